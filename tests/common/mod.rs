// Scripted collaborators for driving the turn controller in tests
#![allow(dead_code)]

use anyhow::Result;
use memory_interview::analysis::{
    AnalysisError, AnalysisRequest, AnalysisService, AnalysisSummary, SummarySource,
};
use memory_interview::audio::{
    AudioBackend, AudioBackendConfig, AudioFrame, MicrophoneAccess, MicrophoneError,
    PermissionState,
};
use memory_interview::catalog::Question;
use memory_interview::interview::Collaborators;
use memory_interview::speech::{
    EventSink, RecognitionEngine, RecognitionRequest, RecognizerEvent, SpeakRequest,
    SpeakerEvent, SpeechSynthesizer,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

pub fn question(id: &str) -> Question {
    Question::new(id, format!("{} 질문입니다?", id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakMode {
    /// Report start and end right away
    AutoEnd,
    /// Fail to start every prompt
    FailToStart,
    /// Keep the sink; the test ends the prompt
    Manual,
}

pub struct FakeSynthesizer {
    mode: SpeakMode,
    pub requests: Mutex<Vec<SpeakRequest>>,
    pub cancels: AtomicUsize,
    sink: Mutex<Option<EventSink<SpeakerEvent>>>,
}

impl FakeSynthesizer {
    pub fn new(mode: SpeakMode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
            sink: Mutex::new(None),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn emit(&self, event: SpeakerEvent) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn speak(&self, request: SpeakRequest, sink: EventSink<SpeakerEvent>) -> Result<()> {
        self.requests.lock().unwrap().push(request);

        match self.mode {
            SpeakMode::AutoEnd => {
                sink.emit(SpeakerEvent::Started);
                sink.emit(SpeakerEvent::Boundary { char_index: 0 });
                sink.emit(SpeakerEvent::Ended);
            }
            SpeakMode::FailToStart => anyhow::bail!("no voice available"),
            SpeakMode::Manual => {}
        }

        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "fake-tts"
    }
}

pub struct FakeRecognizer {
    starts: watch::Sender<usize>,
    pub stops: AtomicUsize,
    /// Emit `Ended` when asked to stop
    pub confirm_stop: AtomicBool,
    pub fail_start: AtomicBool,
    pub audio_attached: AtomicUsize,
    sinks: Mutex<Vec<EventSink<RecognizerEvent>>>,
    pub requests: Mutex<Vec<RecognitionRequest>>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        let (starts, _) = watch::channel(0);
        Self {
            starts,
            stops: AtomicUsize::new(0),
            confirm_stop: AtomicBool::new(true),
            fail_start: AtomicBool::new(false),
            audio_attached: AtomicUsize::new(0),
            sinks: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn starts(&self) -> usize {
        *self.starts.borrow()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub async fn wait_for_starts(&self, n: usize) {
        let mut rx = self.starts.subscribe();
        rx.wait_for(|count| *count >= n)
            .await
            .expect("recognizer dropped");
    }

    /// Emit on the latest attempt
    pub fn emit(&self, event: RecognizerEvent) -> bool {
        match self.sinks.lock().unwrap().last() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// Emit on a specific attempt, counting from 1
    pub fn emit_on(&self, attempt: usize, event: RecognizerEvent) -> bool {
        match self.sinks.lock().unwrap().get(attempt - 1) {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for FakeRecognizer {
    async fn start(
        &self,
        request: RecognitionRequest,
        audio: Option<broadcast::Receiver<AudioFrame>>,
        sink: EventSink<RecognizerEvent>,
    ) -> Result<()> {
        self.requests.lock().unwrap().push(request);
        if audio.is_some() {
            self.audio_attached.fetch_add(1, Ordering::SeqCst);
        }
        self.sinks.lock().unwrap().push(sink);
        self.starts.send_modify(|count| *count += 1);

        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("recognition service unavailable");
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.confirm_stop.load(Ordering::SeqCst) {
            self.emit(RecognizerEvent::Ended);
        }
    }

    fn name(&self) -> &str {
        "fake-stt"
    }
}

/// Counters shared by the microphone and the backends it hands out
#[derive(Default)]
pub struct MicrophoneCounters {
    pub requests: AtomicUsize,
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
}

impl MicrophoneCounters {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

pub struct FakeMicrophone {
    pub permission: Mutex<PermissionState>,
    pub deny: AtomicBool,
    pub counters: Arc<MicrophoneCounters>,
}

impl FakeMicrophone {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(PermissionState::Prompt),
            deny: AtomicBool::new(false),
            counters: Arc::new(MicrophoneCounters::default()),
        }
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.lock().unwrap() = state;
    }
}

#[async_trait::async_trait]
impl MicrophoneAccess for FakeMicrophone {
    async fn query(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request(
        &self,
        _config: &AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>, MicrophoneError> {
        self.counters.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(MicrophoneError::PermissionDenied("user rejected".to_string()));
        }
        Ok(Box::new(FakeBackend {
            counters: Arc::clone(&self.counters),
            tx: None,
        }))
    }
}

struct FakeBackend {
    counters: Arc<MicrophoneCounters>,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

#[async_trait::async_trait]
impl AudioBackend for FakeBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(8);
        self.tx = Some(tx);
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.tx.take().is_some() {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "fake-mic"
    }
}

pub struct FakeAnalysis {
    pub fail: AtomicBool,
    /// Time each request takes before answering
    pub delay: Mutex<Duration>,
    pub requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeAnalysis {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisService for FakeAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisSummary, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AnalysisError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(AnalysisSummary {
            summary: format!("요약: {}", request.answer),
            analysis: "AI 분석 완료".to_string(),
            guidance: "전문가 상담 권장".to_string(),
            source: SummarySource::Service,
        })
    }
}

/// One set of fakes, shared between the test and the controller
pub struct Fakes {
    pub synthesizer: Arc<FakeSynthesizer>,
    pub recognizer: Arc<FakeRecognizer>,
    pub microphone: Arc<FakeMicrophone>,
    pub analysis: Arc<FakeAnalysis>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_speech(SpeakMode::AutoEnd)
    }

    pub fn with_speech(mode: SpeakMode) -> Self {
        Self {
            synthesizer: Arc::new(FakeSynthesizer::new(mode)),
            recognizer: Arc::new(FakeRecognizer::new()),
            microphone: Arc::new(FakeMicrophone::new()),
            analysis: Arc::new(FakeAnalysis::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            synthesizer: self.synthesizer.clone(),
            recognizer: self.recognizer.clone(),
            microphone: self.microphone.clone(),
            analysis: self.analysis.clone(),
        }
    }
}
