use serde::{Deserialize, Serialize};

/// Microphone frame published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String,  // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String,  // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Prompt request published to the TTS service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakMessage {
    pub session_id: String,
    pub utterance_id: u64,
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechEventKind {
    Start,
    Boundary,
    End,
    Error,
}

/// Playback lifecycle event from the TTS service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEventMessage {
    pub session_id: String,
    pub utterance_id: u64,
    pub event: SpeechEventKind,
    #[serde(default)]
    pub char_index: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Asks the TTS service to silence a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelSpeechMessage {
    pub session_id: String,
    pub timestamp: String,
}
