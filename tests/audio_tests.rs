// Tests for audio frames, WAV replay and the file-backed microphone
//
// WAV fixtures are generated into temporary files with hound.

use anyhow::Result;
use memory_interview::audio::{
    rms_level, AudioBackend, AudioBackendConfig, AudioFile, AudioFrame, MicrophoneAccess,
    MicrophoneError, MicrophoneSession, PermissionState, WavBackend, WavMicrophone,
};
use memory_interview::config::MicrophoneConfig;
use std::path::Path;
use tokio::sync::watch;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// 300ms of a loud square wave at 16kHz mono
fn answer_wav(dir: &tempfile::TempDir) -> Result<std::path::PathBuf> {
    let path = dir.path().join("answer.wav");
    let samples: Vec<i16> = (0..4800)
        .map(|i| if i % 2 == 0 { 16000 } else { -16000 })
        .collect();
    write_wav(&path, 16000, 1, &samples)?;
    Ok(path)
}

#[test]
fn test_audio_frame_duration() {
    let frame = AudioFrame {
        samples: vec![0i16; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    };
    assert_eq!(frame.duration_ms(), 100);

    // Stereo audio: samples are interleaved [L, R, L, R, ...]
    let stereo = AudioFrame {
        samples: vec![100, 200, 150, 250, 175, 275],
        sample_rate: 1000,
        channels: 2,
        timestamp_ms: 0,
    };
    assert_eq!(stereo.duration_ms(), 3);
}

#[test]
fn test_audio_frame_pcm_bytes_little_endian() {
    let frame = AudioFrame {
        samples: vec![1, -2],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    };
    assert_eq!(frame.pcm_bytes(), vec![0x01, 0x00, 0xFE, 0xFF]);
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.target_sample_rate, 16000, "Default should be 16kHz for recognition");
    assert_eq!(config.target_channels, 1, "Default should be mono");
    assert_eq!(config.buffer_duration_ms, 100, "Default buffer should be 100ms");
}

#[test]
fn test_rms_level_range() {
    assert_eq!(rms_level(&[]), 0.0);
    assert_eq!(rms_level(&[0; 320]), 0.0);

    let quiet = rms_level(&[1000, -1000, 1000, -1000]);
    let loud = rms_level(&[20000, -20000, 20000, -20000]);
    assert!(quiet > 0.0 && quiet < loud);
    assert!(loud <= 1.0);
}

#[test]
fn test_audio_file_open_and_frames() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = answer_wav(&dir)?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 4800);
    assert!((audio.duration_seconds - 0.3).abs() < 0.001);
    assert!(audio.path.contains("answer.wav"));

    let frames = audio.frames(100);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].timestamp_ms, 200);
    assert!(frames.iter().all(|f| f.samples.len() == 1600));
    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");
    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[tokio::test(start_paused = true)]
async fn test_wav_backend_replays_all_frames() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let audio = AudioFile::open(answer_wav(&dir)?)?;
    let mut backend = WavBackend::new(audio, 100);

    let mut rx = backend.start().await?;
    assert!(backend.is_capturing());
    assert!(backend.start().await.is_err(), "second start should fail");

    let mut received = Vec::new();
    while let Some(frame) = rx.recv().await {
        received.push(frame);
    }

    assert_eq!(received.len(), 3);
    assert!(!backend.is_capturing());
    backend.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_wav_microphone_missing_file_is_denied() {
    let mic = WavMicrophone::new("/nonexistent/answer.wav");

    assert_eq!(mic.query().await, PermissionState::Denied);
    let result = mic.request(&AudioBackendConfig::default()).await;
    assert!(matches!(result, Err(MicrophoneError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_wav_microphone_unreadable_file_is_unavailable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"not a wav file")?;

    let mic = WavMicrophone::new(&path);
    assert_eq!(mic.query().await, PermissionState::Granted);

    let result = mic.request(&AudioBackendConfig::default()).await;
    assert!(matches!(result, Err(MicrophoneError::Unavailable(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_microphone_session_publishes_levels_and_frames() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mic = WavMicrophone::new(answer_wav(&dir)?);
    let (levels, mut level_rx) = watch::channel(0.0_f32);

    let mut session = MicrophoneSession::acquire(&mic, &MicrophoneConfig::default(), &levels)
        .await
?;
    assert!(session.is_open());
    assert!(session.has_level_tap());

    let mut frames = session.subscribe();
    let frame = frames.recv().await?;
    assert_eq!(frame.sample_rate, 16000);

    level_rx.wait_for(|level| *level > 0.4).await?;

    assert!(session.release().await);
    assert!(!session.is_open());
    assert_eq!(*level_rx.borrow(), 0.0);

    // Release is idempotent
    assert!(!session.release().await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_level_tap_can_be_disabled() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mic = WavMicrophone::new(answer_wav(&dir)?);
    let (levels, level_rx) = watch::channel(0.0_f32);
    let config = MicrophoneConfig {
        level_tap: false,
        ..MicrophoneConfig::default()
    };

    let mut session = MicrophoneSession::acquire(&mic, &config, &levels)
        .await
?;
    let mut frames = session.subscribe();
    frames.recv().await?;

    assert!(!session.has_level_tap());
    assert_eq!(*level_rx.borrow(), 0.0);
    session.release().await;
    Ok(())
}
