pub mod client;
pub mod engines;
pub mod messages;

pub use client::NatsClient;
pub use engines::{NatsRecognitionEngine, NatsSpeechSynthesizer};
pub use messages::{
    AudioFrameMessage, CancelSpeechMessage, SpeakMessage, SpeechEventKind, SpeechEventMessage,
    TranscriptMessage,
};
