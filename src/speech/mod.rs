//! Speech engine adapters
//!
//! - `PromptSpeaker` wraps a text-to-speech engine and guarantees one terminal
//!   outcome per prompt
//! - `SpeechRecognizer` wraps a continuous speech-to-text engine and restarts
//!   attempts that end on their own
//! - Engines report through tagged `EventSink`s into a single controller inbox

pub mod events;
pub mod prompt;
pub mod recognizer;

pub use events::{EngineEvent, EventSink, RecognizerEvent, SinkEvent, SpeakerEvent};
pub use prompt::{PromptOutcome, PromptSpeaker, SpeakRequest, SpeechSynthesizer};
pub use recognizer::{
    RecognitionEngine, RecognitionRequest, RecognizerSignal, SpeechRecognizer, StopOutcome,
};
