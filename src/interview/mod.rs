//! Interview turn engine
//!
//! This module provides the `TurnController` that runs one interview:
//! - Speaks each question through the prompt speaker
//! - Opens the microphone (or waits for typed input) once the prompt ends
//! - Runs the recognizer and silence watchdog for the answer
//! - Seals the transcript, releases the turn's resources and advances
//! - Hands the collected answers to analysis when the last turn ends

mod controller;
mod handle;
mod session;
mod state;
mod stats;
mod transcript;
mod watchdog;

pub use controller::{Collaborators, TurnController};
pub use handle::InterviewHandle;
pub use session::{Answer, InputMode, Session, TurnEnd};
pub use state::{Trigger, TurnState};
pub use stats::SessionSnapshot;
pub use transcript::{SealedUtterance, TranscriptAccumulator, Utterance};
pub use watchdog::{SilenceWatchdog, WatchdogExpiry};
