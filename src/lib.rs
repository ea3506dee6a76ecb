pub mod analysis;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod interview;
pub mod nats;
pub mod runtime;
pub mod speech;

pub use analysis::{AnalysisService, AnalysisSummary, HttpAnalysisClient, InterviewReport};
pub use audio::{AudioBackend, AudioBackendConfig, AudioFile, AudioFrame, MicrophoneAccess, WavMicrophone};
pub use catalog::{Question, QuestionCatalog};
pub use config::{Config, TurnConfig};
pub use error::TurnError;
pub use http::{create_router, AppState};
pub use interview::{
    Collaborators, InputMode, InterviewHandle, SessionSnapshot, TurnController, TurnState,
};
pub use nats::{NatsClient, NatsRecognitionEngine, NatsSpeechSynthesizer};
pub use runtime::{CollaboratorFactory, ServiceFactory};
pub use speech::{RecognitionEngine, SpeechSynthesizer};
