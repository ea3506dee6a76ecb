pub mod backend;
pub mod file;
pub mod level;
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use file::{AudioFile, WavBackend};
pub use level::rms_level;
pub use microphone::{
    MicrophoneAccess, MicrophoneError, MicrophoneSession, MicrophoneSlot, PermissionState,
    WavMicrophone,
};
