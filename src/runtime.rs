use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{AnalysisService, HttpAnalysisClient};
use crate::audio::{MicrophoneAccess, WavMicrophone};
use crate::config::Config;
use crate::interview::Collaborators;
use crate::nats::{NatsClient, NatsRecognitionEngine, NatsSpeechSynthesizer};

/// Builds the engines for one interview
#[async_trait::async_trait]
pub trait CollaboratorFactory: Send + Sync {
    async fn build(&self) -> Result<Collaborators>;
}

/// Production wiring: NATS speech engines, the file-backed microphone and
/// the HTTP analysis client. The NATS connection and HTTP client are shared
/// across interviews.
pub struct ServiceFactory {
    nats: NatsClient,
    analysis: Arc<dyn AnalysisService>,
    input_path: PathBuf,
}

impl ServiceFactory {
    pub async fn connect(config: &Config) -> Result<Self> {
        let nats = NatsClient::connect(&config.nats.url)
            .await
            .context("Speech engines need a NATS connection")?;
        let analysis = HttpAnalysisClient::new(&config.analysis)?;

        let input_path = match &config.microphone.input_path {
            Some(path) => path.clone(),
            None => {
                warn!("No microphone input configured; answers must be typed");
                PathBuf::new()
            }
        };
        info!("Microphone input: {}", input_path.display());

        Ok(Self {
            nats,
            analysis: Arc::new(analysis),
            input_path,
        })
    }
}

#[async_trait::async_trait]
impl CollaboratorFactory for ServiceFactory {
    async fn build(&self) -> Result<Collaborators> {
        let microphone: Arc<dyn MicrophoneAccess> = Arc::new(WavMicrophone::new(&self.input_path));

        Ok(Collaborators {
            synthesizer: Arc::new(NatsSpeechSynthesizer::new(self.nats.clone())),
            recognizer: Arc::new(NatsRecognitionEngine::new(self.nats.clone())),
            microphone,
            analysis: Arc::clone(&self.analysis),
        })
    }
}
