use serde::{Deserialize, Serialize};
use tracing::debug;

/// The evolving answer to the current question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Confirmed text, in arrival order
    final_segments: Vec<String>,
    /// Latest unconfirmed tail, replaced in place
    interim_segment: String,
}

impl Utterance {
    pub fn final_segments(&self) -> &[String] {
        &self.final_segments
    }

    pub fn interim_segment(&self) -> &str {
        &self.interim_segment
    }

    pub fn composed_text(&self) -> String {
        self.final_segments
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.interim_segment.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn joined_finals(&self) -> String {
        self.final_segments.join(" ")
    }
}

/// Read-only answer produced when a turn ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedUtterance {
    segments: Vec<String>,
    text: String,
}

impl SealedUtterance {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Merges interim and final recognition results into one running transcript.
///
/// Final segments are append-only until `reset`. Once sealed, further
/// results are refused.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    utterance: Utterance,
    sealed: Option<SealedUtterance>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utterance(&self) -> &Utterance {
        &self.utterance
    }

    pub fn composed_text(&self) -> String {
        match &self.sealed {
            Some(sealed) => sealed.text.clone(),
            None => self.utterance.composed_text(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    /// Append a confirmed segment. Returns false if nothing was appended.
    pub fn push_final(&mut self, text: &str) -> bool {
        if self.refuse("final") {
            return false;
        }

        self.utterance.interim_segment.clear();
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.utterance.final_segments.push(text.to_string());
        true
    }

    /// Replace the unconfirmed tail
    pub fn push_interim(&mut self, text: &str) -> bool {
        if self.refuse("interim") {
            return false;
        }

        self.utterance.interim_segment = text.trim().to_string();
        true
    }

    /// Close the utterance. A trailing interim that the engine never confirmed is
    /// promoted unless the confirmed text already ends with it. Sealing twice
    /// returns the same result.
    pub fn seal(&mut self) -> SealedUtterance {
        if let Some(sealed) = &self.sealed {
            return sealed.clone();
        }

        let interim = std::mem::take(&mut self.utterance.interim_segment);
        if !interim.is_empty() && !self.utterance.joined_finals().ends_with(&interim) {
            self.utterance.final_segments.push(interim);
        }

        let sealed = SealedUtterance {
            segments: self.utterance.final_segments.clone(),
            text: self.utterance.joined_finals(),
        };
        self.sealed = Some(sealed.clone());
        sealed
    }

    /// Start a fresh, empty utterance
    pub fn reset(&mut self) {
        self.utterance = Utterance::default();
        self.sealed = None;
    }

    fn refuse(&self, kind: &str) -> bool {
        if self.sealed.is_some() {
            debug!("Dropping {} result after the answer was sealed", kind);
            return true;
        }
        false
    }
}
