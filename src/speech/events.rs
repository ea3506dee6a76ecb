//! Engine lifecycle events and the sinks engines use to report them

use std::fmt;
use std::marker::PhantomData;
use tokio::sync::mpsc;

/// Lifecycle of one spoken prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerEvent {
    Started,
    /// Word or sentence boundary reached
    Boundary { char_index: usize },
    Ended,
    Errored(String),
}

impl SpeakerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SpeakerEvent::Ended | SpeakerEvent::Errored(_))
    }
}

/// Output of a continuous recognition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Interim(String),
    Final(String),
    Ended,
    Errored(String),
}

impl RecognizerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecognizerEvent::Ended | RecognizerEvent::Errored(_))
    }
}

/// Event in the controller's inbox, tagged with the utterance or attempt that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Speaker { utterance: u64, event: SpeakerEvent },
    Recognizer { attempt: u64, event: RecognizerEvent },
}

pub trait SinkEvent: Send + 'static {
    fn tagged(tag: u64, event: Self) -> EngineEvent;
}

impl SinkEvent for SpeakerEvent {
    fn tagged(utterance: u64, event: Self) -> EngineEvent {
        EngineEvent::Speaker { utterance, event }
    }
}

impl SinkEvent for RecognizerEvent {
    fn tagged(attempt: u64, event: Self) -> EngineEvent {
        EngineEvent::Recognizer { attempt, event }
    }
}

/// Handed to an engine for one utterance or attempt. Emitting never blocks,
/// so engines may report from synchronous callbacks.
pub struct EventSink<E> {
    tx: mpsc::UnboundedSender<EngineEvent>,
    tag: u64,
    _event: PhantomData<fn(E)>,
}

impl<E: SinkEvent> EventSink<E> {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>, tag: u64) -> Self {
        Self {
            tx,
            tag,
            _event: PhantomData,
        }
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Returns false once the controller has gone away
    pub fn emit(&self, event: E) -> bool {
        self.tx.send(E::tagged(self.tag, event)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            tag: self.tag,
            _event: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").field("tag", &self.tag).finish()
    }
}
