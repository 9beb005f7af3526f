//! Abstraction over the realtime session runtime.
//!
//! The runtime (socket handling, audio streaming, turn detection) lives behind
//! `RealtimeSession`; this crate only needs to construct, connect, observe and
//! close it.

use crate::{api_key::ApiKey, assembler::SessionPlan, history::HistoryItem};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Error texts that identify a failed transport negotiation (e.g. a non-SDP
/// body where an SDP answer was expected). Illustrative, not exhaustive.
pub const NEGOTIATION_SIGNATURES: &[&str] = &[
    "SDP",
    "SessionDescription",
    "setRemoteDescription",
    "Expect line: v=",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Transport negotiation failed: {0}")]
    Negotiation(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("Session is closed")]
    Closed,
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Whether this failure warrants degrading to a lower-capability transport.
    pub fn is_negotiation_failure(&self) -> bool {
        match self {
            SessionError::Negotiation(_) => true,
            SessionError::Transport(msg) | SessionError::Protocol(msg) => {
                NEGOTIATION_SIGNATURES.iter().any(|sig| msg.contains(sig))
            }
            _ => false,
        }
    }
}

/// Events delivered by a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The complete, ordered conversation history (not a delta).
    HistoryUpdated(Vec<HistoryItem>),
    /// A runtime error reported after the session connected.
    Error(String),
}

/// Receiving half of a session's event subscription.
pub type EventStream = mpsc::UnboundedReceiver<SessionEvent>;

/// One realtime session instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeSession: Send {
    /// Hands out the session's event subscription. Only the first call returns `Some`.
    fn take_events(&mut self) -> Option<EventStream>;

    /// Performs the connection handshake.
    async fn connect(&mut self, api_key: &ApiKey) -> Result<(), SessionError>;

    /// Sends a typed user message.
    async fn send_text(&self, text: &str) -> Result<(), SessionError>;

    /// Appends PCM16 (24 kHz, mono) user audio to the input buffer.
    async fn send_audio(&self, pcm16: &[u8]) -> Result<(), SessionError>;

    /// Cancels the response currently being generated.
    async fn interrupt(&self) -> Result<(), SessionError>;

    /// Tears the session down. Events stop after this returns.
    async fn close(&mut self);
}

/// Creates session instances from assembled plans.
pub trait SessionFactory: Send + Sync {
    fn create(&self, plan: SessionPlan) -> Box<dyn RealtimeSession>;
}

/// Exclusive owner of one session, its event subscription and its credentials.
///
/// Dropping or closing the handle also drops the subscription, so no listener
/// outlives the session it was attached to.
pub struct SessionHandle {
    session: Box<dyn RealtimeSession>,
    api_key: ApiKey,
    events: Option<EventStream>,
    connected: bool,
}

impl SessionHandle {
    pub fn new(mut session: Box<dyn RealtimeSession>, api_key: ApiKey) -> Self {
        let events = session.take_events();
        Self {
            session,
            api_key,
            events,
            connected: false,
        }
    }

    /// Connects once; later calls on a connected handle are no-ops.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.connected {
            return Ok(());
        }
        self.session.connect(&self.api_key).await?;
        self.connected = true;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn events_mut(&mut self) -> Option<&mut EventStream> {
        self.events.as_mut()
    }

    pub async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::Closed);
        }
        self.session.send_text(text).await
    }

    pub async fn send_audio(&self, pcm16: &[u8]) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::Closed);
        }
        self.session.send_audio(pcm16).await
    }

    pub async fn interrupt(&self) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::Closed);
        }
        self.session.interrupt().await
    }

    /// Unsubscribes and closes the session. Consumes the handle.
    pub async fn close(mut self) {
        self.events = None;
        self.session.close().await;
    }
}
