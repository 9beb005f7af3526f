//! Session Lifecycle Controller
//!
//! Owns the single live `SessionHandle`, the connection status and the
//! display history. Every operation takes `&mut self`, so replacing the handle
//! (close old, open new) is one uninterrupted step and two connects can never
//! overlap.

use crate::{
    api_key::{ApiKey, ValidationError},
    assembler::{AssemblerSettings, assemble_with_transport},
    history::{ChatMessage, HistoryNormalizer},
    options::{ConnectionOptions, ConnectionStatus, SessionMode},
    session::{SessionError, SessionEvent, SessionFactory, SessionHandle},
    transport::TransportKind,
};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Upper bound on a single connect handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Updates published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Status(ConnectionStatus),
    Message(ChatMessage),
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("No previous connection options to reconnect with")]
    NoPreviousOptions,
    #[error("Not connected")]
    NotConnected,
}

pub struct SessionController {
    factory: Arc<dyn SessionFactory>,
    settings: AssemblerSettings,
    connect_timeout: Duration,
    status: ConnectionStatus,
    mode: SessionMode,
    handle: Option<SessionHandle>,
    history: HistoryNormalizer,
    last_options: Option<ConnectionOptions>,
    /// Most recently entered key; survives mode switches without re-entry.
    last_api_key: Option<ApiKey>,
    updates: mpsc::UnboundedSender<ControllerEvent>,
}

impl SessionController {
    /// Creates a disconnected controller and the receiver for its updates.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        settings: AssemblerSettings,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let controller = Self {
            factory,
            settings,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            status: ConnectionStatus::Disconnected,
            mode: SessionMode::default(),
            handle: None,
            history: HistoryNormalizer::new(),
            last_options: None,
            last_api_key: None,
            updates,
        };
        (controller, rx)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.history.messages()
    }

    pub fn has_session(&self) -> bool {
        self.handle.is_some()
    }

    /// Remembers a newly entered key for later reconnects without connecting.
    pub fn set_api_key(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.last_api_key = Some(ApiKey::parse(raw)?);
        Ok(())
    }

    /// Opens a new session with `options`, replacing any current one.
    ///
    /// A malformed key is rejected before anything else happens. Failures are
    /// terminal for the attempt: the status returns to disconnected and no
    /// handle is kept. A WebRTC negotiation failure is retried once over
    /// WebSocket.
    pub async fn connect(&mut self, options: ConnectionOptions) -> Result<(), ControllerError> {
        let api_key = match options.validated_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Rejected connect request");
                self.emit(ControllerEvent::Error(e.to_string()));
                return Err(e.into());
            }
        };

        self.mode = options.session_mode;
        self.last_api_key = Some(api_key.clone());
        self.last_options = Some(options.clone());

        self.set_status(ConnectionStatus::Connecting);
        self.release_handle().await;
        self.history.clear();

        let result = match self.open(&options, &api_key, options.transport).await {
            Err(e) if options.transport == TransportKind::WebRtc && e.is_negotiation_failure() => {
                warn!(error = %e, "WebRTC negotiation failed; retrying over WebSocket");
                self.open(&options, &api_key, TransportKind::WebSocket).await
            }
            other => other,
        };

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.set_status(ConnectionStatus::Connected);
                info!(mode = %self.mode, "Realtime session connected");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Realtime session failed to connect");
                self.set_status(ConnectionStatus::Disconnected);
                self.emit(ControllerEvent::Error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Closes the current session (if any) and clears the history.
    pub async fn disconnect(&mut self) {
        self.release_handle().await;
        self.history.clear();
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Changes the session mode; a connected session is rebuilt in the new mode
    /// from the last options and the most recently entered key.
    pub async fn switch_mode(&mut self, next: SessionMode) -> Result<(), ControllerError> {
        self.mode = next;
        if self.status != ConnectionStatus::Connected {
            return Ok(());
        }

        let mut options = self
            .last_options
            .clone()
            .ok_or(ControllerError::NoPreviousOptions)?;
        options.session_mode = next;
        if let Some(key) = &self.last_api_key {
            options.api_key = SecretString::from(key.expose().to_string());
        }
        info!(mode = %next, "Switching session mode");
        self.connect(options).await
    }

    /// Sends typed text to the connected session.
    pub async fn send_text(&self, text: &str) -> Result<(), ControllerError> {
        let handle = self.handle.as_ref().ok_or(ControllerError::NotConnected)?;
        handle.send_text(text).await?;
        Ok(())
    }

    /// Streams user audio into the connected session.
    pub async fn send_audio(&self, pcm16: &[u8]) -> Result<(), ControllerError> {
        let handle = self.handle.as_ref().ok_or(ControllerError::NotConnected)?;
        handle.send_audio(pcm16).await?;
        Ok(())
    }

    /// Stops the assistant's current response.
    pub async fn interrupt(&self) -> Result<(), ControllerError> {
        let handle = self.handle.as_ref().ok_or(ControllerError::NotConnected)?;
        handle.interrupt().await?;
        info!("Interrupted current response");
        Ok(())
    }

    /// Waits for the next event of the current session.
    ///
    /// Pends forever while no session is held. Returns `None` once the current
    /// session's event stream has ended.
    pub async fn next_session_event(&mut self) -> Option<SessionEvent> {
        match self.handle.as_mut().and_then(SessionHandle::events_mut) {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Applies one session event and returns any newly produced messages.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Vec<ChatMessage> {
        match event {
            SessionEvent::HistoryUpdated(snapshot) => {
                let fresh = self.history.ingest(&snapshot);
                for message in &fresh {
                    self.emit(ControllerEvent::Message(message.clone()));
                }
                fresh
            }
            SessionEvent::Error(message) => {
                // informational only; the session stays up
                error!(%message, "Realtime session error");
                self.emit(ControllerEvent::Error(message));
                Vec::new()
            }
        }
    }

    /// Tears everything down; call before dropping the controller.
    pub async fn shutdown(mut self) {
        self.disconnect().await;
    }

    async fn open(
        &self,
        options: &ConnectionOptions,
        api_key: &ApiKey,
        transport: TransportKind,
    ) -> Result<SessionHandle, SessionError> {
        let plan = assemble_with_transport(options, api_key, transport, &self.settings);
        info!(
            mode = %plan.mode,
            model = %plan.config.model,
            transport = %transport,
            "Connecting realtime session"
        );
        let mut handle = SessionHandle::new(self.factory.create(plan), api_key.clone());

        match tokio::time::timeout(self.connect_timeout, handle.connect()).await {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => {
                handle.close().await;
                Err(e)
            }
            Err(_) => {
                handle.close().await;
                Err(SessionError::Timeout(self.connect_timeout))
            }
        }
    }

    async fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close().await;
            info!("Closed previous realtime session");
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            self.status = status;
            self.emit(ControllerEvent::Status(status));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // no receiver means nobody is rendering; the state is still kept
        let _ = self.updates.send(event);
    }
}
