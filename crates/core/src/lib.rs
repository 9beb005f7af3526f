//! Realtime Voice Core
//!
//! Session configuration and lifecycle for a realtime voice/text assistant:
//! option model, turn detection, transport and agent factories, the session
//! assembler, history normalization and the connection lifecycle controller.
//! The session runtime itself sits behind [`session::RealtimeSession`].

pub mod agent;
pub mod api_key;
pub mod assembler;
pub mod controller;
pub mod history;
pub mod options;
pub mod session;
pub mod session_config;
pub mod tools;
pub mod transport;
pub mod turn_detection;
pub mod web_search;

pub use controller::{ControllerError, ControllerEvent, SessionController};
pub use history::{ChatMessage, Role};
pub use options::{ConnectionOptions, ConnectionStatus, SessionMode};
