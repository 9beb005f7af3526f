//! WebSocket runtime behind [`realtime_voice_core::session::RealtimeSession`].
//!
//! Sends the assembled `session.update`, keeps an ordered copy of the
//! conversation from server events, plays audio deltas and runs function tools.

pub mod audio;
pub mod conversation;
pub mod events;
pub mod session;

pub use session::{WsSession, WsSessionFactory};
