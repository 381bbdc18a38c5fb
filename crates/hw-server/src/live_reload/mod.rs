//! Live reload push channel.

mod broadcaster;
mod websocket;

pub use broadcaster::{ReloadBroadcaster, ReloadMessage, SessionHandle, SessionId};
pub(crate) use websocket::ws_handler;
