//! Core module containing the hub's transport-independent types

pub mod error;
pub mod events;
pub mod session;

pub use error::{ConfigError, HubError, ProtocolError};
pub use events::ConnectionEvent;
pub use session::{NicknameChange, Session};
