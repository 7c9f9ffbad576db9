pub mod errors;
pub mod id;

pub use errors::{ConfigError, ProtocolError, SharecastError};
pub use id::{ConnId, SessionId};
