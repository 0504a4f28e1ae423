//! Core type definitions using newtype patterns for type safety.

mod port;
mod session_id;

pub use port::{Port, PortError, PortRange};
pub use session_id::SessionId;
