//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept)
//!     → connection.rs (id, in-flight tracking)
//!     → Hand off to HTTP layer (one task per connection)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Accept, Listener, ListenerError};
