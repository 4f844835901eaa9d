//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() → closed flag set → acceptor wakes → listener dropped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary closes the server → optional drain
//! ```
//!
//! # Design Decisions
//! - The closed flag is an atomic owned by the server, never a global
//! - Closing stops future accepts only; in-flight connections finish

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
