//! # cardkit transport
//!
//! The card directory as seen by the client: publish, fetch by id, and search
//! by identity. Every call carries a bearer token string.
//!
//! [`memory::MemoryDirectory`] is a complete in-process directory used in
//! tests and offline setups.

pub mod error;
pub mod memory;
pub mod transport;

pub use error::{Result, TransportError};
pub use memory::MemoryDirectory;
pub use transport::CardTransport;
