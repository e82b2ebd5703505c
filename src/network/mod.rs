//! Network Layer
//!
//! HTTP transport for the leaderboard protocol. Deliberately thin: it
//! receives a POST body, hands it to the dispatcher, and writes the
//! status and plain-text body back. All ranking logic lives below it.

pub mod server;

pub use server::{HttpServer, ServerConfig, ServerError};
