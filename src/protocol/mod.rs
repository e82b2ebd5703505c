//! Wire Protocol
//!
//! Request and response format for client-server communication over
//! HTTP POST bodies. Requests arrive as a percent-encoded `d=<base64>`
//! envelope around `key=value` pairs; responses are plain text.

pub mod codec;
pub mod command;

pub use codec::{decode, encode_command, encode_rank, encode_ranks, DecodeError};
pub use command::{Command, Method};
