//! mailgate — inbound email intake and action-token verification.

pub mod config;
pub mod error;
pub mod intake;
pub mod server;
pub mod token;
