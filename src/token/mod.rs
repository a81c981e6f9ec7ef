//! Signed action tokens (unsubscribe links).
//!
//! Tokens are minted elsewhere; this module only verifies them.

pub mod codec;
pub mod verifier;

pub use codec::{ActionTokenPayload, TokenCodec, TokenScope, UserId};
pub use verifier::{VerifierState, verifier_routes};
