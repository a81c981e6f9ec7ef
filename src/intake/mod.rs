//! Inbound email intake.
//!
//! Every delivery flows through:
//! 1. `IntakeFilter::classify()` — ordered guards over metadata (no I/O)
//! 2. `Dispatch::dispatch()` — one authenticated POST to the action processor
//! 3. `EmailRouter::handle()` — folds both into a single `Disposition`

pub mod dispatcher;
pub mod filter;
pub mod router;
pub mod routes;
pub mod types;

pub use dispatcher::{ActionDispatcher, Dispatch};
pub use filter::{Guard, GuardAction, GuardKind, IntakeFilter};
pub use router::EmailRouter;
pub use routes::{IntakeState, intake_routes};
pub use types::{Disposition, EmailForwardPayload, InboundEmailMessage, Rejection, Verdict};
