//! HTTP gateway hosting the shared Lockstep focus session.
//!
//! The gateway owns the one [`lockstep_core::session::FocusSession`] of a
//! deployment, serves rendered lessons and target plans to presenters and
//! followers, records their touches, and reports the synchronization score.

pub mod api;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;
pub mod state;

pub use server::{router, start_gateway};
pub use state::GatewayState;
