//! Core document model, focus session, and scoring for Lockstep.
//!
//! Everything in this crate is pure apart from [`config`]: extraction,
//! structure building and annotation hold no shared state and can be
//! called concurrently on independent inputs.

pub mod annotate;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod protocol;
pub mod score;
pub mod session;
pub mod structure;
