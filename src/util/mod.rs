//! Backoff and deadline helpers.

pub mod retry;
pub mod timeout;
