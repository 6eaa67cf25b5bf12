//! Cooperative cancellation for collection runs.
//!
//! A host requests early termination through a [`CancellationToken`]; the
//! controller observes it at iteration boundaries and while waiting, then
//! flushes whatever it has collected.

mod token;

pub use token::CancellationToken;
