//! Single-slot checkpoint persistence.
//!
//! A checkpoint is the full serialized state of a collection run. It is
//! written before every advance and read once when a run starts, so a run
//! interrupted by a hard navigation (or a process restart) continues from it.
//! Stores hold exactly one slot: saving replaces whatever was there.

mod model;
mod store;

pub use model::{Checkpoint, CheckpointPolicy};
pub use store::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};

#[cfg(test)]
pub use store::MockCheckpointStore;
