//! The engine's checkpointer seam is `pailflow_store::CheckpointStore`
//! itself (spec.md §4.3) — re-exported here under the graph's own
//! vocabulary rather than wrapped, since the store crate's trait already
//! has the exact shape this module needs.
pub use pailflow_store::{CheckpointRecord, CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
