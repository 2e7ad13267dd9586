pub mod movement_replicator;
pub mod reconciliation_policy;
pub mod replicated_entity;
pub mod snapshot_buffer;

pub use movement_replicator::MovementReplicator;
pub use reconciliation_policy::{Correction, ReconciliationPolicy};
pub use replicated_entity::{ReconciliationState, ReplicatedEntity};
pub use snapshot_buffer::{BufferedSnapshot, SharedSnapshotBuffer, SnapshotBuffer};
