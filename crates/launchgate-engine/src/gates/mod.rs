pub mod aggregator;
pub mod assignment;
pub mod coordinator;

pub use aggregator::{compute_gate_state, update_gate_approval_state};
pub use assignment::ReviewerAssigner;
pub use coordinator::{GateTarget, VoteCoordinator};
