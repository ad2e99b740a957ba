pub mod context;
pub mod error;
pub mod network;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// the client workload was created
    Created,
    /// the client workload was removed
    Removed,
    /// the cluster already matched the network
    Unchanged,
}
