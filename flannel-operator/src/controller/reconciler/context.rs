use flannel_operator_core::{
    kubernetes::cluster::ClusterOperations, resources::release::OperatorRelease,
};

pub struct ReconcilerContext<C> {
    pub release: OperatorRelease,
    pub cluster: C,
}

impl<C: ClusterOperations> ReconcilerContext<C> {
    pub fn new(cluster: C, release: OperatorRelease) -> Self {
        Self { release, cluster }
    }
}
