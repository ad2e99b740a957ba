pub mod helpers;
pub mod kubernetes;
pub mod resources;

pub const FIELD_MANAGER: &str = "flannel-operator";
pub const DEFAULT_WORKLOAD_NAMESPACE: &str = "kube-system";
pub const DEFAULT_FLANNEL_IMAGE: &str = "giantswarm/flannel:v0.6.2";
