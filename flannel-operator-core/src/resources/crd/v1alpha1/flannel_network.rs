use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "flannel.st-g.de",
    version = "v1alpha1",
    kind = "FlannelNetwork",
    plural = "flannelnetworks",
    namespaced,
    status = "FlannelNetworkStatus",
    printcolumn = r#"{"name":"VNI","type":"string","jsonPath":".spec.vni"}"#,
    printcolumn = r#"{"name":"CIDR","type":"string","jsonPath":".spec.cidr"}"#
)]
pub struct FlannelNetworkSpec {
    /// identifier of the virtual network segment (VXLAN network identifier)
    #[serde(default)]
    pub vni: String,
    /// address block assigned to this network
    #[serde(default)]
    pub cidr: String,
}

/// Replica counters of the network's client workload.
///
/// The operator doesn't populate this block yet, it's kept so that existing
/// objects carrying it still validate against the schema.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlannelNetworkStatus {
    /// whether actions on the managed objects are currently suspended
    #[serde(default)]
    pub paused: bool,
    /// total number of non-terminated client pods
    #[serde(default)]
    pub replicas: i32,
    /// client pods running the desired spec
    #[serde(default)]
    pub updated_replicas: i32,
    /// client pods available for at least minReadySeconds
    #[serde(default)]
    pub available_replicas: i32,
    /// client pods that aren't available
    #[serde(default)]
    pub unavailable_replicas: i32,
}
