use std::collections::BTreeMap;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

use crate::resources::labels::get_operator_labels;

use self::flannel_network::FlannelNetwork;

pub mod flannel_network;

pub const FLANNEL_NETWORK_DESCRIPTION: &str = "Flannel-based container network connectivity";
pub const DESCRIPTION_ANNOTATION: &str = "flannel.st-g.de/description";

/// Builds the registration object that makes the API server accept
/// `FlannelNetwork` resources.
pub fn generate_flannel_network_definition() -> CustomResourceDefinition {
    let mut definition = FlannelNetwork::crd();

    definition.metadata.labels = Some(get_operator_labels());
    definition.metadata.annotations = Some(BTreeMap::from([(
        DESCRIPTION_ANNOTATION.to_owned(),
        FLANNEL_NETWORK_DESCRIPTION.to_owned(),
    )]));

    definition
}

pub fn flannel_network_definition_name() -> &'static str {
    FlannelNetwork::crd_name()
}
