use derive_builder::Builder;
use ipnet::IpNet;
use kube::core::ObjectMeta;

use crate::helpers::RequireMetadata;

use super::{
    annotations::get_client_annotations,
    crd::v1alpha1::flannel_network::FlannelNetwork,
    labels::get_client_labels,
    meta::{client_deployment_name, validate_label_value, validate_object_name, validate_vni},
    release::OperatorRelease,
    ResourceGenerationError,
};

pub mod deployment;

/// Everything needed to render the client workload of a single network.
#[derive(Debug, Clone, Builder)]
pub struct ClientRelease {
    /// namespace the deployment is created in
    pub namespace: String,
    pub network_namespace: String,
    pub network_name: String,
    pub vni: String,
    pub cidr: String,
    pub image: String,
    pub server_port: i32,
}

impl ClientReleaseBuilder {
    pub fn with_operator(&mut self, release: &OperatorRelease) -> &mut Self {
        self.namespace(release.namespace.to_owned())
            .image(release.flannel_image.to_owned())
            .server_port(release.server_port)
    }

    pub fn with_network(
        &mut self,
        network: &FlannelNetwork,
    ) -> Result<&mut Self, ResourceGenerationError> {
        let name = network.require_name_or(ResourceGenerationError::DependentMissingMetadataName)?;
        let namespace = network
            .require_namespace_or(ResourceGenerationError::DependentMissingMetadataNamespace)?;

        Ok(self
            .network_namespace(namespace.to_owned())
            .network_name(name.to_owned())
            .vni(network.spec.vni.to_owned())
            .cidr(network.spec.cidr.to_owned()))
    }
}

impl ClientRelease {
    pub fn get_name(&self) -> String {
        client_deployment_name(&self.network_namespace, &self.network_name, &self.vni)
    }

    pub fn validated(self) -> Result<Self, ResourceGenerationError> {
        validate_vni(&self.vni)?;
        validate_label_value("metadata.namespace", &self.network_namespace)?;
        validate_label_value("metadata.name", &self.network_name)?;
        validate_object_name(&self.get_name())?;

        Ok(self)
    }

    /// The network's address block, `None` when it isn't a valid CIDR.
    pub fn parsed_cidr(&self) -> Option<IpNet> {
        self.cidr.parse().ok()
    }

    pub fn generate_client_metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.get_name()),
            namespace: Some(self.namespace.to_owned()),
            labels: Some(get_client_labels(
                &self.network_namespace,
                &self.network_name,
                &self.vni,
            )),
            annotations: Some(get_client_annotations(
                &self.network_namespace,
                &self.network_name,
                &self.cidr,
            )),
            ..Default::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use kube::core::ObjectMeta;

    use crate::resources::{
        crd::v1alpha1::flannel_network::{FlannelNetwork, FlannelNetworkSpec},
        release::OperatorRelease,
        ResourceGenerationError,
    };

    use super::{ClientRelease, ClientReleaseBuilder};

    pub fn network(namespace: &str, name: &str, vni: &str, cidr: &str) -> FlannelNetwork {
        FlannelNetwork {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..Default::default()
            },
            spec: FlannelNetworkSpec {
                vni: vni.to_owned(),
                cidr: cidr.to_owned(),
            },
            status: None,
        }
    }

    pub fn release_for(network: &FlannelNetwork) -> ClientRelease {
        ClientReleaseBuilder::default()
            .with_operator(&OperatorRelease::default())
            .with_network(network)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn release_takes_identity_from_network() {
        let release = release_for(&network("default", "net1", "42", "10.0.0.0/24"));

        assert_eq!(release.get_name(), "flannel-client-default-net1-vni42");
        assert_eq!(release.namespace, "kube-system");
        assert_eq!(release.parsed_cidr().map(|n| n.to_string()).as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn release_requires_network_namespace() {
        let mut nameless = network("default", "net1", "42", "10.0.0.0/24");
        nameless.metadata.namespace = None;

        let result = ClientReleaseBuilder::default().with_network(&nameless).map(|_| ());

        assert!(matches!(
            result,
            Err(ResourceGenerationError::DependentMissingMetadataNamespace)
        ));
    }

    #[test]
    fn malformed_cidr_is_tolerated_but_reported() {
        let release = release_for(&network("default", "net1", "42", "not-a-cidr"));

        assert!(release.parsed_cidr().is_none());
        assert!(release.validated().is_ok());
    }

    #[test]
    fn network_name_must_fit_a_label_value() {
        let release = release_for(&network("default", &"n".repeat(64), "42", "10.0.0.0/24"));

        assert!(matches!(
            release.validated(),
            Err(ResourceGenerationError::InvalidData(_))
        ));
    }

    #[test]
    fn invalid_vni_fails_validation() {
        let release = release_for(&network("default", "net1", "", "10.0.0.0/24"));

        assert!(matches!(
            release.validated(),
            Err(ResourceGenerationError::MissingData(_))
        ));
    }
}
