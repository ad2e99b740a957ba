use derive_builder::Builder;
use kube::core::ObjectMeta;

use crate::{DEFAULT_FLANNEL_IMAGE, DEFAULT_WORKLOAD_NAMESPACE};

use super::{
    labels::get_operator_labels,
    meta::{validate_label_value, validate_object_name},
    ResourceGenerationError,
};

pub const DEFAULT_SERVER_PORT: i32 = 8889;
pub const DEFAULT_SERVER_CPU_LIMIT: &str = "200m";

/// Settings shared by every workload the operator generates.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct OperatorRelease {
    /// namespace the client and server workloads are deployed to
    #[builder(default = "DEFAULT_WORKLOAD_NAMESPACE.to_owned()")]
    pub namespace: String,
    #[builder(default = "DEFAULT_FLANNEL_IMAGE.to_owned()")]
    pub flannel_image: String,
    /// port the flannel server listens on (and clients connect to)
    #[builder(default = "DEFAULT_SERVER_PORT")]
    pub server_port: i32,
    #[builder(default = "DEFAULT_SERVER_CPU_LIMIT.to_owned()")]
    pub server_cpu_limit: String,
}

impl Default for OperatorRelease {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_WORKLOAD_NAMESPACE.to_owned(),
            flannel_image: DEFAULT_FLANNEL_IMAGE.to_owned(),
            server_port: DEFAULT_SERVER_PORT,
            server_cpu_limit: DEFAULT_SERVER_CPU_LIMIT.to_owned(),
        }
    }
}

impl OperatorRelease {
    pub fn validated(self) -> Result<Self, ResourceGenerationError> {
        validate_object_name(&self.namespace)?;

        if !(1..=65535).contains(&self.server_port) {
            return Err(ResourceGenerationError::InvalidData(
                format!("{} is not a valid server port", self.server_port).into(),
            ));
        }

        if self.flannel_image.is_empty() {
            return Err(ResourceGenerationError::MissingData("flannel image".into()));
        }

        validate_label_value("flannel image tag", self.get_flannel_version())?;

        Ok(self)
    }

    /// Tag of the flannel image, `latest` when the image reference has none.
    /// A trailing digest is not part of the tag.
    pub fn get_flannel_version(&self) -> &str {
        let reference = self
            .flannel_image
            .split_once('@')
            .map_or(self.flannel_image.as_str(), |(reference, _)| reference);
        let last_segment = reference.rsplit('/').next().unwrap_or(reference);

        match last_segment.split_once(':') {
            Some((_, tag)) if !tag.is_empty() => tag,
            _ => "latest",
        }
    }

    pub fn generate_metadata(&self, name: &str) -> ObjectMeta {
        ObjectMeta {
            labels: Some(get_operator_labels()),
            namespace: Some(self.namespace.to_owned()),
            name: Some(name.to_owned()),
            ..Default::default()
        }
    }
}
