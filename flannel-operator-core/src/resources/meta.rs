use once_cell::sync::Lazy;
use regex::Regex;

use super::{crd::v1alpha1::flannel_network::FlannelNetwork, ResourceGenerationError};

pub const CLIENT_DEPLOYMENT_PREFIX: &str = "flannel-client";
pub const SERVER_DAEMON_SET_NAME: &str = "flannel-server";

const MAX_OBJECT_NAME_LENGTH: usize = 253;
const MAX_LABEL_VALUE_LENGTH: usize = 63;

/// Name of the client deployment derived from a network's identity.
///
/// This is the only link between a network and its deployment, so both the
/// create and the delete path must go through it.
pub fn client_deployment_name(namespace: &str, name: &str, vni: &str) -> String {
    format!("{CLIENT_DEPLOYMENT_PREFIX}-{namespace}-{name}-vni{vni}")
}

pub trait TryNetworkMeta {
    fn try_get_client_deployment_name(&self) -> Option<String>;
}

impl TryNetworkMeta for FlannelNetwork {
    fn try_get_client_deployment_name(&self) -> Option<String> {
        let namespace = self.metadata.namespace.as_ref()?;
        let name = self.metadata.name.as_ref()?;

        Some(client_deployment_name(namespace, name, &self.spec.vni))
    }
}

static LABEL_VALUE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap());

static OBJECT_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

pub fn validate_vni(vni: &str) -> Result<(), ResourceGenerationError> {
    validate_label_value("spec.vni", vni)
}

/// Checks that `value` can be used as a label value, `field` names it in the
/// error.
pub fn validate_label_value(field: &str, value: &str) -> Result<(), ResourceGenerationError> {
    if value.is_empty() {
        return Err(ResourceGenerationError::MissingData(field.to_owned().into()));
    }

    if value.len() > MAX_LABEL_VALUE_LENGTH || !LABEL_VALUE_REGEX.is_match(value) {
        return Err(ResourceGenerationError::InvalidData(
            format!("'{value}' is not a valid {field} label value").into(),
        ));
    }

    Ok(())
}

pub fn validate_object_name(name: &str) -> Result<(), ResourceGenerationError> {
    if name.len() > MAX_OBJECT_NAME_LENGTH || !OBJECT_NAME_REGEX.is_match(name) {
        return Err(ResourceGenerationError::InvalidData(
            format!("'{name}' is not a valid object name").into(),
        ));
    }

    Ok(())
}
