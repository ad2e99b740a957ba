use std::borrow::Cow;

use flannel_operator_core::resources::{
    client::ClientReleaseBuilderError, crd::v1alpha1::flannel_network::FlannelNetworkSpec,
    ResourceGenerationError,
};
use kube::core::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("'{}' resource contains invalid data!", .0)]
    InvalidObjectData(Cow<'static, str>),
    #[error("Couldn't prepare a client release! Reason: {}", .0)]
    ClientReleaseBuilderError(ClientReleaseBuilderError),
    #[error("Couldn't generate a client resource! Reason: {}", .0)]
    ClientResourceGenerationError(ResourceGenerationError),
    #[error("Couldn't apply the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Spec of '{}' can't change ({:?} -> {:?}), recreate the network instead!", .name, .old, .new)]
    ImmutableSpec {
        name: String,
        old: FlannelNetworkSpec,
        new: FlannelNetworkSpec,
    },
}

impl ReconcilerError {
    /// Whether running the same action again can succeed without any change
    /// to the network itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcilerError::KubeApiError(kube::Error::Api(ErrorResponse { code, .. })) => {
                *code == 429 || *code >= 500
            }
            ReconcilerError::KubeApiError(
                kube::Error::HyperError(_) | kube::Error::Service(_) | kube::Error::ReadEvents(_),
            ) => true,
            _ => false,
        }
    }
}

impl From<ResourceGenerationError> for ReconcilerError {
    fn from(value: ResourceGenerationError) -> Self {
        match value {
            ResourceGenerationError::DependentMissingMetadataName
            | ResourceGenerationError::DependentMissingMetadataNamespace => {
                ReconcilerError::MissingObjectMetadata
            }
            ResourceGenerationError::InvalidData(details) => {
                ReconcilerError::InvalidObjectData(details)
            }
            other => ReconcilerError::ClientResourceGenerationError(other),
        }
    }
}
