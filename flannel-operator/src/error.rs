use flannel_operator_core::resources::{release::OperatorReleaseBuilderError, ResourceGenerationError};
use kube::config::{InferConfigError, KubeconfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Couldn't prepare the operator release! Reason: {}", .0)]
    ReleaseBuilderError(OperatorReleaseBuilderError),
    #[error("The operator release is invalid! Details: {}", .0)]
    ReleaseValidationError(ResourceGenerationError),
    #[error("Couldn't load kubeconfig! Reason: {}", .0)]
    KubeconfigError(KubeconfigError),
    #[error("Couldn't infer cluster configuration! Reason: {}", .0)]
    InferConfigError(InferConfigError),
    #[error("Couldn't create k8s API client! Reason: {}", .0)]
    ClientError(kube::Error),
    #[error("Couldn't register the FlannelNetwork resource type! Reason: {}", .0)]
    RegistrationError(kube::Error),
}
