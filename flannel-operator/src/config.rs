use std::time::Duration;

use flannel_operator_core::resources::release::{OperatorRelease, OperatorReleaseBuilder};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use log::debug;

use crate::{
    cli::{GlobalArgs, OperatorArgs},
    controller::{queue::QueueSettings, OperatorSettings},
    error::OperatorError,
};

/// Everything the operator needs to start, resolved from command line and
/// environment.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub kube_config: Option<String>,
    pub kube_context: Option<String>,
    pub release: OperatorRelease,
    pub settings: OperatorSettings,
    pub resync_period: Duration,
    pub dry_run: bool,
}

impl OperatorConfig {
    pub fn from_args(
        global_args: &GlobalArgs,
        operator_args: &OperatorArgs,
    ) -> Result<Self, OperatorError> {
        let release = OperatorReleaseBuilder::default()
            .namespace(&operator_args.namespace)
            .flannel_image(&operator_args.flannel_image)
            .build()
            .map_err(OperatorError::ReleaseBuilderError)?
            .validated()
            .map_err(OperatorError::ReleaseValidationError)?;

        Ok(Self {
            kube_config: global_args.kube_config.to_owned(),
            kube_context: global_args.kube_context.to_owned(),
            release,
            settings: OperatorSettings {
                queue: QueueSettings {
                    retry_base_delay: Duration::from_millis(operator_args.retry_base_ms),
                    retry_max_delay: Duration::from_secs(operator_args.retry_max_seconds),
                    max_attempts: operator_args.max_attempts,
                    min_interval: Duration::from_millis(operator_args.min_interval_ms),
                },
                registration_timeout: Duration::from_secs(
                    operator_args.registration_timeout_seconds,
                ),
                retain_resource_type: operator_args.retain_resource_type,
            },
            resync_period: Duration::from_secs(operator_args.resync_seconds),
            dry_run: operator_args.dry_run,
        })
    }
}

/// Uses the given kubeconfig/context when either is set, otherwise infers
/// the configuration (in-cluster service account first).
pub async fn create_client(
    config_path: &Option<String>,
    context_name: &Option<String>,
) -> Result<Client, OperatorError> {
    let config = match (config_path, context_name) {
        (None, None) => Config::infer()
            .await
            .map_err(OperatorError::InferConfigError)?,
        _ => {
            let config_options = KubeConfigOptions {
                context: context_name.to_owned(),
                ..Default::default()
            };

            match config_path {
                Some(path) => {
                    let kubeconfig =
                        Kubeconfig::read_from(path).map_err(OperatorError::KubeconfigError)?;
                    Config::from_custom_kubeconfig(kubeconfig, &config_options)
                        .await
                        .map_err(OperatorError::KubeconfigError)?
                }
                None => Config::from_kubeconfig(&config_options)
                    .await
                    .map_err(OperatorError::KubeconfigError)?,
            }
        }
    };

    debug!("Connecting to {}", config.cluster_url);

    Client::try_from(config).map_err(OperatorError::ClientError)
}
