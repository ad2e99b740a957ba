use flannel_operator_core::{
    kubernetes::{
        cluster::ClusterOperations,
        operations::{is_already_exists, is_not_found},
    },
    resources::{
        client::{ClientRelease, ClientReleaseBuilder},
        crd::v1alpha1::flannel_network::FlannelNetwork,
    },
};
use kube::{api::DeleteParams, ResourceExt};
use log::{debug, info, warn};

use super::{context::ReconcilerContext, error::ReconcilerError, ReconcileOutcome};

/// Ensures the client workload of a freshly observed network exists.
pub async fn on_add<C: ClusterOperations>(
    context: &ReconcilerContext<C>,
    network: &FlannelNetwork,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let release = build_release(context, network)?;

    if release.parsed_cidr().is_none() {
        warn!(
            "Network '{}/{}' has an invalid CIDR '{}', the client will be created anyway",
            release.network_namespace, release.network_name, release.cidr
        );
    }

    let deployment = release.generate_client_deployment();

    match context.cluster.create_deployment(&deployment).await {
        Ok(()) => {
            info!(
                "Client '{}' for network '{}/{}' (VNI {}) created",
                release.get_name(),
                release.network_namespace,
                release.network_name,
                release.vni
            );
            Ok(ReconcileOutcome::Created)
        }
        Err(error) if is_already_exists(&error) => {
            debug!("Client '{}' already exists", release.get_name());
            Ok(ReconcileOutcome::Unchanged)
        }
        Err(error) => Err(ReconcilerError::KubeApiError(error)),
    }
}

/// Removes the client workload of a deleted network, leaving its pods to
/// the garbage collector.
pub async fn on_delete<C: ClusterOperations>(
    context: &ReconcilerContext<C>,
    network: &FlannelNetwork,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let release = build_release(context, network)?;
    let name = release.get_name();

    match context
        .cluster
        .delete_deployment(&release.namespace, &name, &DeleteParams::orphan())
        .await
    {
        Ok(()) => {
            info!(
                "Client '{name}' for network '{}/{}' removed",
                release.network_namespace, release.network_name
            );
            Ok(ReconcileOutcome::Removed)
        }
        Err(error) if is_not_found(&error) => {
            debug!("Client '{name}' is already gone");
            Ok(ReconcileOutcome::Unchanged)
        }
        Err(error) => Err(ReconcilerError::KubeApiError(error)),
    }
}

/// Network specs are immutable, a changed spec is reported and left alone.
pub fn on_update(
    old: &FlannelNetwork,
    new: &FlannelNetwork,
) -> Result<ReconcileOutcome, ReconcilerError> {
    if old.spec == new.spec {
        return Ok(ReconcileOutcome::Unchanged);
    }

    Err(ReconcilerError::ImmutableSpec {
        name: format!("{}/{}", new.namespace().unwrap_or_default(), new.name_any()),
        old: old.spec.clone(),
        new: new.spec.clone(),
    })
}

fn build_release<C>(
    context: &ReconcilerContext<C>,
    network: &FlannelNetwork,
) -> Result<ClientRelease, ReconcilerError> {
    let release = ClientReleaseBuilder::default()
        .with_operator(&context.release)
        .with_network(network)?
        .build()
        .map_err(ReconcilerError::ClientReleaseBuilderError)?;

    Ok(release.validated()?)
}
