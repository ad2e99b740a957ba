use flannel_operator_core::{
    kubernetes::{cluster::ClusterOperations, operations::is_already_exists},
    resources::release::OperatorRelease,
};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyPresent,
}

/// Creates the cluster-wide flannel server. An existing daemon set is left
/// untouched, whatever its spec.
pub async fn ensure_server_workload<C: ClusterOperations>(
    cluster: &C,
    release: &OperatorRelease,
) -> kube::Result<ProvisionOutcome> {
    let daemon_set = release.generate_server_daemon_set();
    let name = daemon_set.metadata.name.as_deref().unwrap_or_default();

    match cluster.create_daemon_set(&daemon_set).await {
        Ok(()) => {
            info!("Server '{name}' created in '{}' namespace", release.namespace);
            Ok(ProvisionOutcome::Created)
        }
        Err(error) if is_already_exists(&error) => {
            debug!("Server '{name}' already exists");
            Ok(ProvisionOutcome::AlreadyPresent)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use flannel_operator_core::resources::release::OperatorRelease;

    use crate::test_helpers::{api_error, ClusterCall, Operation, RecordingCluster};

    use super::{ensure_server_workload, ProvisionOutcome};

    #[tokio::test]
    async fn server_is_created_once_in_workload_namespace() {
        let cluster = RecordingCluster::default();
        let release = OperatorRelease::default();

        let first = ensure_server_workload(&cluster, &release).await.unwrap();
        let second = ensure_server_workload(&cluster, &release).await.unwrap();

        assert_eq!(first, ProvisionOutcome::Created);
        assert_eq!(second, ProvisionOutcome::AlreadyPresent);
        assert_eq!(
            cluster.calls()[0],
            ClusterCall::CreateDaemonSet {
                namespace: "kube-system".to_owned(),
                name: "flannel-server".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn other_failures_are_reported() {
        let cluster = RecordingCluster::default();
        cluster.fail_next(Operation::CreateDaemonSet, api_error(403, "Forbidden"));

        assert!(ensure_server_workload(&cluster, &OperatorRelease::default())
            .await
            .is_err());
    }
}
