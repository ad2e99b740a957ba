use std::time::Duration;

use flannel_operator_core::{
    kubernetes::{
        cluster::ClusterOperations,
        operations::{is_already_exists, is_not_found},
    },
    resources::crd::v1alpha1::{
        flannel_network_definition_name, generate_flannel_network_definition,
    },
};
use kube::api::DeleteParams;
use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

pub const SERVED_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deregistration {
    Removed,
    AlreadyAbsent,
}

/// Makes the API server accept `FlannelNetwork` resources.
pub async fn register<C: ClusterOperations>(cluster: &C) -> kube::Result<Registration> {
    let definition = generate_flannel_network_definition();

    match cluster.create_definition(&definition).await {
        Ok(()) => {
            info!(
                "Resource type '{}' registered",
                flannel_network_definition_name()
            );
            Ok(Registration::Created)
        }
        Err(error) if is_already_exists(&error) => {
            info!(
                "Resource type '{}' is already registered",
                flannel_network_definition_name()
            );
            Ok(Registration::AlreadyPresent)
        }
        Err(error) => Err(error),
    }
}

/// Removes the `FlannelNetwork` resource type. Client and server workloads
/// stay where they are.
pub async fn deregister<C: ClusterOperations>(cluster: &C) -> kube::Result<Deregistration> {
    let name = flannel_network_definition_name();

    match cluster.delete_definition(name, &DeleteParams::default()).await {
        Ok(()) => {
            info!("Resource type '{name}' deregistered");
            Ok(Deregistration::Removed)
        }
        Err(error) if is_not_found(&error) => {
            debug!("Resource type '{name}' was already removed");
            Ok(Deregistration::AlreadyAbsent)
        }
        Err(error) => Err(error),
    }
}

/// Polls until `FlannelNetwork` objects can be listed, giving up after
/// `timeout`. Returns whether the type became available.
pub async fn wait_until_served<C: ClusterOperations>(
    cluster: &C,
    timeout: Duration,
    poll_interval: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        match cluster.is_network_type_served().await {
            Ok(true) => return true,
            Ok(false) => debug!("Waiting for the FlannelNetwork resource type to be served..."),
            Err(error) => debug!("Couldn't check whether FlannelNetwork is served: {error}"),
        }

        if Instant::now() + poll_interval > deadline {
            warn!(
                "FlannelNetwork resource type isn't served after {}s, continuing anyway",
                timeout.as_secs()
            );
            return false;
        }

        sleep(poll_interval).await;
    }
}
