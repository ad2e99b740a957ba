use async_trait::async_trait;
use k8s_openapi::{
    api::apps::v1::{DaemonSet, Deployment},
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    core::{ApiResource, DynamicObject},
    Api, Client,
};
use log::debug;

use crate::{
    helpers::AndIf, resources::crd::v1alpha1::flannel_network::FlannelNetwork, FIELD_MANAGER,
};

use super::{
    network_client::{FlannelNetworkClient, NetworkClientError},
    operations::{
        create_cluster_resource, create_resource, delete_cluster_resource, delete_resource,
        is_not_found,
    },
};

/// Every cluster write the operator performs.
///
/// Implementations report the raw API error; deciding which failures count
/// as success is up to the caller.
#[async_trait]
pub trait ClusterOperations: Send + Sync {
    async fn create_deployment(&self, deployment: &Deployment) -> kube::Result<()>;

    async fn delete_deployment(
        &self,
        namespace: &str,
        name: &str,
        params: &DeleteParams,
    ) -> kube::Result<()>;

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> kube::Result<()>;

    async fn create_definition(&self, definition: &CustomResourceDefinition) -> kube::Result<()>;

    async fn delete_definition(&self, name: &str, params: &DeleteParams) -> kube::Result<()>;

    /// `true` once the API server serves `FlannelNetwork` objects.
    async fn is_network_type_served(&self) -> kube::Result<bool>;

    /// Number of `FlannelNetwork` objects stored cluster-wide.
    async fn count_networks(&self) -> kube::Result<usize>;
}

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    dry_run: bool,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: self.dry_run,
            field_manager: Some(FIELD_MANAGER.to_owned()),
        }
    }

    fn delete_params(&self, params: &DeleteParams) -> DeleteParams {
        params.clone().and_if(self.dry_run, |p| p.dry_run())
    }
}

#[async_trait]
impl ClusterOperations for KubeCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> kube::Result<()> {
        let namespace = deployment.metadata.namespace.as_deref().unwrap_or_default();

        create_resource(&self.client, namespace, deployment, &self.post_params()).await
    }

    async fn delete_deployment(
        &self,
        namespace: &str,
        name: &str,
        params: &DeleteParams,
    ) -> kube::Result<()> {
        delete_resource::<Deployment>(&self.client, namespace, name, &self.delete_params(params))
            .await
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> kube::Result<()> {
        let namespace = daemon_set.metadata.namespace.as_deref().unwrap_or_default();

        create_resource(&self.client, namespace, daemon_set, &self.post_params()).await
    }

    async fn create_definition(&self, definition: &CustomResourceDefinition) -> kube::Result<()> {
        create_cluster_resource(&self.client, definition, &self.post_params()).await
    }

    async fn delete_definition(&self, name: &str, params: &DeleteParams) -> kube::Result<()> {
        delete_cluster_resource::<CustomResourceDefinition>(
            &self.client,
            name,
            &self.delete_params(params),
        )
        .await
    }

    async fn is_network_type_served(&self) -> kube::Result<bool> {
        let networks = FlannelNetworkClient::all(self.client.clone());

        match networks.list(&ListParams::default().limit(1)).await {
            Ok(_) => Ok(true),
            Err(NetworkClientError::KubeApiError(error)) if is_not_found(&error) => {
                debug!("FlannelNetwork resource type isn't served yet");
                Ok(false)
            }
            Err(NetworkClientError::KubeApiError(error)) => Err(error),
            // the type is served, it's just some stored object that doesn't decode
            Err(error) => {
                debug!("FlannelNetwork listing failed to decode: {error}");
                Ok(true)
            }
        }
    }

    async fn count_networks(&self) -> kube::Result<usize> {
        let api_resource = ApiResource::erase::<FlannelNetwork>(&());
        let networks = Api::<DynamicObject>::all_with(self.client.clone(), &api_resource)
            .list(&ListParams::default())
            .await?;

        Ok(networks.items.len())
    }
}
