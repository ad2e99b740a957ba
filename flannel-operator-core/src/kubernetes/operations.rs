use std::fmt::Debug;

use k8s_openapi::{
    serde::{de::DeserializeOwned, Serialize},
    ClusterResourceScope, NamespaceResourceScope,
};
use kube::{
    api::{DeleteParams, PostParams},
    core::ErrorResponse,
    Api, Client, Resource,
};
use log::{debug, info};

use crate::helpers::pretty_type_name;

/// `true` when a create failed only because the object is already there.
pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(
        error,
        kube::Error::Api(ErrorResponse { reason, code, .. })
            if reason == "AlreadyExists" || (*code == 409 && reason.is_empty())
    )
}

/// `true` when a get/delete failed only because the object is gone.
pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(ErrorResponse { code: 404, .. }))
}

pub async fn create_resource<T>(
    client: &Client,
    namespace: &str,
    resource: &T,
    post_params: &PostParams,
) -> kube::Result<()>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_name = resource.meta().name.as_deref().unwrap_or_default();

    info!(
        "Creating '{resource_name}' {} resource in '{namespace}' namespace...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    resource_api.create(post_params, resource).await?;

    Ok(())
}

pub async fn create_cluster_resource<T>(
    client: &Client,
    resource: &T,
    post_params: &PostParams,
) -> kube::Result<()>
where
    T: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_name = resource.meta().name.as_deref().unwrap_or_default();

    info!(
        "Creating '{resource_name}' {} resource on the cluster...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::all(client.clone());
    resource_api.create(post_params, resource).await?;

    Ok(())
}

pub async fn delete_resource<T>(
    client: &Client,
    namespace: &str,
    name: &str,
    delete_params: &DeleteParams,
) -> kube::Result<()>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    info!(
        "Removing '{name}' {} resource from '{namespace}' namespace...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    let result = resource_api.delete(name, delete_params).await?;

    debug!("Deletion of '{name}' accepted: {}", result.is_right());

    Ok(())
}

pub async fn delete_cluster_resource<T>(
    client: &Client,
    name: &str,
    delete_params: &DeleteParams,
) -> kube::Result<()>
where
    T: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    info!(
        "Removing '{name}' {} resource from the cluster...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::all(client.clone());
    resource_api.delete(name, delete_params).await?;

    Ok(())
}
