use futures::AsyncBufRead;
use kube::{
    api::{DeleteParams, ListParams, PostParams, WatchParams},
    core::{ApiResource, DynamicObject},
    Api, Client, Resource,
};
use log::debug;
use thiserror::Error;

use crate::{resources::crd::v1alpha1::flannel_network::FlannelNetwork, FIELD_MANAGER};

use super::codec::{from_dynamic, to_dynamic, CodecError, NetworkWatch};

#[derive(Debug, Error)]
pub enum NetworkClientError {
    #[error("Kubernetes API error! Reason: {}", .0)]
    KubeApiError(#[from] kube::Error),
    #[error("{}", .0)]
    Codec(#[from] CodecError),
    #[error("FlannelNetwork is missing metadata.name!")]
    MissingName,
}

/// Client for `FlannelNetwork` objects going through the dynamic API.
///
/// Objects are converted with [`super::codec`] on the way in and out, so
/// callers only ever see the typed resource.
#[derive(Clone)]
pub struct FlannelNetworkClient {
    client: Client,
    api: Api<DynamicObject>,
    namespace: Option<String>,
}

impl FlannelNetworkClient {
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        let api_resource = ApiResource::erase::<FlannelNetwork>(&());

        Self {
            api: Api::namespaced_with(client.clone(), namespace, &api_resource),
            client,
            namespace: Some(namespace.to_owned()),
        }
    }

    pub fn all(client: Client) -> Self {
        let api_resource = ApiResource::erase::<FlannelNetwork>(&());

        Self {
            api: Api::all_with(client.clone(), &api_resource),
            client,
            namespace: None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub async fn create(&self, network: &FlannelNetwork) -> Result<FlannelNetwork, NetworkClientError> {
        let object = to_dynamic(network)?;
        let created = self.api.create(&post_params(), &object).await?;

        Ok(from_dynamic(created)?)
    }

    pub async fn get(&self, name: &str) -> Result<FlannelNetwork, NetworkClientError> {
        Ok(from_dynamic(self.api.get(name).await?)?)
    }

    /// Replaces the stored object; `metadata.resourceVersion` is passed
    /// through so stale writes are rejected by the API server.
    pub async fn update(&self, network: &FlannelNetwork) -> Result<FlannelNetwork, NetworkClientError> {
        let name = network
            .metadata
            .name
            .as_deref()
            .ok_or(NetworkClientError::MissingName)?;
        let object = to_dynamic(network)?;
        let replaced = self.api.replace(name, &post_params(), &object).await?;

        Ok(from_dynamic(replaced)?)
    }

    pub async fn delete(&self, name: &str, params: &DeleteParams) -> Result<(), NetworkClientError> {
        let result = self.api.delete(name, params).await?;

        debug!("FlannelNetwork '{name}' deletion accepted: {}", result.is_right());

        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<FlannelNetwork>, NetworkClientError> {
        self.api
            .list(params)
            .await?
            .items
            .into_iter()
            .map(|object| from_dynamic(object).map_err(NetworkClientError::from))
            .collect()
    }

    /// Opens a long-lived watch starting after `resource_version`.
    pub async fn watch(
        &self,
        params: &WatchParams,
        resource_version: &str,
    ) -> Result<NetworkWatch<impl AsyncBufRead + Unpin>, NetworkClientError> {
        let url = FlannelNetwork::url_path(&(), self.namespace.as_deref());
        let request = kube::core::Request::new(url)
            .watch(params, resource_version)
            .map_err(kube::Error::BuildRequest)?;
        let body = self.client.request_stream(request).await?;

        Ok(NetworkWatch::new(Box::pin(body)))
    }
}

fn post_params() -> PostParams {
    PostParams {
        dry_run: false,
        field_manager: Some(FIELD_MANAGER.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use kube::{
        api::{DeleteParams, ListParams, WatchParams},
        client::ConfigExt,
        core::ObjectMeta,
        Client, Config,
    };
    use serde_json::json;
    use tower::ServiceBuilder;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::{
        kubernetes::codec::NetworkWatchEvent,
        resources::crd::v1alpha1::flannel_network::{FlannelNetwork, FlannelNetworkSpec},
    };

    use super::{FlannelNetworkClient, NetworkClientError};

    const NETWORKS_PATH: &str = "/apis/flannel.st-g.de/v1alpha1/namespaces/default/flannelnetworks";

    fn client_for(server: &MockServer) -> Client {
        let config = Config::new(server.uri().parse().unwrap());
        let service = ServiceBuilder::new()
            .layer(config.base_uri_layer())
            .service(hyper::Client::new());

        Client::new(service, config.default_namespace)
    }

    fn network(name: Option<&str>) -> FlannelNetwork {
        FlannelNetwork {
            metadata: ObjectMeta {
                name: name.map(str::to_owned),
                namespace: Some("default".to_owned()),
                ..Default::default()
            },
            spec: FlannelNetworkSpec {
                vni: "42".to_owned(),
                cidr: "10.0.0.0/24".to_owned(),
            },
            status: None,
        }
    }

    // the API server doesn't always echo type metadata back
    fn stored_object(vni: &str) -> serde_json::Value {
        json!({
            "metadata": { "name": "net1", "namespace": "default", "resourceVersion": "10" },
            "spec": { "vni": vni, "cidr": "10.0.0.0/24" }
        })
    }

    #[tokio::test]
    async fn create_sends_stamped_object_with_field_manager() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(NETWORKS_PATH))
            .and(query_param("fieldManager", "flannel-operator"))
            .and(body_partial_json(json!({
                "apiVersion": "flannel.st-g.de/v1alpha1",
                "kind": "FlannelNetwork",
                "spec": { "vni": "42" }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(stored_object("42")))
            .expect(1)
            .mount(&server)
            .await;

        let created = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .create(&network(Some("net1")))
            .await
            .unwrap();

        assert_eq!(created.spec.vni, "42");
        assert_eq!(created.metadata.resource_version.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn get_decodes_objects_without_type_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{NETWORKS_PATH}/net1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_object("7")))
            .mount(&server)
            .await;

        let network = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .get("net1")
            .await
            .unwrap();

        assert_eq!(network.spec.vni, "7");
        assert_eq!(network.metadata.name.as_deref(), Some("net1"));
    }

    #[tokio::test]
    async fn get_surfaces_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{NETWORKS_PATH}/missing")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "kind": "Status",
                "apiVersion": "v1",
                "status": "Failure",
                "message": "flannelnetworks.flannel.st-g.de \"missing\" not found",
                "reason": "NotFound",
                "code": 404
            })))
            .mount(&server)
            .await;

        let result = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .get("missing")
            .await;

        assert!(matches!(
            result,
            Err(NetworkClientError::KubeApiError(kube::Error::Api(response))) if response.code == 404
        ));
    }

    #[tokio::test]
    async fn update_replaces_the_named_object() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(format!("{NETWORKS_PATH}/net1")))
            .and(body_partial_json(json!({
                "apiVersion": "flannel.st-g.de/v1alpha1",
                "kind": "FlannelNetwork",
                "metadata": { "name": "net1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_object("42")))
            .expect(1)
            .mount(&server)
            .await;

        let updated = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .update(&network(Some("net1")))
            .await
            .unwrap();

        assert_eq!(updated.spec.vni, "42");
    }

    #[tokio::test]
    async fn update_without_name_never_reaches_the_server() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .update(&network(None))
            .await;

        assert!(matches!(result, Err(NetworkClientError::MissingName)));
    }

    #[tokio::test]
    async fn delete_targets_the_named_object() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(format!("{NETWORKS_PATH}/net1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored_object("42")))
            .expect(1)
            .mount(&server)
            .await;

        FlannelNetworkClient::namespaced(client_for(&server), "default")
            .delete("net1", &DeleteParams::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_across_namespaces_decodes_every_item() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/flannel.st-g.de/v1alpha1/flannelnetworks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "flannel.st-g.de/v1alpha1",
                "kind": "FlannelNetworkList",
                "metadata": { "resourceVersion": "10" },
                "items": [stored_object("1"), stored_object("2")]
            })))
            .mount(&server)
            .await;

        let client = FlannelNetworkClient::all(client_for(&server));
        let networks = client.list(&ListParams::default()).await.unwrap();

        assert_eq!(client.namespace(), None);
        assert_eq!(
            networks
                .iter()
                .map(|network| network.spec.vni.as_str())
                .collect::<Vec<_>>(),
            vec!["1", "2"]
        );
    }

    #[tokio::test]
    async fn watch_streams_frames_from_the_response_body() {
        let server = MockServer::start().await;
        let body = format!(
            "{}\n{}\n",
            json!({ "type": "ADDED", "object": stored_object("42") }),
            json!({ "type": "DELETED", "object": stored_object("42") })
        );

        Mock::given(method("GET"))
            .and(path(NETWORKS_PATH))
            .and(query_param("watch", "true"))
            .and(query_param("resourceVersion", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let mut watch = FlannelNetworkClient::namespaced(client_for(&server), "default")
            .watch(&WatchParams::default(), "10")
            .await
            .unwrap();

        assert!(matches!(
            watch.next_event().await,
            Some(NetworkWatchEvent::Added(network)) if network.spec.vni == "42"
        ));
        assert!(matches!(
            watch.next_event().await,
            Some(NetworkWatchEvent::Deleted(_))
        ));
        assert!(watch.next_event().await.is_none());
        assert!(watch.is_closed());
    }
}
