use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use flannel_operator_core::{
    kubernetes::cluster::ClusterOperations,
    resources::crd::v1alpha1::flannel_network::{FlannelNetwork, FlannelNetworkSpec},
};
use k8s_openapi::{
    api::apps::v1::{DaemonSet, Deployment},
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};
use kube::{
    api::{DeleteParams, PropagationPolicy},
    core::{ErrorResponse, ObjectMeta},
};

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: format!("simulated {reason}"),
        reason: reason.to_owned(),
        code,
    })
}

pub fn network(namespace: &str, name: &str, vni: &str) -> FlannelNetwork {
    FlannelNetwork {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            resource_version: Some("1".to_owned()),
            ..Default::default()
        },
        spec: FlannelNetworkSpec {
            vni: vni.to_owned(),
            cidr: "10.0.0.0/24".to_owned(),
        },
        status: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDeployment,
    DeleteDeployment,
    CreateDaemonSet,
    CreateDefinition,
    DeleteDefinition,
    CheckServed,
    CountNetworks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    CreateDeployment {
        namespace: String,
        name: String,
    },
    DeleteDeployment {
        namespace: String,
        name: String,
        orphan: bool,
    },
    CreateDaemonSet {
        namespace: String,
        name: String,
    },
    CreateDefinition {
        name: String,
    },
    DeleteDefinition {
        name: String,
    },
    CheckServed,
    CountNetworks,
}

impl ClusterCall {
    fn operation(&self) -> Operation {
        match self {
            ClusterCall::CreateDeployment { .. } => Operation::CreateDeployment,
            ClusterCall::DeleteDeployment { .. } => Operation::DeleteDeployment,
            ClusterCall::CreateDaemonSet { .. } => Operation::CreateDaemonSet,
            ClusterCall::CreateDefinition { .. } => Operation::CreateDefinition,
            ClusterCall::DeleteDefinition { .. } => Operation::DeleteDefinition,
            ClusterCall::CheckServed => Operation::CheckServed,
            ClusterCall::CountNetworks => Operation::CountNetworks,
        }
    }
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<ClusterCall>,
    failures: HashMap<Operation, VecDeque<kube::Error>>,
    served: VecDeque<bool>,
    deployments: BTreeSet<String>,
    daemon_sets: BTreeSet<String>,
    definitions: BTreeSet<String>,
    networks: usize,
}

/// In-memory cluster that records every call and behaves like the API
/// server on conflicts: duplicate creates fail with `AlreadyExists` and
/// deletes of missing objects fail with `NotFound`.
#[derive(Clone, Default)]
pub struct RecordingCluster {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingCluster {
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn deployments(&self) -> Vec<String> {
        self.state.lock().unwrap().deployments.iter().cloned().collect()
    }

    pub fn with_definition(self, name: &str) -> Self {
        self.state.lock().unwrap().definitions.insert(name.to_owned());
        self
    }

    pub fn with_daemon_set(self, namespace: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .daemon_sets
            .insert(format!("{namespace}/{name}"));
        self
    }

    pub fn with_served(self, answers: &[bool]) -> Self {
        self.state.lock().unwrap().served.extend(answers);
        self
    }

    pub fn with_networks(self, count: usize) -> Self {
        self.state.lock().unwrap().networks = count;
        self
    }

    pub fn fail_next(&self, operation: Operation, error: kube::Error) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    fn record(&self, call: ClusterCall) -> Result<MutexGuard<'_, RecordingState>, kube::Error> {
        let mut state = self.state.lock().unwrap();
        let operation = call.operation();

        state.calls.push(call);

        match state.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn object_key(meta: &ObjectMeta) -> (String, String) {
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl ClusterOperations for RecordingCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> kube::Result<()> {
        let (namespace, name) = object_key(&deployment.metadata);
        let key = format!("{namespace}/{name}");
        let mut state = self.record(ClusterCall::CreateDeployment { namespace, name })?;

        match state.deployments.insert(key) {
            true => Ok(()),
            false => Err(api_error(409, "AlreadyExists")),
        }
    }

    async fn delete_deployment(
        &self,
        namespace: &str,
        name: &str,
        params: &DeleteParams,
    ) -> kube::Result<()> {
        let mut state = self.record(ClusterCall::DeleteDeployment {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            orphan: matches!(params.propagation_policy, Some(PropagationPolicy::Orphan)),
        })?;

        match state.deployments.remove(&format!("{namespace}/{name}")) {
            true => Ok(()),
            false => Err(api_error(404, "NotFound")),
        }
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> kube::Result<()> {
        let (namespace, name) = object_key(&daemon_set.metadata);
        let key = format!("{namespace}/{name}");
        let mut state = self.record(ClusterCall::CreateDaemonSet { namespace, name })?;

        match state.daemon_sets.insert(key) {
            true => Ok(()),
            false => Err(api_error(409, "AlreadyExists")),
        }
    }

    async fn create_definition(&self, definition: &CustomResourceDefinition) -> kube::Result<()> {
        let name = definition.metadata.name.clone().unwrap_or_default();
        let mut state = self.record(ClusterCall::CreateDefinition { name: name.clone() })?;

        match state.definitions.insert(name) {
            true => Ok(()),
            false => Err(api_error(409, "AlreadyExists")),
        }
    }

    async fn delete_definition(&self, name: &str, _params: &DeleteParams) -> kube::Result<()> {
        let mut state = self.record(ClusterCall::DeleteDefinition {
            name: name.to_owned(),
        })?;

        match state.definitions.remove(name) {
            true => Ok(()),
            false => Err(api_error(404, "NotFound")),
        }
    }

    async fn is_network_type_served(&self) -> kube::Result<bool> {
        let mut state = self.record(ClusterCall::CheckServed)?;

        Ok(state.served.pop_front().unwrap_or(true))
    }

    async fn count_networks(&self) -> kube::Result<usize> {
        let state = self.record(ClusterCall::CountNetworks)?;

        Ok(state.networks)
    }
}
