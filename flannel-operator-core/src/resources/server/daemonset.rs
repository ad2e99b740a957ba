use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, DaemonSetSpec},
        core::v1::{
            Container, ContainerPort, EnvVar, EnvVarSource, HostPathVolumeSource,
            ObjectFieldSelector, PodSpec, PodTemplateSpec, Probe, ResourceRequirements,
            TCPSocketAction, Toleration, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::{
        api::resource::Quantity, apis::meta::v1::LabelSelector, util::intstr::IntOrString,
    },
};
use kube::core::ObjectMeta;

use crate::resources::{
    annotations::get_server_pod_annotations,
    labels::{get_server_labels, get_server_selector_labels},
    meta::SERVER_DAEMON_SET_NAME,
    release::OperatorRelease,
};

pub const SERVER_LOG_VOLUME: &str = "varlogflannel";
pub const SERVER_LOG_HOST_PATH: &str = "/var/log/flannel";
pub const SERVER_LOG_MOUNT_PATH: &str = "/var/log";
pub const SERVER_RUNTIME_VOLUME: &str = "varrunflannel";
pub const SERVER_RUNTIME_PATH: &str = "/var/run/flannel";

const LIVENESS_INITIAL_DELAY_SECONDS: i32 = 30;
const LIVENESS_TIMEOUT_SECONDS: i32 = 5;

impl OperatorRelease {
    pub fn generate_server_command(&self) -> String {
        format!(
            "/opt/bin/flanneld -listen ${{HOST_PUBLIC_IP}}:{port} -etcd-endpoints http://${{HOST_PUBLIC_IP}}:2379 -ip-masq=true",
            port = self.server_port
        )
    }

    pub fn generate_server_daemon_set(&self) -> DaemonSet {
        let version = self.get_flannel_version();
        let selector_labels = get_server_selector_labels(version);

        let container = Container {
            name: SERVER_DAEMON_SET_NAME.to_owned(),
            image: Some(self.flannel_image.to_owned()),
            image_pull_policy: Some("IfNotPresent".to_owned()),
            command: Some(vec![
                "/bin/sh".to_owned(),
                "-c".to_owned(),
                self.generate_server_command(),
            ]),
            env: Some(vec![EnvVar {
                name: "HOST_PUBLIC_IP".to_owned(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        field_path: "status.hostIP".to_owned(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ports: Some(vec![ContainerPort {
                container_port: self.server_port,
                host_port: Some(self.server_port),
                ..Default::default()
            }]),
            resources: Some(ResourceRequirements {
                limits: Some(BTreeMap::from([(
                    "cpu".to_owned(),
                    Quantity(self.server_cpu_limit.to_owned()),
                )])),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: SERVER_LOG_VOLUME.to_owned(),
                    mount_path: SERVER_LOG_MOUNT_PATH.to_owned(),
                    ..Default::default()
                },
                VolumeMount {
                    name: SERVER_RUNTIME_VOLUME.to_owned(),
                    mount_path: SERVER_RUNTIME_PATH.to_owned(),
                    ..Default::default()
                },
            ]),
            liveness_probe: Some(Probe {
                tcp_socket: Some(TCPSocketAction {
                    host: None,
                    port: IntOrString::Int(self.server_port),
                }),
                initial_delay_seconds: Some(LIVENESS_INITIAL_DELAY_SECONDS),
                timeout_seconds: Some(LIVENESS_TIMEOUT_SECONDS),
                ..Default::default()
            }),
            ..Default::default()
        };

        DaemonSet {
            metadata: self.generate_server_metadata(),
            spec: Some(DaemonSetSpec {
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(selector_labels),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(get_server_labels(version)),
                        annotations: Some(get_server_pod_annotations()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        host_network: Some(true),
                        tolerations: Some(vec![Toleration {
                            key: Some("CriticalAddonsOnly".to_owned()),
                            operator: Some("Exists".to_owned()),
                            ..Default::default()
                        }]),
                        containers: vec![container],
                        volumes: Some(vec![
                            host_path_volume(SERVER_LOG_VOLUME, SERVER_LOG_HOST_PATH),
                            host_path_volume(SERVER_RUNTIME_VOLUME, SERVER_RUNTIME_PATH),
                        ]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn host_path_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_owned(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_owned(),
            ..Default::default()
        }),
        ..Default::default()
    }
}
