use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy},
        core::v1::{
            Container, EnvVar, EnvVarSource, HostPathVolumeSource, ObjectFieldSelector, PodSecurityContext,
            PodSpec, PodTemplateSpec, SeccompProfile, SecurityContext, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::core::ObjectMeta;

use crate::resources::labels::{get_client_labels, get_client_selector_labels};

use super::ClientRelease;

pub const CLIENT_CONTAINER_NAME: &str = "k8s-flannel";
pub const CLIENT_RUNTIME_VOLUME: &str = "flannel";
pub const CLIENT_RUNTIME_PATH: &str = "/run/flannel";

impl ClientRelease {
    pub fn generate_client_command(&self) -> String {
        format!(
            "/opt/bin/flanneld --remote=$NODE_IP:{port} --public-ip=$NODE_IP --iface=$NODE_IP --networks={vni} -v=1",
            port = self.server_port,
            vni = self.vni
        )
    }

    pub fn generate_client_deployment(&self) -> Deployment {
        let selector_labels =
            get_client_selector_labels(&self.network_namespace, &self.network_name, &self.vni);
        let metadata = self.generate_client_metadata();

        let pod_spec = PodSpec {
            host_network: Some(true),
            restart_policy: Some("Always".to_owned()),
            security_context: Some(PodSecurityContext {
                seccomp_profile: Some(SeccompProfile {
                    type_: "Unconfined".to_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            containers: vec![Container {
                name: CLIENT_CONTAINER_NAME.to_owned(),
                image: Some(self.image.to_owned()),
                image_pull_policy: Some("IfNotPresent".to_owned()),
                command: Some(vec![
                    "/bin/sh".to_owned(),
                    "-c".to_owned(),
                    self.generate_client_command(),
                ]),
                env: Some(vec![EnvVar {
                    name: "NODE_IP".to_owned(),
                    value_from: Some(EnvVarSource {
                        field_ref: Some(ObjectFieldSelector {
                            field_path: "status.hostIP".to_owned(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                security_context: Some(SecurityContext {
                    privileged: Some(true),
                    ..Default::default()
                }),
                volume_mounts: Some(vec![VolumeMount {
                    name: CLIENT_RUNTIME_VOLUME.to_owned(),
                    mount_path: CLIENT_RUNTIME_PATH.to_owned(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: CLIENT_RUNTIME_VOLUME.to_owned(),
                host_path: Some(HostPathVolumeSource {
                    path: CLIENT_RUNTIME_PATH.to_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        Deployment {
            metadata,
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                strategy: Some(DeploymentStrategy {
                    type_: Some("Recreate".to_owned()),
                    ..Default::default()
                }),
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(selector_labels),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(get_client_labels(
                            &self.network_namespace,
                            &self.network_name,
                            &self.vni,
                        )),
                        ..Default::default()
                    }),
                    spec: Some(pod_spec),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::resources::client::tests::{network, release_for};

    #[test]
    fn deployment_is_named_and_placed_deterministically() {
        let release = release_for(&network("default", "net1", "42", "10.0.0.0/24"));
        let first = release.generate_client_deployment();
        let second = release.generate_client_deployment();

        assert_eq!(
            first.metadata.name.as_deref(),
            Some("flannel-client-default-net1-vni42")
        );
        assert_eq!(first.metadata.namespace.as_deref(), Some("kube-system"));
        assert_eq!(first, second);
    }

    #[test]
    fn deployment_runs_single_recreated_host_network_replica() {
        let deployment = release_for(&network("default", "net1", "42", "10.0.0.0/24"))
            .generate_client_deployment();
        let spec = deployment.spec.unwrap();
        let pod_spec = spec.template.spec.unwrap();

        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.strategy.unwrap().type_.as_deref(), Some("Recreate"));
        assert_eq!(pod_spec.host_network, Some(true));
        assert_eq!(
            spec.selector.match_labels.unwrap().get("vni").map(String::as_str),
            Some("42")
        );
    }

    #[test]
    fn same_vni_in_other_namespaces_gets_its_own_selector() {
        let selector = |namespace: &str| {
            release_for(&network(namespace, "net1", "42", "10.0.0.0/24"))
                .generate_client_deployment()
                .spec
                .unwrap()
                .selector
                .match_labels
                .unwrap()
        };
        let default = selector("default");

        assert_ne!(default, selector("team-a"));
        assert_eq!(
            default
                .get("flannel.st-g.de/network-namespace")
                .map(String::as_str),
            Some("default")
        );
        assert_eq!(
            default.get("flannel.st-g.de/network-name").map(String::as_str),
            Some("net1")
        );
    }

    #[test]
    fn client_command_targets_network_vni_and_server_port() {
        let release = release_for(&network("default", "net1", "42", "10.0.0.0/24"));

        assert_eq!(
            release.generate_client_command(),
            "/opt/bin/flanneld --remote=$NODE_IP:8889 --public-ip=$NODE_IP --iface=$NODE_IP --networks=42 -v=1"
        );
    }

    #[test]
    fn cidr_is_recorded_as_annotation() {
        let deployment = release_for(&network("default", "net1", "42", "10.0.0.0/24"))
            .generate_client_deployment();
        let annotations = deployment.metadata.annotations.unwrap();

        assert_eq!(
            annotations.get("flannel.st-g.de/cidr").map(String::as_str),
            Some("10.0.0.0/24")
        );
        assert_eq!(
            annotations
                .get("flannel.st-g.de/network-name")
                .map(String::as_str),
            Some("net1")
        );
    }
}
