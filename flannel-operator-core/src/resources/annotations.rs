use std::collections::BTreeMap;

pub const NETWORK_NAMESPACE_ANNOTATION: &str = "flannel.st-g.de/network-namespace";
pub const NETWORK_NAME_ANNOTATION: &str = "flannel.st-g.de/network-name";
pub const NETWORK_CIDR_ANNOTATION: &str = "flannel.st-g.de/cidr";

pub const CRITICAL_POD_ANNOTATION: &str = "scheduler.alpha.kubernetes.io/critical-pod";

pub fn get_client_annotations(
    network_namespace: &str,
    network_name: &str,
    cidr: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            NETWORK_NAMESPACE_ANNOTATION.to_owned(),
            network_namespace.to_owned(),
        ),
        (NETWORK_NAME_ANNOTATION.to_owned(), network_name.to_owned()),
        (NETWORK_CIDR_ANNOTATION.to_owned(), cidr.to_owned()),
    ])
}

pub fn get_server_pod_annotations() -> BTreeMap<String, String> {
    BTreeMap::from([(CRITICAL_POD_ANNOTATION.to_owned(), "".to_owned())])
}
