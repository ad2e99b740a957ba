use std::collections::BTreeMap;

pub const CLIENT_APP_NAME: &str = "flannel-client";
pub const SERVER_APP_NAME: &str = "flannel-server";

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const MANAGED_BY_VALUE: &str = "flannel-operator";

pub const NETWORK_NAMESPACE_LABEL: &str = "flannel.st-g.de/network-namespace";
pub const NETWORK_NAME_LABEL: &str = "flannel.st-g.de/network-name";

pub fn get_operator_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_owned(), MANAGED_BY_VALUE.to_owned())])
}

/// Pod selector labels of a network's client deployment, unique per
/// network identity.
pub fn get_client_selector_labels(
    network_namespace: &str,
    network_name: &str,
    vni: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_owned(), CLIENT_APP_NAME.to_owned()),
        (NETWORK_NAMESPACE_LABEL.to_owned(), network_namespace.to_owned()),
        (NETWORK_NAME_LABEL.to_owned(), network_name.to_owned()),
        ("vni".to_owned(), vni.to_owned()),
    ])
}

pub fn get_client_labels(
    network_namespace: &str,
    network_name: &str,
    vni: &str,
) -> BTreeMap<String, String> {
    let mut labels = get_client_selector_labels(network_namespace, network_name, vni);
    labels.extend(get_operator_labels());

    labels
}

pub fn get_server_selector_labels(version: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_owned(), SERVER_APP_NAME.to_owned()),
        ("version".to_owned(), version.to_owned()),
    ])
}

pub fn get_server_labels(version: &str) -> BTreeMap<String, String> {
    let mut labels = get_server_selector_labels(version);
    labels.extend(get_operator_labels());

    labels
}
