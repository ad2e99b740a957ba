use kube::core::ObjectMeta;

use super::{labels::get_server_labels, meta::SERVER_DAEMON_SET_NAME, release::OperatorRelease};

pub mod daemonset;

impl OperatorRelease {
    pub fn generate_server_metadata(&self) -> ObjectMeta {
        ObjectMeta {
            labels: Some(get_server_labels(self.get_flannel_version())),
            ..self.generate_metadata(SERVER_DAEMON_SET_NAME)
        }
    }
}
