//! Record kinds carried by the relay.

use std::fmt;

use sentryflow_proto::methods;

/// One of the eleven independent record streams the operator relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    ApiLog,
    EnvoyMetrics,
    DeployAdd,
    DeployUpdate,
    DeployDelete,
    PodAdd,
    PodUpdate,
    PodDelete,
    ServiceAdd,
    ServiceUpdate,
    ServiceDelete,
}

impl RecordKind {
    pub const ALL: [Self; 11] = [
        Self::ApiLog,
        Self::EnvoyMetrics,
        Self::DeployAdd,
        Self::DeployUpdate,
        Self::DeployDelete,
        Self::PodAdd,
        Self::PodUpdate,
        Self::PodDelete,
        Self::ServiceAdd,
        Self::ServiceUpdate,
        Self::ServiceDelete,
    ];

    /// Stable snake-case name used in log fields and metric attributes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiLog => "api_log",
            Self::EnvoyMetrics => "envoy_metrics",
            Self::DeployAdd => "deploy_add",
            Self::DeployUpdate => "deploy_update",
            Self::DeployDelete => "deploy_delete",
            Self::PodAdd => "pod_add",
            Self::PodUpdate => "pod_update",
            Self::PodDelete => "pod_delete",
            Self::ServiceAdd => "service_add",
            Self::ServiceUpdate => "service_update",
            Self::ServiceDelete => "service_delete",
        }
    }

    /// Collector RPC that feeds this kind.
    pub const fn collector_method(self) -> &'static str {
        match self {
            Self::ApiLog => methods::METHOD_GIVE_API_LOG,
            Self::EnvoyMetrics => methods::METHOD_GIVE_ENVOY_METRICS,
            Self::DeployAdd => methods::METHOD_ADD_DEPLOY_EVENT,
            Self::DeployUpdate => methods::METHOD_UPDATE_DEPLOY_EVENT,
            Self::DeployDelete => methods::METHOD_DELETE_DEPLOY_EVENT,
            Self::PodAdd => methods::METHOD_ADD_POD_EVENT,
            Self::PodUpdate => methods::METHOD_UPDATE_POD_EVENT,
            Self::PodDelete => methods::METHOD_DELETE_POD_EVENT,
            Self::ServiceAdd => methods::METHOD_ADD_SVC_EVENT,
            Self::ServiceUpdate => methods::METHOD_UPDATE_SVC_EVENT,
            Self::ServiceDelete => methods::METHOD_DELETE_SVC_EVENT,
        }
    }

    /// Exporter RPC that subscribes to this kind.
    pub const fn exporter_method(self) -> &'static str {
        match self {
            Self::ApiLog => methods::METHOD_GET_API_LOG,
            Self::EnvoyMetrics => methods::METHOD_GET_ENVOY_METRICS,
            Self::DeployAdd => methods::METHOD_ADD_DEPLOY_EVENT_DB,
            Self::DeployUpdate => methods::METHOD_UPDATE_DEPLOY_EVENT_DB,
            Self::DeployDelete => methods::METHOD_DELETE_DEPLOY_EVENT_DB,
            Self::PodAdd => methods::METHOD_ADD_POD_EVENT_DB,
            Self::PodUpdate => methods::METHOD_UPDATE_POD_EVENT_DB,
            Self::PodDelete => methods::METHOD_DELETE_POD_EVENT_DB,
            Self::ServiceAdd => methods::METHOD_ADD_SVC_EVENT_DB,
            Self::ServiceUpdate => methods::METHOD_UPDATE_SVC_EVENT_DB,
            Self::ServiceDelete => methods::METHOD_DELETE_SVC_EVENT_DB,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_and_methods_are_unique() {
        let names: HashSet<_> = RecordKind::ALL.iter().map(|k| k.as_str()).collect();
        let collector: HashSet<_> = RecordKind::ALL.iter().map(|k| k.collector_method()).collect();
        let exporter: HashSet<_> = RecordKind::ALL.iter().map(|k| k.exporter_method()).collect();
        assert_eq!(names.len(), RecordKind::ALL.len());
        assert_eq!(collector.len(), RecordKind::ALL.len());
        assert_eq!(exporter.len(), RecordKind::ALL.len());
    }

    #[test]
    fn service_kinds_map_to_svc_rpcs() {
        assert_eq!(
            RecordKind::ServiceUpdate.collector_method(),
            "Collector/UpdateSvcEvent"
        );
        assert_eq!(
            RecordKind::ServiceUpdate.exporter_method(),
            "Exporter/UpdateSvcEventDB"
        );
        assert_eq!(RecordKind::ServiceUpdate.to_string(), "service_update");
    }
}
