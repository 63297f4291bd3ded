//! Record kinds selectable on the command line.

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TapKind {
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

impl TapKind {
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

    /// Name written in the `kind` field of each output line. Matches the
    /// operator's log and metric naming.
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

    /// Requested kinds with duplicates removed, or every kind for `all`.
    pub fn resolve(requested: &[Self], all: bool) -> Vec<Self> {
        if all {
            return Self::ALL.to_vec();
        }
        let mut kinds = Vec::with_capacity(requested.len());
        for kind in requested {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}
