//! Named constants for gRPC method strings.
//!
//! These constants are derived from the protobuf service definitions and are
//! shared between the operator (log fields, metric attributes) and the tap
//! client so that method names stay in sync without duplicating string
//! literals.

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// `Collector/GiveAPILog`
pub const METHOD_GIVE_API_LOG: &str = "Collector/GiveAPILog";

/// `Collector/GiveEnvoyMetrics`
pub const METHOD_GIVE_ENVOY_METRICS: &str = "Collector/GiveEnvoyMetrics";

/// `Collector/AddDeployEvent`
pub const METHOD_ADD_DEPLOY_EVENT: &str = "Collector/AddDeployEvent";

/// `Collector/UpdateDeployEvent`
pub const METHOD_UPDATE_DEPLOY_EVENT: &str = "Collector/UpdateDeployEvent";

/// `Collector/DeleteDeployEvent`
pub const METHOD_DELETE_DEPLOY_EVENT: &str = "Collector/DeleteDeployEvent";

/// `Collector/AddPodEvent`
pub const METHOD_ADD_POD_EVENT: &str = "Collector/AddPodEvent";

/// `Collector/UpdatePodEvent`
pub const METHOD_UPDATE_POD_EVENT: &str = "Collector/UpdatePodEvent";

/// `Collector/DeletePodEvent`
pub const METHOD_DELETE_POD_EVENT: &str = "Collector/DeletePodEvent";

/// `Collector/AddSvcEvent`
pub const METHOD_ADD_SVC_EVENT: &str = "Collector/AddSvcEvent";

/// `Collector/UpdateSvcEvent`
pub const METHOD_UPDATE_SVC_EVENT: &str = "Collector/UpdateSvcEvent";

/// `Collector/DeleteSvcEvent`
pub const METHOD_DELETE_SVC_EVENT: &str = "Collector/DeleteSvcEvent";

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// `Exporter/GetAPILog`
pub const METHOD_GET_API_LOG: &str = "Exporter/GetAPILog";

/// `Exporter/GetEnvoyMetrics`
pub const METHOD_GET_ENVOY_METRICS: &str = "Exporter/GetEnvoyMetrics";

/// `Exporter/AddDeployEventDB`
pub const METHOD_ADD_DEPLOY_EVENT_DB: &str = "Exporter/AddDeployEventDB";

/// `Exporter/UpdateDeployEventDB`
pub const METHOD_UPDATE_DEPLOY_EVENT_DB: &str = "Exporter/UpdateDeployEventDB";

/// `Exporter/DeleteDeployEventDB`
pub const METHOD_DELETE_DEPLOY_EVENT_DB: &str = "Exporter/DeleteDeployEventDB";

/// `Exporter/AddPodEventDB`
pub const METHOD_ADD_POD_EVENT_DB: &str = "Exporter/AddPodEventDB";

/// `Exporter/UpdatePodEventDB`
pub const METHOD_UPDATE_POD_EVENT_DB: &str = "Exporter/UpdatePodEventDB";

/// `Exporter/DeletePodEventDB`
pub const METHOD_DELETE_POD_EVENT_DB: &str = "Exporter/DeletePodEventDB";

/// `Exporter/AddSvcEventDB`
pub const METHOD_ADD_SVC_EVENT_DB: &str = "Exporter/AddSvcEventDB";

/// `Exporter/UpdateSvcEventDB`
pub const METHOD_UPDATE_SVC_EVENT_DB: &str = "Exporter/UpdateSvcEventDB";

/// `Exporter/DeleteSvcEventDB`
pub const METHOD_DELETE_SVC_EVENT_DB: &str = "Exporter/DeleteSvcEventDB";
