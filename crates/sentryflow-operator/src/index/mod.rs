//! Operator-side lookup tables built from cluster-resource events.

mod ip_index;

pub use ip_index::{IpIndex, ResourceKey, ResourceRef, service_ips};
