//! Relay counters exported over OTLP when the `metrics` feature is on.
//!
//! Without the feature these calls compile to nothing.

use crate::relay::{BroadcastOutcome, RecordKind};

#[cfg(feature = "metrics")]
mod otel {
    use std::sync::LazyLock;

    use opentelemetry::global;
    use opentelemetry::metrics::Counter;

    pub(super) struct Instruments {
        pub ingested: Counter<u64>,
        pub broadcast: Counter<u64>,
        pub pruned: Counter<u64>,
    }

    // Built on first use, after `init_metrics` has installed the provider.
    pub(super) static INSTRUMENTS: LazyLock<Instruments> = LazyLock::new(|| {
        let meter = global::meter("sentryflow");
        Instruments {
            ingested: meter
                .u64_counter("sentryflow.records.ingested")
                .with_description("Records accepted from producers")
                .build(),
            broadcast: meter
                .u64_counter("sentryflow.records.broadcast")
                .with_description("Records fanned out to subscribers")
                .build(),
            pruned: meter
                .u64_counter("sentryflow.subscribers.pruned")
                .with_description("Subscribers removed after a failed send")
                .build(),
        }
    });
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_ingested(kind: RecordKind) {
    #[cfg(feature = "metrics")]
    otel::INSTRUMENTS
        .ingested
        .add(1, &[opentelemetry::KeyValue::new("kind", kind.as_str())]);
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_broadcast(kind: RecordKind, outcome: BroadcastOutcome) {
    #[cfg(feature = "metrics")]
    {
        let attrs = [opentelemetry::KeyValue::new("kind", kind.as_str())];
        otel::INSTRUMENTS.broadcast.add(1, &attrs);
        if outcome.failed > 0 {
            otel::INSTRUMENTS
                .pruned
                .add(u64::try_from(outcome.failed).unwrap_or(u64::MAX), &attrs);
        }
    }
}
