//! Request and binding metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the application.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `restbind_requests_total` | Counter | `route`, `status` |
//! | `restbind_request_duration_seconds` | Histogram | `route` |
//! | `restbind_binding_failures_total` | Counter | `field`, `kind` |
//! | `restbind_shadow_mismatches_total` | Counter | `route` |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Registers metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "restbind_requests_total",
        "Total number of requests dispatched to a route"
    );
    describe_histogram!(
        "restbind_request_duration_seconds",
        "Time spent dispatching a request, in seconds"
    );
    describe_counter!(
        "restbind_binding_failures_total",
        "Requests rejected while binding an argument"
    );
    describe_counter!(
        "restbind_shadow_mismatches_total",
        "Shadowed requests whose local status differed from the trusted server"
    );
}

/// Records a dispatched request.
pub fn record_request(route: &str, status_code: u16, duration: Duration) {
    counter!(
        "restbind_requests_total",
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "restbind_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a binder failure.
pub fn record_binding_failure(field: &str, kind: &str) {
    counter!(
        "restbind_binding_failures_total",
        "field" => field.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Records a shadow-traffic status mismatch.
pub fn record_shadow_mismatch(route: &str) {
    counter!(
        "restbind_shadow_mismatches_total",
        "route" => route.to_string()
    )
    .increment(1);
}
