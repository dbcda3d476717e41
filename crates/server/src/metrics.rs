use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static LOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("roster_loads_total", "Successful collection fetches")
        .expect("register loads_total")
});

pub static REPLACES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("roster_replaces_total", "Successful collection replaces")
        .expect("register replaces_total")
});

pub static STORAGE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("roster_storage_errors_total", "Record store read or write failures")
        .expect("register storage_errors_total")
});

pub static CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("roster_conflicts_total", "Conditional replaces rejected on stale revision")
        .expect("register conflicts_total")
});

/// Touch every counter so they show up at zero before the first request.
pub fn init() {
    Lazy::force(&LOADS_TOTAL);
    Lazy::force(&REPLACES_TOTAL);
    Lazy::force(&STORAGE_ERRORS_TOTAL);
    Lazy::force(&CONFLICTS_TOTAL);
}

pub fn render() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    (StatusCode::OK, String::from_utf8_lossy(&buf).into_owned())
}
