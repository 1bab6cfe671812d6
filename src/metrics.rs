use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("feed_requests_total").absolute(0);
    counter!("feed_errors_total").absolute(0);
    counter!("wallets_created_total").absolute(0);

    gauge!("tracked_wallets").set(0.0);

    histogram!("refresh_cycle_seconds").record(0.0);

    Ok(handle)
}

/// A handle that is not installed as the global recorder, for tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
