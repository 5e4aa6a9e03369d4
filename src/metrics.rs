use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all registry metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("markets_created_total").absolute(0);
    counter!("markets_resolved_total").absolute(0);
    counter!("markets_cancelled_total").absolute(0);
    counter!("fees_withdrawn_total").absolute(0);

    gauge!("open_markets").set(0.0);

    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally. Rendering
/// works; nothing recorded through the `metrics` macros reaches it.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
