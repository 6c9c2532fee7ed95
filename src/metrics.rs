use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_cycles_total", "Pipeline cycles completed without error.");
        describe_counter!("relay_cycle_errors_total", "Pipeline cycles abandoned on error.");
        describe_counter!(
            "relay_announcements_new_total",
            "Announcements not seen before."
        );
        describe_counter!("relay_deliveries_total", "Messages posted to a channel.");
        describe_counter!(
            "relay_delivery_errors_total",
            "Channel lookups or posts that failed."
        );
        describe_counter!(
            "relay_unresolved_targets_total",
            "Configured channels the bot could not see."
        );
        describe_counter!("relay_feed_errors_total", "Feed fetch failures.");
        describe_histogram!("relay_feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_gauge!("relay_seen_items", "Size of the seen-announcement set.");
        describe_gauge!(
            "relay_last_cycle_ts",
            "Unix ts when the last pipeline cycle finished."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_metrics();
        Ok(Self { handle })
    }

    /// `/metrics` in Prometheus exposition format plus a `/health` probe.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            )
    }
}

pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tracing::info!(%addr, "metrics endpoint listening");
    axum::serve(listener, router)
        .await
        .context("metrics server")
}
