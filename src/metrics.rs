use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Process-wide Prometheus recorder. A recorder can be installed only once,
/// so repeated `init` calls (tests build many apps) share the first handle.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe_all();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!(
        "recommendations_total",
        "Recommendations generated, by label."
    );
    describe_counter!(
        "opinion_fallback_total",
        "Opinion calls replaced by the offline fallback, by failure stage."
    );
    describe_counter!(
        "news_provider_errors_total",
        "News provider fetch/parse errors, by provider."
    );
    describe_counter!(
        "news_articles_total",
        "Articles returned by the news chain after normalization."
    );
    describe_histogram!(
        "pipeline_duration_ms",
        "Per-symbol pipeline time in milliseconds, opinion call included."
    );
    describe_histogram!("news_fetch_ms", "Provider fetch time in milliseconds.");
}
