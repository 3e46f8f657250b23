use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;
use crate::db::types::SubmissionStatus;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_submission(status: SubmissionStatus) {
    metrics::counter!("grading_submissions_total", "status" => status.as_str()).increment(1);
}

pub(crate) fn record_oracle_call(provider: &'static str, elapsed: Duration) {
    metrics::histogram!("grading_oracle_duration_seconds", "provider" => provider)
        .record(elapsed.as_secs_f64());
}

pub(crate) fn record_oracle_degraded(reason: &'static str) {
    metrics::counter!("grading_oracle_degraded_total", "reason" => reason).increment(1);
}
