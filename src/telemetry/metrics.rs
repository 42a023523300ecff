/*
 * Copyright 2026 ReMock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::config::TelemetryConfig;
use crate::telemetry::attributes::metric;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "otel")]
use crate::telemetry::attributes;
#[cfg(feature = "otel")]
use once_cell::sync::OnceCell;
#[cfg(feature = "otel")]
use opentelemetry_sdk::metrics::SdkMeterProvider;

#[cfg(feature = "otel")]
static METER_PROVIDER: OnceCell<SdkMeterProvider> = OnceCell::new();

#[cfg(feature = "otel")]
pub async fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    use opentelemetry_otlp::WithExportConfig;
    use tracing::error;

    if !config.enabled {
        info!("Metrics are disabled");
        return Ok(());
    }

    let timeout = Duration::from_secs(config.timeout_seconds);
    let exporter = if config.protocol.eq_ignore_ascii_case("http") {
        let endpoint = crate::telemetry::signal_endpoint(&config.endpoint, "metrics");
        info!(endpoint = %endpoint, "Configuring HTTP exporter for metrics");
        opentelemetry_otlp::MetricExporter::builder()
            .with_http()
            .with_endpoint(&endpoint)
            .with_timeout(timeout)
            .build()
    } else {
        info!(endpoint = %config.endpoint, "Configuring gRPC exporter for metrics");
        opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build()
    }
    .map_err(|e| {
        error!("Failed to build OpenTelemetry metric exporter: {}", e);
        anyhow::anyhow!("OpenTelemetry metric exporter build failed: {}", e)
    })?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(10))
        .build();

    let meter_provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(crate::telemetry::resource(config))
        .build();

    opentelemetry::global::set_meter_provider(meter_provider.clone());
    let _ = METER_PROVIDER.set(meter_provider);

    if crate::telemetry::is_debug_enabled() {
        info!("[TELEMETRY DEBUG] Metrics configured with 10-second export interval");
    }
    info!("OpenTelemetry metrics initialized successfully");
    Ok(())
}

#[cfg(not(feature = "otel"))]
pub async fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enabled {
        info!("Metrics are disabled");
        return Ok(());
    }

    info!("Metrics are logged only (OpenTelemetry feature not enabled)");
    Ok(())
}

/// Flushes and stops the meter provider, if one was installed.
pub fn shutdown_metrics() {
    #[cfg(feature = "otel")]
    {
        if let Some(provider) = METER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to shut down meter provider");
            }
        }
    }
}

/// Counts one finished interception and records how long it took.
#[cfg(feature = "otel")]
pub fn record_interception(method: &str, outcome: &'static str, elapsed: Duration) {
    let meter = opentelemetry::global::meter("remock");
    let counter = meter
        .u64_counter(metric::INTERCEPTIONS_TOTAL)
        .with_description("Total number of intercepted requests")
        .build();
    let histogram = meter
        .f64_histogram(metric::INTERCEPTION_DURATION)
        .with_description("Interception duration in seconds, simulated delay included")
        .with_unit("s")
        .build();

    let attributes = [
        attributes::kv::http_method(method),
        attributes::kv::outcome(outcome),
    ];

    if crate::telemetry::is_debug_enabled() {
        tracing::debug!(
            method = %method,
            outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "[TELEMETRY DEBUG] Recording interception metrics"
        );
    }

    counter.add(1, &attributes);
    histogram.record(elapsed.as_secs_f64(), &attributes);
}

#[cfg(feature = "otel")]
pub fn record_guard_failure(rule_id: i64) {
    let counter = opentelemetry::global::meter("remock")
        .u64_counter(metric::GUARD_FAILURES_TOTAL)
        .with_description("Guard expressions that failed to evaluate")
        .build();
    counter.add(1, &[attributes::kv::rule_id(rule_id)]);
}

#[cfg(not(feature = "otel"))]
pub fn record_interception(method: &str, outcome: &'static str, elapsed: Duration) {
    tracing::debug!(
        metric = metric::INTERCEPTIONS_TOTAL,
        method = %method,
        outcome,
        elapsed_ms = elapsed.as_millis() as u64,
        "Interception finished"
    );
}

#[cfg(not(feature = "otel"))]
pub fn record_guard_failure(rule_id: i64) {
    tracing::debug!(
        metric = metric::GUARD_FAILURES_TOTAL,
        rule_id,
        "Guard evaluation failed"
    );
}
