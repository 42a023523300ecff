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

pub mod attributes;
pub mod metrics;
pub mod tracer;

pub use metrics::init_metrics;
pub use tracer::init_tracing;

use crate::config::TelemetryConfig;
use anyhow::Context;
use tracing::info;

/// Check if telemetry debug mode is enabled via environment variable
pub fn is_debug_enabled() -> bool {
    std::env::var("REMOCK_TELEMETRY_DEBUG")
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

/// Debug logging helper for telemetry operations
pub fn debug_log(message: &str, config: &TelemetryConfig) {
    if is_debug_enabled() {
        info!("[TELEMETRY DEBUG] {}", message);
        info!(
            "[TELEMETRY DEBUG] Config: enabled={}, endpoint={}, protocol={}, timeout={}s",
            config.enabled, config.endpoint, config.protocol, config.timeout_seconds
        );
    }
}

/// OTLP/HTTP wants one path per signal; gRPC uses the bare endpoint.
pub(crate) fn signal_endpoint(endpoint: &str, signal: &str) -> String {
    let suffix = format!("v1/{signal}");
    if endpoint.contains(&format!("/{suffix}")) {
        endpoint.to_string()
    } else if endpoint.ends_with('/') {
        format!("{endpoint}{suffix}")
    } else {
        format!("{endpoint}/{suffix}")
    }
}

#[cfg(feature = "otel")]
pub(crate) fn resource(config: &TelemetryConfig) -> opentelemetry_sdk::Resource {
    use opentelemetry::KeyValue;

    opentelemetry_sdk::Resource::builder()
        .with_attributes(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
        ])
        .build()
}

pub async fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    debug_log("Starting telemetry initialization", config);

    init_tracing(config)
        .await
        .context("Failed to initialize tracing")?;
    init_metrics(config)
        .await
        .context("Failed to initialize metrics")?;

    if config.enabled {
        info!(service = %config.service_name, "Telemetry initialized");
    }
    debug_log("Telemetry initialization completed", config);
    Ok(())
}

pub async fn shutdown_telemetry() {
    info!("Shutting down telemetry");
    tracer::shutdown_tracing();
    metrics::shutdown_metrics();
}
