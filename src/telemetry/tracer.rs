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
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

#[cfg(feature = "otel")]
use once_cell::sync::OnceCell;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};

#[cfg(feature = "otel")]
static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_new(&config.log_level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}' ({}), using 'info'", config.log_level, e);
        EnvFilter::new("info")
    })
}

/// Installs the global subscriber: an env filter, a JSON or text log layer
/// and, when telemetry is enabled, an OpenTelemetry span layer.
#[cfg(feature = "otel")]
pub async fn init_tracing(config: &TelemetryConfig) -> anyhow::Result<()> {
    if tracing::dispatcher::has_been_set() {
        info!("A tracing subscriber is already set, skipping initialization");
        return Ok(());
    }

    let tracer = if config.enabled {
        Some(build_tracer(config)?)
    } else {
        None
    };
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let subscriber = Registry::default().with(env_filter(config)).with(otel_layer);
    let _ = if config.log_format == "json" {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).try_init()
    };

    info!(
        otel = config.enabled,
        log_format = %config.log_format,
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(feature = "otel")]
fn build_tracer(config: &TelemetryConfig) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use std::time::Duration;

    if crate::telemetry::is_debug_enabled() {
        eprintln!(
            "[TELEMETRY DEBUG] Endpoint: {}, Protocol: {}, Sampling rate: {}",
            config.endpoint, config.protocol, config.sampling_rate
        );
    }

    let timeout = Duration::from_secs(config.timeout_seconds);
    let exporter = if config.protocol.eq_ignore_ascii_case("http") {
        let endpoint = crate::telemetry::signal_endpoint(&config.endpoint, "traces");
        opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&endpoint)
            .with_timeout(timeout)
            .build()
    } else {
        opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build()
    }
    .map_err(|e| anyhow::anyhow!("OpenTelemetry span exporter build failed: {}", e))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(crate::telemetry::resource(config))
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.sampling_rate,
        ))))
        .build();

    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer("remock");
    let _ = TRACER_PROVIDER.set(tracer_provider);
    Ok(tracer)
}

#[cfg(not(feature = "otel"))]
pub async fn init_tracing(config: &TelemetryConfig) -> anyhow::Result<()> {
    if tracing::dispatcher::has_been_set() {
        info!("A tracing subscriber is already set, skipping initialization");
        return Ok(());
    }

    let subscriber = Registry::default().with(env_filter(config));
    let _ = if config.log_format == "json" {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).try_init()
    };

    info!("Basic tracing initialized (OpenTelemetry feature not enabled)");
    Ok(())
}

pub fn shutdown_tracing() {
    #[cfg(feature = "otel")]
    {
        if let Some(provider) = TRACER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to shut down tracer provider");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_log_level_falls_back() {
        let config = TelemetryConfig {
            log_level: "[not a filter".to_string(),
            ..TelemetryConfig::default()
        };
        assert_eq!(env_filter(&config).to_string(), "info");
    }

    #[tokio::test]
    async fn test_init_tracing_without_export_is_idempotent() {
        let config = TelemetryConfig {
            enabled: false,
            log_format: "text".to_string(),
            ..TelemetryConfig::default()
        };

        assert!(init_tracing(&config).await.is_ok());
        assert!(init_tracing(&config).await.is_ok());
        shutdown_tracing();
    }
}
