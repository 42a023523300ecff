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

use crate::config::types::{Config, MatcherConfig, RuleConfig, TelemetryConfig};
use crate::rules::MockResponse;
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> anyhow::Result<Config> {
        let config: Config =
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    pub fn validate(config: &Config) -> anyhow::Result<()> {
        Self::validate_matcher(&config.matcher)?;
        Self::validate_telemetry(&config.telemetry)?;

        let mut seen = HashSet::new();
        for (index, rule) in config.rules.iter().enumerate() {
            Self::validate_rule(rule).with_context(|| {
                format!("Invalid rule #{} ({} {})", index + 1, rule.method, rule.pattern)
            })?;
            if !seen.insert((rule.method.to_ascii_uppercase(), rule.pattern.as_str())) {
                anyhow::bail!("Duplicate rule: {} {}", rule.method, rule.pattern);
            }
        }

        Ok(())
    }

    fn validate_matcher(config: &MatcherConfig) -> anyhow::Result<()> {
        if config.path_separator.is_empty() {
            anyhow::bail!("Path separator cannot be empty");
        }
        Ok(())
    }

    fn validate_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&config.sampling_rate) {
            anyhow::bail!("Sampling rate must be between 0.0 and 1.0");
        }

        let protocol = config.protocol.to_lowercase();
        if protocol != "http" && protocol != "grpc" {
            anyhow::bail!(
                "Telemetry protocol must be 'http' or 'grpc', got '{}'",
                config.protocol
            );
        }

        if config.log_format != "json" && config.log_format != "text" {
            anyhow::bail!(
                "Log format must be 'json' or 'text', got '{}'",
                config.log_format
            );
        }

        if !config.enabled {
            return Ok(());
        }

        let url = reqwest::Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid telemetry endpoint URL format: {}", config.endpoint))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("Telemetry endpoint must use http:// or https:// scheme");
        }
        if url.host().is_none() {
            anyhow::bail!("Telemetry endpoint must have a host");
        }

        if config.timeout_seconds == 0 {
            anyhow::bail!("Telemetry timeout must be greater than 0");
        }

        Ok(())
    }

    fn validate_rule(rule: &RuleConfig) -> anyhow::Result<()> {
        if rule.method.trim().is_empty() {
            anyhow::bail!("Rule method cannot be empty");
        }
        if http::Method::from_bytes(rule.method.as_bytes()).is_err() {
            anyhow::bail!("Invalid HTTP method: {}", rule.method);
        }

        if rule.pattern.is_empty() {
            anyhow::bail!("Rule pattern cannot be empty");
        }

        let defaults = rule.responses.iter().filter(|r| r.is_default()).count();
        if defaults > 1 {
            anyhow::bail!("Rule can have at most one response without a 'when' guard");
        }

        for response in &rule.responses {
            Self::validate_response(response)?;
        }

        Ok(())
    }

    fn validate_response(response: &MockResponse) -> anyhow::Result<()> {
        if !(100..=599).contains(&response.status) {
            anyhow::bail!("Invalid HTTP status code: {}", response.status);
        }

        if response
            .when
            .as_deref()
            .is_some_and(|expression| expression.trim().is_empty())
        {
            anyhow::bail!("Guard expression cannot be blank; omit 'when' for a default response");
        }

        for header in &response.headers {
            if http::HeaderName::from_bytes(header.key.as_bytes()).is_err() {
                anyhow::bail!("Invalid response header name: {:?}", header.key);
            }
        }

        Ok(())
    }
}
