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

use crate::error::StoreError;
use crate::matcher::{AntPathMatcher, CachePolicy, DEFAULT_PATH_SEPARATOR};
use crate::rules::{InMemoryRuleStore, MockResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Seeds a store with the configured rules, in file order.
    pub fn build_store(&self) -> Result<InMemoryRuleStore, StoreError> {
        let store = InMemoryRuleStore::new();
        for rule_config in &self.rules {
            let rule = store.add_rule(&rule_config.method, &rule_config.pattern)?;
            for response in &rule_config.responses {
                store.save_response(rule.id, response.clone())?;
            }
        }
        Ok(store)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default = "default_path_separator")]
    pub path_separator: String,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub trim_tokens: bool,
    /// `~` adapts, `true` always caches, `false` never does.
    #[serde(default)]
    pub cache_patterns: Option<bool>,
}

fn default_path_separator() -> String {
    DEFAULT_PATH_SEPARATOR.to_string()
}

fn default_case_sensitive() -> bool {
    true
}

impl MatcherConfig {
    pub fn build(&self) -> AntPathMatcher {
        AntPathMatcher::with_separator(self.path_separator.clone())
            .case_sensitive(self.case_sensitive)
            .trim_tokens(self.trim_tokens)
            .cache_patterns(CachePolicy::from(self.cache_patterns))
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            case_sensitive: default_case_sensitive(),
            trim_tokens: false,
            cache_patterns: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Exports spans and metrics over OTLP. Logging is on either way.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_service_name() -> String {
    "remock".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_protocol() -> String {
    "grpc".to_string()
}

fn default_sampling_rate() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            service_version: default_service_version(),
            endpoint: default_endpoint(),
            protocol: default_protocol(),
            sampling_rate: default_sampling_rate(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub method: String,
    pub pattern: String,
    #[serde(default)]
    pub responses: Vec<MockResponse>,
}
