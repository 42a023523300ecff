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

//! Attribute and metric names shared by spans, log fields and metrics.
//!
//! HTTP names follow the OpenTelemetry semantic conventions; the `remock.*`
//! names are specific to interception.
//!
//! References:
//! - https://opentelemetry.io/docs/specs/semconv/http/http-spans/
//! - https://opentelemetry.io/docs/specs/semconv/attributes-registry/

/// HTTP semantic conventions
pub mod http {
    /// HTTP request method
    pub const METHOD: &str = "http.request.method";

    /// HTTP response status code
    pub const RESPONSE_STATUS_CODE: &str = "http.response.status_code";
}

/// Interception attributes
pub mod remock {
    pub const RULE_ID: &str = "remock.rule.id";
    pub const OUTCOME: &str = "remock.outcome";
}

/// Values of [`remock::OUTCOME`]
pub mod outcome {
    /// A stored response was served
    pub const MOCKED: &str = "mocked";
    /// The request went to the real network
    pub const PASSTHROUGH: &str = "passthrough";
    /// Interception failed
    pub const ERROR: &str = "error";
}

pub mod metric {
    pub const INTERCEPTIONS_TOTAL: &str = "remock_interceptions_total";
    pub const GUARD_FAILURES_TOTAL: &str = "remock_guard_failures_total";
    pub const INTERCEPTION_DURATION: &str = "remock_interception_duration";
}

/// Helper functions for creating OpenTelemetry KeyValue pairs
#[cfg(feature = "otel")]
pub mod kv {
    use opentelemetry::KeyValue;

    pub fn http_method(method: impl Into<String>) -> KeyValue {
        KeyValue::new(super::http::METHOD, method.into())
    }

    pub fn rule_id(rule_id: i64) -> KeyValue {
        KeyValue::new(super::remock::RULE_ID, rule_id)
    }

    pub fn outcome(outcome: &'static str) -> KeyValue {
        KeyValue::new(super::remock::OUTCOME, outcome)
    }
}
