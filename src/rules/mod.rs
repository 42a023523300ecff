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

pub mod context;
pub mod selector;
pub mod store;

pub use context::{ContextBuilder, ContextValue, DefaultContextBuilder, EvaluationContext};
pub use selector::{EvalExpressionEvaluator, ExpressionEvaluator, GuardSelector, ResponseSelector};
pub use store::{InMemoryRuleStore, RuleStore};

use serde::{Deserialize, Serialize};

/// A mockable endpoint: an HTTP method plus a URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub method: String,
    pub pattern: String,
    pub pattern_hash: i32,
}

impl Rule {
    pub fn new(id: i64, method: impl Into<String>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            id,
            method: method.into().to_ascii_uppercase(),
            pattern_hash: pattern_hash(&pattern),
            pattern,
        }
    }
}

/// 32-bit `31 * h + c` hash over the UTF-16 code units of `pattern`.
pub fn pattern_hash(pattern: &str) -> i32 {
    pattern
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseContentType {
    #[default]
    Json,
    Xml,
    Text,
}

impl ResponseContentType {
    pub fn essence(&self) -> &'static str {
        match self {
            ResponseContentType::Json => "application/json",
            ResponseContentType::Xml => "application/xml",
            ResponseContentType::Text => "application/text",
        }
    }

    pub fn mime(&self) -> mime::Mime {
        self.essence()
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub key: String,
    pub value: String,
}

/// One candidate response of a rule. A response without a `when` guard is
/// the rule's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content_type: ResponseContentType,
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub headers: Vec<ResponseHeader>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            id: None,
            content_type: ResponseContentType::default(),
            status,
            message: None,
            when: None,
            body: None,
            delay_ms: None,
            headers: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: ResponseContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_when(mut self, expression: impl Into<String>) -> Self {
        self.when = Some(expression.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(ResponseHeader {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_default(&self) -> bool {
        self.when.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWithResponses {
    pub rule: Rule,
    pub responses: Vec<MockResponse>,
}
