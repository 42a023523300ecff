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

use crate::error::PatternError;
use crate::interceptor::message::InterceptedRequest;
use crate::matcher::PathMatcher;
use crate::rules::Rule;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A value guard expressions can see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Narrowest reading of `raw`: int, long, finite double, `true`/`false`,
    /// otherwise the string itself.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i32>() {
            return ContextValue::Int(value);
        }
        if let Ok(value) = raw.parse::<i64>() {
            return ContextValue::Long(value);
        }
        if let Some(value) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) {
            return ContextValue::Double(value);
        }
        match raw {
            "true" => ContextValue::Bool(true),
            "false" => ContextValue::Bool(false),
            _ => ContextValue::String(raw.to_string()),
        }
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ContextValue::Null,
            serde_json::Value::Bool(value) => ContextValue::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => match i32::try_from(value) {
                    Ok(value) => ContextValue::Int(value),
                    Err(_) => ContextValue::Long(value),
                },
                None => number
                    .as_f64()
                    .map_or(ContextValue::Null, ContextValue::Double),
            },
            serde_json::Value::String(value) => ContextValue::coerce(&value),
            serde_json::Value::Array(values) => {
                ContextValue::List(values.into_iter().map(ContextValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => ContextValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, ContextValue::from_json(value)))
                    .collect(),
            ),
        }
    }
}

/// Per-request snapshot evaluated by guard expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationContext {
    pub header: BTreeMap<String, ContextValue>,
    pub query: BTreeMap<String, ContextValue>,
    pub param: BTreeMap<String, ContextValue>,
    pub body: ContextValue,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            header: BTreeMap::new(),
            query: BTreeMap::new(),
            param: BTreeMap::new(),
            body: ContextValue::Map(BTreeMap::new()),
        }
    }
}

pub trait ContextBuilder: Send + Sync {
    fn build(
        &self,
        rule: &Rule,
        request: &InterceptedRequest,
        matcher: &dyn PathMatcher,
    ) -> Result<EvaluationContext, PatternError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContextBuilder;

impl ContextBuilder for DefaultContextBuilder {
    fn build(
        &self,
        rule: &Rule,
        request: &InterceptedRequest,
        matcher: &dyn PathMatcher,
    ) -> Result<EvaluationContext, PatternError> {
        let url = request.comparable_url(&rule.pattern);
        let param = matcher
            .extract_uri_template_variables(&rule.pattern, &url)?
            .iter()
            .map(|(name, value)| (name.to_string(), ContextValue::coerce(value)))
            .collect();

        Ok(EvaluationContext {
            header: header_section(request),
            query: query_section(request),
            param,
            body: body_section(request),
        })
    }
}

/// One value per header name; a repeated name keeps its last value.
fn header_section(request: &InterceptedRequest) -> BTreeMap<String, ContextValue> {
    request
        .headers()
        .iter()
        .map(|(name, value)| (name.clone(), ContextValue::coerce(value)))
        .collect()
}

/// One value per parameter name; a repeated name keeps its first value and a
/// parameter without `=` maps to null.
fn query_section(request: &InterceptedRequest) -> BTreeMap<String, ContextValue> {
    let mut query = BTreeMap::new();
    let Some(raw) = request.url().query() else {
        return query;
    };

    for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (pair, None),
        };
        query
            .entry(decode_query_component(name))
            .or_insert_with(|| match value {
                Some(value) => ContextValue::coerce(&decode_query_component(value)),
                None => ContextValue::Null,
            });
    }
    query
}

fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

fn body_section(request: &InterceptedRequest) -> ContextValue {
    let empty = ContextValue::Map(BTreeMap::new());
    let Some(body) = request.body() else {
        return empty;
    };
    let is_json = body
        .content_type
        .as_ref()
        .is_some_and(|mime| mime.subtype().as_str().eq_ignore_ascii_case("json"));
    if !is_json {
        return empty;
    }

    match serde_json::from_slice::<serde_json::Value>(&body.bytes) {
        Ok(serde_json::Value::Null) => empty,
        Ok(value) => {
            debug!(bytes = body.bytes.len(), "Decoded JSON request body");
            ContextValue::from_json(value)
        }
        Err(e) => {
            warn!(url = %request.url(), error = %e, "Request body is not valid JSON, ignoring it");
            empty
        }
    }
}
