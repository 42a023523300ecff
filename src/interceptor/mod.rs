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

pub mod message;
pub mod transport;

pub use message::{Body, InterceptedRequest, InterceptedResponse};
pub use transport::{ReqwestTransport, Transport};

use crate::error::{InterceptError, PatternError};
use crate::matcher::{AntPathMatcher, PathMatcher};
use crate::rules::{
    ContextBuilder, DefaultContextBuilder, GuardSelector, MockResponse, ResponseSelector,
    RuleStore,
};
use crate::telemetry::attributes::{self, outcome};
use crate::telemetry::metrics;
use async_trait::async_trait;
use http::{StatusCode, Version};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, field, info, info_span, warn, Instrument};

/// Simulated network latency.
#[async_trait]
pub trait Delayer: Send + Sync {
    /// Waits up to `duration`. Returning early is allowed.
    async fn delay(&self, duration: Duration);
}

/// Sleeps on the tokio timer. [`SleepDelayer::interrupt`] ends every wait in
/// progress.
#[derive(Default)]
pub struct SleepDelayer {
    interrupt: Notify,
}

impl SleepDelayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.interrupt.notify_waiters();
    }
}

#[async_trait]
impl Delayer for SleepDelayer {
    async fn delay(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.interrupt.notified() => {
                debug!(delay_ms = duration.as_millis() as u64, "Delay interrupted");
            }
        }
    }
}

/// Serves stored mock responses for matching requests and hands everything
/// else to a [`Transport`].
pub struct Interceptor {
    store: Arc<dyn RuleStore>,
    matcher: Arc<dyn PathMatcher>,
    context_builder: Arc<dyn ContextBuilder>,
    selector: Arc<dyn ResponseSelector>,
    delayer: Arc<dyn Delayer>,
}

pub struct InterceptorBuilder {
    store: Arc<dyn RuleStore>,
    matcher: Option<Arc<dyn PathMatcher>>,
    context_builder: Option<Arc<dyn ContextBuilder>>,
    selector: Option<Arc<dyn ResponseSelector>>,
    delayer: Option<Arc<dyn Delayer>>,
}

impl InterceptorBuilder {
    pub fn matcher(mut self, matcher: Arc<dyn PathMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn context_builder(mut self, context_builder: Arc<dyn ContextBuilder>) -> Self {
        self.context_builder = Some(context_builder);
        self
    }

    pub fn selector(mut self, selector: Arc<dyn ResponseSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn delayer(mut self, delayer: Arc<dyn Delayer>) -> Self {
        self.delayer = Some(delayer);
        self
    }

    pub fn build(self) -> Interceptor {
        Interceptor {
            store: self.store,
            matcher: self
                .matcher
                .unwrap_or_else(|| Arc::new(AntPathMatcher::new())),
            context_builder: self
                .context_builder
                .unwrap_or_else(|| Arc::new(DefaultContextBuilder)),
            selector: self
                .selector
                .unwrap_or_else(|| Arc::new(GuardSelector::default())),
            delayer: self
                .delayer
                .unwrap_or_else(|| Arc::new(SleepDelayer::new())),
        }
    }
}

/// A stored response ready to be returned once its delay has passed.
struct Resolved {
    response: InterceptedResponse,
    delay: Duration,
}

impl Interceptor {
    pub fn builder(store: Arc<dyn RuleStore>) -> InterceptorBuilder {
        InterceptorBuilder {
            store,
            matcher: None,
            context_builder: None,
            selector: None,
            delayer: None,
        }
    }

    /// Answers `request` from the stored rules, or via `transport` when no
    /// rule, response or guard applies.
    ///
    /// Only an invalid stored pattern or a failing transport is an error.
    pub async fn intercept(
        &self,
        request: InterceptedRequest,
        transport: &dyn Transport,
    ) -> Result<InterceptedResponse, InterceptError> {
        let started = Instant::now();
        let method = request.method().as_str().to_string();
        let span = info_span!(
            "remock.intercept",
            remock.interception.id = %uuid::Uuid::new_v4(),
            http.request.method = %method,
            url.full = %request.url(),
            remock.rule.id = field::Empty,
            remock.outcome = field::Empty,
            http.response.status_code = field::Empty,
        );

        async move {
            let resolved = match self.resolve(&request) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(error = %e, "Stored pattern is invalid");
                    finish(&method, outcome::ERROR, started);
                    return Err(InterceptError::from(e));
                }
            };

            match resolved {
                Some(Resolved { response, delay }) => {
                    let remaining = delay.saturating_sub(started.elapsed());
                    self.delayer.delay(remaining).await;
                    info!(status = response.status.as_u16(), "Serving mock response");
                    record_status(&response);
                    finish(&method, outcome::MOCKED, started);
                    Ok(response)
                }
                None => match transport.proceed(request).await {
                    Ok(response) => {
                        record_status(&response);
                        finish(&method, outcome::PASSTHROUGH, started);
                        Ok(response)
                    }
                    Err(e) => {
                        finish(&method, outcome::ERROR, started);
                        Err(InterceptError::from(e))
                    }
                },
            }
        }
        .instrument(span)
        .await
    }

    fn resolve(&self, request: &InterceptedRequest) -> Result<Option<Resolved>, PatternError> {
        let rules = self.store.find_rules_by_method(request.method().as_str());
        let Some(rule) = rules.into_iter().find(|rule| {
            self.matcher
                .matches(&rule.pattern, &request.comparable_url(&rule.pattern))
        }) else {
            debug!("No rule matches, passing through");
            return Ok(None);
        };
        tracing::Span::current().record(attributes::remock::RULE_ID, rule.id);

        let candidates = match self.store.rule_with_responses(rule.id) {
            Some(candidates) if !candidates.responses.is_empty() => candidates,
            _ => {
                debug!(rule_id = rule.id, "Rule has no responses, passing through");
                return Ok(None);
            }
        };

        let context = self
            .context_builder
            .build(&candidates.rule, request, self.matcher.as_ref())?;

        let Some(chosen) = self.selector.select(&context, &candidates) else {
            debug!(rule_id = rule.id, "No response selected, passing through");
            return Ok(None);
        };

        Ok(materialize(chosen).map(|response| Resolved {
            response,
            delay: Duration::from_millis(chosen.delay_ms.unwrap_or(0)),
        }))
    }
}

fn materialize(mock: &MockResponse) -> Option<InterceptedResponse> {
    let status = match StatusCode::from_u16(mock.status) {
        Ok(status) => status,
        Err(_) => {
            warn!(status = mock.status, response_id = ?mock.id, "Stored status code is invalid, passing through");
            return None;
        }
    };

    Some(InterceptedResponse {
        status,
        message: mock.message.clone(),
        version: Version::HTTP_11,
        headers: mock
            .headers
            .iter()
            .map(|header| (header.key.clone(), header.value.clone()))
            .collect(),
        body: mock
            .body
            .as_ref()
            .map(|body| Body::new(body.clone(), Some(mock.content_type.mime()))),
    })
}

fn record_status(response: &InterceptedResponse) {
    tracing::Span::current().record(
        attributes::http::RESPONSE_STATUS_CODE,
        response.status.as_u16(),
    );
}

fn finish(method: &str, result: &'static str, started: Instant) {
    tracing::Span::current().record(attributes::remock::OUTCOME, result);
    metrics::record_interception(method, result, started.elapsed());
}
