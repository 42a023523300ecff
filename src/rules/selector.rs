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

use crate::error::EvaluationError;
use crate::rules::context::EvaluationContext;
use crate::rules::{MockResponse, RuleWithResponses};
use crate::telemetry::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

/// Boolean guard evaluation over the four context sections.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext,
    ) -> Result<bool, EvaluationError>;
}

/// Evaluates guards with the `eval` crate. The sections are bound as
/// `header`, `query`, `param` and `body`, so `body.items[0].id == 3` and
/// `header.reqHeader1 == "value1"` both work.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvalExpressionEvaluator;

impl ExpressionEvaluator for EvalExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext,
    ) -> Result<bool, EvaluationError> {
        let value = eval::Expr::new(expression)
            .value("header", &context.header)
            .value("query", &context.query)
            .value("param", &context.param)
            .value("body", &context.body)
            .exec()
            .map_err(|e| EvaluationError::Failed {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        match value {
            eval::Value::Bool(result) => Ok(result),
            other => Err(EvaluationError::NotBoolean {
                expression: expression.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

pub trait ResponseSelector: Send + Sync {
    fn select<'a>(
        &self,
        context: &EvaluationContext,
        candidates: &'a RuleWithResponses,
    ) -> Option<&'a MockResponse>;
}

/// Picks the first response whose guard is exactly `true`, else the first
/// response without a guard.
pub struct GuardSelector {
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl GuardSelector {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl Default for GuardSelector {
    fn default() -> Self {
        Self::new(Arc::new(EvalExpressionEvaluator))
    }
}

impl ResponseSelector for GuardSelector {
    fn select<'a>(
        &self,
        context: &EvaluationContext,
        candidates: &'a RuleWithResponses,
    ) -> Option<&'a MockResponse> {
        let rule_id = candidates.rule.id;

        let guarded = candidates.responses.iter().find(|response| {
            let Some(expression) = response.when.as_deref() else {
                return false;
            };
            match self.evaluator.evaluate(expression, context) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        rule_id,
                        response_id = ?response.id,
                        error = %e,
                        "Failed to evaluate guard, treating it as false"
                    );
                    metrics::record_guard_failure(rule_id);
                    false
                }
            }
        });

        match guarded {
            Some(response) => {
                debug!(rule_id, response_id = ?response.id, "Guard matched");
                Some(response)
            }
            None => {
                let fallback = candidates.responses.iter().find(|r| r.is_default());
                debug!(
                    rule_id,
                    response_id = ?fallback.and_then(|r| r.id),
                    "No guard matched, using default response"
                );
                fallback
            }
        }
    }
}
