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

use thiserror::Error;

/// Invalid stored patterns and misuse of the template-variable API.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error(
        "The number of capturing groups in the pattern segment {segment} does not match the \
         number of URI template variables it defines ({groups} groups, {variables} variables), \
         which can occur if capturing groups are used in a URI template regex. \
         Use non-capturing groups instead."
    )]
    CapturingGroupMismatch {
        segment: String,
        groups: usize,
        variables: usize,
    },

    #[error("Capturing patterns ({name}) are not supported by the path matcher")]
    UnsupportedCapture { name: String },

    #[error("Invalid regex in pattern segment '{segment}': {source}")]
    InvalidRegex {
        segment: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern \"{pattern}\" is not a match for \"{path}\"")]
    NotAMatch { pattern: String, path: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A rule for {method} {pattern} already exists")]
    DuplicateRule { method: String, pattern: String },

    #[error("Rule {0} not found")]
    RuleNotFound(i64),

    #[error("Response {0} not found")]
    ResponseNotFound(i64),

    #[error("Rule {rule_id} already has a default response ({existing})")]
    MultipleDefaults { rule_id: i64, existing: i64 },

    #[error("Invalid HTTP status code: {0}")]
    InvalidStatus(u16),
}

/// Failure while evaluating a guard expression.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Expression '{expression}' failed: {message}")]
    Failed { expression: String, message: String },

    #[error("Expression '{expression}' did not produce a boolean: {value}")]
    NotBoolean { expression: String, value: String },
}

#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("Stored pattern is invalid: {0}")]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}
