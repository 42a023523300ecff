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
use crate::matcher::PathVariables;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// `?`, `*`, `{name}` and `{name:regex}` tokens inside a single path segment.
static GLOB_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\?|\*|\{((?:\{[^/]+?\}|[^/{}]|\\[{}])+?)\}").expect("glob token regex is valid")
});

const DEFAULT_VARIABLE_PATTERN: &str = "((?s).*)";

/// One compiled path segment of a stored pattern.
#[derive(Debug)]
pub struct SegmentMatcher {
    raw: String,
    case_sensitive: bool,
    kind: SegmentKind,
}

#[derive(Debug)]
enum SegmentKind {
    /// No glob tokens: compared by string equality, no regex involved.
    Exact,
    Glob {
        regex: Regex,
        variable_names: Vec<String>,
    },
}

impl SegmentMatcher {
    pub fn compile(segment: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let mut pattern = String::with_capacity(segment.len() + 16);
        let mut variable_names = Vec::new();
        let mut end = 0;
        let mut found_glob = false;

        for captures in GLOB_PATTERN.captures_iter(segment) {
            let Some(token) = captures.get(0) else {
                continue;
            };
            found_glob = true;
            pattern.push_str(&regex::escape(&segment[end..token.start()]));

            match token.as_str() {
                "?" => pattern.push('.'),
                "*" => pattern.push_str(".*"),
                variable => match variable.find(':') {
                    None => {
                        pattern.push_str(DEFAULT_VARIABLE_PATTERN);
                        if let Some(name) = captures.get(1) {
                            variable_names.push(name.as_str().to_string());
                        }
                    }
                    Some(colon) => {
                        pattern.push('(');
                        pattern.push_str(&variable[colon + 1..variable.len() - 1]);
                        pattern.push(')');
                        variable_names.push(variable[1..colon].to_string());
                    }
                },
            }
            end = token.end();
        }

        if !found_glob {
            return Ok(Self {
                raw: segment.to_string(),
                case_sensitive,
                kind: SegmentKind::Exact,
            });
        }

        pattern.push_str(&regex::escape(&segment[end..]));
        let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(!case_sensitive)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| PatternError::InvalidRegex {
                segment: segment.to_string(),
                source,
            })?;

        Ok(Self {
            raw: segment.to_string(),
            case_sensitive,
            kind: SegmentKind::Glob {
                regex,
                variable_names,
            },
        })
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.kind, SegmentKind::Exact)
    }

    pub fn variable_names(&self) -> &[String] {
        match &self.kind {
            SegmentKind::Exact => &[],
            SegmentKind::Glob { variable_names, .. } => variable_names,
        }
    }

    /// Matches the whole of `candidate`, recording template variables into
    /// `variables` when it is supplied.
    pub fn matches(
        &self,
        candidate: &str,
        variables: Option<&mut PathVariables>,
    ) -> Result<bool, PatternError> {
        let (regex, variable_names) = match &self.kind {
            SegmentKind::Exact => {
                return Ok(if self.case_sensitive {
                    self.raw == candidate
                } else {
                    equals_ignore_case(&self.raw, candidate)
                });
            }
            SegmentKind::Glob {
                regex,
                variable_names,
            } => (regex, variable_names),
        };

        let Some(variables) = variables else {
            return Ok(regex.is_match(candidate));
        };
        let Some(captures) = regex.captures(candidate) else {
            return Ok(false);
        };

        let groups = regex.captures_len() - 1;
        if variable_names.len() != groups {
            return Err(PatternError::CapturingGroupMismatch {
                segment: regex.as_str().to_string(),
                groups,
                variables: variable_names.len(),
            });
        }

        for (index, name) in variable_names.iter().enumerate() {
            if name.starts_with('*') {
                return Err(PatternError::UnsupportedCapture { name: name.clone() });
            }
            let value = captures.get(index + 1).map_or("", |m| m.as_str());
            variables.insert(name.clone(), value);
        }

        Ok(true)
    }
}

fn equals_ignore_case(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}
