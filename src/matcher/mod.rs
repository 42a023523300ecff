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

//! Ant-style path matching.
//!
//! Patterns are split into segments on the path separator. Within a segment
//! `?` matches one character, `*` zero or more characters and `{name}` /
//! `{name:regex}` capture a template variable. A segment that is exactly `**`
//! matches zero or more whole segments.

pub mod cache;
pub mod segment;
pub mod tokenizer;

pub use cache::{CachePolicy, CACHE_TURNOFF_THRESHOLD};
pub use segment::SegmentMatcher;
pub use tokenizer::tokenize;

use crate::error::PatternError;
use cache::PatternCache;
use std::sync::Arc;

pub const DEFAULT_PATH_SEPARATOR: &str = "/";

const DOUBLE_WILDCARD: &str = "**";
const WILDCARD_CHARS: [u8; 3] = [b'*', b'?', b'{'];

pub trait PathMatcher: Send + Sync {
    /// True if `path` contains `*`, `?` or a `{...}` template marker.
    fn is_pattern(&self, path: &str) -> bool;

    fn matches(&self, pattern: &str, path: &str) -> bool;

    /// True if `path` could be the start of something `pattern` matches.
    fn match_start(&self, pattern: &str, path: &str) -> bool;

    /// The part of `path` covered by the first wildcard segment of `pattern`
    /// onwards.
    fn extract_path_within_pattern(&self, pattern: &str, path: &str) -> String;

    /// Template variables bound by matching `path` against `pattern`, in the
    /// order the matcher encounters them. Errors if the two do not match.
    fn extract_uri_template_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Result<PathVariables, PatternError>;
}

/// Ordered template-variable bindings. Re-binding a name keeps its original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables(Vec<(String, String)>);

impl PathVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Segment-wise matcher with shared, adaptively disabled caches.
pub struct AntPathMatcher {
    path_separator: String,
    case_sensitive: bool,
    trim_tokens: bool,
    cache: PatternCache,
}

impl Default for AntPathMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AntPathMatcher {
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_PATH_SEPARATOR)
    }

    /// An empty separator falls back to `/`.
    pub fn with_separator(path_separator: impl Into<String>) -> Self {
        let mut path_separator = path_separator.into();
        if path_separator.is_empty() {
            path_separator = DEFAULT_PATH_SEPARATOR.to_string();
        }
        Self {
            path_separator,
            case_sensitive: true,
            trim_tokens: false,
            cache: PatternCache::new(CachePolicy::Adaptive),
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn trim_tokens(mut self, trim_tokens: bool) -> Self {
        self.trim_tokens = trim_tokens;
        self
    }

    pub fn cache_patterns(mut self, policy: CachePolicy) -> Self {
        self.cache = PatternCache::new(policy);
        self
    }

    pub fn path_separator(&self) -> &str {
        &self.path_separator
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache.policy()
    }

    /// Number of compiled segment matchers currently cached.
    pub fn segment_cache_len(&self) -> usize {
        self.cache.segments_len()
    }

    pub fn tokenized_cache_len(&self) -> usize {
        self.cache.tokenized_len()
    }

    fn tokenize_path(&self, path: &str) -> Vec<String> {
        tokenize(Some(path), &self.path_separator, self.trim_tokens, true)
    }

    fn tokenize_pattern(&self, pattern: &str) -> Arc<[String]> {
        self.cache
            .tokenized(pattern, |pattern| self.tokenize_path(pattern))
    }

    fn match_strings(
        &self,
        pattern: &str,
        candidate: &str,
        variables: Option<&mut PathVariables>,
    ) -> Result<bool, PatternError> {
        let case_sensitive = self.case_sensitive;
        let matcher = self
            .cache
            .segment(pattern, |segment| SegmentMatcher::compile(segment, case_sensitive))?;
        matcher.matches(candidate, variables)
    }

    fn do_match(
        &self,
        pattern: &str,
        path: &str,
        full_match: bool,
        mut variables: Option<&mut PathVariables>,
    ) -> Result<bool, PatternError> {
        let separator = self.path_separator.as_str();
        if path.starts_with(separator) != pattern.starts_with(separator) {
            return Ok(false);
        }

        let patt_dirs = self.tokenize_pattern(pattern);
        if full_match && self.case_sensitive && !self.is_potential_match(path, &patt_dirs) {
            return Ok(false);
        }
        let path_dirs = self.tokenize_path(path);

        // Exclusive end indices.
        let mut patt_start = 0;
        let mut patt_end = patt_dirs.len();
        let mut path_start = 0;
        let mut path_end = path_dirs.len();

        // Everything up to the first `**`.
        while patt_start < patt_end && path_start < path_end {
            let patt_dir = &patt_dirs[patt_start];
            if patt_dir == DOUBLE_WILDCARD {
                break;
            }
            if !self.match_strings(patt_dir, &path_dirs[path_start], variables.as_deref_mut())? {
                return Ok(false);
            }
            patt_start += 1;
            path_start += 1;
        }

        if path_start >= path_end {
            if patt_start >= patt_end {
                return Ok(pattern.ends_with(separator) == path.ends_with(separator));
            }
            if !full_match {
                return Ok(true);
            }
            if patt_start + 1 == patt_end && patt_dirs[patt_start] == "*" && path.ends_with(separator)
            {
                return Ok(true);
            }
            return Ok(only_double_wildcards(&patt_dirs[patt_start..patt_end]));
        } else if patt_start >= patt_end {
            return Ok(false);
        } else if !full_match && patt_dirs[patt_start] == DOUBLE_WILDCARD {
            return Ok(true);
        }

        // Everything after the last `**`.
        while patt_start < patt_end && path_start < path_end {
            let patt_dir = &patt_dirs[patt_end - 1];
            if patt_dir == DOUBLE_WILDCARD {
                break;
            }
            if !self.match_strings(patt_dir, &path_dirs[path_end - 1], variables.as_deref_mut())? {
                return Ok(false);
            }
            if patt_end == patt_dirs.len()
                && pattern.ends_with(separator) != path.ends_with(separator)
            {
                return Ok(false);
            }
            patt_end -= 1;
            path_end -= 1;
        }

        if path_start >= path_end {
            return Ok(only_double_wildcards(&patt_dirs[patt_start..patt_end]));
        }

        // Segment blocks between interior `**` markers.
        while patt_start + 1 != patt_end && path_start < path_end {
            let Some(next_wildcard) =
                (patt_start + 1..patt_end).find(|&i| patt_dirs[i] == DOUBLE_WILDCARD)
            else {
                break;
            };
            if next_wildcard == patt_start + 1 {
                // `**/**`
                patt_start += 1;
                continue;
            }

            let patt_len = next_wildcard - patt_start - 1;
            let path_len = path_end - path_start;
            let mut found = None;
            if path_len >= patt_len {
                'offsets: for offset in 0..=path_len - patt_len {
                    for j in 0..patt_len {
                        let sub_patt = &patt_dirs[patt_start + j + 1];
                        let sub_path = &path_dirs[path_start + offset + j];
                        if !self.match_strings(sub_patt, sub_path, variables.as_deref_mut())? {
                            continue 'offsets;
                        }
                    }
                    found = Some(path_start + offset);
                    break;
                }
            }

            let Some(found) = found else {
                return Ok(false);
            };
            patt_start = next_wildcard;
            path_start = found + patt_len;
        }

        Ok(only_double_wildcards(&patt_dirs[patt_start..patt_end]))
    }

    /// Cheap literal-prefix scan over the raw path. Returns false only when a
    /// literal pattern segment plainly cannot line up with the path.
    fn is_potential_match(&self, path: &str, patt_dirs: &[String]) -> bool {
        if self.trim_tokens {
            return true;
        }
        let path = path.as_bytes();
        let separator = self.path_separator.as_bytes();
        let mut pos = 0;
        for patt_dir in patt_dirs {
            pos += skip_separator(path, pos, separator);
            let skipped = skip_segment(path, pos, patt_dir.as_bytes());
            if skipped < patt_dir.len() {
                return skipped > 0
                    || patt_dir
                        .as_bytes()
                        .first()
                        .is_some_and(|c| WILDCARD_CHARS.contains(c));
            }
            pos += skipped;
        }
        true
    }
}

impl PathMatcher for AntPathMatcher {
    fn is_pattern(&self, path: &str) -> bool {
        let mut in_variable = false;
        for c in path.chars() {
            match c {
                '*' | '?' => return true,
                '{' => in_variable = true,
                '}' if in_variable => return true,
                _ => {}
            }
        }
        false
    }

    fn matches(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, true, None).unwrap_or_else(|e| {
            tracing::warn!(pattern = %pattern, error = %e, "Pattern cannot be compiled");
            false
        })
    }

    fn match_start(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, false, None).unwrap_or_else(|e| {
            tracing::warn!(pattern = %pattern, error = %e, "Pattern cannot be compiled");
            false
        })
    }

    fn extract_path_within_pattern(&self, pattern: &str, path: &str) -> String {
        let separator = self.path_separator.as_str();
        let patt_parts = self.tokenize_path(pattern);
        let path_parts = self.tokenize_path(path);
        let mut extracted = String::new();
        let mut path_started = false;

        let mut segment = 0;
        while segment < patt_parts.len() {
            let patt_part = &patt_parts[segment];
            if patt_part.contains('*') || patt_part.contains('?') {
                while segment < path_parts.len() {
                    if path_started || (segment == 0 && !pattern.starts_with(separator)) {
                        extracted.push_str(separator);
                    }
                    extracted.push_str(&path_parts[segment]);
                    path_started = true;
                    segment += 1;
                }
            }
            segment += 1;
        }

        extracted
    }

    fn extract_uri_template_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Result<PathVariables, PatternError> {
        let mut variables = PathVariables::new();
        if !self.do_match(pattern, path, true, Some(&mut variables))? {
            return Err(PatternError::NotAMatch {
                pattern: pattern.to_string(),
                path: path.to_string(),
            });
        }
        Ok(variables)
    }
}

fn only_double_wildcards(dirs: &[String]) -> bool {
    dirs.iter().all(|dir| dir == DOUBLE_WILDCARD)
}

fn skip_segment(path: &[u8], pos: usize, prefix: &[u8]) -> usize {
    let mut skipped = 0;
    for &c in prefix {
        if WILDCARD_CHARS.contains(&c) {
            return skipped;
        }
        let current = pos + skipped;
        if current >= path.len() {
            return 0;
        }
        if c == path[current] {
            skipped += 1;
        }
    }
    skipped
}

fn skip_separator(path: &[u8], pos: usize, separator: &[u8]) -> usize {
    let mut skipped = 0;
    while path
        .get(pos + skipped..)
        .is_some_and(|rest| rest.starts_with(separator))
    {
        skipped += separator.len();
    }
    skipped
}
