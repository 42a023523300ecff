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
use crate::matcher::segment::SegmentMatcher;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Entry count at which an adaptive cache gives up.
pub const CACHE_TURNOFF_THRESHOLD: usize = 65536;

const ADAPTIVE: u8 = 0;
const ALWAYS: u8 = 1;
const NEVER: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Cache until [`CACHE_TURNOFF_THRESHOLD`] entries, then switch off for good.
    #[default]
    Adaptive,
    Always,
    Never,
}

impl From<Option<bool>> for CachePolicy {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => CachePolicy::Adaptive,
            Some(true) => CachePolicy::Always,
            Some(false) => CachePolicy::Never,
        }
    }
}

/// Tokenized patterns and compiled segment matchers shared by all callers
/// of one matcher.
pub(crate) struct PatternCache {
    policy: AtomicU8,
    tokenized: DashMap<String, Arc<[String]>>,
    segments: DashMap<String, Arc<SegmentMatcher>>,
}

impl PatternCache {
    pub fn new(policy: CachePolicy) -> Self {
        let policy = match policy {
            CachePolicy::Adaptive => ADAPTIVE,
            CachePolicy::Always => ALWAYS,
            CachePolicy::Never => NEVER,
        };
        Self {
            policy: AtomicU8::new(policy),
            tokenized: DashMap::with_capacity(256),
            segments: DashMap::with_capacity(256),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        match self.policy.load(Ordering::Acquire) {
            ALWAYS => CachePolicy::Always,
            NEVER => CachePolicy::Never,
            _ => CachePolicy::Adaptive,
        }
    }

    pub fn tokenized<F>(&self, pattern: &str, tokenize: F) -> Arc<[String]>
    where
        F: FnOnce(&str) -> Vec<String>,
    {
        let policy = self.policy();
        if policy != CachePolicy::Never {
            if let Some(hit) = self.tokenized.get(pattern) {
                return Arc::clone(hit.value());
            }
        }

        let tokens: Arc<[String]> = tokenize(pattern).into();
        if policy == CachePolicy::Adaptive && self.tokenized.len() >= CACHE_TURNOFF_THRESHOLD {
            self.deactivate();
            return tokens;
        }
        if policy != CachePolicy::Never {
            self.tokenized
                .insert(pattern.to_string(), Arc::clone(&tokens));
            // A concurrent shutoff may have cleared the map before this insert landed.
            if self.policy() == CachePolicy::Never {
                self.tokenized.remove(pattern);
            }
        }
        tokens
    }

    pub fn segment<F>(&self, segment: &str, compile: F) -> Result<Arc<SegmentMatcher>, PatternError>
    where
        F: FnOnce(&str) -> Result<SegmentMatcher, PatternError>,
    {
        let policy = self.policy();
        if policy != CachePolicy::Never {
            if let Some(hit) = self.segments.get(segment) {
                return Ok(Arc::clone(hit.value()));
            }
        }

        let matcher = Arc::new(compile(segment)?);
        if policy == CachePolicy::Adaptive && self.segments.len() >= CACHE_TURNOFF_THRESHOLD {
            self.deactivate();
            return Ok(matcher);
        }
        if policy != CachePolicy::Never {
            self.segments
                .insert(segment.to_string(), Arc::clone(&matcher));
            if self.policy() == CachePolicy::Never {
                self.segments.remove(segment);
            }
        }
        Ok(matcher)
    }

    pub fn tokenized_len(&self) -> usize {
        self.tokenized.len()
    }

    pub fn segments_len(&self) -> usize {
        self.segments.len()
    }

    fn deactivate(&self) {
        if self.policy.swap(NEVER, Ordering::AcqRel) == ADAPTIVE {
            warn!(
                threshold = CACHE_TURNOFF_THRESHOLD,
                "Too many distinct path patterns, disabling pattern cache"
            );
        }
        self.tokenized.clear();
        self.segments.clear();
    }
}
