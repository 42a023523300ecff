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
use crate::rules::{MockResponse, Rule, RuleWithResponses};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Read side used on the interception path.
pub trait RuleStore: Send + Sync {
    /// Rules registered for `method`, in id order.
    fn find_rules_by_method(&self, method: &str) -> Vec<Rule>;

    /// The rule and its responses in stored order.
    fn rule_with_responses(&self, rule_id: i64) -> Option<RuleWithResponses>;
}

struct StoredRule {
    rule: Rule,
    responses: Vec<MockResponse>,
}

pub struct InMemoryRuleStore {
    rules: DashMap<i64, StoredRule>,
    index: DashMap<(String, i32), i64>,
    next_rule_id: AtomicI64,
    next_response_id: AtomicI64,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            index: DashMap::new(),
            next_rule_id: AtomicI64::new(1),
            next_response_id: AtomicI64::new(1),
        }
    }

    /// Registers `method pattern`. Fails when the same method already has a
    /// rule with the same pattern hash.
    pub fn add_rule(&self, method: &str, pattern: &str) -> Result<Rule, StoreError> {
        let id = self.next_rule_id.fetch_add(1, Ordering::Relaxed);
        let rule = Rule::new(id, method, pattern);

        match self.index.entry((rule.method.clone(), rule.pattern_hash)) {
            Entry::Occupied(_) => {
                return Err(StoreError::DuplicateRule {
                    method: rule.method,
                    pattern: rule.pattern,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        debug!(rule_id = id, method = %rule.method, pattern = %rule.pattern, "Rule added");
        self.rules.insert(
            id,
            StoredRule {
                rule: rule.clone(),
                responses: Vec::new(),
            },
        );
        Ok(rule)
    }

    /// Removes a rule together with all of its responses.
    pub fn remove_rule(&self, rule_id: i64) -> Result<Rule, StoreError> {
        let (_, stored) = self
            .rules
            .remove(&rule_id)
            .ok_or(StoreError::RuleNotFound(rule_id))?;
        self.index
            .remove(&(stored.rule.method.clone(), stored.rule.pattern_hash));
        debug!(
            rule_id,
            responses = stored.responses.len(),
            "Rule removed"
        );
        Ok(stored.rule)
    }

    pub fn rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.iter().map(|entry| entry.rule.clone()).collect();
        rules.sort_by_key(|rule| rule.id);
        rules
    }

    pub fn rule(&self, rule_id: i64) -> Option<Rule> {
        self.rules.get(&rule_id).map(|entry| entry.rule.clone())
    }

    /// Inserts `response` when its id is unset, otherwise replaces the stored
    /// response with that id in place. Returns the response id.
    pub fn save_response(&self, rule_id: i64, mut response: MockResponse) -> Result<i64, StoreError> {
        if !(100..=599).contains(&response.status) {
            return Err(StoreError::InvalidStatus(response.status));
        }

        let mut stored = self
            .rules
            .get_mut(&rule_id)
            .ok_or(StoreError::RuleNotFound(rule_id))?;

        if response.is_default() {
            let existing = stored
                .responses
                .iter()
                .find(|other| other.is_default() && other.id != response.id)
                .and_then(|other| other.id);
            if let Some(existing) = existing {
                return Err(StoreError::MultipleDefaults { rule_id, existing });
            }
        }

        match response.id {
            Some(id) => {
                let slot = stored
                    .responses
                    .iter_mut()
                    .find(|other| other.id == Some(id))
                    .ok_or(StoreError::ResponseNotFound(id))?;
                *slot = response;
                debug!(rule_id, response_id = id, "Response updated");
                Ok(id)
            }
            None => {
                let id = self.next_response_id.fetch_add(1, Ordering::Relaxed);
                response.id = Some(id);
                stored.responses.push(response);
                debug!(rule_id, response_id = id, "Response added");
                Ok(id)
            }
        }
    }

    pub fn response(&self, rule_id: i64, response_id: i64) -> Option<MockResponse> {
        self.rules.get(&rule_id).and_then(|entry| {
            entry
                .responses
                .iter()
                .find(|response| response.id == Some(response_id))
                .cloned()
        })
    }

    pub fn delete_response(&self, response_id: i64) -> Result<(), StoreError> {
        for mut entry in self.rules.iter_mut() {
            let before = entry.responses.len();
            entry
                .responses
                .retain(|response| response.id != Some(response_id));
            if entry.responses.len() != before {
                debug!(rule_id = entry.rule.id, response_id, "Response deleted");
                return Ok(());
            }
        }
        Err(StoreError::ResponseNotFound(response_id))
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn find_rules_by_method(&self, method: &str) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|entry| entry.rule.method.eq_ignore_ascii_case(method))
            .map(|entry| entry.rule.clone())
            .collect();
        rules.sort_by_key(|rule| rule.id);
        rules
    }

    fn rule_with_responses(&self, rule_id: i64) -> Option<RuleWithResponses> {
        self.rules.get(&rule_id).map(|entry| RuleWithResponses {
            rule: entry.rule.clone(),
            responses: entry.responses.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_and_find_by_method() {
        let store = InMemoryRuleStore::new();
        let first = store.add_rule("GET", "/a/*").unwrap();
        store.add_rule("POST", "/a/*").unwrap();
        let third = store.add_rule("get", "/b").unwrap();

        let rules = store.find_rules_by_method("Get");
        assert_eq!(rules.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first.id, third.id]);
        assert!(store.find_rules_by_method("DELETE").is_empty());
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let store = InMemoryRuleStore::new();
        store.add_rule("GET", "/a").unwrap();
        let err = store.add_rule("get", "/a").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRule { .. }));
        assert_eq!(store.rules().len(), 1);
    }

    #[test]
    fn test_remove_rule_cascades_and_frees_pattern() {
        let store = InMemoryRuleStore::new();
        let rule = store.add_rule("GET", "/a").unwrap();
        let response_id = store.save_response(rule.id, MockResponse::new(200)).unwrap();

        store.remove_rule(rule.id).unwrap();
        assert!(store.rule(rule.id).is_none());
        assert!(store.response(rule.id, response_id).is_none());
        assert!(matches!(
            store.delete_response(response_id),
            Err(StoreError::ResponseNotFound(_))
        ));
        assert!(store.add_rule("GET", "/a").is_ok());
    }

    #[test]
    fn test_save_response_insert_then_update_keeps_order() {
        let store = InMemoryRuleStore::new();
        let rule = store.add_rule("GET", "/a").unwrap();
        let first = store
            .save_response(rule.id, MockResponse::new(200).with_when("header.a == 1"))
            .unwrap();
        let second = store.save_response(rule.id, MockResponse::new(404)).unwrap();

        let mut updated = store.response(rule.id, first).unwrap();
        updated.status = 500;
        assert_eq!(store.save_response(rule.id, updated).unwrap(), first);

        let loaded = store.rule_with_responses(rule.id).unwrap();
        assert_eq!(
            loaded.responses.iter().map(|r| (r.id, r.status)).collect::<Vec<_>>(),
            vec![(Some(first), 500), (Some(second), 404)]
        );
    }

    #[test]
    fn test_second_default_rejected() {
        let store = InMemoryRuleStore::new();
        let rule = store.add_rule("GET", "/a").unwrap();
        let default = store.save_response(rule.id, MockResponse::new(200)).unwrap();
        let err = store
            .save_response(rule.id, MockResponse::new(201))
            .unwrap_err();
        assert!(matches!(err, StoreError::MultipleDefaults { existing, .. } if existing == default));

        // Re-saving the default itself is fine.
        let again = store.response(rule.id, default).unwrap();
        assert!(store.save_response(rule.id, again).is_ok());
    }

    #[test]
    fn test_invalid_status_and_unknown_ids() {
        let store = InMemoryRuleStore::new();
        let rule = store.add_rule("GET", "/a").unwrap();
        assert!(matches!(
            store.save_response(rule.id, MockResponse::new(99)),
            Err(StoreError::InvalidStatus(99))
        ));
        assert!(matches!(
            store.save_response(42, MockResponse::new(200)),
            Err(StoreError::RuleNotFound(42))
        ));
        let mut ghost = MockResponse::new(200);
        ghost.id = Some(7);
        assert!(matches!(
            store.save_response(rule.id, ghost),
            Err(StoreError::ResponseNotFound(7))
        ));
        assert!(matches!(store.remove_rule(42), Err(StoreError::RuleNotFound(42))));
    }

    #[test]
    fn test_delete_response() {
        let store = InMemoryRuleStore::new();
        let rule = store.add_rule("GET", "/a").unwrap();
        let id = store.save_response(rule.id, MockResponse::new(200)).unwrap();
        store.delete_response(id).unwrap();
        assert!(store.rule_with_responses(rule.id).unwrap().responses.is_empty());
    }

    #[test]
    fn test_concurrent_add_rule() {
        let store = Arc::new(InMemoryRuleStore::new());
        let mut handles = vec![];

        for i in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    let _ = store.add_rule("GET", &format!("/p{}", (i * 50 + j) % 100));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.rules().len(), 100);
    }
}
