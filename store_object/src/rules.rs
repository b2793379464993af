//! Application rules consulted before a delete
//!
//! A failing rule set aborts the delete without an error: the store reports
//! `false` and leaves the entity untouched.

use crate::entity::Entity;
use crate::options::DeleteOptions;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSet {
    Create,
    Update,
    Delete,
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSet::Create => write!(f, "create"),
            RuleSet::Update => write!(f, "update"),
            RuleSet::Delete => write!(f, "delete"),
        }
    }
}

#[async_trait]
pub trait RuleChecker: Send + Sync {
    async fn check(
        &self,
        entity: &dyn Entity,
        rule_set: RuleSet,
        options: &DeleteOptions,
    ) -> anyhow::Result<bool>;
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl RuleChecker for AllowAll {
    async fn check(&self, _: &dyn Entity, _: RuleSet, _: &DeleteOptions) -> anyhow::Result<bool> {
        Ok(true)
    }
}

type Rule = Arc<dyn Fn(&dyn Entity, &DeleteOptions) -> anyhow::Result<bool> + Send + Sync>;

/// Named rules grouped by rule set; a rule set passes when every rule passes
#[derive(Default)]
pub struct RulesChecker {
    rules: RwLock<HashMap<RuleSet, Vec<(String, Rule)>>>,
}

impl fmt::Debug for RulesChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesChecker")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl RulesChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, rule_set: RuleSet, name: &str, rule: F)
    where
        F: Fn(&dyn Entity, &DeleteOptions) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        if let Ok(mut rules) = self.rules.write() {
            rules
                .entry(rule_set)
                .or_default()
                .push((name.to_string(), Arc::new(rule)));
        }
    }

    /// Remove a rule by name, returns whether one was removed
    pub fn remove(&self, rule_set: RuleSet, name: &str) -> bool {
        let Ok(mut rules) = self.rules.write() else {
            return false;
        };
        let Some(list) = rules.get_mut(&rule_set) else {
            return false;
        };
        let before = list.len();
        list.retain(|(rule_name, _)| rule_name != name);
        list.len() != before
    }

    fn rule_names(&self) -> Vec<String> {
        self.rules
            .read()
            .map(|rules| {
                rules
                    .iter()
                    .flat_map(|(set, list)| list.iter().map(move |(name, _)| format!("{set}:{name}")))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl RuleChecker for RulesChecker {
    async fn check(
        &self,
        entity: &dyn Entity,
        rule_set: RuleSet,
        options: &DeleteOptions,
    ) -> anyhow::Result<bool> {
        let rules: Vec<(String, Rule)> = self
            .rules
            .read()
            .map_err(|_| anyhow::anyhow!("rules lock poisoned"))?
            .get(&rule_set)
            .cloned()
            .unwrap_or_default();

        for (name, rule) in rules {
            if !rule(entity, options)? {
                tracing::debug!(rule = %name, %rule_set, "Rule rejected entity");
                return Ok(false);
            }
        }
        Ok(true)
    }
}
