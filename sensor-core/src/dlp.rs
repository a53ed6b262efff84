//! Content inspection
//!
//! Checks a piece of content (typically the clipboard) against the policies
//! synced from HQ. Patterns match case-insensitively and the first matching
//! policy wins. A pattern that does not compile is skipped.

use regex::{Regex, RegexBuilder};
use serde_json::json;

use crate::client::PolicyRule;

pub const CLIPBOARD_BLOCK: &str = "CLIPBOARD_BLOCK";
pub const CLIPBOARD_LOG: &str = "CLIPBOARD_LOG";

/// Characters of blocked content kept in the alert
const SNIPPET_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlpAction {
    /// Clear the content and report it
    Block,
    /// Report only
    LogOnly,
}

impl DlpAction {
    /// Anything other than `BLOCK` only logs
    pub fn from_policy(action: &str) -> Self {
        if action == "BLOCK" {
            DlpAction::Block
        } else {
            DlpAction::LogOnly
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlpMatch {
    pub policy_id: String,
    pub policy_name: String,
    pub action: DlpAction,
}

impl DlpMatch {
    pub fn event_type(&self) -> &'static str {
        match self.action {
            DlpAction::Block => CLIPBOARD_BLOCK,
            DlpAction::LogOnly => CLIPBOARD_LOG,
        }
    }

    /// Alert metadata; only blocks carry a snippet of the content
    pub fn alert_metadata(&self, content: &str, host: &str) -> serde_json::Value {
        match self.action {
            DlpAction::Block => json!({
                "policyId": self.policy_id,
                "policyName": self.policy_name,
                "contentSnippet": content_snippet(content),
                "host": host,
            }),
            DlpAction::LogOnly => json!({
                "policyId": self.policy_id,
                "policyName": self.policy_name,
                "host": host,
            }),
        }
    }
}

pub fn content_snippet(content: &str) -> String {
    let head: String = content.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", head)
}

#[derive(Debug, Clone)]
struct CompiledPolicy {
    id: String,
    name: String,
    action: DlpAction,
    regex: Regex,
}

/// Policies compiled once per sync, in HQ order
#[derive(Debug, Clone, Default)]
pub struct PolicyMatcher {
    policies: Vec<CompiledPolicy>,
}

impl PolicyMatcher {
    pub fn compile(rules: &[PolicyRule]) -> Self {
        let policies = rules
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(CompiledPolicy {
                        id: rule.id.clone(),
                        name: rule.name.clone(),
                        action: DlpAction::from_policy(&rule.action),
                        regex,
                    }),
                    Err(e) => {
                        log::error!("Invalid regex for policy {}: {}", rule.name, e);
                        None
                    }
                }
            })
            .collect();

        Self { policies }
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn evaluate(&self, content: &str) -> Option<DlpMatch> {
        self.policies
            .iter()
            .find(|p| p.regex.is_match(content))
            .map(|p| DlpMatch {
                policy_id: p.id.clone(),
                policy_name: p.name.clone(),
                action: p.action,
            })
    }
}
