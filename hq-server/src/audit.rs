//! Audit ledger writer
//!
//! Every administrative action is appended with a SHA-256 hash over the
//! canonical entry and the previous entry's hash, so tampering with any row
//! breaks every hash after it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{AuditLogEntry, Severity};
use crate::store::{SharedStore, StoreResult};

/// Previous hash used for the first entry of the ledger
pub const GENESIS_HASH: &str = "GENESIS_BLOCK_INIT";

/// Who performed an administrative action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Field order here is the hashing order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalEntry<'a> {
    prev_hash: &'a str,
    actor_id: &'a str,
    action: &'a str,
    target_resource: &'a str,
    details: &'a serde_json::Value,
    timestamp: String,
}

pub fn chain_hash(
    prev_hash: &str,
    actor_id: &str,
    action: &str,
    target_resource: &str,
    details: &serde_json::Value,
    timestamp: DateTime<Utc>,
) -> String {
    let canonical = CanonicalEntry {
        prev_hash,
        actor_id,
        action,
        target_resource,
        details,
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let payload = serde_json::to_vec(&canonical).unwrap_or_default();
    format!("{:x}", Sha256::digest(&payload))
}

/// Walk entries oldest first and confirm each hash links to its predecessor
pub fn verify_chain(entries_oldest_first: &[AuditLogEntry]) -> bool {
    let mut prev = GENESIS_HASH.to_string();
    for entry in entries_oldest_first {
        let expected = chain_hash(
            &prev,
            &entry.actor_id,
            &entry.action,
            &entry.target_resource,
            &entry.details,
            entry.timestamp,
        );
        if expected != entry.hash {
            return false;
        }
        prev = entry.hash.clone();
    }
    true
}

/// An action waiting for its place in the ledger. The store seals it onto
/// the current tail inside a single write, so concurrent appends never
/// share a previous hash.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub target_resource: String,
    pub details: serde_json::Value,
    pub severity: Severity,
}

impl NewAuditEntry {
    /// Stamp and hash the entry onto `prev_hash`; `None` means an empty ledger
    pub fn seal(self, prev_hash: Option<&str>) -> AuditLogEntry {
        let timestamp = Utc::now();
        let hash = chain_hash(
            prev_hash.unwrap_or(GENESIS_HASH),
            &self.actor_id,
            &self.action,
            &self.target_resource,
            &self.details,
            timestamp,
        );

        AuditLogEntry {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            action: self.action,
            target_resource: self.target_resource,
            details: self.details,
            severity: self.severity,
            hash,
            timestamp,
        }
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    store: SharedStore,
}

impl AuditLogger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Append an action to the ledger and return the stored entry
    pub async fn log_audit_action(
        &self,
        actor: &Actor,
        action: &str,
        target_resource: &str,
        details: Option<serde_json::Value>,
        severity: Severity,
    ) -> StoreResult<AuditLogEntry> {
        let details = match details {
            Some(serde_json::Value::Null) | None => serde_json::json!({}),
            Some(v) => v,
        };

        let entry = self
            .store
            .append_audit(NewAuditEntry {
                actor_id: actor.id.clone(),
                actor_name: actor.name.clone(),
                action: action.to_string(),
                target_resource: target_resource.to_string(),
                details,
                severity,
            })
            .await?;

        tracing::info!(
            actor = %actor.id,
            action,
            target = target_resource,
            severity = severity.as_str(),
            "Audit entry recorded"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn entries_chain_from_genesis() {
        let store = Arc::new(MemoryStore::new());
        let logger = AuditLogger::new(store.clone());
        let actor = Actor::new("SYS_ADMIN", "ANALYST_01");

        let first = logger
            .log_audit_action(&actor, "COMMAND_ISOLATE", "sensor:S1", Some(json!("enable")), Severity::Critical)
            .await
            .unwrap();
        let second = logger
            .log_audit_action(&actor, "POLICY_UPDATE", "policy:*", None, Severity::Info)
            .await
            .unwrap();

        assert_eq!(
            first.hash,
            chain_hash(GENESIS_HASH, "SYS_ADMIN", "COMMAND_ISOLATE", "sensor:S1", &json!("enable"), first.timestamp)
        );
        assert_eq!(second.details, json!({}));

        let mut ledger = store.get_audit_logs().await.unwrap();
        ledger.reverse();
        assert_eq!(ledger.len(), 2);
        assert!(verify_chain(&ledger));

        ledger[0].target_resource = "sensor:S2".to_string();
        assert!(!verify_chain(&ledger));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_keep_one_chain() {
        let store = Arc::new(MemoryStore::new());
        let logger = AuditLogger::new(store.clone());
        let actor = Actor::new("SYS_ADMIN", "ANALYST_01");

        let writers: Vec<_> = (0..50)
            .map(|i| {
                let logger = logger.clone();
                let actor = actor.clone();
                tokio::spawn(async move {
                    logger
                        .log_audit_action(&actor, "COMMAND_ISOLATE", &format!("sensor:S{}", i), None, Severity::Critical)
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let mut ledger = store.get_audit_logs().await.unwrap();
        ledger.reverse();
        assert_eq!(ledger.len(), 50);
        assert!(verify_chain(&ledger));
    }
}
