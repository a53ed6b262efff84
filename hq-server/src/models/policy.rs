//! Policy model (DLP rules distributed to sensors)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// Version reported when no policies exist
pub const EMPTY_POLICY_VERSION: &str = "v0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyAction {
    Block,
    LogOnly,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Block => "BLOCK",
            PolicyAction::LogOnly => "LOG_ONLY",
        }
    }
}

impl FromStr for PolicyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLOCK" => Ok(PolicyAction::Block),
            "LOG_ONLY" => Ok(PolicyAction::LogOnly),
            other => Err(format!("unknown policy action: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Regular expression matched against monitored content
    pub pattern: String,
    pub action: PolicyAction,
    #[serde(default)]
    pub description: String,
}

impl PolicyRule {
    fn new(id: &str, name: &str, pattern: &str, action: PolicyAction, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: None,
            pattern: pattern.to_string(),
            action,
            description: description.to_string(),
        }
    }
}

/// Rules seeded into an empty policy set
pub fn default_policies() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(
            "1",
            "AWS_ACCESS_KEY",
            r"AKIA[0-9A-Z]{16}",
            PolicyAction::Block,
            "Blocks AWS IAM Access Keys",
        ),
        PolicyRule::new(
            "2",
            "JWT_TOKEN",
            r"eyJ[a-zA-Z0-9_\-\.]+\.[a-zA-Z0-9_\-\.]+\.[a-zA-Z0-9_\-\.]+",
            PolicyAction::Block,
            "Blocks JSON Web Tokens",
        ),
        PolicyRule::new(
            "3",
            "EMAIL_ADDRESS",
            r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
            PolicyAction::LogOnly,
            "Logs PII (Email)",
        ),
        PolicyRule::new(
            "4",
            "INTERNAL_KEYWORD",
            r"(CONFIDENTIAL|SECRET|PROPRIETARY)",
            PolicyAction::Block,
            "Blocks Corporate Classifications",
        ),
    ]
}

/// Short content hash sensors use to skip unchanged policy downloads
pub fn policy_version(policies: &[PolicyRule]) -> String {
    if policies.is_empty() {
        return EMPTY_POLICY_VERSION.to_string();
    }

    let canonical = serde_json::to_vec(policies).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    let hex = format!("{:x}", digest);
    hex[..8].to_string()
}

impl PolicyRule {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, category, pattern, action, description FROM policies ORDER BY position, id"
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let action: String = r.try_get("action")?;
                Ok(PolicyRule {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    category: r.try_get("category")?,
                    pattern: r.try_get("pattern")?,
                    action: action.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
                    description: r.try_get("description")?,
                })
            })
            .collect()
    }

    /// Replace the whole policy set in one transaction
    pub async fn replace_all(pool: &PgPool, policies: &[PolicyRule]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM policies").execute(&mut *tx).await?;

        for (position, policy) in policies.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO policies (id, name, category, pattern, action, description, position, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
                "#
            )
            .bind(&policy.id)
            .bind(&policy.name)
            .bind(&policy.category)
            .bind(&policy.pattern)
            .bind(policy.action.as_str())
            .bind(&policy.description)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM policies")
            .fetch_one(pool)
            .await?;
        row.try_get("count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_set_has_v0() {
        assert_eq!(policy_version(&[]), EMPTY_POLICY_VERSION);
    }

    #[test]
    fn version_tracks_content() {
        let mut policies = default_policies();
        let before = policy_version(&policies);
        assert_eq!(before.len(), 8);
        assert_eq!(before, policy_version(&default_policies()));

        policies[0].action = PolicyAction::LogOnly;
        assert_ne!(before, policy_version(&policies));
    }

    #[test]
    fn action_wire_format() {
        let rule: PolicyRule = serde_json::from_value(json!({
            "id": "edm-2",
            "name": "Employee Masterfile EDM",
            "category": "EDM & IDM",
            "pattern": "\\b\\d{3}-\\d{2}-\\d{4}\\b",
            "action": "LOG_ONLY",
            "description": "Prevents SSN leakage"
        }))
        .unwrap();

        assert_eq!(rule.action, PolicyAction::LogOnly);
        assert_eq!(serde_json::to_value(&rule).unwrap()["action"], "LOG_ONLY");
        assert!("ALLOW".parse::<PolicyAction>().is_err());
    }
}
