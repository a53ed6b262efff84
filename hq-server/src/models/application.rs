//! Application inventory model (discovered SaaS apps)

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppType {
    Sanctioned,
    Unsanctioned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub instance: String,
    #[serde(rename = "type")]
    pub app_type: AppType,
    pub users: i64,
    /// Cloud confidence index, 0-100
    pub cci: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

#[allow(clippy::too_many_arguments)]
fn app(
    id: &str,
    name: &str,
    vendor: &str,
    instance: &str,
    app_type: AppType,
    users: i64,
    cci: i64,
    certs: &[&str],
    risk: Option<&str>,
) -> Application {
    Application {
        id: id.to_string(),
        name: name.to_string(),
        vendor: vendor.to_string(),
        instance: instance.to_string(),
        app_type,
        users,
        cci,
        certs: certs.iter().map(|c| c.to_string()).collect(),
        risk: risk.map(str::to_string),
    }
}

/// Inventory seeded into an empty store
pub fn initial_apps() -> Vec<Application> {
    vec![
        app("APP-001", "Google Workspace", "Google LLC", "sentinel-corp.google.com",
            AppType::Sanctioned, 142, 98, &["SOC2", "ISO27001"], None),
        app("APP-002", "Slack (Corporate)", "Salesforce", "sentinel-team.slack.com",
            AppType::Sanctioned, 138, 92, &["SOC2"], None),
        app("APP-003", "Dropbox (Personal)", "Dropbox Inc", "personal-box",
            AppType::Unsanctioned, 3, 45, &[], Some("Exfiltration Risk")),
        app("APP-004", "ChatGPT Enterprise", "OpenAI", "sentinel.openai.com",
            AppType::Sanctioned, 56, 85, &["SOC2"], None),
        app("APP-005", "WeTransfer", "WeTransfer BV", "public-web",
            AppType::Unsanctioned, 1, 30, &[], Some("No Encryption")),
    ]
}

impl Application {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query("SELECT data FROM applications ORDER BY id")
            .fetch_all(pool)
            .await?;

        rows.into_iter()
            .map(|r| r.try_get::<Json<Application>, _>("data").map(|j| j.0))
            .collect()
    }

    /// Insert the initial inventory when the table is empty
    pub async fn seed_if_empty(pool: &PgPool) -> Result<(), sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM applications")
            .fetch_one(pool)
            .await?;
        if row.try_get::<i64, _>("count")? > 0 {
            return Ok(());
        }

        let mut tx = pool.begin().await?;
        for app in initial_apps() {
            sqlx::query("INSERT INTO applications (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
                .bind(&app.id)
                .bind(Json(&app))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!("Seeded initial application inventory");
        Ok(())
    }
}
