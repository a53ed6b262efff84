//! Gateway model (upstream relays sensors report through)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Row};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: String,
    pub name: String,
    pub region: String,
    pub endpoint: String,
    pub status: String,
    pub enabled: bool,
    #[serde(default)]
    pub latency_ms: Option<u32>,
    /// Operator-defined fields carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Gateway {
    fn new(id: &str, name: &str, region: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            region: region.to_string(),
            endpoint: endpoint.to_string(),
            status: "ACTIVE".to_string(),
            enabled: true,
            latency_ms: None,
            extra: Map::new(),
        }
    }

    /// Merge a partial update over this gateway. The id is never changed.
    pub fn merged(&self, fields: &Map<String, Value>) -> Result<Gateway, serde_json::Error> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in fields {
            if key != "id" {
                current.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(Value::Object(current))
    }
}

/// Relays present on a fresh install
pub fn default_gateways() -> Vec<Gateway> {
    vec![
        Gateway::new("gw-us-east", "US-East Relay", "us-east-1", "https://us-east.relay.sentinel.local"),
        Gateway::new("gw-eu-west", "EU-West Relay", "eu-west-1", "https://eu-west.relay.sentinel.local"),
        Gateway::new("gw-ap-south", "AP-South Relay", "ap-south-1", "https://ap-south.relay.sentinel.local"),
    ]
}

/// Partial update: `{ id, ...fields }`
#[derive(Debug, Deserialize)]
pub struct UpdateGatewayRequest {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Gateway {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query("SELECT data FROM gateways ORDER BY id")
            .fetch_all(pool)
            .await?;

        rows.into_iter()
            .map(|r| r.try_get::<Json<Gateway>, _>("data").map(|j| j.0))
            .collect()
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query("SELECT data FROM gateways WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(|r| r.try_get::<Json<Gateway>, _>("data").map(|j| j.0)).transpose()
    }

    pub async fn save(pool: &PgPool, gateway: &Gateway) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO gateways (id, data, updated_at) VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#
        )
        .bind(&gateway.id)
        .bind(Json(gateway))
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn seed_defaults(pool: &PgPool) -> Result<(), sqlx::Error> {
        for gateway in default_gateways() {
            sqlx::query("INSERT INTO gateways (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
                .bind(&gateway.id)
                .bind(Json(&gateway))
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}
