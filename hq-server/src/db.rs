//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Multi-statement script, so use the simple query protocol
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Sensors (endpoints reporting heartbeats)
CREATE TABLE IF NOT EXISTS sensors (
    id VARCHAR(255) PRIMARY KEY,
    hostname VARCHAR(255) NOT NULL UNIQUE,
    ip_address VARCHAR(45),
    last_seen BIGINT NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'ONLINE',
    version VARCHAR(50) NOT NULL DEFAULT '1.0.0'
);

-- Alerts (telemetry events from sensors)
CREATE TABLE IF NOT EXISTS alerts (
    id VARCHAR(255) PRIMARY KEY,
    sensor_id VARCHAR(255) NOT NULL,
    event_type VARCHAR(100) NOT NULL,
    timestamp BIGINT NOT NULL,
    hostname VARCHAR(255),
    payload JSONB,
    metadata JSONB
);

-- Policies (DLP rules, replaced as a set)
CREATE TABLE IF NOT EXISTS policies (
    id VARCHAR(255) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    category VARCHAR(255),
    pattern TEXT NOT NULL,
    action VARCHAR(20) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    position INT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Command queue (drained by sensor heartbeats)
CREATE TABLE IF NOT EXISTS commands (
    id UUID PRIMARY KEY,
    sensor_id VARCHAR(255) NOT NULL,
    command_type VARCHAR(100) NOT NULL,
    payload JSONB,
    queued_at BIGINT NOT NULL
);

-- Audit ledger (hash chained)
CREATE TABLE IF NOT EXISTS audit_log (
    id UUID PRIMARY KEY,
    actor_id VARCHAR(255) NOT NULL,
    actor_name VARCHAR(255) NOT NULL,
    action VARCHAR(255) NOT NULL,
    target_resource VARCHAR(255) NOT NULL,
    details JSONB NOT NULL DEFAULT '{}',
    severity VARCHAR(20) NOT NULL,
    hash VARCHAR(64) NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL
);

-- System log buffer
CREATE TABLE IF NOT EXISTS system_logs (
    id BIGSERIAL PRIMARY KEY,
    log_type VARCHAR(20) NOT NULL,
    component VARCHAR(100) NOT NULL,
    message TEXT NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Application inventory
CREATE TABLE IF NOT EXISTS applications (
    id VARCHAR(255) PRIMARY KEY,
    data JSONB NOT NULL
);

-- Gateways
CREATE TABLE IF NOT EXISTS gateways (
    id VARCHAR(255) PRIMARY KEY,
    data JSONB NOT NULL,
    updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Engine settings
CREATE TABLE IF NOT EXISTS system_config (
    key VARCHAR(255) PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);
CREATE INDEX IF NOT EXISTS idx_alerts_type ON alerts(event_type);
CREATE INDEX IF NOT EXISTS idx_sensors_last_seen ON sensors(last_seen);
CREATE INDEX IF NOT EXISTS idx_commands_sensor ON commands(sensor_id);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
CREATE INDEX IF NOT EXISTS idx_system_logs_timestamp ON system_logs(timestamp);
"#;
