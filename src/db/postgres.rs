use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::models::{
    Alert, AlertKind, Monitor, MonitorChanges, MonitorStatus, MonitorWithCounts, Ping,
};
use super::store::{CasOutcome, MonitorStore, StoreError};

/// Postgres-backed [`MonitorStore`].
///
/// Status commits are single conditional UPDATE statements, so the
/// compare-and-update contract rides on row-level atomicity; no transaction
/// is ever held across an await point.
pub struct PgStore {
    pool: PgPool,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS monitors (
        id UUID PRIMARY KEY,
        slug TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        schedule TEXT,
        grace_period_seconds INTEGER NOT NULL DEFAULT 300,
        status TEXT NOT NULL DEFAULT 'new',
        last_ping TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_monitors_status ON monitors (status)",
    "CREATE TABLE IF NOT EXISTS pings (
        id UUID PRIMARY KEY,
        monitor_id UUID NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
        received_at TIMESTAMPTZ NOT NULL,
        source TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_pings_monitor_time ON pings (monitor_id, received_at DESC)",
    "CREATE TABLE IF NOT EXISTS alerts (
        id UUID PRIMARY KEY,
        monitor_id UUID NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        sent_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_alerts_monitor_time ON alerts (monitor_id, sent_at DESC)",
];

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the tables and indexes this store relies on.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct MonitorRow {
    id: Uuid,
    slug: String,
    name: String,
    email: String,
    schedule: Option<String>,
    grace_period_seconds: i32,
    status: String,
    last_ping: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MonitorRow> for Monitor {
    type Error = StoreError;

    fn try_from(row: MonitorRow) -> Result<Self, Self::Error> {
        let status = MonitorStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "monitor {} carries unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Monitor {
            id: row.id,
            slug: row.slug,
            name: row.name,
            email: row.email,
            schedule: row.schedule,
            grace_period_seconds: row.grace_period_seconds,
            status,
            last_ping: row.last_ping,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MonitorCountsRow {
    #[sqlx(flatten)]
    monitor: MonitorRow,
    ping_count: i64,
    alert_count: i64,
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    monitor_id: Uuid,
    kind: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let kind = AlertKind::parse(&row.kind).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "alert {} carries unknown kind '{}'",
                row.id, row.kind
            ))
        })?;
        Ok(Alert {
            id: row.id,
            monitor_id: row.monitor_id,
            kind,
            sent_at: row.sent_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

#[async_trait]
impl MonitorStore for PgStore {
    async fn create_monitor(&self, monitor: Monitor) -> Result<Monitor, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(
            "INSERT INTO monitors (id, slug, name, email, schedule, grace_period_seconds, status, last_ping, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(monitor.id)
        .bind(&monitor.slug)
        .bind(&monitor.name)
        .bind(&monitor.email)
        .bind(&monitor.schedule)
        .bind(monitor.grace_period_seconds)
        .bind(monitor.status.as_str())
        .bind(monitor.last_ping)
        .bind(monitor.created_at)
        .bind(monitor.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::SlugTaken(monitor.slug.clone())
            } else {
                StoreError::from(e)
            }
        })?;
        row.try_into()
    }

    async fn monitor_by_id(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Monitor::try_from).transpose()
    }

    async fn monitor_by_slug(&self, slug: &str) -> Result<Option<Monitor>, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Monitor::try_from).transpose()
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorWithCounts>, StoreError> {
        let rows = sqlx::query_as::<_, MonitorCountsRow>(
            "SELECT m.*,
                    (SELECT COUNT(*) FROM pings p WHERE p.monitor_id = m.id) AS ping_count,
                    (SELECT COUNT(*) FROM alerts a WHERE a.monitor_id = m.id) AS alert_count
             FROM monitors m
             ORDER BY m.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(MonitorWithCounts {
                    monitor: row.monitor.try_into()?,
                    ping_count: row.ping_count,
                    alert_count: row.alert_count,
                })
            })
            .collect()
    }

    async fn monitors_in_status(
        &self,
        statuses: &[MonitorStatus],
    ) -> Result<Vec<Monitor>, StoreError> {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, MonitorRow>(
            "SELECT * FROM monitors WHERE status = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Monitor::try_from).collect()
    }

    async fn update_monitor(
        &self,
        id: Uuid,
        changes: MonitorChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Monitor>, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(
            "UPDATE monitors SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                schedule = COALESCE($4, schedule),
                grace_period_seconds = COALESCE($5, grace_period_seconds),
                status = COALESCE($6, status),
                updated_at = $7
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.schedule)
        .bind(changes.grace_period_seconds)
        .bind(changes.status.map(|s| s.as_str().to_string()))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Monitor::try_from).transpose()
    }

    async fn compare_and_update_status(
        &self,
        id: Uuid,
        expected_status: MonitorStatus,
        expected_last_ping: Option<DateTime<Utc>>,
        new_status: MonitorStatus,
        new_last_ping: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(
            "UPDATE monitors SET status = $4, last_ping = $5, updated_at = $6
             WHERE id = $1 AND status = $2 AND last_ping IS NOT DISTINCT FROM $3
             RETURNING *",
        )
        .bind(id)
        .bind(expected_status.as_str())
        .bind(expected_last_ping)
        .bind(new_status.as_str())
        .bind(new_last_ping)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(CasOutcome::Updated(row.try_into()?)),
            None => {
                // Nothing matched: either the pre-state moved or the row is gone.
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM monitors WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Ok(CasOutcome::Conflict)
                } else {
                    Ok(CasOutcome::Missing)
                }
            }
        }
    }

    async fn delete_monitor(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM monitors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_ping(&self, ping: Ping) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO pings (id, monitor_id, received_at, source) VALUES ($1, $2, $3, $4)",
        )
        .bind(ping.id)
        .bind(ping.monitor_id)
        .bind(ping.received_at)
        .bind(&ping.source)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::MonitorGone
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(())
    }

    async fn recent_pings(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Ping>, StoreError> {
        let pings = sqlx::query_as::<_, Ping>(
            "SELECT * FROM pings WHERE monitor_id = $1 ORDER BY received_at DESC LIMIT $2",
        )
        .bind(monitor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(pings)
    }

    async fn append_alert(&self, alert: Alert) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO alerts (id, monitor_id, kind, sent_at) VALUES ($1, $2, $3, $4)")
            .bind(alert.id)
            .bind(alert.monitor_id)
            .bind(alert.kind.as_str())
            .bind(alert.sent_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::MonitorGone
                } else {
                    StoreError::from(e)
                }
            })?;
        Ok(())
    }

    async fn recent_alerts(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM alerts WHERE monitor_id = $1 ORDER BY sent_at DESC LIMIT $2",
        )
        .bind(monitor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn latest_alert_of_kind(
        &self,
        monitor_id: Uuid,
        kind: AlertKind,
    ) -> Result<Option<Alert>, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM alerts WHERE monitor_id = $1 AND kind = $2 ORDER BY sent_at DESC LIMIT 1",
        )
        .bind(monitor_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Alert::try_from).transpose()
    }
}
