use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::token_digest;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;
use crate::domain::user::models::UserId;

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_digest, created_at, expires_at, \
     last_used_at, user_agent, ip_address, active";

/// Session store on PostgreSQL.
///
/// Rotation is a single conditional `UPDATE`, so concurrent rotations of one
/// session are linearized by the row lock.
pub struct PostgresSessionStore {
    pool: PgPool,
    ttl: Duration,
    retention: Duration,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool, ttl: Duration, retention: Duration) -> Self {
        Self {
            pool,
            ttl,
            retention,
        }
    }
}

#[derive(Debug, FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    refresh_token_digest: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    active: bool,
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        Session {
            id: SessionId(r.id),
            user_id: UserId(r.user_id),
            refresh_token_digest: r.refresh_token_digest,
            created_at: r.created_at,
            expires_at: r.expires_at,
            last_used_at: r.last_used_at,
            user_agent: r.user_agent,
            ip_address: r.ip_address,
            active: r.active,
        }
    }
}

fn query_error(operation: &'static str, e: sqlx::Error) -> SessionError {
    match e {
        sqlx::Error::PoolTimedOut => SessionError::Timeout(operation),
        other => SessionError::Database(other.to_string()),
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, new_session: NewSession) -> Result<Session, SessionError> {
        let session = Session::start(new_session, self.ttl, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_digest, created_at, expires_at,
                                  last_used_at, user_agent, ip_address, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id.0)
        .bind(session.user_id.0)
        .bind(&session.refresh_token_digest)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_used_at)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.active)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("create", e))?;

        Ok(session)
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, SessionError> {
        let sql = format!(
            "SELECT {} FROM sessions \
             WHERE refresh_token_digest = $1 AND active AND expires_at > $2",
            SESSION_COLUMNS
        );

        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(token_digest(refresh_token))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("find_by_refresh_token", e))?;

        Ok(record.map(Session::from))
    }

    async fn rotate(
        &self,
        id: &SessionId,
        current: &str,
        replacement: &str,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let sql = format!(
            "UPDATE sessions SET refresh_token_digest = $3, last_used_at = $4 \
             WHERE id = $1 AND refresh_token_digest = $2 AND active AND expires_at > $4 \
             RETURNING {}",
            SESSION_COLUMNS
        );

        let rotated = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(id.0)
            .bind(token_digest(current))
            .bind(token_digest(replacement))
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("rotate", e))?;

        if let Some(record) = rotated {
            return Ok(record.into());
        }

        // Nothing matched: tell a lost race apart from a session that is gone.
        let still_usable: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM sessions WHERE id = $1 AND active AND expires_at > $2",
        )
        .bind(id.0)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("rotate", e))?;

        match still_usable {
            Some(_) => Err(SessionError::Stale(id.to_string())),
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn invalidate(&self, id: &SessionId) -> Result<bool, SessionError> {
        let result = sqlx::query("UPDATE sessions SET active = FALSE WHERE id = $1 AND active")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("invalidate", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn invalidate_all_for_user(&self, user_id: &UserId) -> Result<u64, SessionError> {
        let result =
            sqlx::query("UPDATE sessions SET active = FALSE WHERE user_id = $1 AND active")
                .bind(user_id.0)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("invalidate_all_for_user", e))?;

        Ok(result.rows_affected())
    }

    async fn list_active_for_user(&self, user_id: &UserId) -> Result<Vec<Session>, SessionError> {
        let sql = format!(
            "SELECT {} FROM sessions \
             WHERE user_id = $1 AND active AND expires_at > $2 \
             ORDER BY created_at ASC",
            SESSION_COLUMNS
        );

        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(user_id.0)
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("list_active_for_user", e))?;

        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let expired =
            sqlx::query("UPDATE sessions SET active = FALSE WHERE active AND expires_at <= $1")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("sweep_expired", e))?;

        let deleted = sqlx::query("DELETE FROM sessions WHERE NOT active AND expires_at <= $1")
            .bind(now - self.retention)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("sweep_expired", e))?;

        Ok(expired.rows_affected() + deleted.rows_affected())
    }
}
