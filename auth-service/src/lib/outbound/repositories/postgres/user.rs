use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::errors::DirectoryError;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileRefresh;
use crate::domain::user::models::ProviderLink;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserDirectory;

const USER_COLUMNS: &str = "id, email, name, role, provider, provider_id, avatar_url, \
     email_verified, active, password_hash, created_at, updated_at, last_login_at";

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        operation: &'static str,
        condition: &str,
        binds: &[&str],
    ) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let mut query = sqlx::query_as::<_, UserRecord>(&sql);
        for value in binds {
            query = query.bind(*value);
        }

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error(operation, e))?
            .map(User::try_from)
            .transpose()
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    provider: String,
    provider_id: Option<String>,
    avatar_url: Option<String>,
    email_verified: bool,
    active: bool,
    password_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRecord> for User {
    type Error = DirectoryError;

    fn try_from(r: UserRecord) -> Result<Self, Self::Error> {
        let invalid = |e: &dyn std::fmt::Display| {
            DirectoryError::InvalidRecord(format!("user {}: {}", r.id, e))
        };

        Ok(User {
            id: UserId(r.id),
            email: EmailAddress::new(r.email.clone()).map_err(|e| invalid(&e))?,
            name: DisplayName::new(r.name.clone()).map_err(|e| invalid(&e))?,
            role: Role::from_str(&r.role).map_err(|e| invalid(&e))?,
            provider: AuthProvider::from_stored(&r.provider).map_err(|e| invalid(&e))?,
            provider_id: r.provider_id,
            avatar_url: r.avatar_url,
            email_verified: r.email_verified,
            active: r.active,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
            last_login_at: r.last_login_at,
        })
    }
}

fn query_error(operation: &'static str, e: sqlx::Error) -> DirectoryError {
    match e {
        sqlx::Error::PoolTimedOut => DirectoryError::Timeout(operation),
        other => DirectoryError::Database(other.to_string()),
    }
}

/// Name of the unique constraint `e` violated, if any.
fn violated_constraint(e: &sqlx::Error) -> Option<&str> {
    e.as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .and_then(|db_err| db_err.constraint())
}

/// Translate uniqueness violations into the directory's conflict errors.
fn write_error(operation: &'static str, user: &User, e: sqlx::Error) -> DirectoryError {
    let conflict = match violated_constraint(&e) {
        Some("users_email_key") => Some(DirectoryError::EmailTaken(user.email.to_string())),
        Some("users_provider_identity_key") => Some(DirectoryError::ProviderIdentityTaken {
            provider: user.provider.to_string(),
            provider_id: user.provider_id.clone().unwrap_or_default(),
        }),
        _ => None,
    };
    conflict.unwrap_or_else(|| query_error(operation, e))
}

fn link_error(link: &ProviderLink, e: sqlx::Error) -> DirectoryError {
    if violated_constraint(&e) == Some("users_provider_identity_key") {
        return DirectoryError::ProviderIdentityTaken {
            provider: link.provider.to_string(),
            provider_id: link.provider_id.clone(),
        };
    }
    query_error("link_provider", e)
}

fn updated(id: &UserId, record: Option<UserRecord>) -> Result<User, DirectoryError> {
    record
        .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
        .and_then(User::try_from)
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, DirectoryError> {
        self.fetch_one_where("find_by_email", "email = $1", &[email.as_str()])
            .await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("find_by_id", e))?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_provider(
        &self,
        provider: &AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError> {
        self.fetch_one_where(
            "find_by_provider",
            "provider = $1 AND provider_id = $2",
            &[provider.as_str(), provider_id],
        )
        .await
    }

    async fn create(&self, user: User) -> Result<User, DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, provider, provider_id, avatar_url,
                               email_verified, active, password_hash, created_at, updated_at,
                               last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(user.name.as_str())
        .bind(user.role.as_str())
        .bind(user.provider.as_str())
        .bind(&user.provider_id)
        .bind(&user.avatar_url)
        .bind(user.email_verified)
        .bind(user.active)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("create", &user, e))?;

        Ok(user)
    }

    async fn record_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DirectoryError> {
        let sql = format!(
            "UPDATE users SET last_login_at = $2, updated_at = $2 \
             WHERE id = $1 AND active RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.0)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("record_login", e))?
            .map(User::try_from)
            .transpose()
    }

    async fn link_provider(
        &self,
        id: &UserId,
        link: &ProviderLink,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        let sql = format!(
            "UPDATE users SET provider = $2, provider_id = $3, email_verified = TRUE, \
             avatar_url = COALESCE(avatar_url, $4), updated_at = $5 \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.0)
            .bind(link.provider.as_str())
            .bind(&link.provider_id)
            .bind(&link.avatar_url)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| link_error(link, e))?;

        updated(id, record)
    }

    async fn update_profile(
        &self,
        id: &UserId,
        refresh: &ProfileRefresh,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        let sql = format!(
            "UPDATE users SET name = $2, avatar_url = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.0)
            .bind(refresh.name.as_str())
            .bind(&refresh.avatar_url)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("update_profile", e))?;

        updated(id, record)
    }

    async fn set_active(
        &self,
        id: &UserId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        let sql = format!(
            "UPDATE users SET active = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.0)
            .bind(active)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("set_active", e))?;

        updated(id, record)
    }
}
