//! Schema bootstrap for the authentication tables

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::credentials::CredentialStore;
use crate::error::{AuthError, StoreError, StoreResult};
use crate::models::{NewUser, Role};

/// Username of the account seeded by [`seed_admin`]
pub const BOOTSTRAP_ADMIN: &str = "admin";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(32) NOT NULL,
        password_hash TEXT NOT NULL,
        role VARCHAR(32) NOT NULL CHECK (role IN (
            'student', 'teacher', 'system_admin', 'registrar_officer', 'transcript_officer'
        )),
        full_name VARCHAR(100) NOT NULL,
        email VARCHAR(254) UNIQUE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_login TIMESTAMPTZ,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username_lower_idx ON users (LOWER(username))",
    r#"
    CREATE TABLE IF NOT EXISTS login_attempts (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        ip_address TEXT NOT NULL,
        success BOOLEAN NOT NULL,
        attempted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS login_attempts_lookup_idx ON login_attempts (LOWER(username), attempted_at)",
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
        action VARCHAR(64) NOT NULL,
        entity_type VARCHAR(64),
        entity_id BIGINT,
        details TEXT,
        ip_address TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS audit_logs_created_idx ON audit_logs (created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS user_sessions (
        session_id VARCHAR(128) PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role VARCHAR(32) NOT NULL,
        csrf_token VARCHAR(128) NOT NULL,
        ip_address TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        last_activity TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS user_sessions_user_idx ON user_sessions (user_id)",
    "CREATE INDEX IF NOT EXISTS user_sessions_activity_idx ON user_sessions (last_activity)",
    // Client-supplied values must never be rejected by a column width, or the
    // attempt log silently stops counting. Widens tables from older releases.
    "ALTER TABLE login_attempts ALTER COLUMN username TYPE TEXT",
    "ALTER TABLE login_attempts ALTER COLUMN ip_address TYPE TEXT",
    "ALTER TABLE audit_logs ALTER COLUMN ip_address TYPE TEXT",
    "ALTER TABLE user_sessions ALTER COLUMN ip_address TYPE TEXT",
];

/// Create the authentication tables if they are missing
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    info!("Ensuring authentication schema");

    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Create the bootstrap administrator unless an account with that name exists
///
/// Returns whether an account was created.
pub async fn seed_admin(credentials: &CredentialStore, password: &str) -> Result<bool, AuthError> {
    if credentials
        .find_by_username(BOOTSTRAP_ADMIN)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let digest = credentials.hash_password(password)?;
    let admin = NewUser {
        username: BOOTSTRAP_ADMIN.to_string(),
        password_digest: digest,
        role: Role::SystemAdmin,
        full_name: "System Administrator".to_string(),
        email: None,
    };

    match credentials.users().create(&admin, Utc::now()).await {
        Ok(user) => {
            info!("Seeded bootstrap administrator (id {})", user.id);
            Ok(true)
        }
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
