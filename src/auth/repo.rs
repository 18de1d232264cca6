use crate::auth::repo_types::{NewUser, User};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, age, fname, lname, \
     is_verified, is_logged_in, profile_picture, created_at, updated_at";

/// True when the error is the unique-index violation raised by a duplicate
/// email insert (Postgres SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new unverified user. A duplicate email surfaces as the
    /// underlying unique-violation error, see [`is_unique_violation`].
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, age, fname, lname)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.age)
        .bind(new.fname)
        .bind(new.lname)
        .fetch_one(db)
        .await
    }

    /// Flip the verified flag. Setting it twice is a no-op, not an error.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = TRUE, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Advisory login flag only; token validity never consults it.
    pub async fn set_logged_in(db: &PgPool, id: Uuid, logged_in: bool) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_logged_in = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(logged_in)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        fname: &str,
        lname: &str,
        age: i32,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET fname = $2, lname = $3, age = $4, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(fname)
        .bind(lname)
        .bind(age)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_profile_picture(db: &PgPool, id: Uuid, key: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET profile_picture = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(key)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
