//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::common::{now_timestamp, Status};
use crate::DbPool;

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, firebase_uid, photo_url, role, \
     status, created_at, last_login";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub firebase_uid: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active.as_str()
    }

    /// Admin area access requires both the role and an active account.
    pub fn is_active_admin(&self) -> bool {
        self.is_admin() && self.is_active()
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            photo_url: user.photo_url,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Fields for inserting a new account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub firebase_uid: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Posted by the browser after a Firebase Google sign-in.
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    /// Firebase ID token from `user.getIdToken()`
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Normalise an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub async fn find_by_email(db: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(normalize_email(email))
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &DbPool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// All accounts, newest first.
    pub async fn list(db: &DbPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn list_admins(db: &DbPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'admin' ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &DbPool, new: NewUser) -> Result<User, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash, firebase_uid, photo_url,
                               role, status, created_at, last_login)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&id)
        .bind(new.name.trim())
        .bind(normalize_email(&new.email))
        .bind(new.phone.filter(|p| !p.trim().is_empty()))
        .bind(new.password_hash)
        .bind(new.firebase_uid)
        .bind(new.photo_url)
        .bind(new.role.as_str())
        .bind(new.status.as_str())
        .bind(&now)
        .execute(db)
        .await?;

        User::find_by_id(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Update profile fields. Returns `false` if the user does not exist.
    pub async fn update_profile(
        db: &DbPool,
        id: &str,
        name: &str,
        email: &str,
        phone: Option<&str>,
        status: Status,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, phone = ?, status = ? WHERE id = ?",
        )
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(phone.map(str::trim).filter(|p| !p.is_empty()))
        .bind(status.as_str())
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(db: &DbPool, id: &str, status: Status) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_role(db: &DbPool, id: &str, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a sign-in; attaches the Firebase UID and photo when they were not known yet.
    pub async fn touch_login(
        db: &DbPool,
        id: &str,
        firebase_uid: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login = ?,
                firebase_uid = COALESCE(firebase_uid, ?),
                photo_url = COALESCE(photo_url, ?)
            WHERE id = ?
            "#,
        )
        .bind(now_timestamp())
        .bind(firebase_uid)
        .bind(photo_url)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Delete the account and its sessions.
    pub async fn delete(db: &DbPool, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Session {
    pub async fn create(
        db: &DbPool,
        user_id: &str,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<Session, sqlx::Error> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: token_hash.to_string(),
            expires_at: expires_at.to_string(),
            created_at: now_timestamp(),
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(&session.expires_at)
        .bind(&session.created_at)
        .execute(db)
        .await?;

        Ok(session)
    }

    /// Look up an unexpired session by token hash.
    pub async fn find_valid(db: &DbPool, token_hash: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_id, token_hash, expires_at, created_at FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(now_timestamp())
        .fetch_optional(db)
        .await
    }

    pub async fn delete_by_token_hash(db: &DbPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_user(db: &DbPool, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove expired sessions; returns the number deleted.
    pub async fn purge_expired(db: &DbPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@ApniHolidays.COM "), "admin@apniholidays.com");
    }

    #[test]
    fn test_user_response_hides_credentials() {
        let user = User {
            id: "u1".to_string(),
            name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            password_hash: Some("$argon2id$...".to_string()),
            firebase_uid: Some("firebase-uid".to_string()),
            photo_url: None,
            role: "admin".to_string(),
            status: "inactive".to_string(),
            created_at: now_timestamp(),
            last_login: None,
        };
        assert!(user.is_admin());
        assert!(!user.is_active_admin());
        assert_eq!(user.first_name(), "Asha");

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("firebase_uid").is_none());
    }
}
