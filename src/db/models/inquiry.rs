//! Contact form submissions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::now_timestamp;
use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inquiry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub package_id: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Contact form fields. Shared by the JSON API and the HTML form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInquiryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub package_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Inquiry {
    pub async fn create(db: &DbPool, req: CreateInquiryRequest) -> Result<Inquiry, sqlx::Error> {
        let inquiry = Inquiry {
            id: format!("inq_{}", uuid::Uuid::new_v4().simple()),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: non_empty(req.phone),
            subject: non_empty(req.subject),
            message: req.message.trim().to_string(),
            package_id: non_empty(req.package_id),
            status: "new".to_string(),
            created_at: now_timestamp(),
        };

        sqlx::query(
            r#"
            INSERT INTO inquiries (id, name, email, phone, subject, message, package_id, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&inquiry.id)
        .bind(&inquiry.name)
        .bind(&inquiry.email)
        .bind(&inquiry.phone)
        .bind(&inquiry.subject)
        .bind(&inquiry.message)
        .bind(&inquiry.package_id)
        .bind(&inquiry.status)
        .bind(&inquiry.created_at)
        .execute(db)
        .await?;

        Ok(inquiry)
    }

    /// Most recent first.
    pub async fn list(db: &DbPool, limit: i64) -> Result<Vec<Inquiry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, name, email, phone, subject, message, package_id, status, created_at
            FROM inquiries
            ORDER BY created_at DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(db)
        .await
    }
}
