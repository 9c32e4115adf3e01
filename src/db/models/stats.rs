//! Admin dashboard counters.

use serde::{Deserialize, Serialize};

use crate::DbPool;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteStats {
    /// Active packages
    pub packages: i64,
    /// Accounts with the `user` role
    pub users: i64,
    /// Featured packages
    pub featured: i64,
    pub inquiries: i64,
}

impl SiteStats {
    pub async fn collect(db: &DbPool) -> Result<SiteStats, sqlx::Error> {
        let packages: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM packages WHERE status = 'active'")
                .fetch_one(db)
                .await?;
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'user'")
            .fetch_one(db)
            .await?;
        let featured: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages WHERE featured = 1")
            .fetch_one(db)
            .await?;
        let inquiries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inquiries")
            .fetch_one(db)
            .await?;

        Ok(SiteStats {
            packages,
            users,
            featured,
            inquiries,
        })
    }
}
