//! Tour package catalogue.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{now_timestamp, Status};
use crate::DbPool;

const PACKAGE_COLUMNS: &str = "id, title, destination, days, price, discount_price, description, \
     highlights, inclusions, exclusions, itinerary, image_url, featured, status, created_at, updated_at";

/// Row as stored; `featured` is an integer flag in SQL.
#[derive(Debug, Clone, FromRow)]
struct PackageRow {
    id: String,
    title: String,
    destination: String,
    days: i64,
    price: f64,
    discount_price: Option<f64>,
    description: String,
    highlights: String,
    inclusions: String,
    exclusions: String,
    itinerary: String,
    image_url: String,
    featured: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub days: i64,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub description: String,
    pub highlights: String,
    pub inclusions: String,
    pub exclusions: String,
    pub itinerary: String,
    pub image_url: String,
    pub featured: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            destination: row.destination,
            days: row.days,
            price: row.price,
            discount_price: row.discount_price,
            description: row.description,
            highlights: row.highlights,
            inclusions: row.inclusions,
            exclusions: row.exclusions,
            itinerary: row.itinerary,
            image_url: row.image_url,
            featured: row.featured != 0,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filters for listing packages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageFilter {
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PackageFilter {
    /// Active packages only, the public catalogue view.
    pub fn active() -> Self {
        Self {
            status: Some(Status::Active),
            ..Default::default()
        }
    }

    pub fn featured(limit: usize) -> Self {
        Self {
            featured: Some(true),
            status: Some(Status::Active),
            limit: Some(limit as i64),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackageRequest {
    /// Optional caller-chosen ID; generated from the destination otherwise
    pub id: Option<String>,
    pub title: String,
    pub destination: String,
    pub days: i64,
    pub price: f64,
    pub discount_price: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub highlights: String,
    #[serde(default)]
    pub inclusions: String,
    #[serde(default)]
    pub exclusions: String,
    #[serde(default)]
    pub itinerary: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePackageRequest {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub days: Option<i64>,
    pub price: Option<f64>,
    /// `Some(None)` clears the discount
    #[serde(default, with = "double_option")]
    pub discount_price: Option<Option<f64>>,
    pub description: Option<String>,
    pub highlights: Option<String>,
    pub inclusions: Option<String>,
    pub exclusions: Option<String>,
    pub itinerary: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<Status>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer).map(Some)
    }
}

/// Build a readable package ID such as `pkg_sri_lanka_1a2b3c4d`.
pub fn generate_package_id(destination: &str) -> String {
    let slug: String = destination
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    if slug.is_empty() {
        format!("pkg_{}", suffix)
    } else {
        format!("pkg_{}_{}", slug, suffix)
    }
}

/// Format a rupee amount with Indian digit grouping, e.g. `₹1,23,456`.
pub fn format_inr(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.unsigned_abs().to_string();

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            parts.push(&head[end - 2..end]);
            end -= 2;
        }
        parts.push(&head[..end]);
        parts.reverse();
        format!("{},{}", parts.join(","), tail)
    };

    format!("{}₹{}", if negative { "-" } else { "" }, grouped)
}

impl Package {
    /// The price shown to customers: the discount price when it undercuts the list price.
    pub fn display_amount(&self) -> f64 {
        match self.discount_price {
            Some(d) if d > 0.0 && d < self.price => d,
            _ => self.price,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.display_amount() < self.price
    }

    pub fn display_price(&self) -> String {
        format_inr(self.display_amount())
    }

    pub fn list_price(&self) -> String {
        format_inr(self.price)
    }

    pub fn nights(&self) -> i64 {
        (self.days - 1).max(0)
    }

    pub fn highlight_list(&self) -> Vec<&str> {
        split_list(&self.highlights)
    }

    pub fn inclusion_list(&self) -> Vec<&str> {
        split_list(&self.inclusions)
    }

    pub fn exclusion_list(&self) -> Vec<&str> {
        split_list(&self.exclusions)
    }

    pub fn itinerary_days(&self) -> Vec<&str> {
        self.itinerary
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active.as_str()
    }

    pub async fn list(db: &DbPool, filter: &PackageFilter) -> Result<Vec<Package>, sqlx::Error> {
        let featured = filter.featured.map(i64::from);
        let status = filter.status.map(|s| s.as_str().to_string());
        let destination = filter
            .destination
            .as_ref()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());
        let limit = filter.limit.unwrap_or(i64::MAX).max(0);

        let sql = format!(
            r#"
            SELECT {PACKAGE_COLUMNS}
            FROM packages
            WHERE (? IS NULL OR featured = ?)
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR LOWER(destination) = ?)
            ORDER BY featured DESC, created_at DESC, id ASC
            LIMIT ?
            "#
        );

        let rows: Vec<PackageRow> = sqlx::query_as(&sql)
            .bind(featured)
            .bind(featured)
            .bind(status.clone())
            .bind(status)
            .bind(destination.clone())
            .bind(destination)
            .bind(limit)
            .fetch_all(db)
            .await?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    pub async fn get(db: &DbPool, id: &str) -> Result<Option<Package>, sqlx::Error> {
        let row: Option<PackageRow> =
            sqlx::query_as(&format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?"))
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(row.map(Package::from))
    }

    pub async fn destinations(db: &DbPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT destination FROM packages WHERE status = 'active' ORDER BY destination",
        )
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &DbPool, req: CreatePackageRequest) -> Result<Package, sqlx::Error> {
        let now = now_timestamp();
        let id = req
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_package_id(&req.destination));

        sqlx::query(
            r#"
            INSERT INTO packages (id, title, destination, days, price, discount_price, description,
                                  highlights, inclusions, exclusions, itinerary, image_url, featured,
                                  status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.title)
        .bind(&req.destination)
        .bind(req.days)
        .bind(req.price)
        .bind(req.discount_price)
        .bind(&req.description)
        .bind(&req.highlights)
        .bind(&req.inclusions)
        .bind(&req.exclusions)
        .bind(&req.itinerary)
        .bind(&req.image_url)
        .bind(i64::from(req.featured))
        .bind(req.status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Package::get(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Apply a partial update. Returns `None` when the package does not exist.
    pub async fn update(
        db: &DbPool,
        id: &str,
        req: UpdatePackageRequest,
    ) -> Result<Option<Package>, sqlx::Error> {
        let Some(current) = Package::get(db, id).await? else {
            return Ok(None);
        };

        let merged = Package {
            title: req.title.unwrap_or(current.title),
            destination: req.destination.unwrap_or(current.destination),
            days: req.days.unwrap_or(current.days),
            price: req.price.unwrap_or(current.price),
            discount_price: req.discount_price.unwrap_or(current.discount_price),
            description: req.description.unwrap_or(current.description),
            highlights: req.highlights.unwrap_or(current.highlights),
            inclusions: req.inclusions.unwrap_or(current.inclusions),
            exclusions: req.exclusions.unwrap_or(current.exclusions),
            itinerary: req.itinerary.unwrap_or(current.itinerary),
            image_url: req.image_url.unwrap_or(current.image_url),
            featured: req.featured.unwrap_or(current.featured),
            status: req
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or(current.status),
            updated_at: now_timestamp(),
            ..current
        };

        sqlx::query(
            r#"
            UPDATE packages
            SET title = ?, destination = ?, days = ?, price = ?, discount_price = ?, description = ?,
                highlights = ?, inclusions = ?, exclusions = ?, itinerary = ?, image_url = ?,
                featured = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&merged.title)
        .bind(&merged.destination)
        .bind(merged.days)
        .bind(merged.price)
        .bind(merged.discount_price)
        .bind(&merged.description)
        .bind(&merged.highlights)
        .bind(&merged.inclusions)
        .bind(&merged.exclusions)
        .bind(&merged.itinerary)
        .bind(&merged.image_url)
        .bind(i64::from(merged.featured))
        .bind(&merged.status)
        .bind(&merged.updated_at)
        .bind(id)
        .execute(db)
        .await?;

        Ok(Some(merged))
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(db: &DbPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM packages WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(db: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM packages")
            .fetch_one(db)
            .await
    }
}

fn split_list(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Package {
        Package {
            id: "pkg_dubai_001".to_string(),
            title: "DUBAI 3 NIGHT 04 DAYS".to_string(),
            destination: "Dubai".to_string(),
            days: 4,
            price: 29999.0,
            discount_price: Some(19999.0),
            description: String::new(),
            highlights: "Burj Khalifa visit, Desert safari, ".to_string(),
            inclusions: String::new(),
            exclusions: String::new(),
            itinerary: "Day 1: Arrival\n\nDay 2: City tour\n".to_string(),
            image_url: String::new(),
            featured: true,
            status: "active".to_string(),
            created_at: now_timestamp(),
            updated_at: now_timestamp(),
        }
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(19999.0), "₹19,999");
        assert_eq!(format_inr(123456.0), "₹1,23,456");
        assert_eq!(format_inr(12345678.4), "₹1,23,45,678");
        assert_eq!(format_inr(-1500.0), "-₹1,500");
    }

    #[test]
    fn test_display_price_prefers_discount() {
        let mut package = sample();
        assert_eq!(package.display_price(), "₹19,999");
        assert!(package.has_discount());

        package.discount_price = Some(35000.0);
        assert_eq!(package.display_price(), "₹29,999");
        assert!(!package.has_discount());

        package.discount_price = None;
        assert_eq!(package.list_price(), "₹29,999");
    }

    #[test]
    fn test_list_helpers() {
        let package = sample();
        assert_eq!(package.highlight_list(), vec!["Burj Khalifa visit", "Desert safari"]);
        assert_eq!(package.itinerary_days(), vec!["Day 1: Arrival", "Day 2: City tour"]);
        assert_eq!(package.nights(), 3);
    }

    #[test]
    fn test_generate_package_id() {
        let id = generate_package_id("Sri Lanka");
        assert!(id.starts_with("pkg_sri_lanka_"));
        assert_eq!(id.len(), "pkg_sri_lanka_".len() + 8);
        assert!(generate_package_id("  ").starts_with("pkg_"));
    }

    #[test]
    fn test_update_request_distinguishes_cleared_discount() {
        let req: UpdatePackageRequest = serde_json::from_str(r#"{"discount_price": null}"#).unwrap();
        assert_eq!(req.discount_price, Some(None));

        let req: UpdatePackageRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(req.discount_price, None);
    }
}
