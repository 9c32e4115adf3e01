//! Input validation for API requests and HTML forms.
//!
//! Validators return `Result<(), String>` with a user-facing message. To
//! collect several failures into one `ApiError`, feed them to
//! `ValidationErrorBuilder::check` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{
    CreateInquiryRequest, CreatePackageRequest, Package, RegisterRequest, Status,
    UpdatePackageRequest,
};

/// Minimum length for account passwords
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    /// Pragmatic email check: something@domain.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$"
    ).unwrap();

    /// Phone numbers: optional leading +, digits with spaces, dashes or brackets
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 ()-]{5,18}[0-9]$"
    ).unwrap();

    /// Package IDs chosen by admins, e.g. pkg_dubai_001
    static ref PACKAGE_ID_REGEX: Regex = Regex::new(
        r"^[a-z0-9][a-z0-9_-]{0,63}$"
    ).unwrap();
}

/// Validate a required text field with a maximum length
pub fn validate_required(value: &str, label: &str, max_len: usize) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} is too long (max {} characters)", label, max_len));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    validate_required(name, "Name", 255)
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 255 {
        return Err("Email is too long (max 255 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate a phone number that must be present
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number".to_string());
    }
    Ok(())
}

/// Validate a phone number that may be left blank
pub fn validate_optional_phone(phone: Option<&str>) -> Result<(), String> {
    match phone.map(str::trim) {
        None | Some("") => Ok(()),
        Some(p) => validate_phone(p),
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

/// Validate a status string from a form or query
pub fn validate_status(status: &str) -> Result<Status, String> {
    Status::parse(status).ok_or_else(|| "Status must be 'active' or 'inactive'".to_string())
}

pub fn validate_package_id(id: &str) -> Result<(), String> {
    if !PACKAGE_ID_REGEX.is_match(id) {
        return Err(
            "Package ID must be lowercase letters, digits, '_' or '-' (max 64 characters)"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_days(days: i64) -> Result<(), String> {
    if !(1..=365).contains(&days) {
        return Err("Days must be between 1 and 365".to_string());
    }
    Ok(())
}

/// Prices are catalogue data only; they just need to be sane amounts.
pub fn validate_price(price: f64, label: &str) -> Result<(), String> {
    if !price.is_finite() || price < 0.0 {
        return Err(format!("{} must be a non-negative amount", label));
    }
    Ok(())
}

pub fn validate_image_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err("Image URL must be an http(s) URL".to_string()),
    }
}

fn check_discount(builder: &mut ValidationErrorBuilder, price: f64, discount: Option<f64>) {
    if let Some(discount) = discount {
        builder.check("discount_price", validate_price(discount, "Discount price"));
        if discount > price {
            builder.add("discount_price", "Discount price cannot exceed the price");
        }
    }
}

/// Field errors for a contact form or inquiry request
pub fn inquiry_errors(req: &CreateInquiryRequest) -> ValidationErrorBuilder {
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("name", validate_name(&req.name))
        .check("email", validate_email(&req.email))
        .check("phone", validate_phone(req.phone.as_deref().unwrap_or("")))
        .check("message", validate_required(&req.message, "Message", 5000));
    if let Some(subject) = req.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        builder.check("subject", validate_required(subject, "Subject", 255));
    }
    builder
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("name", validate_name(&req.name))
        .check("email", validate_email(&req.email))
        .check("password", validate_password(&req.password))
        .check("phone", validate_optional_phone(req.phone.as_deref()));
    builder.finish()
}

pub fn validate_create_package(req: &CreatePackageRequest) -> Result<(), ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    if let Some(id) = req.id.as_deref().filter(|id| !id.is_empty()) {
        builder.check("id", validate_package_id(id));
    }
    builder
        .check("title", validate_required(&req.title, "Title", 255))
        .check("destination", validate_required(&req.destination, "Destination", 128))
        .check("days", validate_days(req.days))
        .check("price", validate_price(req.price, "Price"))
        .check("image_url", validate_image_url(&req.image_url));
    check_discount(&mut builder, req.price, req.discount_price);
    builder.finish()
}

/// Only the fields present in the update are checked, except the discount,
/// which must not exceed the price the package will have afterwards.
pub fn validate_update_package(
    req: &UpdatePackageRequest,
    current: &Package,
) -> Result<(), ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        builder.check("title", validate_required(title, "Title", 255));
    }
    if let Some(destination) = &req.destination {
        builder.check("destination", validate_required(destination, "Destination", 128));
    }
    if let Some(days) = req.days {
        builder.check("days", validate_days(days));
    }
    if let Some(price) = req.price {
        builder.check("price", validate_price(price, "Price"));
    }
    if let Some(url) = &req.image_url {
        builder.check("image_url", validate_image_url(url));
    }
    if req.price.is_some() || req.discount_price.is_some() {
        let price = req.price.unwrap_or(current.price);
        let discount = req.discount_price.unwrap_or(current.discount_price);
        check_discount(&mut builder, price, discount);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("asha@example.com").is_ok());
        assert!(validate_email(" info@apniholidays.co.in ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("asha@localhost").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("022-2345-6789").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("12").is_err());

        assert!(validate_optional_phone(None).is_ok());
        assert!(validate_optional_phone(Some("  ")).is_ok());
        assert!(validate_optional_phone(Some("abc")).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("correct horse").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_status() {
        assert_eq!(validate_status("active"), Ok(Status::Active));
        assert_eq!(validate_status("Inactive"), Ok(Status::Inactive));
        assert!(validate_status("archived").is_err());
    }

    #[test]
    fn test_validate_package_fields() {
        assert!(validate_package_id("pkg_dubai_001").is_ok());
        assert!(validate_package_id("PKG DUBAI").is_err());
        assert!(validate_days(4).is_ok());
        assert!(validate_days(0).is_err());
        assert!(validate_price(0.0, "Price").is_ok());
        assert!(validate_price(-1.0, "Price").is_err());
        assert!(validate_price(f64::NAN, "Price").is_err());
        assert!(validate_image_url("").is_ok());
        assert!(validate_image_url("https://i.ibb.co/x.jpg").is_ok());
        assert!(validate_image_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_inquiry_errors_lists_missing_fields() {
        let errors = inquiry_errors(&CreateInquiryRequest::default()).into_errors();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("phone"));
        assert!(errors.contains_key("message"));
        assert!(!errors.contains_key("subject"));

        let ok = CreateInquiryRequest {
            name: "Priya".to_string(),
            email: "priya@example.com".to_string(),
            phone: Some("+91 98765 43210".to_string()),
            message: "Hello".to_string(),
            ..Default::default()
        };
        assert!(inquiry_errors(&ok).is_empty());
    }

    fn stored_package(price: f64, discount_price: Option<f64>) -> Package {
        Package {
            id: "pkg_goa_001".to_string(),
            title: "Goa Beaches".to_string(),
            destination: "Goa".to_string(),
            days: 4,
            price,
            discount_price,
            description: String::new(),
            highlights: String::new(),
            inclusions: String::new(),
            exclusions: String::new(),
            itinerary: String::new(),
            image_url: String::new(),
            featured: false,
            status: "active".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_update_package_checks_discount_against_new_price() {
        let current = stored_package(5000.0, None);
        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"price": 1000, "discount_price": 2000}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_err());

        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"discount_price": null}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_ok());
    }

    #[test]
    fn test_update_package_checks_discount_against_stored_price() {
        let current = stored_package(5000.0, Some(4500.0));

        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"discount_price": 5001}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_err());

        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"discount_price": 4999}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_ok());

        // Lowering the price below the stored discount
        let req: UpdatePackageRequest = serde_json::from_str(r#"{"price": 4000}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_err());

        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"price": 4000, "discount_price": null}"#).unwrap();
        assert!(validate_update_package(&req, &current).is_ok());
    }
}
