// Askama template definitions

use askama::Template;
use std::collections::HashMap;

use crate::api::auth::MaybeUser;
use crate::db::{Package, User};
use crate::AppState;

/// One-shot banner shown above the page content
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: &'static str,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "danger",
            message: message.into(),
        }
    }
}

/// Layout data shared by every page through `base.html`
pub struct PageContext {
    pub site_name: String,
    pub title: String,
    pub nav: &'static str,
    pub user_name: Option<String>,
    pub is_admin: bool,
    pub firebase_snippet: String,
    pub loading_reset_ms: u64,
    pub alert_dismiss_ms: u64,
    pub flash: Option<Flash>,
}

impl PageContext {
    pub fn new(state: &AppState, user: &MaybeUser, title: impl Into<String>, nav: &'static str) -> Self {
        let MaybeUser(user) = user;
        Self {
            site_name: state.config.server.site_name.clone(),
            title: title.into(),
            nav,
            user_name: user.as_ref().map(|u: &User| u.name.clone()),
            is_admin: user.as_ref().map(User::is_active_admin).unwrap_or(false),
            firebase_snippet: state.config.firebase.sdk_snippet(),
            loading_reset_ms: state.config.ui.loading_reset_ms,
            alert_dismiss_ms: state.config.ui.alert_dismiss_ms,
            flash: None,
        }
    }

    pub fn nav_class(&self, item: &str) -> &'static str {
        if self.nav == item {
            "active"
        } else {
            ""
        }
    }
}

/// Submitted values and server-side field errors for re-rendering a form
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: HashMap<String, String>,
    errors: HashMap<String, Vec<String>>,
    submitted: bool,
}

impl FormState {
    pub fn submitted(values: HashMap<String, String>, errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            values,
            errors,
            submitted: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn is_value(&self, field: &str, candidate: &str) -> bool {
        self.value(field) == candidate
    }

    pub fn error(&self, field: &str) -> String {
        self.errors
            .get(field)
            .map(|messages| messages.join(" "))
            .unwrap_or_default()
    }

    /// Server error for the field, else the browser-side hint
    pub fn error_or(&self, field: &str, hint: &str) -> String {
        let error = self.error(field);
        if error.is_empty() {
            hint.to_string()
        } else {
            error
        }
    }

    pub fn invalid_class(&self, field: &str) -> &'static str {
        if self.errors.contains_key(field) {
            "is-invalid"
        } else {
            ""
        }
    }

    /// `needs-validation` always; `was-validated` once a submission failed
    pub fn form_class(&self) -> &'static str {
        if self.submitted && self.has_errors() {
            "needs-validation was-validated"
        } else {
            "needs-validation"
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub featured: Vec<Package>,
    pub destinations: Vec<String>,
}

#[derive(Template)]
#[template(path = "packages.html")]
pub struct PackagesTemplate {
    pub page: PageContext,
    pub packages: Vec<Package>,
    pub destinations: Vec<String>,
    pub selected: Option<String>,
}

impl PackagesTemplate {
    pub fn is_selected(&self, destination: &str) -> bool {
        self.selected.as_deref() == Some(destination)
    }
}

#[derive(Template)]
#[template(path = "package_detail.html")]
pub struct PackageDetailTemplate {
    pub page: PageContext,
    pub package: Package,
    pub form: FormState,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub packages: Vec<Package>,
    pub form: FormState,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub form: FormState,
    pub error: Option<String>,
    pub next: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status: u16,
    pub heading: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_error(field: &str) -> FormState {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "Asha".to_string());
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec!["Phone is required".to_string()]);
        FormState::submitted(values, errors)
    }

    #[test]
    fn test_fresh_form_is_not_validated() {
        let form = FormState::default();
        assert_eq!(form.form_class(), "needs-validation");
        assert_eq!(form.value("name"), "");
        assert_eq!(form.invalid_class("name"), "");
        assert_eq!(form.error_or("name", "Please enter your name."), "Please enter your name.");
    }

    #[test]
    fn test_failed_submission_marks_fields() {
        let form = form_with_error("phone");
        assert_eq!(form.form_class(), "needs-validation was-validated");
        assert_eq!(form.value("name"), "Asha");
        assert!(form.is_value("name", "Asha"));
        assert_eq!(form.invalid_class("phone"), "is-invalid");
        assert_eq!(form.invalid_class("name"), "");
        assert_eq!(form.error_or("phone", "hint"), "Phone is required");
    }

    #[test]
    fn test_flash_kinds_map_to_bootstrap_alerts() {
        assert_eq!(Flash::success("ok").kind, "success");
        assert_eq!(Flash::error("no").kind, "danger");
    }
}
