use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// Per-field, human-readable validation messages, keyed by form field name.
/// Templates re-render the submitted values alongside these.
#[derive(Debug, Default, Clone)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.0.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}."));
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

/// Validate a form into the error map; empty map means the form is good.
pub fn check<T: Validate>(form: &T) -> FormErrors {
    match form.validate() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors.into(),
    }
}

/// Prefix bare URLs with a scheme. Values already carrying `http://` or
/// `https://` pass through untouched, as does an empty value (the length
/// rule reports that one).
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CategoryForm {
    #[validate(length(min = 1, max = 128, message = "Please enter a category name (max 128 characters)."))]
    pub name: String,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct PageForm {
    #[validate(length(min = 1, max = 128, message = "Please enter the title of the page (max 128 characters)."))]
    pub title: String,
    #[validate(
        length(min = 1, max = 200, message = "Please enter the URL of the page (max 200 characters)."),
        url(message = "Please enter a well-formed URL.")
    )]
    pub url: String,
}

impl PageForm {
    pub fn normalize(&mut self) {
        self.url = normalize_url(&self.url);
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UserForm {
    #[validate(length(min = 1, max = 150, message = "Please choose a username (max 150 characters)."))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter a password."))]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(url(message = "Please enter a well-formed website URL."))]
    pub website: Option<String>,
}

impl ProfileForm {
    /// Browsers submit an empty string for a blank optional input.
    pub fn normalize(&mut self) {
        if self.website.as_deref().is_some_and(|w| w.trim().is_empty()) {
            self.website = None;
        }
    }
}
