//! Local validation for the login, registration and post forms.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ClientError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("name pattern is valid"));
static SPECIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("special pattern is valid"));

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result(self) -> Result<(), ClientError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.insert("email", "Please enter a valid email address");
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ClientError> {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, self.email.trim());
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        } else if self.password.chars().count() < 6 {
            errors.insert("password", "Password must be at least 6 characters");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ClientError> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name", "Name is required");
        } else if name.chars().count() < 2 {
            errors.insert("name", "Name must be at least 2 characters");
        } else if !NAME_RE.is_match(&self.name) {
            errors.insert("name", "Name can only contain letters and spaces");
        }

        check_email(&mut errors, self.email.trim());

        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        } else if self.password.chars().count() < 8 {
            errors.insert("password", "Password must be at least 8 characters");
        }

        if self.confirm_password.is_empty() {
            errors.insert("confirmPassword", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.insert("confirmPassword", "Passwords do not match");
        }

        if !self.accept_terms {
            errors.insert("terms", "You must accept the terms and conditions");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), ClientError> {
        let mut errors = FieldErrors::default();
        if self.title.trim().is_empty() {
            errors.insert("title", "Title is required");
        }
        if self.content.trim().is_empty() {
            errors.insert("content", "Content is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
}

/// How many of the five password criteria are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    pub score: u8,
}

impl PasswordStrength {
    pub fn label(&self) -> StrengthLabel {
        match self.score {
            0..=2 => StrengthLabel::Weak,
            3 => StrengthLabel::Fair,
            4 => StrengthLabel::Good,
            _ => StrengthLabel::Strong,
        }
    }
}

pub fn password_strength(password: &str) -> PasswordStrength {
    let checks = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        SPECIAL_RE.is_match(password),
    ];
    PasswordStrength {
        score: checks.iter().filter(|&&passed| passed).count() as u8,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Submission state of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub submitting: bool,
    pub notice: Option<Notice>,
}

impl FormState {
    pub fn begin(&mut self) {
        self.submitting = true;
        self.notice = None;
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.notice = Some(Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        });
    }

    /// Re-enables the form and shows the server's message or `fallback`.
    pub fn fail(&mut self, err: &ClientError, fallback: &str) {
        self.submitting = false;
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            message: err.user_message(fallback),
        });
    }
}

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const REGISTER_FAILED: &str = "Registration failed. Please try again.";
pub const CREATE_POST_FAILED: &str = "Failed to create post";
pub const LOAD_POSTS_FAILED: &str = "Failed to load posts. Please try again.";
