//! Post payload validation.
//!
//! Input arrives as untyped JSON so that a single pass can report every
//! violated constraint instead of stopping at the first deserialization error.

use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::domain::entities::ImageRef;
use crate::domain::types::PostStatus;

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_EXCERPT_CHARS: usize = 10;
pub const MIN_CONTENT_CHARS: usize = 50;

pub const FIELD_TITLE: &str = "title";
pub const FIELD_EXCERPT: &str = "excerpt";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_READ_TIME: &str = "readTime";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_IMAGE_URL: &str = "imageUrl";
pub const FIELD_IMAGE_PUBLIC_ID: &str = "imagePublicId";
pub const FIELD_IMAGE: &str = "image";

const LEGACY_FIELD_IMAGE_PUBLIC_ID: &str = "cloudinaryPublicId";

/// Normalized, typed post payload produced by [`validate_post`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub read_time: i32,
    pub status: PostStatus,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for FieldViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("post validation failed: ")?;
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            Display::fmt(violation, f)?;
        }
        Ok(())
    }
}

/// Validate an untyped post record.
pub fn validate_post(value: &Value) -> Result<PostInput, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError {
            violations: vec![FieldViolation::new("body", "Expected a JSON object")],
        });
    };

    let mut violations = Vec::new();

    let title = min_chars(object, FIELD_TITLE, "Title", MIN_TITLE_CHARS, &mut violations);
    let excerpt = min_chars(
        object,
        FIELD_EXCERPT,
        "Excerpt",
        MIN_EXCERPT_CHARS,
        &mut violations,
    );
    let content = min_chars(
        object,
        FIELD_CONTENT,
        "Content",
        MIN_CONTENT_CHARS,
        &mut violations,
    );
    let read_time = read_time(object.get(FIELD_READ_TIME)).map_err(|message| {
        violations.push(FieldViolation::new(FIELD_READ_TIME, message));
    });
    let status = status(object.get(FIELD_STATUS)).map_err(|message| {
        violations.push(FieldViolation::new(FIELD_STATUS, message));
    });
    let image = image(object, &mut violations);

    match (title, excerpt, content, read_time, status, image) {
        (Some(title), Some(excerpt), Some(content), Ok(read_time), Ok(status), Ok(image))
            if violations.is_empty() =>
        {
            Ok(PostInput {
                title,
                excerpt,
                content,
                read_time,
                status,
                image,
            })
        }
        _ => Err(ValidationError { violations }),
    }
}

fn min_chars(
    object: &Map<String, Value>,
    field: &'static str,
    label: &str,
    min: usize,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            violations.push(FieldViolation::new(field, "Required"));
            None
        }
        Some(Value::String(text)) if text.chars().count() >= min => Some(text.clone()),
        Some(Value::String(_)) => {
            violations.push(FieldViolation::new(
                field,
                format!("{label} must be at least {min} characters"),
            ));
            None
        }
        Some(_) => {
            violations.push(FieldViolation::new(field, "Expected a string"));
            None
        }
    }
}

fn read_time(value: Option<&Value>) -> Result<i32, &'static str> {
    let minutes = match value {
        None | Some(Value::Null) => return Err("Required"),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(whole) => whole as f64,
            None => number.as_f64().ok_or("Must be a number")?,
        },
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| "Must be a number")?,
        Some(_) => return Err("Must be a number"),
    };

    if !minutes.is_finite() {
        return Err("Must be a number");
    }
    if minutes.fract() != 0.0 {
        return Err("Must be a whole number of minutes");
    }
    if minutes <= 0.0 {
        return Err("Must be a positive number");
    }
    if minutes > f64::from(i32::MAX) {
        return Err("Must be a reasonable number of minutes");
    }
    Ok(minutes as i32)
}

fn status(value: Option<&Value>) -> Result<PostStatus, &'static str> {
    match value {
        None | Some(Value::Null) => Err("Required"),
        Some(Value::String(text)) => text
            .parse::<PostStatus>()
            .map_err(|_| "Expected 'draft' or 'published'"),
        Some(_) => Err("Expected 'draft' or 'published'"),
    }
}

fn image(
    object: &Map<String, Value>,
    violations: &mut Vec<FieldViolation>,
) -> Result<Option<ImageRef>, ()> {
    let url = optional_text(object.get(FIELD_IMAGE_URL)).and_then(|url| match url {
        Some(raw) if Url::parse(&raw).is_err() => Err("Must be a valid URL"),
        other => Ok(other),
    });
    let public_id = optional_text(
        object
            .get(FIELD_IMAGE_PUBLIC_ID)
            .or_else(|| object.get(LEGACY_FIELD_IMAGE_PUBLIC_ID)),
    );

    match (url, public_id) {
        (Ok(Some(url)), Ok(Some(public_id))) => Ok(Some(ImageRef { url, public_id })),
        (Ok(None), Ok(None)) => Ok(None),
        (Ok(_), Ok(_)) => {
            violations.push(FieldViolation::new(
                FIELD_IMAGE,
                "Image URL and image public id must be provided together",
            ));
            Err(())
        }
        (url, public_id) => {
            if let Err(message) = url {
                violations.push(FieldViolation::new(FIELD_IMAGE_URL, message));
            }
            if let Err(message) = public_id {
                violations.push(FieldViolation::new(FIELD_IMAGE_PUBLIC_ID, message));
            }
            Err(())
        }
    }
}

/// Absent, `null` and `""` all mean "no value".
fn optional_text(value: Option<&Value>) -> Result<Option<String>, &'static str> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err("Expected a string"),
    }
}
