//! Schema validation for inbound content.
//!
//! [`validate_content`] is the single entry point: it inspects the JSON value
//! for the discriminating fields of each content family, deserializes against
//! the matching schema, and reports failures as a [`ValidationError`] carrying
//! field-level [`ValidationIssue`]s rather than a bare message.

use serde_json::Value;

use crate::content::{Ad, Article, Content, ContentType, LandingPage};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, empty for whole-document issues.
    pub path: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationIssue {
    /// Issue attached to a specific field path.
    #[must_use]
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Issue about the document as a whole.
    #[must_use]
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }
}

/// Validation failure with structured details, suitable for returning to API
/// clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Summary message.
    pub message: String,
    /// Field-level issues.
    pub details: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Build a validation error from a summary and its issues.
    #[must_use]
    pub fn new(message: impl Into<String>, details: Vec<ValidationIssue>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }
}

/// Detect the content family from the discriminating fields of a JSON value.
///
/// Detection only looks at field presence, not field validity, so it also
/// classifies content that would fail full validation. Non-object values are
/// `Unknown`.
#[must_use]
pub fn detect_content_type(value: &Value) -> ContentType {
    let Some(object) = value.as_object() else {
        return ContentType::Unknown;
    };

    if object.contains_key("headline") && object.contains_key("body") && object.contains_key("author")
    {
        ContentType::Article
    } else if object.contains_key("adText") && object.contains_key("targetAudience") {
        ContentType::Ad
    } else if object.contains_key("pageTitle") && object.contains_key("heroSection") {
        ContentType::LandingPage
    } else {
        ContentType::Unknown
    }
}

/// Validate a JSON value against the recognized content schemas.
///
/// The family is chosen by [`detect_content_type`]; the value is then
/// deserialized against that family's schema. Content matching no family
/// fails with a whole-document issue listing the recognized shapes.
pub fn validate_content(value: &Value) -> Result<Content, ValidationError> {
    match detect_content_type(value) {
        ContentType::Article => deserialize_as::<Article>(value, "article").map(Content::Article),
        ContentType::Ad => deserialize_as::<Ad>(value, "ad").map(Content::Ad),
        ContentType::LandingPage => {
            deserialize_as::<LandingPage>(value, "landingPage").map(Content::LandingPage)
        }
        ContentType::Unknown => Err(ValidationError::new(
            "Validation failed",
            vec![ValidationIssue::root(
                "content does not match any known schema (article, ad, landingPage)",
            )],
        )),
    }
}

fn deserialize_as<T: serde::de::DeserializeOwned>(
    value: &Value,
    type_name: &str,
) -> Result<T, ValidationError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        ValidationError::new(
            format!("Validation failed ({type_name})"),
            vec![ValidationIssue::root(e.to_string())],
        )
    })
}
