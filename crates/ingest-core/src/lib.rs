//! ingest-core: content data model and validation for the Content Automation
//! Platform.
//!
//! This crate defines the content shapes the ingestion service accepts
//! (articles, ads, landing pages), the status vocabulary for ingestion
//! records, and the schema validation that turns untrusted JSON into a typed
//! [`Content`] value or a structured [`ValidationError`].
//!
//! The validation surface is deliberately small: callers hand in a
//! `serde_json::Value` and get back either a validated value or a list of
//! field-level issues suitable for returning to API clients verbatim.

pub mod content;
pub mod validate;

pub use content::{Ad, Article, Content, ContentType, IngestionStatus, LandingPage};
pub use validate::{ValidationError, ValidationIssue, detect_content_type, validate_content};
