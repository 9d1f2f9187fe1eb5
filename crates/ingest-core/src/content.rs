//! Content shapes accepted by the ingestion service.
//!
//! Three content families are recognized, each identified by its
//! discriminating fields:
//!
//! - **Article**: `headline` + `body` + `author`
//! - **Ad**: `adText` + `targetAudience`
//! - **Landing page**: `pageTitle` + `heroSection`
//!
//! All wire field names are camelCase. Anything that matches none of these
//! shapes is reported as [`ContentType::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The recognized content families, plus `Unknown` for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Article,
    Ad,
    LandingPage,
    Unknown,
}

impl ContentType {
    /// Wire name of the content type, as used in responses and stats keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Ad => "ad",
            Self::LandingPage => "landingPage",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an ingestion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl IngestionStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IngestionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ingestion status: {0}")]
pub struct UnknownStatus(pub String);

/// An editorial article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Article {
    pub headline: String,
    pub body: String,
    pub author: String,
    pub publish_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// An advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ad {
    pub ad_text: String,
    pub target_audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
}

/// The hero section of a landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeroSection {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
}

/// A marketing landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LandingPage {
    pub page_title: String,
    pub hero_section: HeroSection,
}

/// A validated content value of one of the recognized families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Article(Article),
    Ad(Ad),
    LandingPage(LandingPage),
}

impl Content {
    /// The content family this value belongs to.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Article(_) => ContentType::Article,
            Self::Ad(_) => ContentType::Ad,
            Self::LandingPage(_) => ContentType::LandingPage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_wire_names() {
        assert_eq!(ContentType::Article.as_str(), "article");
        assert_eq!(ContentType::Ad.as_str(), "ad");
        assert_eq!(ContentType::LandingPage.as_str(), "landingPage");
        assert_eq!(ContentType::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            IngestionStatus::Pending,
            IngestionStatus::Processing,
            IngestionStatus::Completed,
            IngestionStatus::Failed,
        ] {
            let parsed: IngestionStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<IngestionStatus>().is_err());
    }

    #[test]
    fn test_article_deserializes_camel_case() {
        let article: Article = serde_json::from_value(json!({
            "headline": "Breaking",
            "body": "Something happened",
            "author": "jo",
            "publishDate": "2025-01-01",
            "tags": ["news"]
        }))
        .unwrap();
        assert_eq!(article.headline, "Breaking");
        assert_eq!(article.tags.as_deref(), Some(&["news".to_string()][..]));
    }

    #[test]
    fn test_content_serializes_untagged() {
        let content = Content::Ad(Ad {
            ad_text: "Buy now".to_string(),
            target_audience: "everyone".to_string(),
            call_to_action: None,
        });
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"adText": "Buy now", "targetAudience": "everyone"}));
        assert_eq!(content.content_type(), ContentType::Ad);
    }
}
