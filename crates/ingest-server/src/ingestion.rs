//! Content ingestion service: validation, record store, health and stats.
//!
//! Records live in process memory only; restart loses them (by design, this
//! service is not a durable store).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use ingest_core::{ContentType, IngestionStatus, ValidationIssue, detect_content_type, validate_content};

/// Service version reported in health responses.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An inbound ingestion request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRequest {
    /// The content to validate and store. Defaults to JSON null when absent,
    /// which fails validation like any other unrecognized shape.
    #[serde(default)]
    pub content: Value,
    /// Optional content type hint; detection runs regardless.
    #[serde(default)]
    pub content_type: Option<ContentType>,
    /// Optional caller metadata stored with the record.
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// The outcome of one ingestion request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResponse {
    pub id: String,
    pub status: IngestionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

/// A stored ingestion record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRecord {
    pub id: String,
    pub content: Value,
    pub content_type: ContentType,
    pub status: IngestionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

/// Service health snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Active protocol sessions, supplied by the transport layer.
    pub connections: usize,
    /// Milliseconds since service start.
    pub uptime: i64,
    pub version: &'static str,
}

/// Aggregate ingestion statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionStats {
    pub total_records: usize,
    pub completed_records: usize,
    pub failed_records: usize,
    /// Percentage of completed records, 0 when empty.
    pub success_rate: f64,
    pub content_type_counts: HashMap<String, usize>,
    pub uptime: i64,
}

/// Validates and stores content, keeping every attempt as a record.
pub struct IngestionService {
    records: RwLock<HashMap<String, IngestionRecord>>,
    started_at: DateTime<Utc>,
}

impl IngestionService {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    /// Validate and store one piece of content.
    ///
    /// Validation failures are not errors at this level: the attempt is
    /// stored as a failed record and reported through the response status,
    /// with the issues attached.
    pub async fn ingest(&self, request: IngestionRequest) -> IngestionResponse {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        tracing::info!(record_id = %id, "starting content ingestion");

        match validate_content(&request.content) {
            Ok(content) => {
                let content_type = content.content_type();
                // Store the normalized form of the validated content.
                let normalized =
                    serde_json::to_value(&content).unwrap_or(request.content);

                let record = IngestionRecord {
                    id: id.clone(),
                    content: normalized,
                    content_type,
                    status: IngestionStatus::Completed,
                    created_at: timestamp,
                    updated_at: timestamp,
                    metadata: request.metadata,
                    errors: None,
                };
                self.records.write().await.insert(id.clone(), record);

                tracing::info!(record_id = %id, content_type = %content_type, "content ingestion completed");
                IngestionResponse {
                    id,
                    status: IngestionStatus::Completed,
                    content_type: Some(content_type),
                    timestamp,
                    message: Some("Content ingested successfully".to_string()),
                    errors: None,
                }
            }
            Err(error) => {
                tracing::warn!(record_id = %id, "content validation failed");

                let record = IngestionRecord {
                    id: id.clone(),
                    content_type: detect_content_type(&request.content),
                    content: request.content,
                    status: IngestionStatus::Failed,
                    created_at: timestamp,
                    updated_at: timestamp,
                    metadata: request.metadata,
                    errors: Some(error.details.clone()),
                };
                self.records.write().await.insert(id.clone(), record);

                IngestionResponse {
                    id,
                    status: IngestionStatus::Failed,
                    content_type: None,
                    timestamp,
                    message: Some(error.message),
                    errors: Some(error.details),
                }
            }
        }
    }

    /// Look up one record by id.
    pub async fn record(&self, id: &str) -> Option<IngestionRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// All records, in arbitrary order.
    pub async fn records(&self) -> Vec<IngestionRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Records whose status wire name equals `status`. Unrecognized status
    /// strings simply match nothing.
    pub async fn records_by_status(&self, status: &str) -> Vec<IngestionRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.status.as_str() == status)
            .cloned()
            .collect()
    }

    /// Health snapshot. `connections` is the caller-supplied count of active
    /// protocol sessions.
    pub fn health(&self, connections: usize) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            timestamp: Utc::now(),
            connections,
            uptime: self.uptime_ms(),
            version: SERVICE_VERSION,
        }
    }

    /// Aggregate statistics over all records.
    pub async fn stats(&self) -> IngestionStats {
        let records = self.records.read().await;
        let total_records = records.len();
        let completed_records = records
            .values()
            .filter(|r| r.status == IngestionStatus::Completed)
            .count();
        let failed_records = records
            .values()
            .filter(|r| r.status == IngestionStatus::Failed)
            .count();

        let mut content_type_counts: HashMap<String, usize> = HashMap::new();
        for record in records.values() {
            *content_type_counts
                .entry(record.content_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        IngestionStats {
            total_records,
            completed_records,
            failed_records,
            success_rate: if total_records > 0 {
                (completed_records as f64 / total_records as f64) * 100.0
            } else {
                0.0
            },
            content_type_counts,
            uptime: self.uptime_ms(),
        }
    }

    fn uptime_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

impl Default for IngestionService {
    fn default() -> Self {
        Self::new()
    }
}
