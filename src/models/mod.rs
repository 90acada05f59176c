use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted drawing. Identity is the store-assigned id; records are
/// immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingRecord {
    pub id: i64,
    pub image_png: Vec<u8>,
    pub analysis: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A drawing about to be persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewDrawing {
    pub image_png: Vec<u8>,
    pub analysis: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful save orchestration. `analysis_warning` carries
/// the non-fatal reason when the configured analyzer failed and the drawing
/// was persisted without commentary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDrawing {
    pub id: i64,
    pub analysis: Option<String>,
    pub analysis_warning: Option<String>,
    pub created_at: DateTime<Utc>,
}
