use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Visibility {
    Private,
    Friends,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Friends => "friends",
            Visibility::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TaxonStatus {
    Accepted,
    Provisional,
    Synonym,
    Ambiguous,
    Misapplied,
    Doubtful,
}

impl TaxonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonStatus::Accepted => "accepted",
            TaxonStatus::Provisional => "provisional",
            TaxonStatus::Synonym => "synonym",
            TaxonStatus::Ambiguous => "ambiguous",
            TaxonStatus::Misapplied => "misapplied",
            TaxonStatus::Doubtful => "doubtful",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Rejected => "rejected",
            FriendshipStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UserRow {
    pub user_id: Uuid,
    pub friend_code: String,
    pub created_at: DateTime<Utc>,
}

/// A single identified entity within a job's `detected_animals` list.
///
/// `confidence` is a display-order heuristic assigned by the Prediction
/// Parser, not a calibrated probability.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DetectedAnimal {
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub confidence: f64,
    pub animal_id: Option<Uuid>,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageConversionRow {
    pub conv_id: Uuid,
    pub user_id: Uuid,
    pub original_bytes_ref: String,
    pub normalized_bytes_ref: String,
    pub original_format: String,
    pub original_width: i32,
    pub original_height: i32,
    pub converted_width: i32,
    pub converted_height: i32,
    pub transformations_applied: serde_json::Value,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub bound: bool,
}

#[derive(Debug, Clone)]
pub struct CreateConversionParams {
    pub conv_id: Uuid,
    pub user_id: Uuid,
    pub original_bytes_ref: String,
    pub normalized_bytes_ref: String,
    pub original_format: String,
    pub original_width: i32,
    pub original_height: i32,
    pub converted_width: i32,
    pub converted_height: i32,
    pub transformations_applied: serde_json::Value,
    pub checksum: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisJobRow {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub conversion_id: Option<Uuid>,
    pub raw_image_ref: Option<String>,
    pub status: String,
    pub cv_method: String,
    pub model_name: String,
    pub detail_level: String,
    pub post_conversion_transformations: Option<serde_json::Value>,
    pub raw_response: Option<String>,
    pub parsed_prediction: Option<String>,
    pub detected_animals: serde_json::Value,
    pub selected_index: Option<i32>,
    pub identified_animal: Option<Uuid>,
    pub cost_usd: Option<f64>,
    pub processing_time: Option<f64>,
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub retry_count: i32,
    pub retry_after: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJobRow {
    pub fn detected_animals(&self) -> Vec<DetectedAnimal> {
        serde_json::from_value(self.detected_animals.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct CreateJobParams {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub conversion_id: Option<Uuid>,
    pub raw_image_ref: Option<String>,
    pub cv_method: String,
    pub model_name: String,
    pub detail_level: String,
    pub post_conversion_transformations: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceTaxonRow {
    pub taxon_id: Uuid,
    pub source: String,
    pub source_priority: i32,
    pub source_taxon_id: String,
    pub scientific_name: String,
    pub authorship: Option<String>,
    pub rank: String,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    #[sqlx(rename = "order")]
    #[serde(rename = "order")]
    pub order_: Option<String>,
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub tribe: Option<String>,
    pub genus: Option<String>,
    pub subgenus: Option<String>,
    pub species: Option<String>,
    pub subspecies: Option<String>,
    pub generic_name: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub status: String,
    pub extinct: bool,
    pub environment: Vec<String>,
    pub nomenclatural_code: Option<String>,
    pub parent: Option<Uuid>,
    pub accepted_name: Option<Uuid>,
    pub source_url: Option<String>,
    pub completeness_score: f64,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertReferenceTaxonParams {
    pub source: String,
    pub source_priority: i32,
    pub source_taxon_id: String,
    pub scientific_name: String,
    pub authorship: Option<String>,
    pub rank: String,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub tribe: Option<String>,
    pub genus: Option<String>,
    pub subgenus: Option<String>,
    pub species: Option<String>,
    pub subspecies: Option<String>,
    pub generic_name: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub status: String,
    pub extinct: bool,
    pub environment: Vec<String>,
    pub nomenclatural_code: Option<String>,
    pub parent_source_id: Option<String>,
    pub source_url: Option<String>,
    pub completeness_score: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommonNameRow {
    pub id: Uuid,
    pub taxon: Uuid,
    pub name: String,
    pub language: String,
    pub country: String,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NameRelationRow {
    pub id: Uuid,
    pub name_taxon: Uuid,
    pub related_name_taxon: Uuid,
    pub relation_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CanonicalAnimalRow {
    pub animal_id: Uuid,
    pub scientific_name: String,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    #[sqlx(rename = "order")]
    #[serde(rename = "order")]
    pub order_: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub creation_index: i64,
    pub created_by_user_id: Option<Uuid>,
    pub verified: bool,
    pub verification_method: Option<String>,
    pub taxonomy_id: Option<Uuid>,
    pub taxonomy_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpsertCanonicalAnimalParams {
    pub scientific_name: String,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub created_by_user_id: Option<Uuid>,
    pub verification_method: Option<String>,
    pub taxonomy_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObservationRow {
    pub observation_id: Uuid,
    pub owner_user_id: Uuid,
    pub animal_id: Uuid,
    pub original_image_ref: Option<String>,
    pub processed_image_ref: Option<String>,
    pub image_checksum: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_name: Option<String>,
    pub notes: Option<String>,
    pub customizations: serde_json::Value,
    pub catch_date: DateTime<Utc>,
    pub visibility: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordObservationParams {
    pub owner_user_id: Uuid,
    pub animal_id: Uuid,
    pub original_image_ref: Option<String>,
    pub processed_image_ref: Option<String>,
    pub image_checksum: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_name: Option<String>,
    pub notes: Option<String>,
    pub customizations: serde_json::Value,
    pub catch_date: Option<DateTime<Utc>>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FriendshipRow {
    pub id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportJobRow {
    pub id: Uuid,
    pub source: String,
    pub version: Option<String>,
    pub status: String,
    pub records_total: i64,
    pub records_imported: i64,
    pub records_failed: i64,
    pub error_log: serde_json::Value,
    pub metadata: serde_json::Value,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RawReferenceRowRecord {
    pub id: Uuid,
    pub import_job_id: Uuid,
    pub source: String,
    pub row_kind: String,
    pub col_id: String,
    pub columns: serde_json::Value,
    pub is_processed: bool,
    pub processing_errors: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
