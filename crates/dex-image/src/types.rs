//! Image Normalizer / Conversion Store types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a stored blob entry (normalized image bytes on disk, keyed
/// by conversion id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Statistics about the blob store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
}

/// User-supplied transform request for C1 (§4.1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformRequest {
    pub rotation: Option<u16>,
    pub crop: Option<Crop>,
    #[serde(default = "default_true")]
    pub apply_exif_rotation: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Output of C1: processed PNG bytes plus the metadata record (§4.1).
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedImage {
    pub png_bytes: Vec<u8>,
    pub original_format: String,
    pub original_dims: (u32, u32),
    pub processed_dims: (u32, u32),
    pub transformations_applied: Vec<String>,
    pub exif_orientation: u16,
    pub was_resized: bool,
    pub was_converted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_cache_entry_serialization() {
        let entry = CacheEntry {
            path: PathBuf::from("/cache/abc123"),
            content_type: "image/png".to_string(),
            size: 12345,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("image/png"));
        assert!(json.contains("12345"));

        let deserialized: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content_type, entry.content_type);
        assert_eq!(deserialized.size, entry.size);
    }
}
