//! Image Normalizer (C1) and Conversion Store (C2) blob backing.

mod error;
mod processor;
mod store;
mod types;

pub use error::{ImageError, Result};
pub use processor::process;
pub use store::BlobStore;
pub use types::{CacheEntry, CacheStats, Crop, ProcessedImage, TransformRequest};

use sha2::{Digest, Sha256};

/// SHA-256 of the normalized bytes, as used for `Image Conversion.checksum`
/// (§3) — the round-trip determinism law means this is stable across runs
/// given identical input bytes and transformations.
pub fn checksum_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
