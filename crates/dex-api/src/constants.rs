// --- Validation limits ---

/// Maximum allowed length of an observation's notes field (in characters).
pub const MAX_NOTES_LENGTH: usize = 3000;

/// Maximum allowed length of a location name (in characters).
pub const MAX_LOCATION_NAME_LENGTH: usize = 256;

// --- Conversion Store (C2) ---

/// Time-to-live for an unbound image conversion before it's reaped (spec §4.2).
pub const CONVERSION_TTL_SECS: u64 = 60 * 10;

// --- Tree cache defaults (spec §4.13) ---

/// Default tree-cache TTL for personal/friends/selected scopes.
pub const TREE_CACHE_TTL_SECS: u64 = 2 * 60;

/// Tree-cache TTL for the `global` scope.
pub const TREE_CACHE_TTL_GLOBAL_SECS: u64 = 5 * 60;

/// TTL for the uncached `sync_entries` (no `last_sync`) response, per user.
pub const SYNC_ALL_CACHE_TTL_SECS: u64 = 5 * 60;
