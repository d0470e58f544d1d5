pub mod canonical_animals;
pub mod common_names;
pub mod conversions;
pub mod friendships;
pub mod import_jobs;
pub mod jobs;
pub mod migrate;
pub mod name_relations;
pub mod observations;
pub mod raw_rows;
pub mod reference_taxa;
pub mod types;
pub mod users;

pub use sqlx::postgres::PgPool;
pub use types::*;
