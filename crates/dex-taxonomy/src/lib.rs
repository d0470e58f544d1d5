//! Taxonomy Reconciler (C5): matches computer-vision predictions against
//! the imported reference corpus and upserts Canonical Animals.

mod error;
mod reconciler;
mod types;

pub use error::{Result, TaxonomyError};
pub use reconciler::{normalize_scientific_name, reconcile};
pub use types::{ReconcileInput, ReconcileOutput};
