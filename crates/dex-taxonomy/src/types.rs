//! Data types for the Taxonomy Reconciler (C5, §4.5)

#[derive(Debug, Clone)]
pub struct ReconcileInput {
    pub genus: String,
    pub species: String,
    pub subspecies: Option<String>,
    pub common_name: Option<String>,
    pub cv_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub taxon: Option<dex_db::ReferenceTaxonRow>,
    pub created_canonical_animal: bool,
    pub message: String,
}
