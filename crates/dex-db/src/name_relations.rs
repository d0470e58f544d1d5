//! Name Relations: fallback links used when a synonym's `accepted_name` is
//! null (spec §4.5 synonym resolution, stage 2 of the fallback chain).

use crate::types::NameRelationRow;
use uuid::Uuid;

const FALLBACK_TYPES: &[&str] = &["spelling correction", "basionym", "homotypic synonym"];

pub async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    name_taxon: Uuid,
    related_name_taxon: Uuid,
    relation_type: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO name_relations (id, name_taxon, related_name_taxon, relation_type)
         VALUES (gen_random_uuid(), $1, $2, $3)",
    )
    .bind(name_taxon)
    .bind(related_name_taxon)
    .bind(relation_type)
    .execute(executor)
    .await?;
    Ok(())
}

/// Finds a fallback-typed relation from `taxon_id` to an accepted taxon.
pub async fn find_accepted_fallback(
    executor: impl sqlx::PgExecutor<'_>,
    taxon_id: Uuid,
) -> Result<Option<NameRelationRow>, sqlx::Error> {
    sqlx::query_as::<_, NameRelationRow>(
        "SELECT nr.* FROM name_relations nr
         JOIN reference_taxa t ON t.taxon_id = nr.related_name_taxon
         WHERE nr.name_taxon = $1 AND nr.relation_type = ANY($2) AND t.status = 'accepted'
         LIMIT 1",
    )
    .bind(taxon_id)
    .bind(FALLBACK_TYPES)
    .fetch_optional(executor)
    .await
}
