//! Reference Taxon (C5/C6) persistence and the query primitives the
//! Taxonomy Reconciler's six-stage matcher is built from.

use crate::types::{ReferenceTaxonRow, UpsertReferenceTaxonParams};
use uuid::Uuid;

const STATUSES_IN_SCOPE: &[&str] = &["accepted", "provisional", "synonym"];

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    taxon_id: Uuid,
) -> Result<Option<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>("SELECT * FROM reference_taxa WHERE taxon_id = $1")
        .bind(taxon_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_by_source(
    executor: impl sqlx::PgExecutor<'_>,
    source: &str,
    source_taxon_id: &str,
) -> Result<Option<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT * FROM reference_taxa WHERE source = $1 AND source_taxon_id = $2",
    )
    .bind(source)
    .bind(source_taxon_id)
    .fetch_optional(executor)
    .await
}

/// Stage 1: exact field match. `subspecies` present requires an exact
/// `infraspecific_epithet` match; absent requires it to be null or empty.
pub async fn exact_field_match(
    executor: impl sqlx::PgExecutor<'_>,
    genus: &str,
    species: &str,
    subspecies: Option<&str>,
) -> Result<Vec<ReferenceTaxonRow>, sqlx::Error> {
    let rows = if let Some(sub) = subspecies {
        sqlx::query_as::<_, ReferenceTaxonRow>(
            "SELECT * FROM reference_taxa
             WHERE status = ANY($1) AND genus ILIKE $2 AND specific_epithet ILIKE $3
               AND infraspecific_epithet ILIKE $4
             ORDER BY source_priority ASC, completeness_score DESC, confidence_score DESC",
        )
        .bind(STATUSES_IN_SCOPE)
        .bind(genus)
        .bind(species)
        .bind(sub)
        .fetch_all(executor)
        .await?
    } else {
        sqlx::query_as::<_, ReferenceTaxonRow>(
            "SELECT * FROM reference_taxa
             WHERE status = ANY($1) AND genus ILIKE $2 AND specific_epithet ILIKE $3
               AND (infraspecific_epithet IS NULL OR infraspecific_epithet = '')
             ORDER BY source_priority ASC, completeness_score DESC, confidence_score DESC",
        )
        .bind(STATUSES_IN_SCOPE)
        .bind(genus)
        .bind(species)
        .fetch_all(executor)
        .await?
    };
    Ok(rows)
}

/// Stage 2: exact scientific-name match.
pub async fn exact_scientific_name_match(
    executor: impl sqlx::PgExecutor<'_>,
    scientific_name: &str,
) -> Result<Vec<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT * FROM reference_taxa
         WHERE status = ANY($1) AND scientific_name ILIKE $2
         ORDER BY source_priority ASC, completeness_score DESC, confidence_score DESC",
    )
    .bind(STATUSES_IN_SCOPE)
    .bind(scientific_name)
    .fetch_all(executor)
    .await
}

/// Stage 3 / 6: common-name match (exact via `mode = exact`, fuzzy via
/// `ILIKE '%name%'` otherwise), restricted to in-scope taxa.
pub async fn common_name_match(
    executor: impl sqlx::PgExecutor<'_>,
    common_name: &str,
    fuzzy: bool,
) -> Result<Vec<ReferenceTaxonRow>, sqlx::Error> {
    let pattern = if fuzzy {
        format!("%{}%", common_name)
    } else {
        common_name.to_string()
    };
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT t.* FROM reference_taxa t
         JOIN common_names c ON c.taxon = t.taxon_id
         WHERE t.status = ANY($1) AND c.name ILIKE $2
         ORDER BY t.source_priority ASC, t.completeness_score DESC, t.confidence_score DESC",
    )
    .bind(STATUSES_IN_SCOPE)
    .bind(pattern)
    .fetch_all(executor)
    .await
}

/// Stage 4: fuzzy field match (genus + species only, all subspecies variants).
pub async fn fuzzy_field_match(
    executor: impl sqlx::PgExecutor<'_>,
    genus: &str,
    species: &str,
) -> Result<Vec<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT * FROM reference_taxa
         WHERE status = ANY($1) AND genus ILIKE $2 AND specific_epithet ILIKE $3
         ORDER BY source_priority ASC, completeness_score DESC, confidence_score DESC",
    )
    .bind(STATUSES_IN_SCOPE)
    .bind(genus)
    .bind(species)
    .fetch_all(executor)
    .await
}

/// Stage 5: fuzzy scientific-name match, capped at 10 candidates.
pub async fn fuzzy_scientific_name_match(
    executor: impl sqlx::PgExecutor<'_>,
    needle: &str,
) -> Result<Vec<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT * FROM reference_taxa
         WHERE status = ANY($1) AND scientific_name ILIKE $2
         ORDER BY source_priority ASC, completeness_score DESC, confidence_score DESC
         LIMIT 10",
    )
    .bind(STATUSES_IN_SCOPE)
    .bind(format!("%{}%", needle))
    .fetch_all(executor)
    .await
}

/// Best-effort resolution of `"<first> <last>"` under accepted status, used
/// by the synonym-resolution fallback chain (spec §4.5).
pub async fn find_accepted_by_genus_species(
    executor: impl sqlx::PgExecutor<'_>,
    genus: &str,
    species: &str,
) -> Result<Option<ReferenceTaxonRow>, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        "SELECT * FROM reference_taxa
         WHERE status = 'accepted' AND genus ILIKE $1 AND specific_epithet ILIKE $2
         ORDER BY source_priority ASC, completeness_score DESC
         LIMIT 1",
    )
    .bind(genus)
    .bind(species)
    .fetch_optional(executor)
    .await
}

pub async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertReferenceTaxonParams,
    parent: Option<Uuid>,
) -> Result<ReferenceTaxonRow, sqlx::Error> {
    sqlx::query_as::<_, ReferenceTaxonRow>(
        r#"INSERT INTO reference_taxa (
            taxon_id, source, source_priority, source_taxon_id, scientific_name, authorship,
            rank, kingdom, phylum, class, "order", family, subfamily, tribe, genus, subgenus,
            species, subspecies, generic_name, specific_epithet, infraspecific_epithet,
            status, extinct, environment, nomenclatural_code, parent, source_url,
            completeness_score, confidence_score, updated_at
        ) VALUES (
            gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
            $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, NOW()
        )
        ON CONFLICT (source, source_taxon_id) DO UPDATE SET
            scientific_name = EXCLUDED.scientific_name,
            authorship = EXCLUDED.authorship,
            rank = EXCLUDED.rank,
            kingdom = EXCLUDED.kingdom,
            phylum = EXCLUDED.phylum,
            class = EXCLUDED.class,
            "order" = EXCLUDED.order,
            family = EXCLUDED.family,
            subfamily = EXCLUDED.subfamily,
            tribe = EXCLUDED.tribe,
            genus = EXCLUDED.genus,
            subgenus = EXCLUDED.subgenus,
            species = EXCLUDED.species,
            subspecies = EXCLUDED.subspecies,
            generic_name = EXCLUDED.generic_name,
            specific_epithet = EXCLUDED.specific_epithet,
            infraspecific_epithet = EXCLUDED.infraspecific_epithet,
            status = EXCLUDED.status,
            extinct = EXCLUDED.extinct,
            environment = EXCLUDED.environment,
            nomenclatural_code = EXCLUDED.nomenclatural_code,
            parent = COALESCE(EXCLUDED.parent, reference_taxa.parent),
            source_url = EXCLUDED.source_url,
            completeness_score = EXCLUDED.completeness_score,
            confidence_score = EXCLUDED.confidence_score,
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(params.source)
    .bind(params.source_priority)
    .bind(params.source_taxon_id)
    .bind(params.scientific_name)
    .bind(params.authorship)
    .bind(params.rank)
    .bind(params.kingdom)
    .bind(params.phylum)
    .bind(params.class)
    .bind(params.order)
    .bind(params.family)
    .bind(params.subfamily)
    .bind(params.tribe)
    .bind(params.genus)
    .bind(params.subgenus)
    .bind(params.species)
    .bind(params.subspecies)
    .bind(params.generic_name)
    .bind(params.specific_epithet)
    .bind(params.infraspecific_epithet)
    .bind(params.status)
    .bind(params.extinct)
    .bind(params.environment)
    .bind(params.nomenclatural_code)
    .bind(parent)
    .bind(params.source_url)
    .bind(params.completeness_score)
    .bind(params.confidence_score)
    .fetch_one(executor)
    .await
}

/// Sets `accepted_name` on synonym rows once the accepted taxon is known
/// (the importer resolves this in a second pass, after all rows exist).
pub async fn set_accepted_name(
    executor: impl sqlx::PgExecutor<'_>,
    taxon_id: Uuid,
    accepted_name: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE reference_taxa SET accepted_name = $2, updated_at = NOW() WHERE taxon_id = $1")
        .bind(taxon_id)
        .bind(accepted_name)
        .execute(executor)
        .await?;
    Ok(())
}

/// Field repair (spec §4.5): persists genus/specific_epithet/infraspecific_epithet
/// parsed from `scientific_name` when they were previously missing.
pub async fn repair_fields(
    executor: impl sqlx::PgExecutor<'_>,
    taxon_id: Uuid,
    genus: &str,
    specific_epithet: &str,
    infraspecific_epithet: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE reference_taxa
         SET genus = COALESCE(NULLIF(genus, ''), $2),
             specific_epithet = COALESCE(NULLIF(specific_epithet, ''), $3),
             infraspecific_epithet = COALESCE(NULLIF(infraspecific_epithet, ''), $4),
             updated_at = NOW()
         WHERE taxon_id = $1",
    )
    .bind(taxon_id)
    .bind(genus)
    .bind(specific_epithet)
    .bind(infraspecific_epithet)
    .execute(executor)
    .await?;
    Ok(())
}
