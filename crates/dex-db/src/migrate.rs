use sqlx::PgPool;
use tracing::info;

/// Run all database migrations (idempotent).
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            user_id UUID PRIMARY KEY,
            friend_code TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS reference_taxa (
            taxon_id UUID PRIMARY KEY,
            source TEXT NOT NULL,
            source_priority INTEGER NOT NULL DEFAULT 100,
            source_taxon_id TEXT NOT NULL,
            scientific_name TEXT NOT NULL,
            authorship TEXT,
            rank TEXT NOT NULL,
            kingdom TEXT,
            phylum TEXT,
            class TEXT,
            "order" TEXT,
            family TEXT,
            subfamily TEXT,
            tribe TEXT,
            genus TEXT,
            subgenus TEXT,
            species TEXT,
            subspecies TEXT,
            generic_name TEXT,
            specific_epithet TEXT,
            infraspecific_epithet TEXT,
            status TEXT NOT NULL CHECK (status IN ('accepted', 'provisional', 'synonym', 'ambiguous', 'misapplied', 'doubtful')),
            extinct BOOLEAN NOT NULL DEFAULT FALSE,
            environment TEXT[] NOT NULL DEFAULT '{}',
            nomenclatural_code TEXT,
            parent UUID REFERENCES reference_taxa(taxon_id),
            accepted_name UUID REFERENCES reference_taxa(taxon_id),
            source_url TEXT,
            completeness_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (source, source_taxon_id)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS reference_taxa_genus_epithet_idx ON reference_taxa(genus, specific_epithet)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS reference_taxa_scientific_name_idx ON reference_taxa(scientific_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS reference_taxa_status_idx ON reference_taxa(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS reference_taxa_parent_idx ON reference_taxa(parent)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS name_relations (
            id UUID PRIMARY KEY,
            name_taxon UUID NOT NULL REFERENCES reference_taxa(taxon_id) ON DELETE CASCADE,
            related_name_taxon UUID NOT NULL REFERENCES reference_taxa(taxon_id) ON DELETE CASCADE,
            relation_type TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS name_relations_name_taxon_idx ON name_relations(name_taxon)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS common_names (
            id UUID PRIMARY KEY,
            taxon UUID NOT NULL REFERENCES reference_taxa(taxon_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            is_preferred BOOLEAN NOT NULL DEFAULT FALSE,
            UNIQUE (taxon, name, language, country)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS common_names_name_idx ON common_names(name)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS canonical_animals (
            animal_id UUID PRIMARY KEY,
            scientific_name TEXT NOT NULL UNIQUE,
            kingdom TEXT,
            phylum TEXT,
            class TEXT,
            "order" TEXT,
            family TEXT,
            genus TEXT,
            species TEXT,
            creation_index BIGINT NOT NULL UNIQUE,
            created_by_user_id UUID REFERENCES users(user_id),
            verified BOOLEAN NOT NULL DEFAULT FALSE,
            verification_method TEXT,
            taxonomy_id UUID REFERENCES reference_taxa(taxon_id),
            taxonomy_confidence DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS canonical_animals_creation_index_idx ON canonical_animals(creation_index)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS image_conversions (
            conv_id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            original_bytes_ref TEXT NOT NULL,
            normalized_bytes_ref TEXT NOT NULL,
            original_format TEXT NOT NULL,
            original_width INTEGER NOT NULL,
            original_height INTEGER NOT NULL,
            converted_width INTEGER NOT NULL,
            converted_height INTEGER NOT NULL,
            transformations_applied JSONB NOT NULL DEFAULT '{}',
            checksum TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMPTZ NOT NULL,
            bound BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS image_conversions_user_idx ON image_conversions(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS image_conversions_reap_idx ON image_conversions(bound, expires_at, created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analysis_jobs (
            job_id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            conversion_id UUID REFERENCES image_conversions(conv_id),
            raw_image_ref TEXT,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
            cv_method TEXT NOT NULL,
            model_name TEXT NOT NULL,
            detail_level TEXT NOT NULL,
            post_conversion_transformations JSONB,
            raw_response TEXT,
            parsed_prediction TEXT,
            detected_animals JSONB NOT NULL DEFAULT '[]',
            selected_index INTEGER,
            identified_animal UUID REFERENCES canonical_animals(animal_id),
            cost_usd DOUBLE PRECISION,
            processing_time DOUBLE PRECISION,
            input_tokens INTEGER,
            output_tokens INTEGER,
            retry_count INTEGER NOT NULL DEFAULT 0,
            retry_after TIMESTAMPTZ,
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS analysis_jobs_user_idx ON analysis_jobs(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS analysis_jobs_status_idx ON analysis_jobs(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS observations (
            observation_id UUID PRIMARY KEY,
            owner_user_id UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            animal_id UUID NOT NULL REFERENCES canonical_animals(animal_id),
            original_image_ref TEXT,
            processed_image_ref TEXT,
            image_checksum TEXT,
            lat DOUBLE PRECISION,
            lon DOUBLE PRECISION,
            location_name TEXT,
            notes TEXT,
            customizations JSONB NOT NULL DEFAULT '{}',
            catch_date TIMESTAMPTZ NOT NULL,
            visibility TEXT NOT NULL DEFAULT 'private' CHECK (visibility IN ('private', 'friends', 'public')),
            is_favorite BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (owner_user_id, animal_id, catch_date)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS observations_owner_idx ON observations(owner_user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS observations_animal_idx ON observations(animal_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS observations_updated_at_idx ON observations(updated_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS friendships (
            id UUID PRIMARY KEY,
            from_user UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            to_user UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'accepted', 'rejected', 'blocked')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (from_user, to_user),
            CHECK (from_user <> to_user)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS friendships_to_user_idx ON friendships(to_user, status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS import_jobs (
            id UUID PRIMARY KEY,
            source TEXT NOT NULL,
            version TEXT,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN
                ('pending', 'downloading', 'processing', 'validating', 'importing', 'completed', 'failed', 'cancelled')),
            records_total BIGINT NOT NULL DEFAULT 0,
            records_imported BIGINT NOT NULL DEFAULT 0,
            records_failed BIGINT NOT NULL DEFAULT 0,
            error_log JSONB NOT NULL DEFAULT '[]',
            metadata JSONB NOT NULL DEFAULT '{}',
            file_path TEXT,
            file_size BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS import_jobs_source_status_idx ON import_jobs(source, status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS raw_reference_rows (
            id UUID PRIMARY KEY,
            import_job_id UUID NOT NULL REFERENCES import_jobs(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            row_kind TEXT NOT NULL DEFAULT 'name_usage' CHECK (row_kind IN ('name_usage', 'name_relation', 'vernacular_name')),
            col_id TEXT NOT NULL,
            columns JSONB NOT NULL,
            is_processed BOOLEAN NOT NULL DEFAULT FALSE,
            processing_errors JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS raw_reference_rows_unprocessed_idx
            ON raw_reference_rows(import_job_id, row_kind) WHERE NOT is_processed",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS raw_reference_rows_col_id_idx ON raw_reference_rows(source, col_id)")
        .execute(pool)
        .await?;

    info!("Database migrations completed");
    Ok(())
}
