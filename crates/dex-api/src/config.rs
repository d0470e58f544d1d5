use std::env;
use std::path::PathBuf;
use uuid::Uuid;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub blob_store_dir: PathBuf,
    /// User IDs permitted to call admin-gated endpoints (global tree scope,
    /// `recalculate_creation_index`).
    pub admin_user_ids: Vec<Uuid>,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        // Support both DATABASE_URL and separate DB_* environment variables
        // (for compatibility with Cloud SQL socket connections)
        let database_url = if let Ok(url) = env::var("DATABASE_URL") {
            url
        } else if let Ok(host) = env::var("DB_HOST") {
            let name = env::var("DB_NAME").unwrap_or_else(|_| "observing".to_string());
            let user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
            let password = env::var("DB_PASSWORD").unwrap_or_default();

            if host.starts_with("/cloudsql/") {
                // Unix socket connection for Cloud SQL
                format!(
                    "postgresql://{}:{}@localhost/{}?host={}",
                    user, password, name, host
                )
            } else {
                // Regular TCP connection
                let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    user, password, host, port, name
                )
            }
        } else {
            "postgres://localhost/observing".to_string()
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let blob_store_dir = env::var("BLOB_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./blobs"));

        let admin_user_ids = env::var("ADMIN_USER_IDS")
            .map(|s| parse_admin_ids(&s))
            .unwrap_or_default();

        Self {
            port,
            database_url,
            cors_origins,
            blob_store_dir,
            admin_user_ids,
        }
    }
}

/// Parse a comma-separated list of user-id UUIDs, trimming whitespace,
/// filtering empties, and silently dropping malformed entries.
fn parse_admin_ids(input: &str) -> Vec<Uuid> {
    input
        .split(',')
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .filter_map(|d| Uuid::parse_str(d).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_single() {
        let id = Uuid::new_v4();
        let result = parse_admin_ids(&id.to_string());
        assert_eq!(result, vec![id]);
    }

    #[test]
    fn test_parse_admin_ids_multiple_with_whitespace() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let result = parse_admin_ids(&format!(" {a} , {b} "));
        assert_eq!(result, vec![a, b]);
    }

    #[test]
    fn test_parse_admin_ids_drops_malformed() {
        let a = Uuid::new_v4();
        let result = parse_admin_ids(&format!("{a},not-a-uuid,"));
        assert_eq!(result, vec![a]);
    }

    #[test]
    fn test_parse_admin_ids_empty_string() {
        assert!(parse_admin_ids("").is_empty());
    }
}
