use std::fmt;

#[derive(Debug)]
pub enum GraphError {
    Database(sqlx::Error),
    PermissionDenied,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "{}", e),
            Self::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            Self::PermissionDenied => None,
        }
    }
}

impl From<sqlx::Error> for GraphError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
