//! Error types for rainbridge

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// rainbridge errors
#[derive(Error, Debug)]
pub enum Error {
    /// Every search directory and every path variant was tried.
    /// `name` is the name the caller asked for, never a fallback variant.
    #[error("Template not found: {name} (searched {} directories)", searched.len())]
    TemplateNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Invalid template name: {0}")]
    InvalidTemplateName(String),

    #[error("Unbalanced loop directive at line {line} (depth {depth})")]
    UnbalancedLoop { line: usize, depth: i64 },

    #[error("Unknown template function: {0}")]
    UnknownFunction(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the not-found case the engine loader maps to `None`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TemplateNotFound { .. })
    }
}

impl From<minijinja::Error> for Error {
    fn from(e: minijinja::Error) -> Self {
        Error::Render(e.to_string())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
