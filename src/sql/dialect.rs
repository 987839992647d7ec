//! SQL dialect strategy table
//!
//! Dialect differences are confined to a small per-dialect style record:
//! placeholder rendering and the keyword naming the inserted row inside an
//! upsert assignment.

use std::fmt;

use crate::error::RowMapError;

/// The SQL dialects the statement builder can render for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

/// Per-dialect rendering style
struct Style {
    numbered_placeholders: bool,
    excluded_keyword: &'static str,
}

const SQLITE: Style = Style {
    numbered_placeholders: false,
    excluded_keyword: "excluded",
};

const POSTGRES: Style = Style {
    numbered_placeholders: true,
    excluded_keyword: "EXCLUDED",
};

impl Dialect {
    const fn style(self) -> &'static Style {
        match self {
            Self::Sqlite => &SQLITE,
            Self::Postgres => &POSTGRES,
        }
    }

    /// Derive the dialect from a connection URL scheme
    pub fn from_url(url: &str) -> Result<Self, RowMapError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(RowMapError::connection(format!(
                "unsupported database URL scheme '{other}'"
            ))),
        }
    }

    /// Render the placeholder at 1-based position `index`
    pub fn placeholder(self, index: usize) -> String {
        if self.style().numbered_placeholders {
            format!("${index}")
        } else {
            "?".to_string()
        }
    }

    /// Keyword naming the inserted row in an upsert assignment
    pub fn excluded_keyword(self) -> &'static str {
        self.style().excluded_keyword
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("sqlite:api.db").unwrap(), Dialect::Sqlite);
        assert_eq!(
            Dialect::from_url("postgres://localhost/db").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            Dialect::from_url("postgresql://localhost/db").unwrap(),
            Dialect::Postgres
        );
        assert!(Dialect::from_url("mysql://localhost/db").is_err());
        assert!(Dialect::from_url("").is_err());
    }

    #[test]
    fn test_placeholder_style() {
        assert_eq!(Dialect::Sqlite.placeholder(1), "?");
        assert_eq!(Dialect::Sqlite.placeholder(7), "?");
        assert_eq!(Dialect::Postgres.placeholder(1), "$1");
        assert_eq!(Dialect::Postgres.placeholder(7), "$7");
    }

    #[test]
    fn test_excluded_keyword() {
        assert_eq!(Dialect::Sqlite.excluded_keyword(), "excluded");
        assert_eq!(Dialect::Postgres.excluded_keyword(), "EXCLUDED");
    }
}
