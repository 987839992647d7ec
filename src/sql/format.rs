//! Pure SQL fragment formatting
//!
//! String functions that turn column-name lists into the comma-joined
//! fragments a statement is assembled from. All functions are pure; inputs
//! are internal column-name lists that are well formed by construction.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, RowMapError};
use crate::sql::dialect::Dialect;

/// Comma-joined column list: `id,email,name`
pub fn column_names(cols: &[&str]) -> String {
    cols.join(",")
}

/// Positional placeholders for `cols`, starting at position 1:
/// `?,?,?` (sqlite) or `$1,$2,$3` (postgres)
pub fn placeholders(cols: &[&str], dialect: Dialect) -> String {
    (1..=cols.len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(",")
}

/// Assignment pairs for UPDATE SET and upsert DO-UPDATE-SET clauses:
/// `a=?,b=?` or `a=$3,b=$4` with numbering starting at `start`
pub fn assignment_list(cols: &[&str], dialect: Dialect, start: usize) -> String {
    cols.iter()
        .enumerate()
        .map(|(i, col)| format!("{}={}", col, dialect.placeholder(start + i)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Upsert assignments that reuse the inserted row's values without
/// re-binding arguments: `a=excluded.a` (sqlite) / `a=EXCLUDED.a` (postgres)
pub fn excluded_assignment_list(cols: &[&str], dialect: Dialect) -> String {
    let keyword = dialect.excluded_keyword();
    cols.iter()
        .map(|col| format!("{col}={keyword}.{col}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Rewrite the `?` placeholders of a raw fragment for `dialect`, numbering
/// from `start`, and report how many were consumed.
///
/// Fragments must not contain a literal `?` outside of a placeholder
/// position; quoted literals are not parsed.
pub fn number_fragment(fragment: &str, dialect: Dialect, start: usize) -> (String, usize) {
    let mut count = 0;
    let rewritten = fragment
        .chars()
        .map(|c| {
            if c == '?' {
                let placeholder = dialect.placeholder(start + count);
                count += 1;
                placeholder
            } else {
                c.to_string()
            }
        })
        .collect();
    (rewritten, count)
}

/// Extract the table name from a `CREATE TABLE [IF NOT EXISTS]` statement
pub fn table_name_from_create_sql(sql: &str) -> Result<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)").unwrap()
    });
    re.captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| RowMapError::validation("table name not found in CREATE TABLE statement"))
}
