//! Snapshot table layout and naming
//!
//! Each calendar day gets its own table, `broken_links_YYYY_MM_DD`. Table
//! names are only ever built from a date or validated against that shape
//! before being spliced into SQL.

use super::traits::{StorageError, StorageResult};
use chrono::NaiveDate;

/// Prefix shared by every snapshot table
pub const SNAPSHOT_TABLE_PREFIX: &str = "broken_links_";

const TABLE_DATE_FORMAT: &str = "%Y_%m_%d";

/// Lists candidate snapshot tables
pub const LIST_SNAPSHOT_TABLES_SQL: &str = r#"
SELECT name FROM sqlite_master
WHERE type = 'table' AND name LIKE 'broken\_links\_%' ESCAPE '\'
ORDER BY name
"#;

/// Checks whether a table exists
pub const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";

/// Connection settings applied when a database file is opened
pub const PRAGMAS_SQL: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA temp_store = MEMORY;
";

/// Returns the table name for a snapshot date
pub fn table_name_for(date: NaiveDate) -> String {
    format!("{}{}", SNAPSHOT_TABLE_PREFIX, date.format(TABLE_DATE_FORMAT))
}

/// Parses the date out of a snapshot table name
///
/// Returns None for tables that share the prefix but are not dated snapshots.
pub fn date_from_table_name(name: &str) -> Option<NaiveDate> {
    let suffix = name.strip_prefix(SNAPSHOT_TABLE_PREFIX)?;
    if suffix.len() != 10 || !suffix.chars().all(|c| c.is_ascii_digit() || c == '_') {
        return None;
    }
    NaiveDate::parse_from_str(suffix, TABLE_DATE_FORMAT).ok()
}

/// Returns the name unchanged if it is a well-formed snapshot table name
pub fn validate_table_name(name: &str) -> StorageResult<&str> {
    match date_from_table_name(name) {
        Some(date) if table_name_for(date) == name => Ok(name),
        _ => Err(StorageError::InvalidTableName(name.to_string())),
    }
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    Region TEXT NOT NULL,
    URL TEXT NOT NULL,
    Status TEXT NOT NULL,
    Path TEXT NOT NULL DEFAULT '',
    Visible INTEGER NOT NULL DEFAULT 0,
    Timestamp TEXT NOT NULL,
    PRIMARY KEY (Region, URL)
);
"#
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

pub fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (Region, URL, Status, Path, Visible, Timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        table
    )
}

pub fn select_sql(table: &str) -> String {
    format!(
        "SELECT Region, URL, Status, Path, Visible, Timestamp FROM {} ORDER BY rowid",
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for_date() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(table_name_for(date), "broken_links_2025_08_01");
        assert_eq!(date_from_table_name("broken_links_2025_08_01"), Some(date));
    }

    #[test]
    fn test_non_snapshot_tables() {
        assert_eq!(date_from_table_name("broken_links_backup"), None);
        assert_eq!(date_from_table_name("broken_links_2025_13_01"), None);
        assert_eq!(date_from_table_name("changes_2025_08_01"), None);
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("broken_links_2025_08_01").is_ok());
        assert!(validate_table_name("broken_links_2025_8_1x").is_err());
        assert!(validate_table_name("broken_links_2025_08_01; DROP TABLE x").is_err());
    }
}
