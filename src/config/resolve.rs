//! Per-database and per-table settings resolution.

use regex::Regex;

use super::ConfigError;
use super::settings::{FieldSettings, GeneratorConfig, TableSettings};

/// Effective settings for one database or table, regexes compiled.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub table: TableSettings,
    pub field: FieldSettings,
    pub ignore_tables: Option<Regex>,
    pub id_to_table: Regex,
    pub join_table: Regex,
    pub primary_key: Option<Vec<String>>,
}

impl Resolved {
    /// Every table-name prefix that may be removed when matching names.
    pub fn table_prefixes(&self) -> impl Iterator<Item = &str> {
        self.table
            .strip_table_name_prefixes
            .iter()
            .chain(self.table.match_table_name_prefixes.iter())
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn is_ignored(&self, table: &str) -> bool {
        if self.ignore_tables.as_ref().is_some_and(|re| re.is_match(table)) {
            return true;
        }
        let prefixes = &self.table.match_table_name_prefixes;
        !prefixes.is_empty() && !prefixes.iter().any(|p| table.starts_with(p.as_str()))
    }

    pub fn delete_flag(&self) -> Option<(&str, &str)> {
        if self.field.delete_flag_column.is_empty() {
            None
        } else {
            Some((
                self.field.delete_flag_column.as_str(),
                self.field.delete_flag_value.as_str(),
            ))
        }
    }
}

impl GeneratorConfig {
    /// Resolve settings table → database → global, per key.
    pub fn resolve(&self, database: &str, table: Option<&str>) -> Result<Resolved, ConfigError> {
        let mut table_settings = self.table_settings.clone();
        let mut field_settings = self.field_settings.clone();
        let mut primary_key = None;

        if let Some(db) = self.databases.get(database) {
            db.table_settings.apply(&mut table_settings);
            db.field_settings.apply(&mut field_settings);

            if let Some(tc) = table.and_then(|t| db.tables.get(t)) {
                tc.table_settings.apply(&mut table_settings);
                tc.field_settings.apply(&mut field_settings);
                primary_key = tc.primary_key.clone();
            }
        }

        let ignore_tables = if table_settings.ignore_tables_matching_regex.is_empty() {
            None
        } else {
            Some(compile(
                "table_settings.ignore_tables_matching_regex",
                &table_settings.ignore_tables_matching_regex,
            )?)
        };
        let id_to_table = compile("field_settings.id_to_table_regex", &field_settings.id_to_table_regex)?;
        let join_table = compile("table_settings.join_table_regex", &table_settings.join_table_regex)?;

        Ok(Resolved {
            table: table_settings,
            field: field_settings,
            ignore_tables,
            id_to_table,
            join_table,
            primary_key,
        })
    }
}

pub(crate) fn compile(key: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{DatabaseConfig, TableConfig, TableSettingsOverride};

    #[test]
    fn test_table_override_wins_over_database() {
        let mut cfg = GeneratorConfig::default();
        cfg.table_settings.strip_table_name_prefixes = vec!["g_".to_string()];

        let mut db = DatabaseConfig::default();
        db.table_settings = TableSettingsOverride {
            strip_table_name_prefixes: Some(vec!["db_".to_string()]),
            ..Default::default()
        };
        let mut tc = TableConfig::default();
        tc.table_settings.strip_table_name_prefixes = Some(vec!["t_".to_string()]);
        tc.primary_key = Some(vec!["code".to_string()]);
        db.tables.insert("t_view".to_string(), tc);
        cfg.databases.insert("shop".to_string(), db);

        let global = cfg.resolve("other", None).unwrap();
        assert_eq!(global.table.strip_table_name_prefixes, vec!["g_"]);

        let database = cfg.resolve("shop", Some("orders")).unwrap();
        assert_eq!(database.table.strip_table_name_prefixes, vec!["db_"]);
        assert!(database.primary_key.is_none());

        let table = cfg.resolve("shop", Some("t_view")).unwrap();
        assert_eq!(table.table.strip_table_name_prefixes, vec!["t_"]);
        assert_eq!(table.primary_key, Some(vec!["code".to_string()]));
    }

    #[test]
    fn test_ignore_and_match_prefixes() {
        let mut cfg = GeneratorConfig::default();
        cfg.table_settings.ignore_tables_matching_regex = "^tmp_".to_string();
        cfg.table_settings.match_table_name_prefixes = vec!["cust_".to_string(), "tmp_".to_string()];

        let resolved = cfg.resolve("shop", None).unwrap();
        assert!(resolved.is_ignored("tmp_import"));
        assert!(resolved.is_ignored("audit"));
        assert!(!resolved.is_ignored("cust_order"));
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let mut cfg = GeneratorConfig::default();
        cfg.field_settings.id_to_table_regex = "(".to_string();

        let err = cfg.resolve("shop", None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { ref key, .. } if key == "field_settings.id_to_table_regex"));
    }
}
