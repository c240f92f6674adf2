use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub class_prefix: String,
    pub generated_suffix: String,
    pub collection_suffix: String,
    pub starter_object_suffix: String,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub relations: RelationsConfig,
    pub emit: EmitConfig,
    pub table_settings: TableSettings,
    pub field_settings: FieldSettings,
    pub databases: BTreeMap<String, DatabaseConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            class_prefix: String::new(),
            generated_suffix: defaults::DEFAULT_GENERATED_SUFFIX.to_string(),
            collection_suffix: defaults::DEFAULT_COLLECTION_SUFFIX.to_string(),
            starter_object_suffix: defaults::DEFAULT_STARTER_OBJECT_SUFFIX.to_string(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            relations: RelationsConfig::default(),
            emit: EmitConfig::default(),
            table_settings: TableSettings::default(),
            field_settings: FieldSettings::default(),
            databases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Root directory both trees are written under
    pub root: PathBuf,
    pub generated_classes: PathBuf,
    pub starter_classes: PathBuf,
    /// Module path the emitted code imports the runtime interface from
    pub runtime_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            generated_classes: PathBuf::from(defaults::DEFAULT_GENERATED_DIR),
            starter_classes: PathBuf::from(defaults::DEFAULT_STARTER_DIR),
            runtime_path: defaults::DEFAULT_RUNTIME_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationsConfig {
    pub allow_cross_database: bool,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            allow_cross_database: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    /// Emit classes for detected join tables too
    pub join_table_classes: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSettings {
    pub match_table_name_prefixes: Vec<String>,
    pub strip_table_name_prefixes: Vec<String>,
    pub ignore_tables_matching_regex: String,
    pub join_table_regex: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            match_table_name_prefixes: Vec::new(),
            strip_table_name_prefixes: Vec::new(),
            ignore_tables_matching_regex: String::new(),
            join_table_regex: defaults::DEFAULT_JOIN_TABLE_REGEX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSettings {
    pub id_to_table_regex: String,
    pub strip_field_prefixes: Vec<String>,
    pub delete_flag_column: String,
    pub delete_flag_value: String,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            id_to_table_regex: defaults::DEFAULT_ID_TO_TABLE_REGEX.to_string(),
            strip_field_prefixes: defaults::DEFAULT_STRIP_FIELD_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            delete_flag_column: String::new(),
            delete_flag_value: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSettingsOverride {
    pub match_table_name_prefixes: Option<Vec<String>>,
    pub strip_table_name_prefixes: Option<Vec<String>>,
    pub ignore_tables_matching_regex: Option<String>,
    pub join_table_regex: Option<String>,
}

impl TableSettingsOverride {
    pub(crate) fn apply(&self, base: &mut TableSettings) {
        if let Some(v) = &self.match_table_name_prefixes {
            base.match_table_name_prefixes = v.clone();
        }
        if let Some(v) = &self.strip_table_name_prefixes {
            base.strip_table_name_prefixes = v.clone();
        }
        if let Some(v) = &self.ignore_tables_matching_regex {
            base.ignore_tables_matching_regex = v.clone();
        }
        if let Some(v) = &self.join_table_regex {
            base.join_table_regex = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSettingsOverride {
    pub id_to_table_regex: Option<String>,
    pub strip_field_prefixes: Option<Vec<String>>,
    pub delete_flag_column: Option<String>,
    pub delete_flag_value: Option<String>,
}

impl FieldSettingsOverride {
    pub(crate) fn apply(&self, base: &mut FieldSettings) {
        if let Some(v) = &self.id_to_table_regex {
            base.id_to_table_regex = v.clone();
        }
        if let Some(v) = &self.strip_field_prefixes {
            base.strip_field_prefixes = v.clone();
        }
        if let Some(v) = &self.delete_flag_column {
            base.delete_flag_column = v.clone();
        }
        if let Some(v) = &self.delete_flag_value {
            base.delete_flag_value = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection parameters, handed to the catalog driver untouched
    pub dsn: String,
    pub table_settings: TableSettingsOverride,
    pub field_settings: FieldSettingsOverride,
    pub tables: BTreeMap<String, TableConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Replaces the catalog primary key (views, keyless tables)
    pub primary_key: Option<Vec<String>>,
    pub table_settings: TableSettingsOverride,
    pub field_settings: FieldSettingsOverride,
}
