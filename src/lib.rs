pub mod catalog;
pub mod config;
pub mod emit;
pub mod inference;
pub mod logging;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod runtime;
pub mod writer;

use wasm_bindgen::prelude::*;

use catalog::DumpCatalog;
use config::GeneratorConfig;

/// Database name given to schemas generated from a bare SQL dump
pub const DUMP_DATABASE: &str = "main";

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Generate classes from a `CREATE TABLE` dump.
///
/// Returns the artifacts as a JSON array of `{kind, relative_path, content, table}`.
#[wasm_bindgen(js_name = "generateFromSql")]
pub fn generate_from_sql(sql: &str, config_toml: Option<String>) -> Result<String, String> {
    let config = match config_toml.as_deref() {
        Some(toml) => GeneratorConfig::from_toml_str(toml).map_err(|e| e.to_string())?,
        None => GeneratorConfig::default(),
    };

    let mut catalog = DumpCatalog::parse(sql, DUMP_DATABASE).map_err(|e| e.to_string())?;
    let (schema, _) = pipeline::extract_schema(&mut catalog, &[DUMP_DATABASE.to_string()], &config)
        .map_err(|e| e.to_string())?;
    let generation = pipeline::generate(&schema, &config).map_err(|e| e.to_string())?;

    let artifacts: Vec<&emit::Artifact> = generation.artifacts().collect();
    serde_json::to_string_pretty(&artifacts).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQL: &str = "
        CREATE TABLE author (id INT NOT NULL, name VARCHAR(64), PRIMARY KEY (id));
        CREATE TABLE book (
            id INT NOT NULL,
            author_id INT NOT NULL,
            PRIMARY KEY (id),
            FOREIGN KEY (author_id) REFERENCES author (id)
        );
    ";

    #[test]
    fn test_generate_from_sql() {
        let json = generate_from_sql(SQL, None).unwrap();
        let artifacts: serde_json::Value = serde_json::from_str(&json).unwrap();
        let artifacts = artifacts.as_array().unwrap();

        assert_eq!(artifacts.len(), 6);
        assert_eq!(artifacts[0]["relative_path"], "generated/author.rs");
        assert_eq!(artifacts[0]["kind"], "generated");
        assert_eq!(artifacts[1]["kind"], "starter");
        assert_eq!(artifacts[0]["table"]["database"], "main");
        assert!(artifacts[2]["content"]
            .as_str()
            .unwrap()
            .contains("pub fn load_author("));
    }

    #[test]
    fn test_generate_from_sql_with_config() {
        let json = generate_from_sql(SQL, Some("class_prefix = \"Dbo\"".to_string())).unwrap();
        assert!(json.contains("generated/dbo_author.rs"));
    }

    #[test]
    fn test_generate_from_sql_reports_errors() {
        let err = generate_from_sql(SQL, Some("clas_prefix = 1".to_string())).unwrap_err();
        assert!(err.contains("failed to load configuration"));
    }
}
