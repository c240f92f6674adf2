use super::ConfigError;
use super::settings::GeneratorConfig;

pub fn validate(cfg: &GeneratorConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    for (key, value) in [
        ("class_prefix", &cfg.class_prefix),
        ("generated_suffix", &cfg.generated_suffix),
        ("collection_suffix", &cfg.collection_suffix),
        ("starter_object_suffix", &cfg.starter_object_suffix),
    ] {
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push(format!("{key} must only contain ASCII letters, digits or '_' (got {value:?})"));
        }
    }

    if cfg.generated_suffix == cfg.starter_object_suffix {
        errors.push("generated_suffix and starter_object_suffix must differ".to_string());
    }

    if cfg.collection_suffix.is_empty() {
        errors.push("collection_suffix must not be empty".to_string());
    }

    if cfg.output.generated_classes == cfg.output.starter_classes {
        errors.push("output.generated_classes and output.starter_classes must differ".to_string());
    }

    // Emitted code reaches the sibling tree through `super::super::<dir>`.
    for (key, dir) in [
        ("output.generated_classes", &cfg.output.generated_classes),
        ("output.starter_classes", &cfg.output.starter_classes),
    ] {
        let segment = dir.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let starts_ok = segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_ok || !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push(format!(
                "{key} must end in a directory usable as a module name (got \"{}\")",
                dir.display()
            ));
        }
    }

    if cfg.output.runtime_path.trim().is_empty() {
        errors.push("output.runtime_path must not be empty".to_string());
    }

    let mut scopes: Vec<(String, Option<String>)> = vec![(String::new(), None)];
    for (db_name, db) in &cfg.databases {
        scopes.push((db_name.clone(), None));
        for table in db.tables.keys() {
            scopes.push((db_name.clone(), Some(table.clone())));
        }
    }

    for (db, table) in &scopes {
        let scope = match table {
            Some(t) => format!("databases.{db}.tables.{t}"),
            None if db.is_empty() => "global".to_string(),
            None => format!("databases.{db}"),
        };
        match cfg.resolve(db, table.as_deref()) {
            Ok(resolved) => {
                if resolved.id_to_table.captures_len() < 2 {
                    errors.push(format!(
                        "{scope}: field_settings.id_to_table_regex needs a capture group for the table stem"
                    ));
                }
                if resolved.join_table.captures_len() < 3 {
                    errors.push(format!(
                        "{scope}: table_settings.join_table_regex needs two capture groups"
                    ));
                }
            }
            Err(err) => errors.push(format!("{scope}: {err}")),
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    Err(ConfigError::Invalid(format!(
        "invalid generator config:\n- {}",
        errors.join("\n- ")
    )))
}

