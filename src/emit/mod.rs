//! Source text for the generated and starter classes.
//!
//! Emission is pure: it turns derived names plus the schema into [`Artifact`]s
//! and leaves disk access to the writer.

mod generated;
pub mod measure;
mod starter;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::model::{Schema, TableRef};
use crate::naming::TableNames;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Rewritten whenever its content changes
    Generated,
    /// Written once, then owned by the user
    Starter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Relative to the output root
    pub relative_path: PathBuf,
    pub content: String,
    /// `None` for module indexes
    pub table: Option<TableRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Path the emitted code imports the runtime interface from
    pub runtime_path: String,
    pub generated_dir: PathBuf,
    pub starter_dir: PathBuf,
}

impl EmitOptions {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            runtime_path: config.output.runtime_path.clone(),
            generated_dir: config.output.generated_classes.clone(),
            starter_dir: config.output.starter_classes.clone(),
        }
    }
}

/// Soft-delete column and value of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFlag {
    pub column: String,
    pub value: String,
}

/// Generated and starter artifacts for one table.
pub fn emit_table(
    schema: &Schema,
    names: &TableNames,
    options: &EmitOptions,
    delete_flag: Option<&DeleteFlag>,
) -> Vec<Artifact> {
    let file = format!("{}.rs", names.class.module);
    vec![
        Artifact {
            kind: ArtifactKind::Generated,
            relative_path: options.generated_dir.join(&file),
            content: generated::render(schema, names, options, delete_flag),
            table: Some(names.table.clone()),
        },
        Artifact {
            kind: ArtifactKind::Starter,
            relative_path: options.starter_dir.join(&file),
            content: starter::render(names, options),
            table: Some(names.table.clone()),
        },
    ]
}

/// `mod.rs` indexes for both output directories, listing `modules` in order.
///
/// The generated index is rewritten each run. The starter index is written
/// once like any starter, so modules registered there by hand survive.
pub fn emit_indexes(modules: &[String], options: &EmitOptions) -> Vec<Artifact> {
    vec![
        Artifact {
            kind: ArtifactKind::Generated,
            relative_path: options.generated_dir.join("mod.rs"),
            content: render_index("// @generated by dbclassgen. Do not edit.\n", modules),
            table: None,
        },
        Artifact {
            kind: ArtifactKind::Starter,
            relative_path: options.starter_dir.join("mod.rs"),
            content: render_index(
                "// Written once by dbclassgen. Add modules for new tables here.\n",
                modules,
            ),
            table: None,
        },
    ]
}

fn render_index(header: &str, modules: &[String]) -> String {
    let mut output = format!("{header}\n");
    for module in modules {
        output.push_str(&format!("pub mod {module};\n"));
    }
    output
}

/// Modules of `modules` that an index file does not declare.
pub fn undeclared<'a>(index: &str, modules: &'a [String]) -> Vec<&'a str> {
    let declared: BTreeSet<&str> = index
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = line
                .strip_prefix("pub(crate) ")
                .or_else(|| line.strip_prefix("pub "))
                .unwrap_or(line);
            line.strip_prefix("mod ")?.strip_suffix(';')
        })
        .collect();
    modules
        .iter()
        .map(String::as_str)
        .filter(|module| !declared.contains(module))
        .collect()
}

/// Path from one output directory to a module of its sibling `dir`.
fn sibling(dir: &Path, module: &str) -> String {
    format!("super::super::{}::{module}", module_segment(dir))
}

/// Last component of an output directory, which names its module.
fn module_segment(dir: &Path) -> &str {
    dir.file_name().and_then(|s| s.to_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer;
    use crate::model::{Column, DefaultValue, Table};
    use crate::naming::NameMap;

    fn column(name: &str, pk: bool, typ: &str) -> Column {
        Column {
            name: name.to_string(),
            nullable: !pk,
            default: DefaultValue::Absent,
            typ: typ.to_string(),
            size: None,
            is_primary_key: pk,
        }
    }

    pub(super) fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new();
        for t in tables {
            schema.add_table(t);
        }
        infer(&mut schema, &GeneratorConfig::default()).unwrap();
        schema
    }

    pub(super) fn table(db: &str, name: &str, pk: &[&str], columns: &[&str]) -> Table {
        let mut t = Table::new(db, name);
        t.columns = pk
            .iter()
            .map(|c| column(c, true, "int"))
            .chain(columns.iter().map(|c| column(c, false, "varchar")))
            .collect();
        t
    }

    pub(super) fn emit(schema: &Schema, db: &str, name: &str) -> Vec<Artifact> {
        let names = NameMap::build(schema, &GeneratorConfig::default())
            .unwrap()
            .derive(schema, &TableRef::new(db, name))
            .unwrap();
        let options = EmitOptions::from_config(&GeneratorConfig::default());
        emit_table(schema, &names, &options, None)
    }

    #[test]
    fn test_artifact_paths() {
        let s = schema(vec![table("crm", "cust_pc", &["id"], &["label"])]);
        let artifacts = emit(&s, "crm", "cust_pc");

        assert_eq!(artifacts[0].kind, ArtifactKind::Generated);
        assert_eq!(artifacts[0].relative_path, PathBuf::from("generated/cust_pc.rs"));
        assert_eq!(artifacts[1].kind, ArtifactKind::Starter);
        assert_eq!(artifacts[1].relative_path, PathBuf::from("concrete/cust_pc.rs"));
    }

    #[test]
    fn test_indexes() {
        let options = EmitOptions::from_config(&GeneratorConfig::default());
        let indexes = emit_indexes(&["author".to_string(), "book".to_string()], &options);

        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[1].relative_path, PathBuf::from("concrete/mod.rs"));
        assert!(indexes[0].content.ends_with("pub mod author;\npub mod book;\n"));
        assert!(indexes[1].content.ends_with("pub mod author;\npub mod book;\n"));
        assert_eq!(indexes[0].kind, ArtifactKind::Generated);
        assert_eq!(indexes[1].kind, ArtifactKind::Starter);
    }

    #[test]
    fn test_undeclared_modules() {
        let modules = vec!["author".to_string(), "book".to_string(), "shelf".to_string()];
        let index = "// mine\npub mod author;\nmod book;\npub mod custom;\n";

        assert_eq!(undeclared(index, &modules), vec!["shelf"]);
    }

    #[test]
    fn test_module_segment() {
        assert_eq!(module_segment(Path::new("src/models/generated/")), "generated");
        assert_eq!(module_segment(Path::new("concrete")), "concrete");
        assert_eq!(sibling(Path::new("out/concrete"), "book"), "super::super::concrete::book");
    }
}
