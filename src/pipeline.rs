//! One generator run: extract, infer, derive names, emit, write.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{self, CatalogDriver, CatalogError};
use crate::config::{ConfigError, GeneratorConfig};
use crate::emit::{self, Artifact, ArtifactKind, DeleteFlag, EmitOptions};
use crate::emit::measure::TextTable;
use crate::inference::{self, InferenceReport};
use crate::model::{Schema, Table, TableRef};
use crate::naming::NameMap;
use crate::writer::{WriteError, WriteOutcome, Writer};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    Emitted {
        generated: WriteOutcome,
        starter: WriteOutcome,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl TableStatus {
    pub fn label(&self) -> String {
        match self {
            TableStatus::Emitted { generated, starter } => {
                format!("generated {generated}, starter {starter}")
            }
            TableStatus::Skipped { reason } => format!("skipped: {reason}"),
            TableStatus::Failed { reason } => format!("failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: TableRef,
    /// Class stem, when names could be derived
    pub class: Option<String>,
    pub status: TableStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub tables: Vec<TableReport>,
    pub indexes: Vec<(PathBuf, WriteOutcome)>,
    /// Emitted modules a preserved starter index does not declare
    pub unregistered: Vec<String>,
    /// False iff any table failed
    pub success: bool,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &TableReport> {
        self.tables
            .iter()
            .filter(|t| matches!(t.status, TableStatus::Failed { .. }))
    }

    /// Aligned per-table summary for terminal output.
    pub fn render(&self) -> String {
        let mut table = TextTable::new(&["table", "class", "outcome"]);
        for report in &self.tables {
            table.push_row(vec![
                report.table.to_string(),
                report.class.clone().unwrap_or_default(),
                report.status.label(),
            ]);
        }
        let mut output = table.render().join("\n");
        output.push('\n');
        output
    }
}

/// What emission decided for one table, before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    Emit { generated: Artifact, starter: Artifact },
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    pub table: TableRef,
    pub class: Option<String>,
    pub planned: Planned,
}

/// Every artifact of a run, grouped by table, plus the module indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub tables: Vec<PlannedTable>,
    /// Emitted modules, sorted
    pub modules: Vec<String>,
    pub indexes: Vec<Artifact>,
}

impl Generation {
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.tables
            .iter()
            .flat_map(|t| match &t.planned {
                Planned::Emit { generated, starter } => vec![generated, starter],
                Planned::Skipped(_) | Planned::Failed(_) => Vec::new(),
            })
            .chain(self.indexes.iter())
    }
}

/// Extract the named databases from `driver` and infer relationships.
pub fn extract_schema(
    driver: &mut dyn CatalogDriver,
    databases: &[String],
    config: &GeneratorConfig,
) -> Result<(Schema, InferenceReport), PipelineError> {
    let mut schema = Schema::new();
    for database in databases {
        catalog::extract_database(driver, database, config, &mut schema)?;
    }
    let report = inference::infer(&mut schema, config)?;
    Ok((schema, report))
}

/// Emit artifacts for every table of an inferred schema. Touches no disk.
///
/// A table whose names collide is reported failed; the others still emit.
pub fn generate(schema: &Schema, config: &GeneratorConfig) -> Result<Generation, ConfigError> {
    let names = NameMap::build(schema, config)?;
    let options = EmitOptions::from_config(config);

    let mut tables = Vec::new();
    let mut modules = Vec::new();
    for table in schema.tables() {
        let table_ref = table.table_ref();
        let class = names.class(&table_ref).map(|c| c.stem.clone());

        if schema.is_join_table(&table_ref) && !config.emit.join_table_classes {
            tracing::debug!(table = %table_ref, "join table; no class emitted");
            tables.push(PlannedTable {
                table: table_ref,
                class,
                planned: Planned::Skipped("join table".to_string()),
            });
            continue;
        }

        let derived = match names.derive(schema, &table_ref) {
            Ok(derived) => derived,
            Err(err) => {
                tracing::error!(table = %table_ref, error = %err, "cannot name table");
                tables.push(PlannedTable {
                    table: table_ref,
                    class,
                    planned: Planned::Failed(err.to_string()),
                });
                continue;
            }
        };

        let delete_flag = delete_flag(table, config)?;
        let mut artifacts = emit::emit_table(schema, &derived, &options, delete_flag.as_ref());
        let (Some(starter), Some(generated)) = (artifacts.pop(), artifacts.pop()) else {
            continue;
        };
        modules.push(derived.class.module.clone());
        tables.push(PlannedTable {
            table: table_ref,
            class,
            planned: Planned::Emit { generated, starter },
        });
    }

    modules.sort();
    let indexes = emit::emit_indexes(&modules, &options);
    Ok(Generation {
        tables,
        modules,
        indexes,
    })
}

/// Soft-delete flag for `table`, if configured and the table carries the column.
fn delete_flag(table: &Table, config: &GeneratorConfig) -> Result<Option<DeleteFlag>, ConfigError> {
    let settings = config.resolve(&table.database, Some(&table.name))?;
    let Some((column, value)) = settings.delete_flag() else {
        return Ok(None);
    };
    if !table.has_column(column) {
        tracing::debug!(table = %table.table_ref(), column, "no delete flag column");
        return Ok(None);
    }
    Ok(Some(DeleteFlag {
        column: column.to_string(),
        value: value.to_string(),
    }))
}

/// Write a generation and collect per-table outcomes.
///
/// A write failure aborts the run; files written before it stay on disk.
pub fn write(generation: &Generation, writer: &Writer) -> Result<RunReport, WriteError> {
    let mut tables = Vec::with_capacity(generation.tables.len());
    for planned in &generation.tables {
        let status = match &planned.planned {
            Planned::Emit { generated, starter } => TableStatus::Emitted {
                generated: writer.write(generated)?,
                starter: writer.write(starter)?,
            },
            Planned::Skipped(reason) => TableStatus::Skipped {
                reason: reason.clone(),
            },
            Planned::Failed(reason) => TableStatus::Failed {
                reason: reason.clone(),
            },
        };
        tables.push(TableReport {
            table: planned.table.clone(),
            class: planned.class.clone(),
            status,
        });
    }

    let mut indexes = Vec::with_capacity(generation.indexes.len());
    let mut unregistered = Vec::new();
    for index in &generation.indexes {
        let outcome = writer.write(index)?;
        if index.kind == ArtifactKind::Starter && outcome == WriteOutcome::Preserved {
            let existing = writer.existing(index)?.unwrap_or_default();
            for module in emit::undeclared(&existing, &generation.modules) {
                tracing::warn!(
                    index = %index.relative_path.display(),
                    module,
                    "starter index does not declare an emitted module"
                );
                unregistered.push(module.to_string());
            }
        }
        indexes.push((index.relative_path.clone(), outcome));
    }

    let success = !tables
        .iter()
        .any(|t| matches!(t.status, TableStatus::Failed { .. }));
    Ok(RunReport {
        tables,
        indexes,
        unregistered,
        success,
    })
}

/// Full run against an already opened catalog.
pub fn run_with(
    driver: &mut dyn CatalogDriver,
    databases: &[String],
    config: &GeneratorConfig,
    writer: &Writer,
) -> Result<RunReport, PipelineError> {
    let (schema, _) = extract_schema(driver, databases, config)?;
    let generation = generate(&schema, config)?;
    let report = write(&generation, writer)?;

    let written = report
        .tables
        .iter()
        .filter(|t| match t.status {
            TableStatus::Emitted { generated, starter } => {
                generated.touches_disk() || starter.touches_disk()
            }
            _ => false,
        })
        .count();
    tracing::info!(
        tables = report.tables.len(),
        written,
        failed = report.failed().count(),
        root = %writer.root().display(),
        "generation finished"
    );
    Ok(report)
}

/// Full run against the databases named in the configuration.
pub fn run(config: &GeneratorConfig, writer: &Writer) -> Result<RunReport, PipelineError> {
    let mut catalog = catalog::connect_all(config)?;
    let databases = catalog.database_names();
    run_with(&mut catalog, &databases, config, writer)
}

/// Aligned listing of every inferred relationship.
pub fn describe_relationships(schema: &Schema) -> String {
    let mut table = TextTable::new(&["table", "kind", "remote", "columns", "via", "source"]);
    for rel in &schema.relationships {
        table.push_row(vec![
            rel.local.to_string(),
            rel.kind.as_str().to_string(),
            rel.remote.to_string(),
            rel.fk_columns().join(", "),
            rel.via
                .as_ref()
                .map(|j| j.table.to_string())
                .unwrap_or_default(),
            rel.provenance.as_str().to_string(),
        ]);
    }
    let mut output = table.render().join("\n");
    output.push('\n');
    output
}
