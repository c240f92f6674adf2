//! Relationship inference over an extracted schema.
//!
//! Four passes run in order: explicit foreign-key promotion, the `<stem>_id`
//! naming-convention fallback, join-table detection and disambiguation of
//! relationships that share both endpoints.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{ConfigError, GeneratorConfig, Resolved};
use crate::model::{
    ForeignKey, JoinTable, Provenance, Qualifier, RelationKind, Relationship, Schema, Table,
    TableRef,
};

/// Diagnostics collected while inferring relationships.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceReport {
    /// Foreign keys promoted to relationships, explicit and inferred.
    pub promoted: Vec<ForeignKey>,
    /// Foreign keys that did not match the referenced table's key.
    pub unresolved: Vec<ForeignKey>,
    pub ambiguous: Vec<AmbiguousColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousColumn {
    pub table: TableRef,
    pub column: String,
    pub candidates: Vec<TableRef>,
}

/// Resolved settings per database and per table, computed once.
struct SettingsCache {
    databases: BTreeMap<String, Resolved>,
    tables: BTreeMap<TableRef, Resolved>,
}

impl SettingsCache {
    fn new(schema: &Schema, config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let mut databases = BTreeMap::new();
        for name in schema.databases.keys() {
            databases.insert(name.clone(), config.resolve(name, None)?);
        }
        let mut tables = BTreeMap::new();
        for table in schema.tables() {
            tables.insert(
                table.table_ref(),
                config.resolve(&table.database, Some(&table.name))?,
            );
        }
        Ok(Self { databases, tables })
    }

    fn database(&self, name: &str) -> Option<&Resolved> {
        self.databases.get(name)
    }

    fn table(&self, table_ref: &TableRef) -> Option<&Resolved> {
        self.tables.get(table_ref)
    }

    /// Whether `name`, a table of `database`, answers to `stem` exactly or once a
    /// configured prefix is removed.
    fn names_table(&self, database: &str, name: &str, stem: &str) -> bool {
        name.eq_ignore_ascii_case(stem) || self.names_table_stripped(database, name, stem)
    }

    fn names_table_stripped(&self, database: &str, name: &str, stem: &str) -> bool {
        self.database(database).is_some_and(|settings| {
            settings
                .table_prefixes()
                .filter_map(|prefix| name.strip_prefix(prefix))
                .any(|rest| rest.eq_ignore_ascii_case(stem))
        })
    }
}

/// Derive every relationship of `schema` and store them on it.
///
/// Existing relationships and join-table classifications are replaced. The
/// output is sorted, so the same catalog snapshot always yields the same list.
pub fn infer(schema: &mut Schema, config: &GeneratorConfig) -> Result<InferenceReport, ConfigError> {
    let settings = SettingsCache::new(schema, config)?;
    let mut report = InferenceReport::default();
    let mut relationships = Vec::new();

    let explicit: Vec<ForeignKey> = schema
        .tables()
        .flat_map(|t| t.foreign_keys.iter().cloned())
        .collect();
    for fk in explicit {
        promote(schema, fk, &mut relationships, &mut report);
    }

    let inferred = naming_fallback(
        schema,
        &settings,
        config.relations.allow_cross_database,
        &mut report,
    );
    for fk in inferred {
        promote(schema, fk, &mut relationships, &mut report);
    }

    schema.relationships = relationships;
    schema.join_tables.clear();
    detect_join_tables(schema, &settings);
    if !config.emit.join_table_classes {
        drop_links_into_join_tables(schema);
    }
    disambiguate(&mut schema.relationships);

    tracing::info!(
        relationships = schema.relationships.len(),
        join_tables = schema.join_tables.len(),
        unresolved = report.unresolved.len(),
        ambiguous = report.ambiguous.len(),
        "relationships inferred"
    );
    Ok(report)
}

fn promote(
    schema: &Schema,
    fk: ForeignKey,
    out: &mut Vec<Relationship>,
    report: &mut InferenceReport,
) {
    let local_ok = schema
        .table(&fk.local)
        .is_some_and(|t| fk.local_columns.iter().all(|c| t.has_column(c)));
    let target_ok = schema
        .table(&fk.referenced)
        .is_some_and(|t| t.is_primary_key(&fk.referenced_columns));

    if !local_ok || !target_ok {
        tracing::warn!(
            table = %fk.local,
            columns = ?fk.local_columns,
            references = %fk.referenced,
            referenced_columns = ?fk.referenced_columns,
            "foreign key does not match the referenced primary key; dropped"
        );
        report.unresolved.push(fk);
        return;
    }

    let has_one = Relationship {
        kind: RelationKind::HasOne,
        local: fk.local.clone(),
        remote: fk.referenced.clone(),
        local_columns: fk.local_columns.clone(),
        remote_columns: fk.referenced_columns.clone(),
        via: None,
        provenance: fk.provenance,
        qualifier: Qualifier::None,
    };
    if out.iter().any(|r| same_link(r, &has_one)) {
        tracing::debug!(table = %fk.local, columns = ?fk.local_columns, "duplicate foreign key ignored");
        return;
    }

    let has_many = Relationship {
        kind: RelationKind::HasMany,
        local: fk.referenced.clone(),
        remote: fk.local.clone(),
        local_columns: fk.referenced_columns.clone(),
        remote_columns: fk.local_columns.clone(),
        via: None,
        provenance: fk.provenance,
        qualifier: Qualifier::None,
    };

    tracing::debug!(
        table = %fk.local,
        columns = ?fk.local_columns,
        references = %fk.referenced,
        provenance = fk.provenance.as_str(),
        "foreign key promoted"
    );
    out.push(has_one);
    out.push(has_many);
    report.promoted.push(fk);
}

fn same_link(a: &Relationship, b: &Relationship) -> bool {
    a.kind == b.kind
        && a.local == b.local
        && a.remote == b.remote
        && a.local_columns == b.local_columns
        && a.remote_columns == b.remote_columns
}

enum Resolution {
    Unmatched,
    Ambiguous(Vec<TableRef>),
    Matched(TableRef, String),
}

/// Synthesize foreign keys for `<stem>_id` style columns not covered by DDL.
fn naming_fallback(
    schema: &Schema,
    settings: &SettingsCache,
    allow_cross_database: bool,
    report: &mut InferenceReport,
) -> Vec<ForeignKey> {
    let mut inferred = Vec::new();

    for table in schema.tables() {
        let table_ref = table.table_ref();
        let Some(resolved) = settings.table(&table_ref) else {
            continue;
        };
        // Any column named by a declared key is off limits, resolved or not.
        let covered: BTreeSet<&str> = table
            .foreign_keys
            .iter()
            .flat_map(|fk| fk.local_columns.iter().map(String::as_str))
            .collect();

        for column in &table.columns {
            if covered.contains(column.name.as_str()) {
                continue;
            }
            let Some(stem) = column_stem(resolved, &column.name) else {
                continue;
            };

            match resolve_stem(schema, settings, allow_cross_database, table, &column.name, &stem) {
                Resolution::Unmatched => {
                    tracing::debug!(table = %table_ref, column = %column.name, stem, "no table matches column stem");
                }
                Resolution::Ambiguous(candidates) => {
                    tracing::warn!(
                        table = %table_ref,
                        column = %column.name,
                        candidates = ?candidates.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "column stem matches several tables; not linked"
                    );
                    report.ambiguous.push(AmbiguousColumn {
                        table: table_ref.clone(),
                        column: column.name.clone(),
                        candidates,
                    });
                }
                Resolution::Matched(target, key) => {
                    match ForeignKey::new(
                        table_ref.clone(),
                        vec![column.name.clone()],
                        target,
                        vec![key],
                        Provenance::Inferred,
                    ) {
                        Ok(fk) => inferred.push(fk),
                        Err(err) => tracing::warn!(error = %err, "inferred foreign key rejected"),
                    }
                }
            }
        }
    }
    inferred
}

fn column_stem(settings: &Resolved, column: &str) -> Option<String> {
    let captures = settings.id_to_table.captures(column)?;
    let raw = captures.get(1)?.as_str();
    let stem = settings
        .field
        .strip_field_prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| raw.strip_prefix(p.as_str()))
        .unwrap_or(raw);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Walk the precedence tiers; the first tier holding a valid candidate decides.
fn resolve_stem(
    schema: &Schema,
    settings: &SettingsCache,
    allow_cross_database: bool,
    local: &Table,
    column: &str,
    stem: &str,
) -> Resolution {
    let same = [local.database.as_str()];
    let others: Vec<&str> = if allow_cross_database {
        schema
            .databases
            .keys()
            .map(String::as_str)
            .filter(|db| *db != local.database)
            .collect()
    } else {
        Vec::new()
    };
    let tiers: [(&[&str], bool); 4] = [
        (&same, false),
        (&same, true),
        (&others, false),
        (&others, true),
    ];

    for (databases, stripped) in tiers {
        let candidates: Vec<(TableRef, String)> = databases
            .iter()
            .filter_map(|db| schema.databases.get(*db))
            .flat_map(|db| db.tables.values())
            .filter(|t| {
                if stripped {
                    settings.names_table_stripped(&t.database, &t.name, stem)
                } else {
                    t.name.eq_ignore_ascii_case(stem)
                }
            })
            .filter_map(|t| single_key(t, local, column))
            .collect();

        match candidates.as_slice() {
            [] => continue,
            [(target, key)] => return Resolution::Matched(target.clone(), key.clone()),
            _ => return Resolution::Ambiguous(candidates.into_iter().map(|(t, _)| t).collect()),
        }
    }
    Resolution::Unmatched
}

/// The candidate's single key column, unless it is the column being resolved.
fn single_key(candidate: &Table, local: &Table, column: &str) -> Option<(TableRef, String)> {
    let pk = candidate.primary_key();
    if pk.len() != 1 {
        return None;
    }
    if candidate.database == local.database && candidate.name == local.name && pk[0] == column {
        return None;
    }
    Some((candidate.table_ref(), pk[0].to_string()))
}

fn detect_join_tables(schema: &mut Schema, settings: &SettingsCache) {
    let mut found: Vec<(TableRef, Relationship, Relationship)> = Vec::new();

    for table in schema.tables() {
        let table_ref = table.table_ref();
        let has_ones: Vec<&Relationship> = schema
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::HasOne && r.local == table_ref)
            .collect();
        if has_ones.len() < 2 {
            continue;
        }
        let referenced = schema
            .relationships
            .iter()
            .any(|r| r.kind == RelationKind::HasOne && r.remote == table_ref && r.local != table_ref);
        if referenced {
            continue;
        }

        let pair = pair_by_name(schema, settings, table, &has_ones)
            .or_else(|| pair_by_shape(schema, table, &has_ones));
        if let Some((a, b)) = pair {
            tracing::debug!(table = %table_ref, left = %a.remote, right = %b.remote, "join table detected");
            found.push((table_ref, a.clone(), b.clone()));
        }
    }

    for (join, a, b) in found {
        schema.relationships.retain(|r| {
            let mirrors = |side: &Relationship| {
                r.kind == RelationKind::HasMany
                    && r.local == side.remote
                    && r.remote == join
                    && r.remote_columns == side.local_columns
            };
            !mirrors(&a) && !mirrors(&b)
        });
        schema.relationships.push(many_to_many(&join, &a, &b));
        schema.relationships.push(many_to_many(&join, &b, &a));
        schema.join_tables.insert(join);
    }
}

/// Join tables get no class of their own, so nothing may hold a collection of
/// their rows. Extra foreign keys on a join table leave such collections behind.
fn drop_links_into_join_tables(schema: &mut Schema) {
    let join_tables = &schema.join_tables;
    schema.relationships.retain(|r| {
        let dangling = r.via.is_none()
            && join_tables.contains(&r.remote)
            && !join_tables.contains(&r.local);
        if dangling {
            tracing::debug!(
                table = %r.local,
                join_table = %r.remote,
                columns = ?r.remote_columns,
                "link into join table dropped"
            );
        }
        !dangling
    });
}

fn valid_pair(schema: &Schema, join: &TableRef, a: &Relationship, b: &Relationship) -> bool {
    let keyed = |r: &Relationship| schema.table(&r.remote).is_some_and(|t| !t.is_keyless());
    a.remote != b.remote && &a.remote != join && &b.remote != join && keyed(a) && keyed(b)
}

fn pair_by_name<'a>(
    schema: &Schema,
    settings: &SettingsCache,
    table: &Table,
    has_ones: &[&'a Relationship],
) -> Option<(&'a Relationship, &'a Relationship)> {
    let join = table.table_ref();
    let captures = settings.table(&join)?.join_table.captures(&table.name)?;
    let (left, right) = (captures.get(1)?.as_str(), captures.get(2)?.as_str());

    let find = |part: &str, skip: Option<&Relationship>| {
        has_ones.iter().copied().find(|r| {
            skip.is_none_or(|s| !std::ptr::eq(s, *r))
                && settings.names_table(&r.remote.database, &r.remote.table, part)
        })
    };
    let a = find(left, None)?;
    let b = find(right, Some(a))?;
    valid_pair(schema, &join, a, b).then_some((a, b))
}

fn pair_by_shape<'a>(
    schema: &Schema,
    table: &Table,
    has_ones: &[&'a Relationship],
) -> Option<(&'a Relationship, &'a Relationship)> {
    let [a, b] = has_ones else {
        return None;
    };
    let allowed: BTreeSet<&str> = table
        .primary_key()
        .into_iter()
        .chain(a.local_columns.iter().map(String::as_str))
        .chain(b.local_columns.iter().map(String::as_str))
        .collect();
    let pure = table.columns.iter().all(|c| allowed.contains(c.name.as_str()));
    (pure && valid_pair(schema, &table.table_ref(), a, b)).then_some((*a, *b))
}

fn many_to_many(join: &TableRef, from: &Relationship, to: &Relationship) -> Relationship {
    let provenance = if from.provenance == Provenance::Explicit && to.provenance == Provenance::Explicit {
        Provenance::Explicit
    } else {
        Provenance::Inferred
    };
    Relationship {
        kind: RelationKind::ManyToMany,
        local: from.remote.clone(),
        remote: to.remote.clone(),
        local_columns: from.remote_columns.clone(),
        remote_columns: to.remote_columns.clone(),
        via: Some(JoinTable {
            table: join.clone(),
            local_columns: from.local_columns.clone(),
            remote_columns: to.local_columns.clone(),
        }),
        provenance,
        qualifier: Qualifier::None,
    }
}

fn disambiguate(relationships: &mut [Relationship]) {
    relationships.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut counts: BTreeMap<(TableRef, TableRef), usize> = BTreeMap::new();
    for r in relationships.iter() {
        *counts.entry((r.local.clone(), r.remote.clone())).or_default() += 1;
    }

    for r in relationships.iter_mut() {
        let shared = counts
            .get(&(r.local.clone(), r.remote.clone()))
            .is_some_and(|n| *n > 1);
        r.qualifier = match (shared, &r.via) {
            (false, _) => Qualifier::None,
            (true, Some(join)) => Qualifier::Via(join.table.clone()),
            (true, None) => Qualifier::ByColumns(r.fk_columns().to_vec()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DefaultValue};

    fn column(name: &str, pk: bool) -> Column {
        Column {
            name: name.to_string(),
            nullable: !pk,
            default: DefaultValue::Absent,
            typ: "int".to_string(),
            size: Some("11".to_string()),
            is_primary_key: pk,
        }
    }

    fn table(db: &str, name: &str, pk: &[&str], columns: &[&str]) -> Table {
        let mut t = Table::new(db, name);
        t.columns = pk
            .iter()
            .map(|c| column(c, true))
            .chain(columns.iter().map(|c| column(c, false)))
            .collect();
        t
    }

    fn with_fk(mut t: Table, columns: &[&str], target: &str, target_columns: &[&str]) -> Table {
        let fk = ForeignKey::new(
            t.table_ref(),
            columns.iter().map(|c| c.to_string()).collect(),
            TableRef::new(&t.database, target),
            target_columns.iter().map(|c| c.to_string()).collect(),
            Provenance::Explicit,
        )
        .unwrap();
        t.foreign_keys.push(fk);
        t
    }

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new();
        for t in tables {
            schema.add_table(t);
        }
        schema
    }

    fn find<'a>(
        schema: &'a Schema,
        kind: RelationKind,
        local: &str,
        remote: &str,
    ) -> Vec<&'a Relationship> {
        schema
            .relationships
            .iter()
            .filter(|r| r.kind == kind && r.local.table == local && r.remote.table == remote)
            .collect()
    }

    #[test]
    fn test_explicit_foreign_key_promotion() {
        let mut s = schema(vec![
            table("lib", "author", &["id"], &["name"]),
            with_fk(table("lib", "book", &["id"], &["writer"]), &["writer"], "author", &["id"]),
        ]);
        let report = infer(&mut s, &GeneratorConfig::default()).unwrap();

        let one = find(&s, RelationKind::HasOne, "book", "author");
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].local_columns, vec!["writer"]);
        assert_eq!(one[0].provenance, Provenance::Explicit);

        let many = find(&s, RelationKind::HasMany, "author", "book");
        assert_eq!(many.len(), 1);
        assert_eq!(many[0].local_columns, vec!["id"]);
        assert_eq!(many[0].remote_columns, vec!["writer"]);
        assert_eq!(report.promoted.len(), 1);
    }

    #[test]
    fn test_foreign_key_to_non_key_column_is_dropped() {
        let mut s = schema(vec![
            table("lib", "author", &["id"], &["email"]),
            with_fk(table("lib", "book", &["id"], &["author_email"]), &["author_email"], "author", &["email"]),
        ]);
        let report = infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.relationships.is_empty());
        assert_eq!(report.unresolved.len(), 1);
    }

    #[test]
    fn test_explicit_key_takes_precedence_over_naming() {
        // owner_id names the `owner` table but the DDL says it references person.
        let mut s = schema(vec![
            table("crm", "owner", &["id"], &[]),
            table("crm", "person", &["id"], &[]),
            with_fk(table("crm", "car", &["id"], &["owner_id"]), &["owner_id"], "person", &["id"]),
        ]);
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert_eq!(find(&s, RelationKind::HasOne, "car", "person").len(), 1);
        assert!(find(&s, RelationKind::HasOne, "car", "owner").is_empty());
    }

    #[test]
    fn test_unresolved_explicit_key_still_covers_column() {
        let mut s = schema(vec![
            table("crm", "owner", &["id"], &["code"]),
            with_fk(table("crm", "car", &["id"], &["owner_id"]), &["owner_id"], "owner", &["code"]),
        ]);
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.relationships.is_empty());
    }

    #[test]
    fn test_naming_fallback_links_id_columns() {
        let mut s = schema(vec![
            table("lib", "author", &["id"], &[]),
            table("lib", "book", &["id"], &["author_id", "primary_author_id", "editor_id"]),
        ]);
        let report = infer(&mut s, &GeneratorConfig::default()).unwrap();

        let one = find(&s, RelationKind::HasOne, "book", "author");
        assert_eq!(one.len(), 2);
        assert!(one.iter().all(|r| r.provenance == Provenance::Inferred));
        assert_eq!(one[0].local_columns, vec!["author_id"]);
        assert_eq!(one[1].local_columns, vec!["primary_author_id"]);
        // editor has no table; silently unlinked
        assert!(report.unresolved.is_empty());
        assert!(report.ambiguous.is_empty());
    }

    #[test]
    fn test_table_key_column_is_not_self_linked() {
        let mut s = schema(vec![table("crm", "user", &["user_id"], &["name"])]);
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.relationships.is_empty());
    }

    #[test]
    fn test_prefix_stripped_match_and_ambiguity() {
        let cfg = GeneratorConfig::from_toml_str(
            r#"
            [table_settings]
            strip_table_name_prefixes = ["a_", "b_"]
            "#,
        )
        .unwrap();
        let mut s = schema(vec![
            table("app", "a_region", &["id"], &[]),
            table("app", "a_zone", &["id"], &[]),
            table("app", "b_zone", &["id"], &[]),
            table("app", "site", &["id"], &["region_id", "zone_id"]),
        ]);
        let report = infer(&mut s, &cfg).unwrap();

        assert_eq!(find(&s, RelationKind::HasOne, "site", "a_region").len(), 1);
        assert!(find(&s, RelationKind::HasOne, "site", "a_zone").is_empty());
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].column, "zone_id");
        assert_eq!(report.ambiguous[0].candidates.len(), 2);
    }

    #[test]
    fn test_same_database_wins_over_other_database() {
        let mut s = schema(vec![
            table("core", "country", &["id"], &[]),
            table("shop", "country", &["code"], &[]),
            table("shop", "store", &["id"], &["country_id", "currency_id"]),
            table("core", "currency", &["id"], &[]),
        ]);
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        let country = find(&s, RelationKind::HasOne, "store", "country");
        assert_eq!(country.len(), 1);
        assert_eq!(country[0].remote.database, "shop");

        let currency = find(&s, RelationKind::HasOne, "store", "currency");
        assert_eq!(currency.len(), 1);
        assert_eq!(currency[0].remote, TableRef::new("core", "currency"));
    }

    #[test]
    fn test_cross_database_matching_can_be_disabled() {
        let cfg = GeneratorConfig::from_toml_str("[relations]\nallow_cross_database = false").unwrap();
        let mut s = schema(vec![
            table("core", "currency", &["id"], &[]),
            table("shop", "store", &["id"], &["currency_id"]),
        ]);
        infer(&mut s, &cfg).unwrap();

        assert!(s.relationships.is_empty());
    }

    fn library_schema() -> Schema {
        schema(vec![
            table("lib", "book", &["id"], &["title"]),
            table("lib", "library", &["id"], &["city"]),
            table("lib", "book2library", &["id"], &["book_id", "library_id"]),
        ])
    }

    #[test]
    fn test_join_table_by_name_is_symmetric() {
        let mut s = library_schema();
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        let join = TableRef::new("lib", "book2library");
        assert!(s.is_join_table(&join));

        let forward = find(&s, RelationKind::ManyToMany, "book", "library");
        let backward = find(&s, RelationKind::ManyToMany, "library", "book");
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);

        let via = forward[0].via.as_ref().unwrap();
        assert_eq!(via.table, join);
        assert_eq!(via.local_columns, vec!["book_id"]);
        assert_eq!(via.remote_columns, vec!["library_id"]);
        let via = backward[0].via.as_ref().unwrap();
        assert_eq!(via.local_columns, vec!["library_id"]);
        assert_eq!(via.remote_columns, vec!["book_id"]);

        assert!(find(&s, RelationKind::HasMany, "book", "book2library").is_empty());
        assert!(find(&s, RelationKind::HasMany, "library", "book2library").is_empty());
        assert_eq!(find(&s, RelationKind::HasOne, "book2library", "book").len(), 1);
    }

    #[test]
    fn test_join_table_by_shape() {
        let mut s = schema(vec![
            table("acl", "user", &["id"], &[]),
            table("acl", "grp", &["id"], &[]),
            table("acl", "membership", &["user_id", "grp_id"], &[]),
            table("acl", "enrollment", &["id"], &["user_id", "grp_id", "grade"]),
        ]);
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.is_join_table(&TableRef::new("acl", "membership")));
        assert!(!s.is_join_table(&TableRef::new("acl", "enrollment")));
        assert_eq!(find(&s, RelationKind::HasMany, "user", "enrollment").len(), 1);
        assert_eq!(find(&s, RelationKind::ManyToMany, "user", "grp").len(), 1);
    }

    #[test]
    fn test_referenced_table_is_not_a_join_table() {
        let mut s = library_schema();
        s.add_table(table("lib", "loan", &["id"], &["book2library_id"]));
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(!s.is_join_table(&TableRef::new("lib", "book2library")));
        assert!(find(&s, RelationKind::ManyToMany, "book", "library").is_empty());
    }

    #[test]
    fn test_extra_key_on_join_table_leaves_no_collection_of_it() {
        let mut s = library_schema();
        s.add_table(table("lib", "librarian", &["id"], &["name"]));
        s.add_table(table("lib", "book2library", &["id"], &["book_id", "library_id", "librarian_id"]));
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.is_join_table(&TableRef::new("lib", "book2library")));
        assert_eq!(find(&s, RelationKind::ManyToMany, "book", "library").len(), 1);
        assert!(find(&s, RelationKind::HasMany, "librarian", "book2library").is_empty());
        assert!(s
            .relationships
            .iter()
            .all(|r| r.via.is_some() || r.remote.table != "book2library"));
        // the join table's own outgoing links stay for describe output
        assert_eq!(find(&s, RelationKind::HasOne, "book2library", "librarian").len(), 1);
    }

    #[test]
    fn test_join_table_classes_keep_links_into_join_table() {
        let mut cfg = GeneratorConfig::default();
        cfg.emit.join_table_classes = true;
        let mut s = library_schema();
        s.add_table(table("lib", "librarian", &["id"], &["name"]));
        s.add_table(table("lib", "book2library", &["id"], &["book_id", "library_id", "librarian_id"]));
        infer(&mut s, &cfg).unwrap();

        assert_eq!(find(&s, RelationKind::HasMany, "librarian", "book2library").len(), 1);
    }

    #[test]
    fn test_disambiguation_by_column() {
        let cfg = GeneratorConfig::from_toml_str(
            r#"
            [field_settings]
            id_to_table_regex = "^([a-z]+)Id"
            "#,
        )
        .unwrap();
        let mut s = schema(vec![
            table("net", "network", &["id"], &["name"]),
            table("net", "cust_pc", &["id"], &["networkId", "networkIdVerejna"]),
        ]);
        infer(&mut s, &cfg).unwrap();

        let one = find(&s, RelationKind::HasOne, "cust_pc", "network");
        assert_eq!(one.len(), 2);
        assert_eq!(one[0].qualifier, Qualifier::ByColumns(vec!["networkId".to_string()]));
        assert_eq!(
            one[1].qualifier,
            Qualifier::ByColumns(vec!["networkIdVerejna".to_string()])
        );

        let many = find(&s, RelationKind::HasMany, "network", "cust_pc");
        assert_eq!(many.len(), 2);
        assert!(many.iter().all(|r| matches!(r.qualifier, Qualifier::ByColumns(_))));
    }

    #[test]
    fn test_single_relationship_is_unqualified() {
        let mut s = library_schema();
        infer(&mut s, &GeneratorConfig::default()).unwrap();

        assert!(s.relationships.iter().all(|r| r.qualifier == Qualifier::None));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut first = library_schema();
        first.add_table(table("lib", "review", &["id"], &["book_id", "library_id"]));
        let mut second = first.clone();

        infer(&mut first, &GeneratorConfig::default()).unwrap();
        infer(&mut second, &GeneratorConfig::default()).unwrap();
        assert_eq!(first, second);

        let keys: Vec<_> = first.relationships.iter().map(|r| r.sort_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
