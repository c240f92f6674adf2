//! Column descriptor mapping and foreign-key clause scanning.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Column, DefaultValue, ForeignKey, Provenance, TableRef};

use super::ColumnDescriptor;

static FOREIGN_KEY_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)\bFOREIGN\s+KEY\s*(?:[`"\[]?[\w$]+[`"\]]?\s*)?\(([^()]*)\)\s*REFERENCES\s+([`"\[\]\w$.\s]+?)\s*\(([^()]*)\)"#,
    )
    .expect("foreign key pattern is valid")
});

/// Split a catalog type string on its first parenthesis group.
///
/// `varchar(255)` becomes (`varchar`, `255`); modifiers after the group stay on the
/// type, so `int(11) unsigned` becomes (`int unsigned`, `11`).
pub fn split_type(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    let Some(open) = raw.find('(') else {
        return (raw.to_string(), None);
    };
    let Some(close) = raw[open..].find(')').map(|i| open + i) else {
        return (raw.to_string(), None);
    };

    let base = raw[..open].trim();
    let size = raw[open + 1..close].trim();
    let rest = raw[close + 1..].trim();

    let typ = if rest.is_empty() {
        base.to_string()
    } else {
        format!("{base} {rest}")
    };
    let size = (!size.is_empty()).then(|| size.to_string());
    (typ, size)
}

pub fn parse_default(raw: Option<&str>) -> DefaultValue {
    match raw {
        None => DefaultValue::Absent,
        Some(s) if s.trim().eq_ignore_ascii_case("null") => DefaultValue::Null,
        Some(s) => {
            let s = s.trim();
            let unquoted = s
                .strip_prefix('\'')
                .and_then(|inner| inner.strip_suffix('\''))
                .unwrap_or(s);
            DefaultValue::Literal(unquoted.to_string())
        }
    }
}

pub fn column_from_descriptor(desc: &ColumnDescriptor) -> Column {
    let (typ, size) = split_type(&desc.typ);
    Column {
        name: desc.name.clone(),
        nullable: desc.nullable,
        default: parse_default(desc.default.as_deref()),
        typ,
        size,
        is_primary_key: desc.primary_key,
    }
}

/// Remove identifier quoting (backticks, double quotes, brackets) and whitespace.
pub fn unquote(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, '`' | '"' | '[' | ']') && !c.is_whitespace())
        .collect()
}

fn column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(unquote)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Scan a create-table definition for `FOREIGN KEY (..) REFERENCES t (..)` clauses.
///
/// Clauses that do not yield a well-formed key are logged and skipped.
pub fn scan_foreign_keys(local: &TableRef, definition: &str) -> Vec<ForeignKey> {
    let mut keys = Vec::new();

    for caps in FOREIGN_KEY_CLAUSE.captures_iter(definition) {
        let local_columns = column_list(&caps[1]);
        let target = unquote(&caps[2]);
        let referenced_columns = column_list(&caps[3]);

        let referenced = match target.rsplit_once('.') {
            Some((db, table)) if !db.is_empty() && !table.is_empty() => TableRef::new(db, table),
            _ => TableRef::new(&local.database, target.trim_matches('.')),
        };

        match ForeignKey::new(
            local.clone(),
            local_columns,
            referenced,
            referenced_columns,
            Provenance::Explicit,
        ) {
            Ok(fk) => keys.push(fk),
            Err(err) => {
                tracing::warn!(table = %local, clause = %&caps[0], "skipping foreign key: {err}");
            }
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type() {
        assert_eq!(split_type("varchar(255)"), ("varchar".to_string(), Some("255".to_string())));
        assert_eq!(split_type("decimal(10,2)"), ("decimal".to_string(), Some("10,2".to_string())));
        assert_eq!(split_type("int(11) unsigned"), ("int unsigned".to_string(), Some("11".to_string())));
        assert_eq!(split_type("text"), ("text".to_string(), None));
        assert_eq!(split_type(" date "), ("date".to_string(), None));
    }

    #[test]
    fn test_parse_default_tri_state() {
        assert_eq!(parse_default(None), DefaultValue::Absent);
        assert_eq!(parse_default(Some("NULL")), DefaultValue::Null);
        assert_eq!(parse_default(Some("null")), DefaultValue::Null);
        assert_eq!(parse_default(Some("'draft'")), DefaultValue::Literal("draft".to_string()));
        assert_eq!(parse_default(Some("0")), DefaultValue::Literal("0".to_string()));
    }

    #[test]
    fn test_scan_mysql_create_statement() {
        let ddl = "CREATE TABLE `book` (\n  `id` int(11) NOT NULL,\n  `author_id` int(11) NOT NULL,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `fk_author` FOREIGN KEY (`author_id`) REFERENCES `author` (`id`) ON DELETE CASCADE\n) ENGINE=InnoDB";
        let local = TableRef::new("library", "book");
        let keys = scan_foreign_keys(&local, ddl);

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].local_columns, vec!["author_id"]);
        assert_eq!(keys[0].referenced, TableRef::new("library", "author"));
        assert_eq!(keys[0].referenced_columns, vec!["id"]);
        assert_eq!(keys[0].provenance, Provenance::Explicit);
    }

    #[test]
    fn test_scan_composite_and_cross_database() {
        let ddl = r#"CREATE TABLE shipment (
            order_id INT, line_no INT, carrier_id INT,
            FOREIGN KEY ( order_id ,
                line_no ) REFERENCES "order_line"(order_id, line_no),
            foreign key (carrier_id) references logistics.carrier (id)
        )"#;
        let local = TableRef::new("shop", "shipment");
        let keys = scan_foreign_keys(&local, ddl);

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].local_columns, vec!["order_id", "line_no"]);
        assert_eq!(keys[0].referenced, TableRef::new("shop", "order_line"));
        assert_eq!(keys[0].referenced_columns, vec!["order_id", "line_no"]);
        assert_eq!(keys[1].referenced, TableRef::new("logistics", "carrier"));
    }

    #[test]
    fn test_malformed_clauses_are_skipped() {
        let ddl = "CREATE TABLE t (a INT, b INT,
            FOREIGN KEY (a, b) REFERENCES other (id),
            FOREIGN KEY () REFERENCES other (),
            FOREIGN KEY (a) REFERENCES
        )";
        let keys = scan_foreign_keys(&TableRef::new("db", "t"), ddl);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_column_from_descriptor() {
        let desc = ColumnDescriptor {
            name: "title".to_string(),
            nullable: true,
            default: Some("NULL".to_string()),
            typ: "varchar(120)".to_string(),
            primary_key: false,
        };
        let column = column_from_descriptor(&desc);
        assert_eq!(column.typ, "varchar");
        assert_eq!(column.size.as_deref(), Some("120"));
        assert_eq!(column.default, DefaultValue::Null);
        assert!(column.nullable);
    }
}
