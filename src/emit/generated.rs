use std::collections::BTreeSet;

use super::measure::{TextTable, comment_safe};
use super::{DeleteFlag, EmitOptions, sibling};
use crate::model::{DefaultValue, RelationKind, Schema, Table};
use crate::naming::{RelationAccessor, TableNames};

pub(super) fn render(
    schema: &Schema,
    names: &TableNames,
    options: &EmitOptions,
    delete_flag: Option<&DeleteFlag>,
) -> String {
    let mut output = String::new();
    let Some(table) = schema.table(&names.table) else {
        return output;
    };
    let keyed = !table.is_keyless();

    render_header(&mut output, table, names);
    render_imports(&mut output, names, options);
    render_via_constants(&mut output, names);
    render_struct(&mut output, names);

    output.push_str(&format!("\nimpl {} {{\n", names.class.generated));
    render_constants(&mut output, table, delete_flag);
    render_constructors(&mut output);
    render_columns(&mut output, table, names, keyed);
    for accessor in &names.relations {
        match accessor.relationship.kind {
            RelationKind::HasOne => render_has_one(&mut output, table, accessor, keyed),
            RelationKind::HasMany => {
                let keyless_remote = schema
                    .table(&accessor.relationship.remote)
                    .is_some_and(Table::is_keyless);
                render_has_many(&mut output, accessor, keyless_remote)
            }
            RelationKind::ManyToMany => render_many_to_many(&mut output, accessor),
        }
    }
    if keyed {
        render_key_cascade(&mut output, names);
    }
    output.push_str("}\n");

    render_entity_impl(&mut output, names);
    output
}

fn render_header(output: &mut String, table: &Table, names: &TableNames) {
    output.push_str(&format!(
        "// @generated by dbclassgen from {}. Do not edit: this file is rewritten\n",
        comment_safe(&names.table.to_string())
    ));
    output.push_str(&format!(
        "// on every run. Customize `{}` in its starter module instead.\n",
        names.class.starter
    ));
    output.push_str("//\n");

    let foreign: BTreeSet<&str> = table
        .foreign_keys
        .iter()
        .flat_map(|fk| fk.local_columns.iter().map(String::as_str))
        .chain(
            names
                .relations
                .iter()
                .filter(|r| r.relationship.kind == RelationKind::HasOne)
                .flat_map(|r| r.relationship.local_columns.iter().map(String::as_str)),
        )
        .collect();

    let mut columns = TextTable::new(&["column", "type", "size", "null", "default", "key"]);
    for column in &table.columns {
        let default = match &column.default {
            DefaultValue::Absent => String::new(),
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Literal(value) => value.clone(),
        };
        let key = match (column.is_primary_key, foreign.contains(column.name.as_str())) {
            (true, true) => "PK FK",
            (true, false) => "PK",
            (false, true) => "FK",
            (false, false) => "",
        };
        columns.push_row(vec![
            comment_safe(&column.name),
            comment_safe(&column.typ),
            comment_safe(column.size.as_deref().unwrap_or("")),
            if column.nullable { "yes" } else { "no" }.to_string(),
            comment_safe(&default),
            key.to_string(),
        ]);
    }
    for line in columns.render() {
        output.push_str(&format!("// {line}\n"));
    }

    if !names.relations.is_empty() {
        output.push_str("//\n// relationships:\n");
        for accessor in &names.relations {
            let r = &accessor.relationship;
            let target = match &r.via {
                Some(join) => format!("{} via {}", r.remote, join.table),
                None => format!("{} ({} -> {})", r.remote, r.local_columns.join(", "), r.remote_columns.join(", ")),
            };
            output.push_str(&format!(
                "//   {} {} [{}]\n",
                r.kind.as_str(),
                comment_safe(&target),
                r.provenance.as_str()
            ));
        }
    }

    if table.is_keyless() {
        output.push_str("//\n// No primary key: collection accessors and the key cascade are omitted.\n");
    }
    output.push('\n');
}

fn render_imports(output: &mut String, names: &TableNames, options: &EmitOptions) {
    output.push_str(&format!("use {} as rt;\n\n", options.runtime_path));

    let mut starters: BTreeSet<String> = BTreeSet::new();
    starters.insert(format!(
        "{}::{}",
        sibling(&options.starter_dir, &names.class.module),
        names.class.starter
    ));
    for accessor in &names.relations {
        starters.insert(format!(
            "{}::{}",
            sibling(&options.starter_dir, &accessor.remote.module),
            accessor.remote.starter
        ));
    }
    for path in starters {
        output.push_str(&format!("use {path};\n"));
    }
}

fn via_const(accessor: &RelationAccessor) -> String {
    format!("{}_VIA", accessor.slot.to_uppercase())
}

fn render_via_constants(output: &mut String, names: &TableNames) {
    for accessor in &names.relations {
        let r = &accessor.relationship;
        let Some(join) = &r.via else {
            continue;
        };
        output.push_str(&format!(
            "\nconst {}: rt::Via = rt::Via {{\n    database: {:?},\n    table: {:?},\n    key: {},\n    local: {},\n    remote: {},\n}};\n",
            via_const(accessor),
            join.table.database,
            join.table.table,
            str_slice(&r.local_columns),
            str_slice(&join.local_columns),
            str_slice(&join.remote_columns),
        ));
    }
}

fn render_struct(output: &mut String, names: &TableNames) {
    output.push_str(&format!(
        "\n/// Generated base of [`{}`].\n#[derive(Debug, Clone, Default)]\npub struct {} {{\n    fields: rt::FieldStore,\n",
        names.class.starter, names.class.generated
    ));
    for accessor in &names.relations {
        let slot = match accessor.relationship.kind {
            RelationKind::HasOne => "HasOne",
            RelationKind::HasMany => "HasMany",
            RelationKind::ManyToMany => "ManyToMany",
        };
        output.push_str(&format!(
            "    {}: rt::{slot}<{}>,\n",
            accessor.slot, accessor.remote.starter
        ));
    }
    output.push_str("}\n");
}

fn render_constants(output: &mut String, table: &Table, delete_flag: Option<&DeleteFlag>) {
    let pk: Vec<String> = table.primary_key().iter().map(|c| c.to_string()).collect();
    output.push_str(&format!(
        "    pub const DATABASE: &'static str = {:?};\n    pub const TABLE: &'static str = {:?};\n    pub const PRIMARY_KEY: &'static [&'static str] = {};\n",
        table.database,
        table.name,
        str_slice(&pk)
    ));
    let flag = match delete_flag {
        Some(flag) => format!("Some(({:?}, {:?}))", flag.column, flag.value),
        None => "None".to_string(),
    };
    output.push_str(&format!(
        "    pub const DELETE_FLAG: Option<(&'static str, &'static str)> = {flag};\n"
    ));
}

fn render_constructors(output: &mut String) {
    output.push_str(
        "
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: rt::FieldStore) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &rt::FieldStore {
        &self.fields
    }
",
    );
}

fn render_columns(output: &mut String, table: &Table, names: &TableNames, keyed: bool) {
    for accessor in &names.columns {
        let is_key = table
            .column(&accessor.column)
            .is_some_and(|c| c.is_primary_key);
        // Changing a foreign key invalidates the has-one slots built on it.
        let stale: Vec<&str> = names
            .relations
            .iter()
            .filter(|r| {
                r.relationship.kind == RelationKind::HasOne
                    && r.relationship.local_columns.contains(&accessor.column)
            })
            .map(|r| r.slot.as_str())
            .collect();

        output.push_str(&format!(
            "\n    pub fn {}(&self) -> Option<&rt::Value> {{\n        self.fields.get({:?})\n    }}\n",
            accessor.getter, accessor.column
        ));
        output.push_str(&format!(
            "\n    pub fn {}(&mut self, value: impl Into<rt::Value>) {{\n        self.fields.set({:?}, value);\n",
            accessor.setter, accessor.column
        ));
        for slot in stale {
            output.push_str(&format!("        self.{slot}.clear();\n"));
        }
        if is_key && keyed {
            output.push_str("        self.on_key_change();\n");
        }
        output.push_str("    }\n");
    }
}

fn render_has_one(output: &mut String, table: &Table, accessor: &RelationAccessor, keyed: bool) {
    let r = &accessor.relationship;
    let remote = &accessor.remote.starter;
    let foreign = str_slice(&r.local_columns);
    let touches_key = r
        .local_columns
        .iter()
        .any(|c| table.column(c).is_some_and(|c| c.is_primary_key));

    output.push_str(&format!(
        "
    pub fn {load}(&mut self, loader: &dyn rt::Loader) -> Result<Option<&{remote}>, rt::RuntimeError> {{
        rt::load_has_one(&mut self.{slot}, loader, &self.fields, {foreign})
    }}

    pub fn {get}(&self) -> Option<&{remote}> {{
        self.{slot}.get()
    }}

    pub fn {set}(&mut self, value: Option<{remote}>) {{
        rt::set_has_one(&mut self.{slot}, &mut self.fields, {foreign}, value);
",
        load = accessor.load,
        get = accessor.get,
        set = accessor.set,
        slot = accessor.slot,
    ));
    if touches_key && keyed {
        output.push_str("        self.on_key_change();\n");
    }
    output.push_str("    }\n");
}

fn render_has_many(output: &mut String, accessor: &RelationAccessor, keyless_remote: bool) {
    let r = &accessor.relationship;
    let remote = &accessor.remote.starter;
    let key = str_slice(&r.local_columns);
    let foreign = str_slice(&r.remote_columns);
    let (Some(add), Some(remove)) = (&accessor.add, &accessor.remove) else {
        return;
    };

    output.push_str(&format!(
        "
    pub fn {load}(&mut self, loader: &dyn rt::Loader) -> Result<&[{remote}], rt::RuntimeError> {{
        rt::load_has_many(&mut self.{slot}, loader, &self.fields, {key}, {foreign})
    }}

    pub fn {get}(&self) -> &[{remote}] {{
        self.{slot}.items()
    }}

    pub fn {set}(&mut self, items: Vec<{remote}>) {{
        rt::set_has_many(&mut self.{slot}, &self.fields, {key}, {foreign}, items);
    }}

    pub fn {add}(&mut self, item: {remote}) {{
        rt::add_has_many(&mut self.{slot}, &self.fields, {key}, {foreign}, item);
    }}
",
        load = accessor.load,
        get = accessor.get,
        set = accessor.set,
        slot = accessor.slot,
    ));
    // Rows without a key are told apart by position only.
    if keyless_remote {
        output.push_str(&format!(
            "
    pub fn {remove}(&mut self, index: usize) -> Option<{remote}> {{
        rt::remove_has_many_at(&mut self.{slot}, {foreign}, index)
    }}
",
            slot = accessor.slot,
        ));
    } else {
        output.push_str(&format!(
            "
    pub fn {remove}(&mut self, key: &[rt::Value]) -> Option<{remote}> {{
        rt::remove_has_many(&mut self.{slot}, {foreign}, key)
    }}
",
            slot = accessor.slot,
        ));
    }
}

fn render_many_to_many(output: &mut String, accessor: &RelationAccessor) {
    let remote = &accessor.remote.starter;
    let via = via_const(accessor);
    let (Some(add), Some(remove)) = (&accessor.add, &accessor.remove) else {
        return;
    };

    output.push_str(&format!(
        "
    pub fn {load}(&mut self, loader: &dyn rt::Loader) -> Result<&[{remote}], rt::RuntimeError> {{
        rt::load_many_to_many(&mut self.{slot}, loader, &self.fields, &{via})
    }}

    pub fn {get}(&self) -> &[{remote}] {{
        self.{slot}.items()
    }}

    pub fn {set}(&mut self, items: Vec<{remote}>) {{
        rt::set_many_to_many(&mut self.{slot}, &self.fields, &{via}, items);
    }}

    pub fn {add}(&mut self, item: {remote}) {{
        rt::add_many_to_many(&mut self.{slot}, &self.fields, &{via}, item);
    }}

    pub fn {remove}(&mut self, key: &[rt::Value]) -> Option<{remote}> {{
        rt::remove_many_to_many(&mut self.{slot}, &{via}, key)
    }}
",
        load = accessor.load,
        get = accessor.get,
        set = accessor.set,
        slot = accessor.slot,
    ));
}

fn render_key_cascade(output: &mut String, names: &TableNames) {
    output.push_str(
        "\n    /// Copy the current key into loaded children and pending join rows.\n    fn on_key_change(&mut self) {\n",
    );
    for accessor in &names.relations {
        let r = &accessor.relationship;
        match r.kind {
            RelationKind::HasOne => {}
            RelationKind::HasMany => output.push_str(&format!(
                "        rt::cascade_has_many(&mut self.{}, &self.fields, {}, {});\n",
                accessor.slot,
                str_slice(&r.local_columns),
                str_slice(&r.remote_columns)
            )),
            RelationKind::ManyToMany => output.push_str(&format!(
                "        rt::cascade_many_to_many(&mut self.{}, &self.fields, &{});\n",
                accessor.slot,
                via_const(accessor)
            )),
        }
    }
    output.push_str("    }\n");
}

fn render_entity_impl(output: &mut String, names: &TableNames) {
    output.push_str(&format!(
        "
impl rt::Entity for {starter} {{
    const DATABASE: &'static str = {generated}::DATABASE;
    const TABLE: &'static str = {generated}::TABLE;
    const PRIMARY_KEY: &'static [&'static str] = {generated}::PRIMARY_KEY;
    const DELETE_FLAG: Option<(&'static str, &'static str)> = {generated}::DELETE_FLAG;

    fn fields(&self) -> &rt::FieldStore {{
        &self.0.fields
    }}

    fn fields_mut(&mut self) -> &mut rt::FieldStore {{
        &mut self.0.fields
    }}

    fn from_fields(fields: rt::FieldStore) -> Self {{
        Self({generated}::from_fields(fields))
    }}
}}
",
        starter = names.class.starter,
        generated = names.class.generated,
    ));
}

/// `&["a", "b"]`
fn str_slice(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("{s:?}")).collect();
    format!("&[{}]", quoted.join(", "))
}
