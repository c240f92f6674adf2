//! Statement parser for schema dumps.

use super::lexer::{Lexer, Token};
use crate::catalog::ColumnDescriptor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlParseError {
    #[error("Expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: Token },
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// A table recovered from the dump.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpTable {
    /// Schema or database qualifier the dump gave the table
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<DumpForeignKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DumpForeignKey {
    pub columns: Vec<String>,
    /// Qualifier of the referenced table, as written
    pub target_schema: Option<String>,
    pub target: String,
    pub target_columns: Vec<String>,
}

/// Parse every `CREATE TABLE` in the dump, folding in `ALTER TABLE ... ADD` keys.
pub fn parse_dump(input: &str) -> Result<Vec<DumpTable>, SqlParseError> {
    let tokens = Lexer::new(input).tokenize();
    Parser::new(tokens).parse()
}

enum AlterAction {
    PrimaryKey(Vec<String>),
    ForeignKey(DumpForeignKey),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_next(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(self.current(), Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    fn parse(&mut self) -> Result<Vec<DumpTable>, SqlParseError> {
        let mut tables: Vec<DumpTable> = Vec::new();
        let mut alters: Vec<(String, AlterAction)> = Vec::new();

        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => {
                    self.advance();
                    // CREATE TEMPORARY TABLE, CREATE UNLOGGED TABLE
                    while matches!(self.current(), Token::Ident(_)) {
                        self.advance();
                    }
                    if self.current() != &Token::Table {
                        self.skip_statement();
                        continue;
                    }
                    self.advance();
                    self.skip_if_not_exists();
                    if let Some(table) = self.parse_create_table()? {
                        tables.push(table);
                    }
                }
                Token::Alter => {
                    if let Some(action) = self.parse_alter_table()? {
                        alters.push(action);
                    }
                }
                _ => self.advance(),
            }
        }

        for (table_name, action) in alters {
            let Some(table) = tables.iter_mut().find(|t| t.name == table_name) else {
                tracing::warn!(table = %table_name, "ALTER TABLE for unknown table ignored");
                continue;
            };
            match action {
                AlterAction::PrimaryKey(cols) => mark_primary_key(&mut table.columns, &cols),
                AlterAction::ForeignKey(fk) => table.foreign_keys.push(fk),
            }
        }

        Ok(tables)
    }

    fn skip_if_not_exists(&mut self) {
        if self.current() == &Token::If {
            self.advance();
            if self.current() == &Token::Not {
                self.advance();
            }
            if self.current() == &Token::Exists {
                self.advance();
            }
        }
    }

    /// `name` or `schema.name`. Of longer paths only the last two parts are kept.
    fn parse_qualified_name(&mut self) -> Option<(Option<String>, String)> {
        let mut name = match self.current() {
            Token::Ident(n) => n.clone(),
            _ => return None,
        };
        let mut schema = None;
        self.advance();
        while self.current() == &Token::Dot {
            self.advance();
            if let Token::Ident(n) = self.current() {
                schema = Some(std::mem::replace(&mut name, n.clone()));
                self.advance();
            }
        }
        Some((schema, name))
    }

    fn parse_create_table(&mut self) -> Result<Option<DumpTable>, SqlParseError> {
        let Some((schema, name)) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(None);
        };

        if self.current() != &Token::LParen {
            // CREATE TABLE ... AS SELECT, CREATE TABLE ... LIKE
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();
        let mut pk_columns: Vec<String> = Vec::new();

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => self.advance(),
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                        pk_columns.extend(self.parse_column_list());
                    }
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Foreign => {
                    if let Some(fk) = self.parse_foreign_key_constraint()? {
                        foreign_keys.push(fk);
                    }
                }
                Token::Constraint => {
                    self.advance();
                    if let Token::Ident(_) = self.current() {
                        self.advance();
                    }
                }
                Token::Unique | Token::Index | Token::Key | Token::Check => {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Ident(word)
                    if ["FULLTEXT", "SPATIAL", "EXCLUDE"]
                        .iter()
                        .any(|k| word.eq_ignore_ascii_case(k)) =>
                {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Ident(_) => {
                    if let Some((col, reference)) = self.parse_column()? {
                        if let Some(fk) = reference {
                            foreign_keys.push(fk);
                        }
                        columns.push(col);
                    }
                }
                Token::Eof => return Err(SqlParseError::UnexpectedEof),
                _ => self.advance(),
            }
        }

        // Table options (ENGINE=, CHARSET=, ...)
        self.skip_statement();

        mark_primary_key(&mut columns, &pk_columns);

        Ok(Some(DumpTable {
            schema,
            name,
            columns,
            foreign_keys,
        }))
    }

    fn parse_column(
        &mut self,
    ) -> Result<Option<(ColumnDescriptor, Option<DumpForeignKey>)>, SqlParseError> {
        let name = match self.current() {
            Token::Ident(n) => n.clone(),
            _ => return Ok(None),
        };
        self.advance();

        let typ = self.parse_type();
        if typ.is_empty() {
            self.skip_until(&[Token::Comma, Token::RParen]);
            return Ok(None);
        }

        let mut column = ColumnDescriptor::new(name.clone(), typ);
        let mut reference = None;

        loop {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    column = column.primary_key();
                }
                Token::Not => {
                    self.advance();
                    if self.current() == &Token::Null {
                        self.advance();
                        column.nullable = false;
                    }
                }
                Token::Null => {
                    self.advance();
                }
                Token::Default => {
                    self.advance();
                    column.default = Some(self.parse_default_value());
                }
                Token::References => {
                    self.advance();
                    let ((target_schema, target), target_columns) = self.parse_reference()?;
                    reference = Some(DumpForeignKey {
                        columns: vec![name.clone()],
                        target_schema,
                        target,
                        target_columns,
                    });
                    self.skip_on_actions();
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::On => self.skip_on_actions(),
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }

        Ok(Some((column, reference)))
    }

    /// Collects the type text, e.g. `int(11) unsigned` or `double precision`.
    fn parse_type(&mut self) -> String {
        let mut typ = String::new();
        let mut paren_depth = 0;

        loop {
            match self.current() {
                Token::Ident(t) if paren_depth == 0 => {
                    let stop = ["CHARACTER", "CHARSET", "GENERATED", "AS"]
                        .iter()
                        .any(|k| t.eq_ignore_ascii_case(k))
                        && !(t.eq_ignore_ascii_case("CHARACTER") && !matches!(self.peek_next(), Token::Ident(s) if s.eq_ignore_ascii_case("SET")));
                    if stop {
                        break;
                    }
                    if !typ.is_empty() && !typ.ends_with('(') {
                        typ.push(' ');
                    }
                    typ.push_str(t);
                    self.advance();
                }
                Token::Ident(t) | Token::Num(t) => {
                    typ.push_str(t);
                    self.advance();
                }
                Token::Str(s) if paren_depth > 0 => {
                    typ.push_str(&format!("'{}'", s.replace('\'', "''")));
                    self.advance();
                }
                Token::LParen => {
                    paren_depth += 1;
                    typ.push('(');
                    self.advance();
                }
                Token::RParen if paren_depth > 0 => {
                    paren_depth -= 1;
                    typ.push(')');
                    self.advance();
                }
                Token::Comma if paren_depth > 0 => {
                    typ.push(',');
                    self.advance();
                }
                _ => break,
            }
        }

        typ
    }

    /// Raw default text; string literals keep their quotes so `'NULL'` stays a literal.
    fn parse_default_value(&mut self) -> String {
        match self.current().clone() {
            Token::Str(s) => {
                self.advance();
                format!("'{s}'")
            }
            Token::Num(n) => {
                self.advance();
                n
            }
            Token::Null => {
                self.advance();
                "NULL".to_string()
            }
            Token::Ident(s) => {
                self.advance();
                if self.current() == &Token::LParen {
                    format!("{s}({})", self.collect_parenthesized())
                } else {
                    s
                }
            }
            Token::LParen => format!("({})", self.collect_parenthesized()),
            _ => String::new(),
        }
    }

    fn collect_parenthesized(&mut self) -> String {
        // current is '('
        self.advance();
        let mut parts = Vec::new();
        let mut depth = 1;

        loop {
            match self.current() {
                Token::LParen => {
                    depth += 1;
                    parts.push("(".to_string());
                }
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    parts.push(")".to_string());
                }
                Token::Ident(s) | Token::Num(s) => parts.push(s.clone()),
                Token::Str(s) => parts.push(format!("'{s}'")),
                Token::Comma => parts.push(",".to_string()),
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }

        parts.join(" ")
    }

    fn parse_reference(
        &mut self,
    ) -> Result<((Option<String>, String), Vec<String>), SqlParseError> {
        let target = match self.parse_qualified_name() {
            Some(t) => t,
            None => {
                return Err(SqlParseError::Expected {
                    expected: "referenced table",
                    found: self.current().clone(),
                });
            }
        };

        let columns = if self.current() == &Token::LParen {
            self.parse_column_list()
        } else {
            Vec::new()
        };

        Ok((target, columns))
    }

    fn parse_foreign_key_constraint(&mut self) -> Result<Option<DumpForeignKey>, SqlParseError> {
        self.advance(); // FOREIGN
        if self.current() != &Token::Key {
            return Ok(None);
        }
        self.advance();

        // MySQL allows an index name here
        if let Token::Ident(_) = self.current() {
            self.advance();
        }

        let columns = self.parse_column_list();

        if self.current() != &Token::References {
            self.skip_until(&[Token::Comma, Token::RParen]);
            return Ok(None);
        }
        self.advance();

        let ((target_schema, target), target_columns) = self.parse_reference()?;
        self.skip_on_actions();

        Ok(Some(DumpForeignKey {
            columns,
            target_schema,
            target,
            target_columns,
        }))
    }

    fn parse_column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();

        if self.current() != &Token::LParen {
            return cols;
        }
        self.advance();

        loop {
            match self.current() {
                Token::Ident(name) => {
                    cols.push(name.clone());
                    self.advance();
                    // index prefix length, e.g. `name`(10)
                    if self.current() == &Token::LParen {
                        self.skip_parenthesized();
                    }
                }
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                _ => self.advance(),
            }
        }

        cols
    }

    fn skip_on_actions(&mut self) {
        while self.current() == &Token::On {
            self.advance();
            if matches!(self.current(), Token::Delete | Token::Update) {
                self.advance();
            }
            match self.current() {
                Token::Cascade | Token::Restrict => self.advance(),
                _ if self.check_word("SET") => {
                    self.advance();
                    if matches!(self.current(), Token::Null | Token::Default) {
                        self.advance();
                    }
                }
                _ if self.check_word("NO") => {
                    self.advance();
                    if self.check_word("ACTION") {
                        self.advance();
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_parenthesized(&mut self) {
        if self.current() != &Token::LParen {
            self.advance();
            return;
        }
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }

    /// `ALTER TABLE [ONLY] t ADD [CONSTRAINT c] {PRIMARY KEY | FOREIGN KEY} ...`
    fn parse_alter_table(&mut self) -> Result<Option<(String, AlterAction)>, SqlParseError> {
        self.advance(); // ALTER

        if self.current() != &Token::Table {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();
        if self.current() == &Token::Only {
            self.advance();
        }

        let Some((_, table_name)) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(None);
        };

        if self.current() != &Token::Add {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        if self.current() == &Token::Constraint {
            self.advance();
            if let Token::Ident(_) = self.current() {
                self.advance();
            }
        }

        let action = match self.current() {
            Token::Primary => {
                self.advance();
                if self.current() != &Token::Key {
                    None
                } else {
                    self.advance();
                    Some(AlterAction::PrimaryKey(self.parse_column_list()))
                }
            }
            Token::Foreign => self
                .parse_foreign_key_constraint()?
                .map(AlterAction::ForeignKey),
            _ => None,
        };

        self.skip_statement();
        Ok(action.map(|a| (table_name, a)))
    }
}

fn mark_primary_key(columns: &mut [ColumnDescriptor], pk_columns: &[String]) {
    for col in columns.iter_mut() {
        if pk_columns.contains(&col.name) {
            col.primary_key = true;
            col.nullable = false;
        }
    }
}
