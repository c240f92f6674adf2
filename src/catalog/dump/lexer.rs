//! Tokenizer for schema dumps (`CREATE TABLE` / `ALTER TABLE` statements).

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Constraint,
    Index,
    If,
    Exists,
    AutoIncrement,
    Check,
    Collate,
    Comment,

    Ident(String),
    Str(String),
    Num(String),

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,

    Eof,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self { chars, current_char }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while self.current_char.is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        // current is '*'
        self.advance();
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Reads text up to `close`; a doubled closing character is an escaped one.
    fn read_delimited(&mut self, close: char, backslash_escapes: bool) -> String {
        self.advance();
        let mut s = String::new();
        while let Some(c) = self.current_char {
            if c == close {
                if self.peek() == Some(&close) {
                    s.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    break;
                }
            } else if c == '\\' && backslash_escapes {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        _ => s.push(escaped),
                    }
                    self.advance();
                }
            } else {
                s.push(c);
                self.advance();
            }
        }
        s
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let Some(c) = self.current_char else {
                return Token::Eof;
            };

            if let Some(token) = punctuation(c) {
                self.advance();
                return token;
            }

            match c {
                '-' if self.peek() == Some(&'-') => self.skip_line_comment(),
                '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    return Token::Num(self.read_number());
                }
                '#' => self.skip_line_comment(),
                '/' => {
                    self.advance();
                    if self.current_char == Some('*') {
                        self.skip_block_comment();
                    }
                }
                '"' => return Token::Ident(self.read_delimited('"', false)),
                '`' => return Token::Ident(self.read_delimited('`', false)),
                '[' => return Token::Ident(self.read_delimited(']', false)),
                '\'' => return Token::Str(self.read_delimited('\'', true)),
                c if c.is_ascii_digit() => return Token::Num(self.read_number()),
                c if c.is_alphabetic() || c == '_' => return keyword_or_ident(self.read_identifier()),
                _ => self.advance(),
            }
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

fn punctuation(c: char) -> Option<Token> {
    match c {
        '(' => Some(Token::LParen),
        ')' => Some(Token::RParen),
        ',' => Some(Token::Comma),
        ';' => Some(Token::Semicolon),
        '.' => Some(Token::Dot),
        _ => None,
    }
}

const KEYWORDS: &[(&str, Token)] = &[
    ("CREATE", Token::Create),
    ("ALTER", Token::Alter),
    ("ADD", Token::Add),
    ("TABLE", Token::Table),
    ("ONLY", Token::Only),
    ("PRIMARY", Token::Primary),
    ("KEY", Token::Key),
    ("FOREIGN", Token::Foreign),
    ("REFERENCES", Token::References),
    ("NOT", Token::Not),
    ("NULL", Token::Null),
    ("UNIQUE", Token::Unique),
    ("DEFAULT", Token::Default),
    ("ON", Token::On),
    ("DELETE", Token::Delete),
    ("UPDATE", Token::Update),
    ("CASCADE", Token::Cascade),
    ("RESTRICT", Token::Restrict),
    ("CONSTRAINT", Token::Constraint),
    ("INDEX", Token::Index),
    ("IF", Token::If),
    ("EXISTS", Token::Exists),
    ("AUTO_INCREMENT", Token::AutoIncrement),
    ("AUTOINCREMENT", Token::AutoIncrement),
    ("CHECK", Token::Check),
    ("COLLATE", Token::Collate),
    ("COMMENT", Token::Comment),
];

fn keyword_or_ident(word: String) -> Token {
    match KEYWORDS.iter().find(|(k, _)| word.eq_ignore_ascii_case(k)) {
        Some((_, token)) => token.clone(),
        None => Token::Ident(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_tokens() {
        let tokens = Lexer::new("CREATE TABLE book (id INT);").tokenize();

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
        assert_eq!(tokens[2], Token::Ident("book".to_string()));
        assert_eq!(tokens[3], Token::LParen);
        assert_eq!(tokens[4], Token::Ident("id".to_string()));
        assert_eq!(tokens[5], Token::Ident("INT".to_string()));
        assert_eq!(tokens[6], Token::RParen);
        assert_eq!(tokens[7], Token::Semicolon);
        assert_eq!(tokens[8], Token::Eof);
    }

    #[test]
    fn test_quoted_identifiers_and_strings() {
        let tokens =
            Lexer::new(r#"CREATE TABLE `cust pc` ("a""b" INT DEFAULT 'it''s', [c] INT);"#).tokenize();

        assert_eq!(tokens[2], Token::Ident("cust pc".to_string()));
        assert_eq!(tokens[4], Token::Ident("a\"b".to_string()));
        assert_eq!(tokens[7], Token::Str("it's".to_string()));
        assert_eq!(tokens[9], Token::Ident("c".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = Lexer::new("-- dump\n# mysql\nCREATE /* x */ TABLE t (id INT);").tokenize();

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
    }
}
