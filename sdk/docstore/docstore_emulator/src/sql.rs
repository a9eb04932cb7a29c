// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! The query subset the emulator understands.
//!
//! ```text
//! SELECT * FROM <alias> [WHERE <predicate>]
//! predicate  := conjunction (OR conjunction)*
//! conjunction:= comparison (AND comparison)*
//! comparison := operand (= | != | <> | < | <= | > | >=) operand | ( predicate )
//! operand    := <alias>.path | <alias>["path"] ... | @param | literal
//! ```
//!
//! Anything else is rejected, which the emulator reports as a bad request.

use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};

/// A parsed `SELECT * FROM ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    alias: String,
    filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
    Compare(Operand, Comparison, Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Path(Vec<String>),
    Parameter(String),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Select,
    From,
    Where,
    And,
    Or,
    True,
    False,
    Null,
    Star,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Identifier(String),
    Parameter(String),
    StringLit(String),
    Number(serde_json::Number),
    Eof,
}

impl SelectStatement {
    /// Parses query text, failing with a description of the first unsupported construct.
    pub fn parse(text: &str) -> Result<Self, String> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        parser.parse_select()
    }

    /// Returns `true` if `document` satisfies the `WHERE` clause.
    ///
    /// Every parameter the clause references must be bound in `parameters`.
    pub fn matches(
        &self,
        document: &Value,
        parameters: &HashMap<String, Value>,
    ) -> Result<bool, String> {
        match &self.filter {
            None => Ok(true),
            Some(predicate) => self.evaluate(predicate, document, parameters),
        }
    }

    fn evaluate(
        &self,
        predicate: &Predicate,
        document: &Value,
        parameters: &HashMap<String, Value>,
    ) -> Result<bool, String> {
        match predicate {
            Predicate::Or(parts) => {
                for part in parts {
                    if self.evaluate(part, document, parameters)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::And(parts) => {
                for part in parts {
                    if !self.evaluate(part, document, parameters)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Compare(left, comparison, right) => {
                let left = self.resolve(left, document, parameters)?;
                let right = self.resolve(right, document, parameters)?;
                Ok(compare(left, *comparison, right))
            }
        }
    }

    fn resolve<'a>(
        &self,
        operand: &'a Operand,
        document: &'a Value,
        parameters: &'a HashMap<String, Value>,
    ) -> Result<Option<&'a Value>, String> {
        match operand {
            Operand::Literal(value) => Ok(Some(value)),
            Operand::Parameter(name) => parameters
                .get(name)
                .map(Some)
                .ok_or_else(|| format!("parameter '{name}' is not bound")),
            Operand::Path(path) => {
                let (root, rest) = path
                    .split_first()
                    .ok_or_else(|| "empty property path".to_string())?;
                if root != &self.alias {
                    return Err(format!("identifier '{root}' could not be resolved"));
                }
                Ok(rest
                    .iter()
                    .try_fold(document, |value, segment| value.get(segment)))
            }
        }
    }
}

/// Missing properties never compare equal (or unequal) to anything.
fn compare(left: Option<&Value>, comparison: Comparison, right: Option<&Value>) -> bool {
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .zip(r.as_f64())
            .and_then(|(l, r)| l.partial_cmp(&r)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
    };
    match (comparison, ordering) {
        (Comparison::Eq, ordering) => ordering == Some(Ordering::Equal),
        (Comparison::NotEq, Some(ordering)) => ordering != Ordering::Equal,
        (Comparison::NotEq, None) => left != right,
        (_, None) => false,
        (Comparison::Lt, Some(ordering)) => ordering == Ordering::Less,
        (Comparison::Le, Some(ordering)) => ordering != Ordering::Greater,
        (Comparison::Gt, Some(ordering)) => ordering == Ordering::Greater,
        (Comparison::Ge, Some(ordering)) => ordering != Ordering::Less,
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let two = (i + 1 < len).then(|| chars[i + 1]);
        let (token, width) = match (c, two) {
            ('*', _) => (Token::Star, 1),
            ('.', Some(d)) if !d.is_ascii_digit() => (Token::Dot, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('=', _) => (Token::Eq, 1),
            ('!', Some('=')) | ('<', Some('>')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', Some('=')) => (Token::Ge, 2),
            ('>', _) => (Token::Gt, 1),
            _ => (Token::Eof, 0),
        };
        if width > 0 {
            tokens.push(token);
            i += width;
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let mut value = String::new();
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string literal".to_string()),
                    Some('\\') => {
                        let escaped = chars
                            .get(i + 1)
                            .ok_or_else(|| "unterminated string literal".to_string())?;
                        value.push(*escaped);
                        i += 2;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(&ch) => {
                        value.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::StringLit(value));
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || ((c == '-' || c == '.') && two.is_some_and(|d| d.is_ascii_digit()));
        if starts_number {
            let start = i;
            i += 1;
            while i < len && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E')) {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let number = serde_json::from_str::<serde_json::Number>(&literal)
                .or_else(|_| {
                    literal
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .ok_or(())
                })
                .map_err(|_| format!("invalid number '{literal}'"))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c == '@' || c.is_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let token = if word.starts_with('@') {
                if word.len() == 1 {
                    return Err("parameter names cannot be empty".to_string());
                }
                Token::Parameter(word)
            } else {
                match word.to_ascii_uppercase().as_str() {
                    "SELECT" => Token::Select,
                    "FROM" => Token::From,
                    "WHERE" => Token::Where,
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "TRUE" => Token::True,
                    "FALSE" => Token::False,
                    "NULL" => Token::Null,
                    _ => Token::Identifier(word),
                }
            };
            tokens.push(token);
            continue;
        }

        return Err(format!("unexpected character '{c}'"));
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Deepest parenthesis nesting a `WHERE` clause may use.
const MAX_NESTING: usize = 32;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.current()))
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            other => Err(format!("expected an identifier, found {other:?}")),
        }
    }

    fn parse_select(&mut self) -> Result<SelectStatement, String> {
        self.expect(Token::Select)?;
        self.expect(Token::Star)?;
        self.expect(Token::From)?;
        let alias = self.identifier()?;
        let filter = if self.current() == &Token::Where {
            self.advance();
            Some(self.parse_or()?)
        } else {
            None
        };
        if self.current() != &Token::Eof {
            return Err(format!("unsupported syntax at {:?}", self.current()));
        }
        Ok(SelectStatement { alias, filter })
    }

    fn parse_or(&mut self) -> Result<Predicate, String> {
        let mut parts = vec![self.parse_and()?];
        while self.current() == &Token::Or {
            self.advance();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Predicate, String> {
        let mut parts = vec![self.parse_comparison()?];
        while self.current() == &Token::And {
            self.advance();
            parts.push(self.parse_comparison()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        })
    }

    fn parse_comparison(&mut self) -> Result<Predicate, String> {
        if self.current() == &Token::LParen {
            if self.depth >= MAX_NESTING {
                return Err(format!("parentheses nest deeper than {MAX_NESTING} levels"));
            }
            self.advance();
            self.depth += 1;
            let inner = self.parse_or()?;
            self.depth -= 1;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }

        let left = self.parse_operand()?;
        let comparison = match self.advance() {
            Token::Eq => Comparison::Eq,
            Token::NotEq => Comparison::NotEq,
            Token::Lt => Comparison::Lt,
            Token::Le => Comparison::Le,
            Token::Gt => Comparison::Gt,
            Token::Ge => Comparison::Ge,
            other => return Err(format!("expected a comparison operator, found {other:?}")),
        };
        let right = self.parse_operand()?;
        Ok(Predicate::Compare(left, comparison, right))
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.advance() {
            Token::Identifier(root) => {
                let mut path = vec![root];
                loop {
                    match self.current() {
                        Token::Dot => {
                            self.advance();
                            path.push(self.identifier()?);
                        }
                        Token::LBracket => {
                            self.advance();
                            match self.advance() {
                                Token::StringLit(name) => path.push(name),
                                other => {
                                    return Err(format!(
                                        "expected a quoted property name, found {other:?}"
                                    ))
                                }
                            }
                            self.expect(Token::RBracket)?;
                        }
                        _ => break,
                    }
                }
                Ok(Operand::Path(path))
            }
            Token::Parameter(name) => Ok(Operand::Parameter(name)),
            Token::StringLit(value) => Ok(Operand::Literal(Value::String(value))),
            Token::Number(number) => Ok(Operand::Literal(Value::Number(number))),
            Token::True => Ok(Operand::Literal(Value::Bool(true))),
            Token::False => Ok(Operand::Literal(Value::Bool(false))),
            Token::Null => Ok(Operand::Literal(Value::Null)),
            other => Err(format!("expected a value or property path, found {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn family() -> Value {
        json!({
            "id": "Andersen.1",
            "lastName": "Andersen",
            "address": { "state": "WA", "city": "Seattle" },
            "children": 1,
            "isRegistered": false
        })
    }

    fn matches(query: &str, params: &[(&str, Value)]) -> bool {
        let parameters = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        SelectStatement::parse(query)
            .unwrap()
            .matches(&family(), &parameters)
            .unwrap()
    }

    #[test]
    fn select_all_matches_everything() {
        assert!(matches("SELECT * FROM c", &[]));
        assert!(matches("select * from root", &[]));
    }

    #[test]
    fn filters_on_literals_and_parameters() {
        assert!(matches("SELECT * FROM f WHERE f.lastName = 'Andersen'", &[]));
        assert!(matches("SELECT * FROM f WHERE f.address.state = \"WA\"", &[]));
        assert!(matches("SELECT * FROM f WHERE f[\"lastName\"] = 'Andersen'", &[]));
        assert!(!matches("SELECT * FROM f WHERE f.lastName = 'Wakefield'", &[]));
        assert!(matches(
            "SELECT * FROM f WHERE f.lastName = @lastName",
            &[("@lastName", json!("Andersen"))]
        ));
    }

    #[test]
    fn combines_predicates() {
        assert!(matches(
            "SELECT * FROM f WHERE f.lastName = 'Andersen' AND f.children >= 1",
            &[]
        ));
        assert!(!matches(
            "SELECT * FROM f WHERE f.lastName = 'Andersen' AND f.isRegistered = true",
            &[]
        ));
        assert!(matches(
            "SELECT * FROM f WHERE (f.lastName = 'Wakefield' OR f.address.city = 'Seattle')",
            &[]
        ));
        assert!(matches("SELECT * FROM f WHERE f.children != 2", &[]));
        assert!(matches("SELECT * FROM f WHERE f.children < 1.5", &[]));
    }

    #[test]
    fn missing_properties_never_match() {
        assert!(!matches("SELECT * FROM f WHERE f.nickname = 'Andy'", &[]));
        assert!(!matches("SELECT * FROM f WHERE f.nickname != 'Andy'", &[]));
    }

    #[test]
    fn rejects_unsupported_queries() {
        for query in [
            "SELECT f.id FROM f",
            "SELECT * FROM f ORDER BY f.id",
            "DELETE FROM f",
            "SELECT * FROM f WHERE f.id = 'unterminated",
            "SELECT * FROM f WHERE",
        ] {
            assert!(SelectStatement::parse(query).is_err(), "{query}");
        }
    }

    #[test]
    fn deeply_nested_parentheses_are_rejected() {
        let nested = |depth: usize| {
            format!(
                "SELECT * FROM f WHERE {}f.id = 'x'{}",
                "(".repeat(depth),
                ")".repeat(depth)
            )
        };
        assert!(SelectStatement::parse(&nested(MAX_NESTING)).is_ok());
        assert!(SelectStatement::parse(&nested(MAX_NESTING + 1)).is_err());
        assert!(SelectStatement::parse(&nested(100_000)).is_err());
    }

    #[test]
    fn unbound_parameters_and_unknown_aliases_fail() {
        let statement = SelectStatement::parse("SELECT * FROM f WHERE f.id = @id").unwrap();
        assert!(statement.matches(&family(), &HashMap::new()).is_err());

        let statement = SelectStatement::parse("SELECT * FROM f WHERE c.id = 'x'").unwrap();
        assert!(statement.matches(&family(), &HashMap::new()).is_err());
    }
}
