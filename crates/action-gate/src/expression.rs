//! Condition expression language
//!
//! Grammar:
//! ```text
//! expr    := or
//! or      := and (("or" | "||") and)*
//! and     := not (("and" | "&&") not)*
//! not     := ("not" | "!") not | compare
//! compare := primary (("==" | "!=") primary)?
//! primary := literal | identifier | "(" expr ")"
//! ```
//! Literals are `True`/`False` (any case), `None`/`null`, numbers and quoted
//! strings. Evaluation only sees the variables map it is handed.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::GateError;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?:(==|!=|&&|\|\||!|\(|\))|"([^"]*)"|'([^']*)'|(-?\d+(?:\.\d+)?)|([A-Za-z_][A-Za-z0-9_]*))"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Eq,
    Ne,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Literal(Value),
    Ident(String),
}

fn tokenize(source: &str) -> Result<Vec<Token>, GateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while !rest.trim().is_empty() {
        let caps = TOKEN
            .captures(rest)
            .ok_or_else(|| GateError::parse(source, format!("unexpected input at '{}'", rest.trim())))?;

        let token = if let Some(op) = caps.get(1) {
            match op.as_str() {
                "==" => Token::Eq,
                "!=" => Token::Ne,
                "&&" => Token::And,
                "||" => Token::Or,
                "!" => Token::Not,
                "(" => Token::LParen,
                _ => Token::RParen,
            }
        } else if let Some(text) = caps.get(2).or_else(|| caps.get(3)) {
            Token::Literal(Value::String(text.as_str().to_string()))
        } else if let Some(number) = caps.get(4) {
            let parsed: f64 = number
                .as_str()
                .parse()
                .map_err(|_| GateError::parse(source, format!("bad number '{}'", number.as_str())))?;
            Token::Literal(serde_json::Number::from_f64(parsed).map_or(Value::Null, Value::Number))
        } else if let Some(word) = caps.get(5) {
            match word.as_str().to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "true" => Token::Literal(Value::Bool(true)),
                "false" => Token::Literal(Value::Bool(false)),
                "none" | "null" => Token::Literal(Value::Null),
                _ => Token::Ident(word.as_str().to_string()),
            }
        } else {
            return Err(GateError::parse(source, "unrecognized token"));
        };

        tokens.push(token);
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Var(String),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare {
        left: Box<Node>,
        right: Box<Node>,
        negated: bool,
    },
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn or(&mut self) -> Result<Node, GateError> {
        let mut node = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            node = Node::Or(Box::new(node), Box::new(self.and()?));
        }
        Ok(node)
    }

    fn and(&mut self) -> Result<Node, GateError> {
        let mut node = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            node = Node::And(Box::new(node), Box::new(self.not()?));
        }
        Ok(node)
    }

    fn not(&mut self) -> Result<Node, GateError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Node::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Node, GateError> {
        let left = self.primary()?;
        let negated = match self.peek() {
            Some(Token::Eq) => false,
            Some(Token::Ne) => true,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.primary()?;
        Ok(Node::Compare {
            left: Box::new(left),
            right: Box::new(right),
            negated,
        })
    }

    fn primary(&mut self) -> Result<Node, GateError> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(Node::Literal(value)),
            Some(Token::Ident(name)) => Ok(Node::Var(name)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(GateError::parse(self.source, "missing ')'")),
                }
            }
            Some(other) => Err(GateError::parse(
                self.source,
                format!("unexpected token {:?}", other),
            )),
            None => Err(GateError::parse(self.source, "unexpected end of expression")),
        }
    }
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, GateError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(GateError::parse(source, "empty expression"));
        }
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let root = parser.or()?;
        if parser.pos < parser.tokens.len() {
            return Err(GateError::parse(source, "trailing tokens"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the given variables only.
    pub fn evaluate(&self, variables: &BTreeMap<String, Value>) -> Result<bool, GateError> {
        eval(&self.root, variables).map(|value| truthy(&value))
    }
}

fn eval(node: &Node, variables: &BTreeMap<String, Value>) -> Result<Value, GateError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Var(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| GateError::UnknownVariable(name.clone())),
        Node::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, variables)?))),
        Node::And(left, right) => {
            if !truthy(&eval(left, variables)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(right, variables)?)))
        }
        Node::Or(left, right) => {
            if truthy(&eval(left, variables)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(right, variables)?)))
        }
        Node::Compare {
            left,
            right,
            negated,
        } => {
            let equal = values_equal(&eval(left, variables)?, &eval(right, variables)?);
            Ok(Value::Bool(equal != *negated))
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(false, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equality_against_boolean_literals() {
        let expr = Expression::parse("IS_MINOR_TRUE == True").unwrap();
        assert!(expr
            .evaluate(&vars(&[("IS_MINOR_TRUE", json!(true))]))
            .unwrap());
        assert!(!expr
            .evaluate(&vars(&[("IS_MINOR_TRUE", json!(false))]))
            .unwrap());
    }

    #[test]
    fn boolean_operators_and_grouping() {
        let expr = Expression::parse("not (A == 1 and B != 'x') or C").unwrap();
        let ctx = vars(&[("A", json!(1.0)), ("B", json!("y")), ("C", json!(false))]);
        assert!(!expr.evaluate(&ctx).unwrap());

        let ctx = vars(&[("A", json!(2)), ("B", json!("y")), ("C", json!(false))]);
        assert!(expr.evaluate(&ctx).unwrap());
    }

    #[test]
    fn short_circuit_skips_unknown_variable() {
        let expr = Expression::parse("A && MISSING").unwrap();
        assert!(!expr.evaluate(&vars(&[("A", json!(false))])).unwrap());
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let expr = Expression::parse("MISSING == True").unwrap();
        assert_eq!(
            expr.evaluate(&BTreeMap::new()),
            Err(GateError::UnknownVariable("MISSING".into()))
        );
    }

    #[test]
    fn malformed_sources_are_rejected() {
        assert!(Expression::parse("").is_err());
        assert!(Expression::parse("A ==").is_err());
        assert!(Expression::parse("(A").is_err());
        assert!(Expression::parse("A B").is_err());
        assert!(Expression::parse("A = B").is_err());
        assert!(Expression::parse("__import__('os')").is_err());
    }
}
