//! Check-constraint expressions.
//!
//! A small SQL-flavoured boolean language: literals, field identifiers, arithmetic,
//! comparisons, `AND`/`OR`/`NOT`, `IN`, `BETWEEN` and `IS [NOT] NULL`. Evaluation follows
//! three-valued logic, so comparisons involving NULL yield NULL.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::ast::Literal;
use crate::value::GeneratedValue;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

/// Parse a check expression.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::UnexpectedToken {
            expected: "end of expression".to_string(),
            found: token.describe(),
        }),
    }
}

impl Expr {
    /// Field identifiers referenced anywhere in the expression.
    pub fn fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(name) => {
                out.insert(name.clone());
            }
            Expr::Unary { operand, .. } => operand.collect_fields(out),
            Expr::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_fields(out);
                for item in list {
                    item.collect_fields(out);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_fields(out);
                low.collect_fields(out);
                high.collect_fields(out);
            }
            Expr::IsNull { expr, .. } => expr.collect_fields(out),
        }
    }

    /// Truth value of the expression; `None` when the result is unknown (NULL).
    pub fn holds<'a, F>(&self, lookup: &F) -> Option<bool>
    where
        F: Fn(&str) -> Option<&'a GeneratedValue>,
    {
        match self.evaluate(lookup) {
            GeneratedValue::Null => None,
            GeneratedValue::Bool(value) => Some(value),
            _ => Some(false),
        }
    }

    pub fn evaluate<'a, F>(&self, lookup: &F) -> GeneratedValue
    where
        F: Fn(&str) -> Option<&'a GeneratedValue>,
    {
        match self {
            Expr::Literal(literal) => literal_value(literal),
            Expr::Field(name) => lookup(name).cloned().unwrap_or(GeneratedValue::Null),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(lookup);
                match (op, value) {
                    (_, GeneratedValue::Null) => GeneratedValue::Null,
                    (UnaryOp::Not, GeneratedValue::Bool(value)) => GeneratedValue::Bool(!value),
                    (UnaryOp::Neg, GeneratedValue::Int(value)) => value
                        .checked_neg()
                        .map_or(GeneratedValue::Null, GeneratedValue::Int),
                    (UnaryOp::Neg, GeneratedValue::Decimal(value)) => {
                        GeneratedValue::Decimal(-value)
                    }
                    _ => GeneratedValue::Null,
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = truth(&left.evaluate(lookup));
                    if left == Some(false) {
                        return GeneratedValue::Bool(false);
                    }
                    match (left, truth(&right.evaluate(lookup))) {
                        (_, Some(false)) => GeneratedValue::Bool(false),
                        (Some(true), Some(true)) => GeneratedValue::Bool(true),
                        _ => GeneratedValue::Null,
                    }
                }
                BinaryOp::Or => {
                    let left = truth(&left.evaluate(lookup));
                    if left == Some(true) {
                        return GeneratedValue::Bool(true);
                    }
                    match (left, truth(&right.evaluate(lookup))) {
                        (_, Some(true)) => GeneratedValue::Bool(true),
                        (Some(false), Some(false)) => GeneratedValue::Bool(false),
                        _ => GeneratedValue::Null,
                    }
                }
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    arithmetic(*op, &left.evaluate(lookup), &right.evaluate(lookup))
                }
                _ => compare(*op, &left.evaluate(lookup), &right.evaluate(lookup)),
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let value = expr.evaluate(lookup);
                if value.is_null() {
                    return GeneratedValue::Null;
                }
                let mut saw_null = false;
                for item in list {
                    match compare(BinaryOp::Eq, &value, &item.evaluate(lookup)) {
                        GeneratedValue::Bool(true) => return GeneratedValue::Bool(!negated),
                        GeneratedValue::Null => saw_null = true,
                        _ => {}
                    }
                }
                if saw_null {
                    GeneratedValue::Null
                } else {
                    GeneratedValue::Bool(*negated)
                }
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = expr.evaluate(lookup);
                let lower = truth(&compare(BinaryOp::GtEq, &value, &low.evaluate(lookup)));
                let upper = truth(&compare(BinaryOp::LtEq, &value, &high.evaluate(lookup)));
                let inside = match (lower, upper) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                };
                match inside {
                    Some(inside) => GeneratedValue::Bool(inside != *negated),
                    None => GeneratedValue::Null,
                }
            }
            Expr::IsNull { expr, negated } => {
                GeneratedValue::Bool(expr.evaluate(lookup).is_null() != *negated)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> GeneratedValue {
    match literal {
        Literal::Null => GeneratedValue::Null,
        Literal::Bool(value) => GeneratedValue::Bool(*value),
        Literal::Int(value) => GeneratedValue::Int(*value),
        Literal::Decimal(value) => GeneratedValue::Decimal(*value),
        Literal::Text(value) => GeneratedValue::Text(value.clone()),
    }
}

fn truth(value: &GeneratedValue) -> Option<bool> {
    match value {
        GeneratedValue::Bool(value) => Some(*value),
        GeneratedValue::Null => None,
        _ => Some(false),
    }
}

fn compare(op: BinaryOp, left: &GeneratedValue, right: &GeneratedValue) -> GeneratedValue {
    if left.is_null() || right.is_null() {
        return GeneratedValue::Null;
    }
    let ordering = left.compare(right);
    let result = match op {
        BinaryOp::Eq => ordering == Some(Ordering::Equal),
        BinaryOp::NotEq => ordering.is_some_and(|ord| ord != Ordering::Equal),
        BinaryOp::Lt => ordering == Some(Ordering::Less),
        BinaryOp::LtEq => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => ordering == Some(Ordering::Greater),
        BinaryOp::GtEq => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => false,
    };
    GeneratedValue::Bool(result)
}

fn arithmetic(op: BinaryOp, left: &GeneratedValue, right: &GeneratedValue) -> GeneratedValue {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => a.checked_div(b),
            _ => None,
        };
        return result.map_or(GeneratedValue::Null, GeneratedValue::Int);
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return GeneratedValue::Null;
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b != 0.0 => a / b,
        _ => return GeneratedValue::Null,
    };
    GeneratedValue::Decimal(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{name}'"),
            Token::Number(raw) => raw.clone(),
            Token::Str(value) => format!("string '{value}'"),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Eq => "'='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::GtEq => "'>='".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            offset: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        while let Some(&ch) = self.chars.peek() {
            let start = self.offset;
            match ch {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '(' => self.single(&mut tokens, Token::LParen),
                ')' => self.single(&mut tokens, Token::RParen),
                ',' => self.single(&mut tokens, Token::Comma),
                '+' => self.single(&mut tokens, Token::Plus),
                '-' => self.single(&mut tokens, Token::Minus),
                '*' => self.single(&mut tokens, Token::Star),
                '/' => self.single(&mut tokens, Token::Slash),
                '=' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                    }
                    tokens.push(Token::Eq);
                }
                '!' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        tokens.push(Token::NotEq);
                    } else {
                        return Err(ExprError::UnexpectedChar {
                            ch: '!',
                            offset: start,
                        });
                    }
                }
                '<' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('=') => {
                            self.bump();
                            tokens.push(Token::LtEq);
                        }
                        Some('>') => {
                            self.bump();
                            tokens.push(Token::NotEq);
                        }
                        _ => tokens.push(Token::Lt),
                    }
                }
                '>' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        tokens.push(Token::GtEq);
                    } else {
                        tokens.push(Token::Gt);
                    }
                }
                '\'' => tokens.push(Token::Str(self.quoted('\'')?)),
                '"' => tokens.push(Token::Ident(self.quoted('"')?)),
                c if c.is_ascii_digit() || c == '.' => tokens.push(self.number()?),
                c if c.is_alphabetic() || c == '_' => tokens.push(self.ident()),
                other => {
                    return Err(ExprError::UnexpectedChar {
                        ch: other,
                        offset: start,
                    });
                }
            }
        }
        Ok(tokens)
    }

    fn single(&mut self, tokens: &mut Vec<Token>, token: Token) {
        self.bump();
        tokens.push(token);
    }

    /// Quoted run; a doubled quote escapes itself.
    fn quoted(&mut self, quote: char) -> Result<String, ExprError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => {
                    if self.chars.peek() == Some(&quote) {
                        self.bump();
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some(ch) => out.push(ch),
                None => return Err(ExprError::UnterminatedString),
            }
        }
    }

    fn number(&mut self) -> Result<Token, ExprError> {
        let mut raw = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                raw.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        if raw.parse::<f64>().is_err() {
            return Err(ExprError::InvalidNumber(raw));
        }
        Ok(Token::Number(raw))
    }

    fn ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: expected.describe(),
                found: token.describe(),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ExprError> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        match self.peek() {
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: keyword.to_string(),
                found: token.describe(),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword("not") {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_additive()?;

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = self.eat_keyword("not");
        if self.eat_keyword("in") {
            self.expect(Token::LParen)?;
            let mut list = vec![self.parse_additive()?];
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                list.push(self.parse_additive()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            });
        }
        if self.eat_keyword("between") {
            let low = self.parse_additive()?;
            self.expect_keyword("and")?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if negated {
            return match self.peek() {
                Some(token) => Err(ExprError::UnexpectedToken {
                    expected: "IN or BETWEEN".to_string(),
                    found: token.describe(),
                }),
                None => Err(ExprError::UnexpectedEnd),
            };
        }

        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::LtEq) => BinaryOp::LtEq,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::GtEq) => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Number(raw)) => parse_number(&raw),
            Some(Token::Str(value)) => Ok(Expr::Literal(Literal::Text(value))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let literal = match name.to_ascii_lowercase().as_str() {
                    "null" => Some(Literal::Null),
                    "true" => Some(Literal::Bool(true)),
                    "false" => Some(Literal::Bool(false)),
                    _ => None,
                };
                Ok(literal.map_or(Expr::Field(name), Expr::Literal))
            }
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: "value".to_string(),
                found: token.describe(),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn parse_number(raw: &str) -> Result<Expr, ExprError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Expr::Literal(Literal::Int(value)));
    }
    raw.parse::<f64>()
        .map(|value| Expr::Literal(Literal::Decimal(value)))
        .map_err(|_| ExprError::InvalidNumber(raw.to_string()))
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
