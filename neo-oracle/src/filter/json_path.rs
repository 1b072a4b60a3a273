//! A restricted JSONPath evaluator.
//!
//! Supports `$`, `.name`, `['name']`, `.*`, `[*]`, `..name`, `[i]` (negative
//! indices count from the end), unions `[a,b]` / `['a','b']` and slices
//! `[start:end]`. Evaluation is bounded by [`MAX_PATH_DEPTH`] segments and
//! [`MAX_PATH_OBJECTS`] intermediate values.

use super::FilterError;
use serde_json::Value;
use std::collections::VecDeque;
use std::str::FromStr;

pub const MAX_PATH_DEPTH: usize = 6;
pub const MAX_PATH_OBJECTS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Root,
    Dot,
    LeftBracket,
    RightBracket,
    Asterisk,
    Comma,
    Colon,
    Identifier(String),
    String(String),
    Number(i64),
}

fn invalid(message: impl Into<String>) -> FilterError {
    FilterError::InvalidPath(message.into())
}

fn tokenize(expr: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => tokens.push(Token::Root),
            '.' => tokens.push(Token::Dot),
            '[' => tokens.push(Token::LeftBracket),
            ']' => tokens.push(Token::RightBracket),
            '*' => tokens.push(Token::Asterisk),
            ',' => tokens.push(Token::Comma),
            ':' => tokens.push(Token::Colon),
            '\'' => {
                let mut content = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => content.push(ch),
                        None => return Err(invalid("unterminated string")),
                    }
                }
                tokens.push(Token::String(content));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut content = c.to_string();
                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    content.push(next);
                    chars.next();
                }
                tokens.push(Token::Identifier(content));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut content = c.to_string();
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    content.push(next);
                    chars.next();
                }
                let number = content
                    .parse::<i64>()
                    .map_err(|_| invalid(format!("bad number `{content}`")))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(invalid(format!("unexpected character `{other}`"))),
        }
    }

    Ok(tokens)
}

/// A parsed path expression.
#[derive(Debug, Clone)]
pub struct JsonPath(Vec<Token>);

impl FromStr for JsonPath {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        if tokens.first() != Some(&Token::Root) {
            return Err(invalid("path must start with `$`"));
        }
        Ok(Self(tokens))
    }
}

impl JsonPath {
    /// Evaluates the path against `root`, returning the selected values in
    /// document order.
    pub fn apply(&self, root: &Value) -> Result<Vec<Value>, FilterError> {
        let mut tokens: VecDeque<Token> = self.0.iter().skip(1).cloned().collect();
        let mut objects = vec![root];
        let mut depth = 0;

        while let Some(token) = tokens.pop_front() {
            depth += 1;
            if depth > MAX_PATH_DEPTH {
                return Err(invalid(format!("more than {MAX_PATH_DEPTH} segments")));
            }
            objects = match token {
                Token::Dot => process_dot(objects, &mut tokens)?,
                Token::LeftBracket => process_bracket(objects, &mut tokens)?,
                other => return Err(invalid(format!("unexpected token {other:?}"))),
            };
            if objects.len() > MAX_PATH_OBJECTS {
                return Err(FilterError::TooManyObjects(MAX_PATH_OBJECTS));
            }
        }

        Ok(objects.into_iter().cloned().collect())
    }
}

type Objects<'a> = Vec<&'a Value>;

fn process_dot<'a>(
    objects: Objects<'a>,
    tokens: &mut VecDeque<Token>,
) -> Result<Objects<'a>, FilterError> {
    match tokens.pop_front() {
        Some(Token::Asterisk) => Ok(descent(&objects)),
        Some(Token::Dot) => match tokens.pop_front() {
            Some(Token::Identifier(name)) => recursive_descent(objects, &name),
            _ => Err(invalid("`..` must be followed by a name")),
        },
        Some(Token::Identifier(name)) => Ok(descent_by_names(&objects, &[name])),
        _ => Err(invalid("`.` must be followed by a name or `*`")),
    }
}

fn process_bracket<'a>(
    objects: Objects<'a>,
    tokens: &mut VecDeque<Token>,
) -> Result<Objects<'a>, FilterError> {
    match tokens.pop_front() {
        Some(Token::Asterisk) => {
            expect_right_bracket(tokens)?;
            Ok(descent(&objects))
        }
        Some(Token::Colon) => process_slice(&objects, tokens, 0),
        Some(Token::Number(start)) => match tokens.pop_front() {
            Some(Token::Colon) => process_slice(&objects, tokens, start),
            Some(Token::Comma) => {
                let indices = collect_union(tokens, start, |token| match token {
                    Token::Number(index) => Some(index),
                    _ => None,
                })?;
                Ok(descent_by_indices(&objects, &indices))
            }
            Some(Token::RightBracket) => Ok(descent_by_indices(&objects, &[start])),
            _ => Err(invalid("malformed index")),
        },
        Some(Token::String(name)) => match tokens.pop_front() {
            Some(Token::Comma) => {
                let names = collect_union(tokens, name, |token| match token {
                    Token::String(name) => Some(name),
                    _ => None,
                })?;
                Ok(descent_by_names(&objects, &names))
            }
            Some(Token::RightBracket) => Ok(descent_by_names(&objects, &[name])),
            _ => Err(invalid("malformed member access")),
        },
        _ => Err(invalid("malformed bracket expression")),
    }
}

fn expect_right_bracket(tokens: &mut VecDeque<Token>) -> Result<(), FilterError> {
    match tokens.pop_front() {
        Some(Token::RightBracket) => Ok(()),
        _ => Err(invalid("expected `]`")),
    }
}

/// Reads the remainder of a union after its first item and comma.
fn collect_union<T>(
    tokens: &mut VecDeque<Token>,
    first: T,
    item: impl Fn(Token) -> Option<T>,
) -> Result<Vec<T>, FilterError> {
    let mut items = vec![first];
    loop {
        let next = tokens.pop_front().ok_or_else(|| invalid("unterminated union"))?;
        items.push(item(next).ok_or_else(|| invalid("mixed or malformed union"))?);
        match tokens.pop_front() {
            Some(Token::Comma) => continue,
            Some(Token::RightBracket) => return Ok(items),
            _ => return Err(invalid("malformed union")),
        }
    }
}

fn process_slice<'a>(
    objects: &Objects<'a>,
    tokens: &mut VecDeque<Token>,
    start: i64,
) -> Result<Objects<'a>, FilterError> {
    let end = match tokens.pop_front() {
        Some(Token::Number(end)) => {
            expect_right_bracket(tokens)?;
            end
        }
        Some(Token::RightBracket) => 0,
        _ => return Err(invalid("malformed slice")),
    };

    let mut selected = Vec::new();
    for &object in objects {
        if let Value::Array(items) = object {
            let len = items.len() as i64;
            let from = (if start >= 0 { start } else { len + start }).clamp(0, len);
            // An end of zero selects through the last element.
            let to = (if end > 0 { end } else { len + end }).clamp(0, len);
            if from < to {
                selected.extend(items[from as usize..to as usize].iter());
            }
        }
    }
    Ok(selected)
}

fn descent<'a>(objects: &Objects<'a>) -> Objects<'a> {
    let mut selected = Vec::new();
    for &object in objects {
        match object {
            Value::Array(items) => selected.extend(items.iter()),
            Value::Object(map) => selected.extend(map.values()),
            _ => {}
        }
    }
    selected
}

fn descent_by_names<'a>(objects: &Objects<'a>, names: &[String]) -> Objects<'a> {
    let mut selected = Vec::new();
    for &object in objects {
        if let Value::Object(map) = object {
            selected.extend(names.iter().filter_map(|name| map.get(name)));
        }
    }
    selected
}

fn descent_by_indices<'a>(objects: &Objects<'a>, indices: &[i64]) -> Objects<'a> {
    let mut selected = Vec::new();
    for &object in objects {
        if let Value::Array(items) = object {
            let len = items.len() as i64;
            for &index in indices {
                let index = if index >= 0 { index } else { len + index };
                if (0..len).contains(&index) {
                    selected.push(&items[index as usize]);
                }
            }
        }
    }
    selected
}

fn recursive_descent<'a>(
    mut objects: Objects<'a>,
    name: &str,
) -> Result<Objects<'a>, FilterError> {
    let mut results = Vec::new();
    while !objects.is_empty() {
        let mut next = Vec::new();
        for object in objects {
            match object {
                Value::Object(map) => {
                    if let Some(value) = map.get(name) {
                        results.push(value);
                    }
                    next.extend(map.values());
                }
                Value::Array(items) => next.extend(items.iter()),
                _ => {}
            }
        }
        if results.len() > MAX_PATH_OBJECTS {
            return Err(FilterError::TooManyObjects(MAX_PATH_OBJECTS));
        }
        objects = next;
    }
    Ok(results)
}
