//! Path queries over structured values.
//!
//! A small JSONPath dialect used by `sort -k`, `grep` and `join`:
//!
//! - `$` the root, `.name` / `['name']` child, `[3]` / `[-1]` index
//! - `[*]` / `.*` every child, `[1:3]` slice
//! - `..name` / `..*` / `..[0]` recursive descent
//!
//! A query that does not start with `$` is read as if it did (`name.first`
//! means `$.name.first`). Numeric names index arrays, so `a.0` works too.

use crate::JboxError;
use jbox_api::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Name(String),
    Index(i64),
    Slice { start: Option<i64>, end: Option<i64> },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    recursive: bool,
    selector: Selector,
}

/// A compiled path query.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    source: String,
    steps: Vec<Step>,
}

impl PathQuery {
    pub fn parse(source: &str) -> Result<Self, JboxError> {
        let trimmed = source.trim();
        let body = match trimmed.strip_prefix('$') {
            Some(rest) => rest.to_string(),
            None if trimmed.starts_with('.') || trimmed.starts_with('[') => trimmed.to_string(),
            None => format!(".{trimmed}"),
        };

        let error = |reason: String| JboxError::Query {
            query: source.to_string(),
            reason,
        };

        let chars: Vec<char> = body.chars().collect();
        let mut steps = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let recursive = chars.get(i + 1) == Some(&'.');
                    i += if recursive { 2 } else { 1 };
                    if recursive && chars.get(i) == Some(&'[') {
                        let (selector, next) = parse_bracket(&chars, i).map_err(error)?;
                        steps.push(Step { recursive, selector });
                        i = next;
                        continue;
                    }
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    let selector = match name.as_str() {
                        "" => return Err(error(format!("empty name at offset {start}"))),
                        "*" => Selector::Wildcard,
                        _ => Selector::Name(name),
                    };
                    steps.push(Step { recursive, selector });
                }
                '[' => {
                    let (selector, next) = parse_bracket(&chars, i).map_err(error)?;
                    steps.push(Step {
                        recursive: false,
                        selector,
                    });
                    i = next;
                }
                other => return Err(error(format!("unexpected {other:?} at offset {i}"))),
            }
        }

        Ok(PathQuery {
            source: source.to_string(),
            steps,
        })
    }

    /// Evaluate against `root`, returning matches in document order.
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in current {
                if step.recursive {
                    for candidate in descendants_or_self(node) {
                        step.selector.apply(candidate, &mut next);
                    }
                } else {
                    step.selector.apply(node, &mut next);
                }
            }
            current = next;
        }
        current
    }

    /// The object key this query names, if it is a single plain child step.
    pub fn as_field_name(&self) -> Option<&str> {
        match self.steps.as_slice() {
            [Step {
                recursive: false,
                selector: Selector::Name(name),
            }] => Some(name),
            _ => None,
        }
    }

    /// The array index this query names, if it is a single index step.
    pub fn as_index(&self) -> Option<i64> {
        match self.steps.as_slice() {
            [Step {
                recursive: false,
                selector: Selector::Index(i),
            }] => Some(*i),
            [Step {
                recursive: false,
                selector: Selector::Name(name),
            }] => name.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Selector {
    fn apply<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) {
        match (self, node) {
            (Selector::Name(name), Value::Object(map)) => out.extend(map.get(name)),
            (Selector::Name(name), Value::Array(items)) => {
                if let Ok(index) = name.parse::<usize>() {
                    out.extend(items.get(index));
                }
            }
            (Selector::Index(index), Value::Array(items)) => {
                out.extend(resolve_index(*index, items.len()).and_then(|i| items.get(i)));
            }
            (Selector::Slice { start, end }, Value::Array(items)) => {
                let len = items.len() as i64;
                let clamp = |bound: i64| -> usize {
                    let b = if bound < 0 { bound + len } else { bound };
                    b.clamp(0, len) as usize
                };
                let from = start.map(clamp).unwrap_or(0);
                let to = end.map(clamp).unwrap_or(items.len());
                if from < to {
                    out.extend(&items[from..to]);
                }
            }
            (Selector::Wildcard, Value::Array(items)) => out.extend(items.iter()),
            (Selector::Wildcard, Value::Object(map)) => out.extend(map.values()),
            _ => {}
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Pre-order walk of `node` and everything below it.
fn descendants_or_self(node: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        match current {
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) => stack.extend(map.values().rev()),
            _ => {}
        }
    }
    out
}

/// Parse `[...]` starting at `open`; returns the selector and the index after `]`.
fn parse_bracket(chars: &[char], open: usize) -> Result<(Selector, usize), String> {
    let mut i = open + 1;
    let quote = match chars.get(i) {
        Some(&q @ ('\'' | '"')) => Some(q),
        _ => None,
    };

    if let Some(q) = quote {
        i += 1;
        let start = i;
        while i < chars.len() && chars[i] != q {
            i += 1;
        }
        if i >= chars.len() {
            return Err(format!("unterminated quote at offset {}", start - 1));
        }
        let name: String = chars[start..i].iter().collect();
        i += 1;
        if chars.get(i) != Some(&']') {
            return Err(format!("expected ']' at offset {i}"));
        }
        return Ok((Selector::Name(name), i + 1));
    }

    let start = i;
    while i < chars.len() && chars[i] != ']' {
        i += 1;
    }
    if i >= chars.len() {
        return Err(format!("unterminated '[' at offset {open}"));
    }
    let inner: String = chars[start..i].iter().collect::<String>().trim().to_string();
    let next = i + 1;

    if inner == "*" {
        return Ok((Selector::Wildcard, next));
    }

    if let Some((lo, hi)) = inner.split_once(':') {
        let bound = |text: &str| -> Result<Option<i64>, String> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse()
                    .map(Some)
                    .map_err(|_| format!("invalid slice bound {text:?}"))
            }
        };
        return Ok((
            Selector::Slice {
                start: bound(lo)?,
                end: bound(hi)?,
            },
            next,
        ));
    }

    inner
        .parse::<i64>()
        .map(|index| (Selector::Index(index), next))
        .map_err(|_| format!("invalid index {inner:?}"))
}
