//! Literal materializer
//!
//! Converts DSL literal expressions into plain JSON values: scalars, lists
//! and tuples of literals, dicts with literal keys and values. Anything
//! outside that surface is not a literal; callers either fall back to PACK
//! lowering or fail with an unsupported-literal violation.

use serde_json::{Map, Number, Value};
use tree_sitter::Node;

use crate::errors::{DslViolation, Result};
use crate::shared::utils::tree_sitter::{node_text, node_text_owned};

/// Materialize a literal expression node, or fail with the offending text.
pub fn materialize(node: &Node, source: &str) -> Result<Value> {
    try_materialize(node, source)
        .ok_or_else(|| DslViolation::UnsupportedLiteral(node_text_owned(node, source)))
}

/// Materialize a literal expression node, returning None when the node is
/// not fully literal.
pub fn try_materialize(node: &Node, source: &str) -> Option<Value> {
    match node.kind() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "none" => Some(Value::Null),
        "integer" => integer_value(node_text(node, source)),
        "float" => float_value(node_text(node, source)),
        "string" => string_value(node, source),
        "concatenated_string" => {
            let mut joined = String::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                match try_materialize(&child, source)? {
                    Value::String(s) => joined.push_str(&s),
                    _ => return None,
                }
            }
            Some(Value::String(joined))
        }
        "unary_operator" => {
            let op = node.child_by_field_name("operator")?;
            let arg = node.child_by_field_name("argument")?;
            let inner = try_materialize(&arg, source)?;
            negate(node_text(&op, source), inner)
        }
        "list" | "tuple" | "expression_list" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                items.push(try_materialize(&child, source)?);
            }
            Some(Value::Array(items))
        }
        "dictionary" => {
            let mut map = Map::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                if child.kind() != "pair" {
                    return None; // dictionary_splat etc.
                }
                let key = try_materialize(&child.child_by_field_name("key")?, source)?;
                let value = try_materialize(&child.child_by_field_name("value")?, source)?;
                map.insert(json_key(&key)?, value);
            }
            Some(Value::Object(map))
        }
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner = node
                .named_children(&mut cursor)
                .find(|c| c.kind() != "comment")?;
            try_materialize(&inner, source)
        }
        _ => None,
    }
}

/// JSON object keys must be strings; non-string literal keys stringify the
/// way Python's json module does (1 -> "1", True -> "true").
pub fn json_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("true".into()),
        Value::Bool(false) => Some("false".into()),
        Value::Null => Some("null".into()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer_value(raw: &str) -> Option<Value> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    let parsed: Option<i128> = if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i128::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<i128>().ok()
    };

    let n = parsed?;
    if let Ok(small) = i64::try_from(n) {
        return Some(Value::Number(Number::from(small)));
    }
    u64::try_from(n).ok().map(|big| Value::Number(Number::from(big)))
}

fn float_value(raw: &str) -> Option<Value> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let f = cleaned.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn negate(op: &str, inner: Value) -> Option<Value> {
    match (op, inner) {
        ("+", v @ Value::Number(_)) => Some(v),
        ("-", Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Some(Value::Number(Number::from(-i)));
            }
            let f = n.as_f64()?;
            Number::from_f64(-f).map(Value::Number)
        }
        _ => None,
    }
}

/// Decode a string node: prefix-aware, escape sequences resolved, rejects
/// byte strings and anything with interpolation slots (f-strings are not
/// literals).
fn string_value(node: &Node, source: &str) -> Option<Value> {
    let mut raw_prefix = false;
    let mut out = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let start = node_text(&child, source).to_ascii_lowercase();
                if start.contains('b') {
                    return None; // bytes are not JSON-representable
                }
                raw_prefix = start.contains('r');
            }
            "string_content" => out.push_str(node_text(&child, source)),
            "escape_sequence" => {
                let text = node_text(&child, source);
                if raw_prefix {
                    out.push_str(text);
                } else {
                    out.push_str(&decode_escape(text)?);
                }
            }
            "interpolation" => return None,
            "string_end" => {}
            _ => return None,
        }
    }
    Some(Value::String(out))
}

pub(crate) fn decode_escape(seq: &str) -> Option<String> {
    let body = seq.strip_prefix('\\')?;
    let mut chars = body.chars();
    let head = chars.next()?;
    let decoded = match head {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'v' => '\x0b',
        '\n' => return Some(String::new()), // line continuation
        'x' | 'u' | 'U' => {
            let hex: String = chars.collect();
            let code = u32::from_str_radix(&hex, 16).ok()?;
            return char::from_u32(code).map(|c| c.to_string());
        }
        _ => return None,
    };
    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tree_sitter::{Parser, Tree};

    fn parse_python(code: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .unwrap();
        parser.parse(code, None).unwrap()
    }

    fn materialize_expr(code: &str) -> Result<Value> {
        let tree = parse_python(code);
        let stmt = tree.root_node().child(0).unwrap();
        assert_eq!(stmt.kind(), "expression_statement");
        let expr = stmt.child(0).unwrap();
        materialize(&expr, code)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(materialize_expr("42").unwrap(), json!(42));
        assert_eq!(materialize_expr("-7").unwrap(), json!(-7));
        assert_eq!(materialize_expr("2.5").unwrap(), json!(2.5));
        assert_eq!(materialize_expr("True").unwrap(), json!(true));
        assert_eq!(materialize_expr("False").unwrap(), json!(false));
        assert_eq!(materialize_expr("None").unwrap(), Value::Null);
        assert_eq!(materialize_expr("1_000").unwrap(), json!(1000));
        assert_eq!(materialize_expr("0xff").unwrap(), json!(255));
    }

    #[test]
    fn test_strings() {
        assert_eq!(materialize_expr("'hi'").unwrap(), json!("hi"));
        assert_eq!(materialize_expr(r#""a\nb""#).unwrap(), json!("a\nb"));
        assert_eq!(materialize_expr(r#"r"a\nb""#).unwrap(), json!(r"a\nb"));
        assert_eq!(materialize_expr(r#""x" "y""#).unwrap(), json!("xy"));
        assert_eq!(materialize_expr(r#""é""#).unwrap(), json!("é"));
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            materialize_expr("[1, 'two', None]").unwrap(),
            json!([1, "two", null])
        );
        assert_eq!(materialize_expr("(1, 2)").unwrap(), json!([1, 2]));
        assert_eq!(
            materialize_expr("{'a': 1, 'b': [2]}").unwrap(),
            json!({"a": 1, "b": [2]})
        );
        // non-string literal keys stringify like Python's json module
        assert_eq!(materialize_expr("{1: 'x'}").unwrap(), json!({"1": "x"}));
    }

    #[test]
    fn test_non_literals_rejected() {
        assert!(materialize_expr("foo").is_err());
        assert!(materialize_expr("f'{x}'").is_err());
        assert!(materialize_expr("[1, x]").is_err());
        assert!(materialize_expr("{'k': foo()}").is_err());
        assert!(materialize_expr("b'bytes'").is_err());
        let err = materialize_expr("1 + 2").unwrap_err();
        assert!(matches!(err, DslViolation::UnsupportedLiteral(_)));
    }
}
