//! JSON rendering of values.
//!
//! The compact form is canonical: it is the exact text hashed when a
//! non-string value is used as a sampling input, so it must not change
//! between releases.
//!
//! - Object keys keep their insertion order.
//! - Whole floats print without a fraction (`3.0` prints as `3`).
//! - NaN and the infinities print as `null`.
//! - Only `"`, `\` and control characters are escaped; everything else
//!   is written as UTF-8.
//!
//! # Examples
//!
//! ```
//! use targex::Value;
//! use targex::output::{to_json, to_json_pretty};
//!
//! let value = Value::Array(vec![Value::from("user-1"), Value::Integer(42)]);
//!
//! assert_eq!(to_json(&value), r#"["user-1",42]"#);
//! assert_eq!(to_json_pretty(&value), "[\n  \"user-1\",\n  42\n]");
//! ```

use indexmap::IndexMap;

use crate::value::{Value, format_float};

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.print_value(value, 0, &mut out);
        out
    }

    fn print_value(&self, value: &Value, indent: usize, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => out.push_str(&n.to_string()),
            Value::Float(n) if n.is_finite() => out.push_str(&format_float(*n)),
            Value::Float(_) => out.push_str("null"),
            Value::String(s) => escape_string(s, out),
            Value::Array(items) => self.print_array(items, indent, out),
            Value::Object(map) => self.print_object(map, indent, out),
        }
    }

    fn print_array(&self, items: &[Value], indent: usize, out: &mut String) {
        if items.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(indent + 1, out);
            self.print_value(item, indent + 1, out);
        }
        self.newline(indent, out);
        out.push(']');
    }

    fn print_object(&self, map: &IndexMap<String, Value>, indent: usize, out: &mut String) {
        if map.is_empty() {
            out.push_str("{}");
            return;
        }

        out.push('{');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(indent + 1, out);
            escape_string(key, out);
            out.push_str(if self.pretty { ": " } else { ":" });
            self.print_value(value, indent + 1, out);
        }
        self.newline(indent, out);
        out.push('}');
    }

    fn newline(&self, level: usize, out: &mut String) {
        if self.pretty {
            out.push('\n');
            out.push_str(&"  ".repeat(level));
        }
    }
}

fn escape_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Compact, canonical JSON text of `value`.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// JSON text of `value` with 2-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
