//! Serialisation of [`Value`] trees back to wire text.
//!
//! Printing is total: every well-formed value has exactly one textual form,
//! and `read(write(v)) == v`. String contents pass through untouched (they
//! are stored wire-ready); escaping happens once, when host text is turned
//! into a value.

use crate::value::Value;

/// Render a value in its wire form.
pub fn write(value: &Value) -> String {
    value.to_string()
}

/// Escape host text for a string literal: `\` and `"` get a backslash.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Resolve the escapes [`escape`] introduces; other backslash sequences are
/// left alone, matching how little the wire dialect promises about them.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('"') | Some('\\')) {
            out.push(chars.next().unwrap());
        } else {
            out.push(c);
        }
    }
    out
}

/// Property list: keys become symbols (pass them with their leading `:`),
/// values stay as given, insertion order preserved.
pub fn plist<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let mut items = Vec::new();
    for (key, value) in pairs {
        items.push(Value::symbol(key));
        items.push(value);
    }
    Value::List(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    #[test]
    fn test_write_matches_reader_output() {
        for text in [
            "nil",
            "t",
            "42",
            "-7",
            "1.5",
            "\"a string \\\" yo\"",
            "sym",
            ":keyword",
            "(1 2 3)",
            "'(1 2)",
            "(a . b)",
            "()",
        ] {
            let value = read_str(text).unwrap();
            assert_eq!(write(&value), text);
        }
    }

    #[test]
    fn test_round_trip_from_value() {
        let value = Value::List(vec![
            Value::symbol(":return"),
            Value::List(vec![Value::symbol(":ok"), Value::string("done")]),
            Value::Int(3),
        ]);
        assert_eq!(read_str(&write(&value)).unwrap(), value);
    }

    #[test]
    fn test_escape_unescape() {
        assert_eq!(escape("a \"b\" \\c"), "a \\\"b\\\" \\\\c");
        assert_eq!(unescape(&escape("a \"b\" \\c")), "a \"b\" \\c");
        // Unknown escapes survive untouched.
        assert_eq!(unescape("tab\\there"), "tab\\there");
    }

    #[test]
    fn test_plist_preserves_order() {
        let v = plist([
            (":name", Value::string("rhai")),
            (":prompt", Value::string("rhai> ")),
        ]);
        assert_eq!(write(&v), "(:name \"rhai\" :prompt \"rhai> \")");
    }
}
