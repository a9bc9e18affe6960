// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Renders a list of identifiers the way the confirmation message expects:
/// `['i-1', 'i-2']`, or `[]` when empty.
pub fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let inner: Vec<String> = items.iter().map(|item| quote(item.as_ref())).collect();
    format!("[{}]", inner.join(", "))
}

/// Quotes a single identifier. Single quotes are preferred; double quotes are
/// used when the value contains a single quote but no double quote.
pub fn quote(value: &str) -> String {
    let delimiter = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_list() {
        let ids = vec!["i-1111111111111111a", "i-2222222222222222b"];
        assert_eq!(
            quoted_list(&ids),
            "['i-1111111111111111a', 'i-2222222222222222b']"
        );
    }

    #[test]
    fn test_quoted_list_empty() {
        let ids: Vec<String> = vec![];
        assert_eq!(quoted_list(&ids), "[]");
    }

    #[test]
    fn test_quoted_list_single() {
        assert_eq!(quoted_list(&["i-0e0c8319ac6030045"]), "['i-0e0c8319ac6030045']");
    }

    #[test]
    fn test_quote_switches_delimiter() {
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("a'b\"c"), "'a\\'b\"c'");
    }

    #[test]
    fn test_quote_escapes_control_characters() {
        assert_eq!(quote("a\\b"), "'a\\\\b'");
        assert_eq!(quote("a\nb"), "'a\\nb'");
        assert_eq!(quote("\u{1}"), "'\\x01'");
    }
}
