// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job option string parsing.
//
// CUPS hands every filter its job options as a single argument of
// whitespace-separated `name=value` pairs. Values may be quoted with single or
// double quotes, grouped in braces, or contain backslash escapes. A bare name
// means `true`, and a bare name starting with `no` sets the remainder to
// `false`.

use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

/// Parsed job options with case-insensitive lookup. Later duplicates replace
/// earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOptions {
    entries: Vec<(String, String)>,
}

impl JobOptions {
    /// Parse a CUPS option string.
    pub fn parse(input: &str) -> Self {
        let mut options = Self::default();
        let mut chars = input.trim().chars().peekable();

        // The whole string may be wrapped in braces (collection syntax).
        if chars.peek() == Some(&'{') {
            let inner = input.trim();
            if inner.ends_with('}') {
                return Self::parse(&inner[1..inner.len() - 1]);
            }
        }

        loop {
            skip_whitespace(&mut chars);
            if chars.peek().is_none() {
                break;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' || c.is_whitespace() {
                    break;
                }
                name.push(c);
                chars.next();
            }

            if chars.peek() == Some(&'=') {
                chars.next();
                let value = read_value(&mut chars);
                if !name.is_empty() {
                    options.insert(name, value);
                }
            } else if name.len() > 2
                && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("no"))
            {
                options.insert(name[2..].to_string(), "false".to_string());
            } else if !name.is_empty() {
                options.insert(name, "true".to_string());
            }
        }

        debug!(count = options.len(), "Parsed job options");
        options
    }

    /// Add or replace an option.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First option present among `names`, in the order given.
    pub fn get_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `true`, `on` and `yes` in any case.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes"
    )
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_value(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut value = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        chars.next();
        match c {
            '\'' | '"' => {
                while let Some(q) = chars.next() {
                    if q == c {
                        break;
                    }
                    if q == '\\' {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    } else {
                        value.push(q);
                    }
                }
            }
            '{' => {
                let mut depth = 1;
                value.push(c);
                while let Some(b) = chars.next() {
                    value.push(b);
                    match b {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    value.push(escaped);
                }
            }
            _ => value.push(c),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pairs() {
        let opts = JobOptions::parse("media=iso_a4_210x297mm print-color-mode=bi-level");
        assert_eq!(opts.len(), 2);
        assert_eq!(opts.get("media"), Some("iso_a4_210x297mm"));
        assert_eq!(opts.get("Print-Color-Mode"), Some("bi-level"));
    }

    #[test]
    fn bare_names_become_booleans() {
        let opts = JobOptions::parse("collate noDuplex");
        assert_eq!(opts.get("collate"), Some("true"));
        assert_eq!(opts.get("Duplex"), Some("false"));
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let opts = JobOptions::parse(r#"job-name='Quarterly report' title="a \"b\"" path=a\ b"#);
        assert_eq!(opts.get("job-name"), Some("Quarterly report"));
        assert_eq!(opts.get("title"), Some("a \"b\""));
        assert_eq!(opts.get("path"), Some("a b"));
    }

    #[test]
    fn brace_groups_are_kept_whole() {
        let opts = JobOptions::parse("media-col={media-size={x-dimension=21000}} copies=2");
        assert_eq!(
            opts.get("media-col"),
            Some("{media-size={x-dimension=21000}}")
        );
        assert_eq!(opts.get("copies"), Some("2"));
    }

    #[test]
    fn later_duplicates_win() {
        let opts = JobOptions::parse("PageSize=A4 pagesize=Letter");
        assert_eq!(opts.len(), 1);
        assert_eq!(opts.get("PageSize"), Some("Letter"));
    }

    #[test]
    fn empty_string_has_no_options() {
        assert!(JobOptions::parse("   ").is_empty());
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("ON"));
        assert!(is_truthy(" yes "));
        assert!(is_truthy("True"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
