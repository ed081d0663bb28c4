//! Flat key/value configuration text in the `.properties` format.
//!
//! Supports `#`/`!` comment lines, `=`, `:` or whitespace as key/value
//! separator, backslash line continuations and the `\t`, `\n`, `\r`, `\f`
//! and `\uXXXX` escapes. Any other escaped character stands for itself.
//! Later duplicates of a key win.

use std::collections::BTreeMap;

use crate::error::{Result, ReviewError};

/// Parsed properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Decodes ISO-8859-1 bytes, the encoding of `.properties` files, and
    /// parses them.
    pub fn from_latin1(bytes: &[u8]) -> Result<Self> {
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        Self::parse(&text)
    }

    /// Parses properties text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut lines = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .enumerate();

        while let Some((index, line)) = lines.next() {
            let line = trim_leading(line);
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical = String::new();
            let mut current = line;
            loop {
                if !continues(current) {
                    logical.push_str(current);
                    break;
                }
                logical.push_str(&current[..current.len() - 1]);
                match lines.next() {
                    Some((_, next)) => current = trim_leading(next),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical, index + 1)?;
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn trim_leading(line: &str) -> &str {
    line.trim_start_matches(is_blank)
}

/// A line continues when it ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(logical: &str, line: usize) -> Result<(String, String)> {
    let chars: Vec<char> = logical.chars().collect();

    let mut key_end = chars.len();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '=' || c == ':' || is_blank(c) {
            key_end = i;
            break;
        }
        i += 1;
    }

    let mut value_start = key_end;
    while value_start < chars.len() && is_blank(chars[value_start]) {
        value_start += 1;
    }
    if value_start < chars.len() && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
    }
    while value_start < chars.len() && is_blank(chars[value_start]) {
        value_start += 1;
    }

    let key = unescape(&chars[..key_end], line)?;
    let value = unescape(&chars[value_start..], line)?;
    Ok((key, value))
}

fn unescape(chars: &[char], line: usize) -> Result<String> {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&escaped) = chars.get(i) else {
            break;
        };
        i += 1;
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\x0c'),
            'u' => {
                let digits: String = chars.iter().skip(i).take(4).collect();
                let decoded = (digits.len() == 4)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ReviewError::ConfigurationSyntax {
                        line,
                        message: format!("malformed \\u{} escape", digits),
                    })?;
                out.push(decoded);
                i += 4;
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
