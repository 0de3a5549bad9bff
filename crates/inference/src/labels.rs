//! Class id to name mapping owned by the loaded model.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

/// Name reported for class ids the table does not know.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: BTreeMap<u32, String>,
}

impl LabelTable {
    pub fn new(names: BTreeMap<u32, String>) -> Self {
        Self { names }
    }

    /// Parse the `names` entry Ultralytics writes into exported model metadata.
    ///
    /// The value is a Python dict literal, e.g. `{0: 'person', 1: "tv's remote"}`.
    /// JSON objects with quoted keys are accepted as well.
    pub fn from_metadata(value: &str) -> anyhow::Result<Self> {
        let body = value.trim();
        let body = body
            .strip_prefix('{')
            .and_then(|b| b.strip_suffix('}'))
            .ok_or_else(|| anyhow::anyhow!("Label metadata is not a mapping: {}", value))?;

        let mut names = BTreeMap::new();
        let mut chars = body.chars().peekable();

        loop {
            skip_separators(&mut chars);
            if chars.peek().is_none() {
                break;
            }

            let key = read_token(&mut chars, ':')?;
            let id: u32 = key
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid class id in label metadata: {:?}", key))?;

            match chars.next() {
                Some(':') => {}
                _ => anyhow::bail!("Expected ':' after class id {} in label metadata", id),
            }

            skip_whitespace(&mut chars);
            let name = read_token(&mut chars, ',')?;
            names.insert(id, name.trim().to_string());
        }

        Ok(Self { names })
    }

    /// One name per line; the class id is the line index. Blank lines are skipped.
    pub fn from_lines(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(id, name)| (id as u32, name.to_string()))
            .collect();

        Self { names }
    }

    pub fn name(&self, class_id: u32) -> &str {
        self.names
            .get(&class_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.names.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entries in ascending class id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn skip_separators(chars: &mut Peekable<Chars>) {
    while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
        chars.next();
    }
}

/// Reads a quoted string, or raw text up to `terminator` (not consumed).
fn read_token(chars: &mut Peekable<Chars>, terminator: char) -> anyhow::Result<String> {
    skip_whitespace(chars);

    let quote = match chars.peek() {
        Some('\'') | Some('"') => chars.next(),
        _ => None,
    };

    let mut token = String::new();

    let Some(quote) = quote else {
        while let Some(&c) = chars.peek() {
            if c == terminator {
                break;
            }
            token.push(c);
            chars.next();
        }
        return Ok(token);
    };

    loop {
        match chars.next() {
            Some('\\') => read_escape(chars, &mut token)?,
            Some(c) if c == quote => break,
            Some(c) => token.push(c),
            None => anyhow::bail!("Unterminated string in label metadata: {:?}", token),
        }
    }

    skip_whitespace(chars);
    Ok(token)
}

/// Decodes one backslash escape as Python `repr` and JSON write them.
/// Unknown escapes keep their backslash, like Python.
fn read_escape(chars: &mut Peekable<Chars>, token: &mut String) -> anyhow::Result<()> {
    let Some(escaped) = chars.next() else {
        anyhow::bail!("Dangling escape in label metadata");
    };

    match escaped {
        'n' => token.push('\n'),
        't' => token.push('\t'),
        'r' => token.push('\r'),
        '0' => token.push('\0'),
        '\\' | '\'' | '"' | '/' => token.push(escaped),
        'x' => token.push(read_code_point(chars, 2)?),
        'u' => token.push(read_code_point(chars, 4)?),
        'U' => token.push(read_code_point(chars, 8)?),
        other => {
            token.push('\\');
            token.push(other);
        }
    }

    Ok(())
}

fn read_code_point(chars: &mut Peekable<Chars>, digits: usize) -> anyhow::Result<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        anyhow::bail!("Truncated escape in label metadata: {:?}", hex);
    }

    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| anyhow::anyhow!("Invalid escape in label metadata: {:?}", hex))
}
