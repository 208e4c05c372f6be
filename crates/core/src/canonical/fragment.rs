//! Lenient key/value scanner for dictionary-shaped text.
//!
//! Collaborator replies arrive as JSON, Python-style dicts with single quotes,
//! or loose `- Key: value` lists with prose around them. The scanner only
//! looks for the known keys followed by `:` or `=`, so the surrounding text can
//! be anything.

use std::collections::HashMap;

const QUOTES: [u8; 2] = [b'\'', b'"'];

/// Resolves `keys` in `text`, returning the raw (trimmed, unquoted) value text
/// for every key that was found.
///
/// Brace-delimited fragments are tried first, in order; the first fragment
/// that resolves every key wins. Otherwise the whole text is scanned.
pub fn scan<'k>(text: &str, keys: &[&'k str]) -> HashMap<&'k str, String> {
    for block in brace_blocks(text) {
        let found = scan_region(block, keys);
        if found.len() == keys.len() {
            return found;
        }
    }
    scan_region(text, keys)
}

fn brace_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (index, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    blocks.push(&text[start..=index]);
                }
            }
            _ => {}
        }
    }

    blocks
}

struct KeyHit<'k> {
    key: &'k str,
    key_start: usize,
    value_start: usize,
}

fn scan_region<'k>(region: &str, keys: &[&'k str]) -> HashMap<&'k str, String> {
    let lowered = region.to_ascii_lowercase();
    let bytes = region.as_bytes();

    let mut hits: Vec<KeyHit<'k>> =
        keys.iter().filter_map(|key| locate_key(&lowered, bytes, key)).collect();
    hits.sort_by_key(|hit| hit.value_start);

    let mut values = HashMap::new();
    for (position, hit) in hits.iter().enumerate() {
        let region_end = hits.get(position + 1).map(|next| next.key_start).unwrap_or(region.len());
        if region_end < hit.value_start {
            continue;
        }
        if let Some(value) = read_value(&region[hit.value_start..region_end]) {
            values.insert(hit.key, value);
        }
    }

    values
}

fn locate_key<'k>(lowered: &str, bytes: &[u8], key: &'k str) -> Option<KeyHit<'k>> {
    let needle = key.to_ascii_lowercase();
    let mut from = 0usize;

    while let Some(offset) = lowered[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        from = end;

        let bounded_left = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let bounded_right = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if !bounded_left || !bounded_right {
            continue;
        }

        let mut cursor = end;
        if cursor < bytes.len() && QUOTES.contains(&bytes[cursor]) {
            cursor += 1;
        }
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || !matches!(bytes[cursor], b':' | b'=') {
            continue;
        }

        let key_start =
            if start > 0 && QUOTES.contains(&bytes[start - 1]) { start - 1 } else { start };
        return Some(KeyHit { key, key_start, value_start: cursor + 1 });
    }

    None
}

fn read_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    let mut chars = trimmed.chars();
    let value = match chars.next() {
        Some(quote @ ('\'' | '"')) => {
            let rest = chars.as_str();
            match rest.find(quote) {
                Some(close) => &rest[..close],
                None => rest,
            }
        }
        Some(_) => {
            let stop = trimmed.find(['}', '\n']).unwrap_or(trimmed.len());
            &trimmed[..stop]
        }
        None => return None,
    };

    let cleaned = value
        .trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, ',' | ';' | '-' | '\'' | '"'));
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
