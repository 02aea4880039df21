/// Characters that legacy exports leave around header names and cells but
/// that are not matched by `char::is_whitespace`.
const INVISIBLE: &[char] = &['\u{feff}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}'];

fn is_padding(c: char) -> bool {
    c.is_whitespace() || INVISIBLE.contains(&c)
}

/// Trim whitespace and invisible characters, then strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim_matches(is_padding);
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim_matches(is_padding)
    } else {
        trimmed
    }
}

/// Parse a cell as a finite float.
///
/// Empty, unparseable and non-finite cells are `None`. A lone decimal comma
/// (`"523,4"`) is accepted since `;`-separated exports commonly use it.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cell = clean_str(raw);
    if cell.is_empty() {
        return None;
    }
    let parsed = match cell.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) if cell.matches(',').count() == 1 && !cell.contains('.') => {
            cell.replacen(',', ".", 1).parse::<f64>().ok()
        }
        Err(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// A category cell, or `None` when it is blank.
pub fn category_value(raw: &str) -> Option<&str> {
    let cell = clean_str(raw);
    (!cell.is_empty()).then_some(cell)
}
