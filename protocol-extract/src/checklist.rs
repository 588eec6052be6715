use crate::models::DEFAULT_SCREENING_ITEM;

/// Turn a freeform checklist block into discrete item labels.
///
/// Each line loses at most one leading bullet (`-`, `*`, `+`, `•`, only when
/// followed by whitespace), then at most one checkbox (`[ ]`, `[x]`), then at
/// most one `1.` / `1)` ordinal. Lines left empty are dropped. A block with no
/// items yields the single default screening item.
pub fn normalize_checklist(block: &str) -> Vec<String> {
    let items: Vec<String> = block
        .lines()
        .map(strip_list_markers)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        vec![DEFAULT_SCREENING_ITEM.to_string()]
    } else {
        items
    }
}

fn strip_list_markers(line: &str) -> &str {
    let rest = strip_bullet(line.trim()).trim_start();
    let rest = strip_checkbox(rest).trim_start();
    strip_ordinal(rest).trim()
}

/// `- item`, but not `-80C` or `**bold**`.
fn strip_bullet(line: &str) -> &str {
    for bullet in ['-', '*', '+', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest;
            }
        }
    }
    line
}

fn strip_checkbox(line: &str) -> &str {
    ["[ ]", "[]", "[x]", "[X]"]
        .iter()
        .find_map(|checkbox| line.strip_prefix(checkbox))
        .unwrap_or(line)
}

/// `1.` / `12)` style prefixes; bare numbers such as `10 mL` are left alone.
fn strip_ordinal(line: &str) -> &str {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    let rest = &line[digits..];
    match rest.chars().next() {
        Some('.') | Some(')')
            if rest[1..].is_empty() || rest[1..].starts_with(char::is_whitespace) =>
        {
            &rest[1..]
        }
        _ => line,
    }
}
