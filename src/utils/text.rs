/// URL slug: lower-case ASCII alphanumerics separated by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// First `max_chars` characters of `input`, never splitting a code point.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

pub fn ellipsize(input: &str, max_chars: usize) -> String {
    let cut = truncate_chars(input, max_chars);
    if cut.len() < input.len() {
        format!("{}...", cut.trim_end())
    } else {
        cut.to_string()
    }
}

/// Removes Markdown code-fence wrapping (```json ... ```) that models add
/// around JSON payloads, including any chatter outside the fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = match (trimmed.find("```"), trimmed.rfind("```")) {
        (Some(start), Some(end)) if end > start => &trimmed[start + 3..end],
        (Some(start), _) => &trimmed[start + 3..],
        _ => trimmed,
    };
    let inner = inner.trim_start();
    inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Intro to Rust"), "intro-to-rust");
        assert_eq!(slugify("  Data  Science: 101! "), "data-science-101");
        assert_eq!(slugify("C++ & Systems"), "c-systems");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(ellipsize("abcdefgh", 3), "abc...");
        assert_eq!(ellipsize("abc", 3), "abc");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(
            strip_code_fences("Here you go:\n```json\n[]\n```\nEnjoy"),
            "[]"
        );
    }
}
