/// Approximate token count: ~4 characters per token.
///
/// tokens(text) := max(1, ceil(chars(collapse_ws(text)) / 4)), and 0 for "".
///
/// Every size decision in the crate goes through this function.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut chars = 0usize;
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_ws {
                chars += 1;
                in_ws = true;
            }
        } else {
            chars += 1;
            in_ws = false;
        }
    }

    ((chars + 3) / 4).max(1)
}
