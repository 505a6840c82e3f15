use crate::selection::tokens::estimate_tokens;

/// Smallest token target a compression pass aims for.
pub const MIN_TARGET_TOKENS: usize = 20;

/// Deterministic extractive compression.
///
/// 1. Keep leading sentences while the running estimate stays within target.
/// 2. Then keep leading bullet lines (`-`, `*`, `•`) from the original text.
///
/// Bullets may repeat text already taken as a sentence; they are not deduplicated.
/// The output never estimates larger than the input.
pub fn compress_extractive(text: &str, target_ratio: f64) -> String {
    let original_tokens = estimate_tokens(text);
    let target = ((original_tokens as f64 * target_ratio).floor() as usize)
        .max(MIN_TARGET_TOKENS);

    let sentences = split_sentences(text);
    let bullets: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| is_bullet(line))
        .collect();

    let mut acc: Vec<&str> = Vec::new();
    let mut tokens = 0;

    for sentence in &sentences {
        let t = estimate_tokens(sentence);
        if tokens + t > target {
            break;
        }
        acc.push(sentence);
        tokens += t;
    }

    for bullet in bullets {
        let t = estimate_tokens(bullet);
        if tokens + t > target {
            break;
        }
        acc.push(bullet);
        tokens += t;
    }

    let out = if acc.is_empty() {
        sentences.iter().take(3).cloned().collect::<Vec<_>>().join(" ")
    } else {
        acc.join("\n")
    };

    // Size must never regress: fall back to the input itself.
    if estimate_tokens(&out) > original_tokens {
        return text.to_string();
    }
    out
}

/// Split text into sentence units.
///
/// Newline runs become single spaces; a split happens on any whitespace run
/// that directly follows `.`, `!` or `?`. Empty units are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = collapse_newlines(text);

    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = normalized.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            if !current.is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_newlines = false;
    for c in text.chars() {
        if c == '\n' {
            if !in_newlines {
                out.push(' ');
                in_newlines = true;
            }
        } else {
            out.push(c);
            in_newlines = false;
        }
    }
    out
}

fn is_bullet(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('-' | '*' | '•'))
}
