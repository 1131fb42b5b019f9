//! Whitespace word-splitting with byte offsets.
//!
//! Offsets let the parser hand back free-text captures as exact slices of the
//! original sentence, so base and conditional text keep their case and
//! internal spacing.

/// One whitespace-delimited word. `start`/`end` are byte offsets into the
/// sentence body (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Word<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Strip at most one terminal `.` or `!`, plus surrounding whitespace.
///
/// Two terminal marks (`"...letter.."`) are left in place so the parse fails
/// downstream, same as any other stray character.
pub(super) fn strip_terminal(sentence: &str) -> &str {
    let trimmed = sentence.trim_end();
    match trimmed.strip_suffix(['.', '!']) {
        Some(rest) => rest.trim_end(),
        None => trimmed,
    }
}

/// Split into words on whitespace runs.
pub(super) fn words(body: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, ch) in body.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                out.push(Word { text: &body[s..idx], start: s, end: idx });
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        out.push(Word { text: &body[s..], start: s, end: body.len() });
    }
    out
}

/// True when the word may appear in a free-text position (base, conditional,
/// letter name): word characters only.
pub(super) fn is_plain_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}
