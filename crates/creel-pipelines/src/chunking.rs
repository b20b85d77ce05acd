//! Token-budgeted chunking of divider-separated report text.

use creel_scanner::DIVIDER;

/// Rough token count: 1.3 tokens per whitespace-separated word, rounded up.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words * 13).div_ceil(10)
}

/// Split `text` on [`DIVIDER`] and pack sections greedily into chunks of at
/// most `token_limit` estimated tokens.
///
/// Each section keeps its trailing divider inside the chunk, and each chunk
/// is trimmed. A section larger than the budget becomes a chunk of its own.
/// Blank sections are dropped.
#[must_use]
pub fn chunk_reports(text: &str, token_limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for report in text.split(DIVIDER) {
        if report.trim().is_empty() {
            continue;
        }
        let section = format!("{report}{DIVIDER}");
        let tokens = estimate_tokens(&section);

        if current_tokens + tokens > token_limit {
            push_chunk(&mut chunks, &current);
            current = section;
            current_tokens = tokens;
        } else {
            current.push_str(&section);
            current_tokens += tokens;
        }
    }
    push_chunk(&mut chunks, &current);

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
