//! Pull diagram text out of a free-form generator completion.

const MERMAID_FENCE: &str = "```mermaid";
const FENCE: &str = "```";

/// The first ```` ```mermaid ```` block, else the first fenced block, else the
/// whole completion. Always trimmed.
pub fn extract_diagram(completion: &str) -> &str {
    fenced_body(completion, MERMAID_FENCE)
        .or_else(|| fenced_body(completion, FENCE))
        .unwrap_or(completion)
        .trim()
}

fn fenced_body<'a>(text: &'a str, opening: &str) -> Option<&'a str> {
    let start = text.find(opening)?;
    let after_open = &text[start + opening.len()..];
    // The rest of the opening line is a language tag, not content.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let end = body.find(FENCE)?;
    Some(&body[..end])
}
