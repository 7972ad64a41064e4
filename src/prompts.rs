//! Centralized prompt definitions for the analysis and diagram pipes
//!
//! Static system prompts double as the pipe definitions pushed to Langbase at
//! start-up. Prompts that depend on a scenario or a diagram are assembled by
//! the `*_prompt` builders below.

/// Perspectives used when discovery fails or returns too little.
pub const FALLBACK_PERSPECTIVES: [&str; 4] = [
    "Immediate Consequences vs Long-term Implications",
    "Individual Rights vs Collective Good",
    "Practical Implementation vs Idealistic Goals",
    "Stakeholder Impact Analysis",
];

/// Shared plain-text rules; the argument extractor relies on colon headers
/// and one statement per line, not markdown.
const PLAIN_TEXT_RULES: &str = r#"CRITICAL FORMATTING RULES:
- Use ONLY plain text - NO markdown formatting whatsoever
- NO asterisks, NO hashtags, NO bullet points, NO numbered lists
- NO bold (**text**), NO italics (*text*), NO headers (### or ##)
- Use simple paragraph breaks and colons for structure
- Write in flowing prose, not lists or bullet points"#;

/// System prompt for the perspective discovery pipe.
pub const PERSPECTIVES_PROMPT: &str = r#"You identify the analytical perspectives that matter for a specific scenario.

Avoid generic philosophical frameworks unless they are truly relevant. Good perspectives name a concrete tension, for example:
- For a revenge killing: "Victim's Rights vs Legal Justice", "Vigilante Justice vs Rule of Law"
- For AI healthcare: "Patient Safety vs Innovation", "Human Autonomy vs AI Efficiency"
- For corporate speech: "Corporate Rights vs Public Interest", "Legal Precedent vs Social Responsibility"

Return ONLY a simple list of 4-6 perspective names, one per line, no formatting."#;

/// Base system prompt for the multi-perspective analysis pipe.
pub const ANALYSIS_PROMPT: &str = r#"You are a professional AI ethics analyst. When presented with any topic, provide a comprehensive examination using perspectives that are specifically relevant to that topic."#;

/// System prompt for follow-up turns of an analysis conversation.
pub const FOLLOW_UP_PROMPT: &str = r#"You are a professional AI ethics analyst. Provide thoughtful, balanced responses to follow-up questions.

CRITICAL FORMATTING RULES:
- Use ONLY plain text - NO markdown, NO asterisks, NO hashtags, NO bullet points
- NO bold (**text**), NO italics (*text*), NO headers (###), NO lists with dashes or numbers
- Structure with clear paragraph breaks and simple text only
- Use colons and line breaks for organization, not markdown syntax

Continue the conversation with the same analytical rigor as before."#;

/// System prompt for the diagram generation pipe.
pub const DIAGRAM_PROMPT: &str = r#"You are an expert at creating detailed, interconnected Mermaid diagrams for complex analysis.

CRITICAL REQUIREMENTS:
1. ALWAYS return VALID Mermaid syntax starting with "graph TD"
2. Node identifiers are single uppercase letters, starting at A, at most 15 nodes (A to O)
3. Define every node on its own line before connecting it
4. Group related concepts in subgraphs
5. Use different node shapes for different kinds of concepts
6. Use different arrow types for different relationships

Node shapes:
- A[Process] - process or action
- B{Decision} - decision point
- C((Outcome)) - outcome or event
- D(Entity) - stakeholder or entity

Arrow types:
- --> direct relationship
- -.-> indirect or optional
- ==> strong relationship
- --x blocking relationship

RESPONSE FORMAT:
Return ONLY the Mermaid code, starting with ```mermaid and ending with ```.
Do NOT include explanations."#;

/// System prompt for the diagram enhancement pipe.
pub const DIAGRAM_ENHANCE_PROMPT: &str = r#"You transform an existing Mermaid diagram into a more or less detailed version of itself.

You will receive the existing diagram, a direction (expand or simplify) and the rules for that direction. Follow them exactly.

RESPONSE FORMAT:
Return ONLY the Mermaid code, starting with ```mermaid and ending with ```.
Do NOT include explanations."#;

/// Ask for perspectives relevant to `scenario`.
pub fn perspectives_prompt(scenario: &str) -> String {
    format!(
        "Analyze this scenario and identify 4-6 most relevant analytical perspectives for examining this specific case.\n\nScenario: {}\n\nReturn ONLY a simple list of 4-6 perspective names, one per line, no formatting:",
        scenario
    )
}

/// Full analysis system prompt with one section per perspective.
pub fn analysis_system_prompt(perspectives: &[String]) -> String {
    let sections = perspectives
        .iter()
        .map(|p| format!("{}:\n[Analysis from this specific perspective]", p))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"{ANALYSIS_PROMPT}

{PLAIN_TEXT_RULES}

REQUIRED RESPONSE STRUCTURE:

SUMMARY:
[Provide a 2-3 sentence executive summary of the key tensions and considerations specific to this topic]

DETAILED ANALYSIS:

{sections}

Critical Counterarguments:
[Challenge each major position with opposing views]

Areas of Complexity:
[Gray areas, edge cases, and nuanced considerations specific to this topic]

Synthesis:
[Balanced conclusion highlighting key trade-offs and questions for further consideration]

IMPORTANT: The perspectives above are specifically chosen for this topic. Focus your analysis through these lenses rather than generic philosophical frameworks.

Remember: Use ONLY plain text with paragraph breaks. No formatting symbols of any kind."#
    )
}

pub fn analysis_user_prompt(scenario: &str) -> String {
    format!("Analyze this topic: {}", scenario)
}

/// Base diagram request for `topic`.
pub fn diagram_prompt(topic: &str, kind: &str) -> String {
    format!(
        r#"Create a detailed Mermaid {kind} diagram for: {topic}

Requirements:
- Show 10-15 interconnected nodes using identifiers A to O
- Include feedback loops and cross-references
- Use subgraphs to group related concepts
- Show different types of relationships with different arrow styles
- Include decision points, processes, stakeholders, and outcomes"#
    )
}

/// Expansion request: keep `basis` verbatim and add nodes named `next_ids`.
pub fn expand_prompt(topic: &str, basis: &str, target_level: i32, next_ids: &[char]) -> String {
    let ids = next_ids
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"Direction: expand (detail level {target_level})
Topic: {topic}

Existing diagram:
```mermaid
{basis}
```

Rules:
- Reproduce every line of the existing diagram exactly as written
- Append 4-6 new nodes using the next identifiers in sequence: {ids}
- Place the new nodes in 1-2 new subgraphs
- Connect every new node to at least one existing node"#
    )
}

/// Simplification request: collapse `basis` to its core.
pub fn simplify_prompt(topic: &str, basis: &str, target_level: i32) -> String {
    format!(
        r#"Direction: simplify (detail level {target_level})
Topic: {topic}

Existing diagram:
```mermaid
{basis}
```

Rules:
- Keep at most 8 core nodes
- Rename the kept nodes sequentially starting from A
- Keep only the most important connections between the kept nodes"#
    )
}
