//! Deterministic rendering of an [`ArgumentTree`] into diagram DSL.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::warn;

use super::ids::IdAllocator;
use crate::argument::{ArgumentNode, ArgumentTree, ArgumentType, Framework, NodeIndex};

const LABEL_MAX_CHARS: usize = 40;
const INDENT: &str = "    ";

/// Output of [`render_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDiagram {
    pub dsl: String,
    /// Tree node id → diagram identifier, in rendering order.
    pub node_ids: Vec<(String, char)>,
    /// Nodes left out because the identifier space ran out.
    pub omitted_nodes: usize,
}

/// Render breadth-first with at most `capacity` identifiers.
pub fn render_tree(tree: &ArgumentTree, capacity: usize) -> RenderedDiagram {
    let mut ids = IdAllocator::new(capacity);
    let mut lines = vec!["graph TD".to_string()];
    lines.extend(class_definitions());
    lines.push(String::new());

    let mut placed: Vec<(&ArgumentNode, char)> = Vec::new();
    let mut queue: VecDeque<(NodeIndex, Option<char>)> = VecDeque::from([(NodeIndex::ROOT, None)]);

    while let Some((index, parent_id)) = queue.pop_front() {
        let Some(node) = tree.node(index) else {
            continue;
        };
        let Ok(id) = ids.allocate() else {
            break;
        };
        lines.push(format!("{INDENT}{id}{}", shape(node)));
        if let Some(parent_id) = parent_id {
            lines.push(format!("{INDENT}{parent_id} {} {id}", connector(node.kind())));
        }
        placed.push((node, id));
        queue.extend(node.children().iter().map(|&child| (child, Some(id))));
    }

    lines.push(String::new());
    lines.extend(
        placed
            .iter()
            .map(|(node, id)| format!("{INDENT}class {id} {}", class_name(node))),
    );

    let omitted_nodes = tree.total_nodes().saturating_sub(placed.len());
    if omitted_nodes > 0 {
        warn!(
            capacity = ids.capacity(),
            omitted_nodes, "Argument tree exceeds diagram identifier space"
        );
    }

    RenderedDiagram {
        dsl: lines.join("\n"),
        node_ids: placed
            .iter()
            .map(|(node, id)| (node.id().to_string(), *id))
            .collect(),
        omitted_nodes,
    }
}

fn shape(node: &ArgumentNode) -> String {
    let label = label(node.text());
    match node.kind() {
        ArgumentType::Opposing | ArgumentType::Counterargument => format!("{{\"{label}\"}}"),
        ArgumentType::Evidence => format!("((\"{label}\"))"),
        ArgumentType::Supporting | ArgumentType::Neutral => format!("[\"{label}\"]"),
    }
}

fn connector(kind: ArgumentType) -> &'static str {
    match kind {
        ArgumentType::Supporting => "-->|supports|",
        ArgumentType::Opposing | ArgumentType::Counterargument => "-.->|opposes|",
        ArgumentType::Evidence => "-->|evidence|",
        ArgumentType::Neutral => "-->",
    }
}

fn label(text: &str) -> String {
    let truncated = if text.chars().count() <= LABEL_MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(LABEL_MAX_CHARS - 3).collect();
        format!("{head}...")
    };
    truncated.replace('"', "#quot;").replace('\n', "<br/>")
}

/// Frameworks colour a node ahead of its type.
fn class_name(node: &ArgumentNode) -> String {
    match node.framework() {
        Some(framework) => css_class(framework.as_str()),
        None => css_class(node.kind().as_str()),
    }
}

fn css_class(name: &str) -> String {
    name.replace('-', "_")
}

fn class_definitions() -> Vec<String> {
    const TYPE_STYLES: [(ArgumentType, &str, &str); 5] = [
        (ArgumentType::Supporting, "#dcfce7", "#16a34a"),
        (ArgumentType::Opposing, "#fef2f2", "#dc2626"),
        (ArgumentType::Counterargument, "#fef2f2", "#dc2626"),
        (ArgumentType::Evidence, "#fefce8", "#ca8a04"),
        (ArgumentType::Neutral, "#f8fafc", "#64748b"),
    ];
    const FRAMEWORK_STYLES: [(Framework, &str, &str); 12] = [
        (Framework::ConsequenceBased, "#fed7aa", "#ea580c"),
        (Framework::RuleBased, "#dbeafe", "#2563eb"),
        (Framework::CharacterBased, "#e9d5ff", "#9333ea"),
        (Framework::Practical, "#ccfbf1", "#0d9488"),
        (Framework::Stakeholder, "#fce7f3", "#db2777"),
        (Framework::Legal, "#e0e7ff", "#4f46e5"),
        (Framework::Emotional, "#ffe4e6", "#e11d48"),
        (Framework::Economic, "#dcfce7", "#15803d"),
        (Framework::Social, "#fef9c3", "#a16207"),
        (Framework::Individual, "#f3e8ff", "#7e22ce"),
        (Framework::Collective, "#cffafe", "#0891b2"),
        (Framework::Contextual, "#f1f5f9", "#475569"),
    ];

    let types = TYPE_STYLES
        .iter()
        .map(|(kind, fill, stroke)| (css_class(kind.as_str()), *fill, *stroke));
    let frameworks = FRAMEWORK_STYLES
        .iter()
        .map(|(framework, fill, stroke)| (css_class(framework.as_str()), *fill, *stroke));

    types
        .chain(frameworks)
        .map(|(name, fill, stroke)| {
            format!("{INDENT}classDef {name} fill:{fill},stroke:{stroke},stroke-width:2px,color:#000")
        })
        .collect()
}
