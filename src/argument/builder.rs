//! Arena-backed assembly of an [`ArgumentTree`].
//!
//! The builder owns a flat node list with the root at index 0 and a cursor on
//! the currently open section. Nodes are only appended, so arena order is the
//! pre-order of the finished tree.

use std::collections::HashSet;

use super::classifier::Classification;
use super::types::{
    ArgumentNode, ArgumentTree, ArgumentType, Framework, NodeIndex, Strength, ROOT_ID,
};
use crate::error::ExtractionError;

pub struct TreeBuilder {
    nodes: Vec<ArgumentNode>,
    current_section: Option<NodeIndex>,
    counter: usize,
}

impl TreeBuilder {
    pub fn new(root_text: impl Into<String>) -> Self {
        let root = ArgumentNode {
            id: ROOT_ID.to_string(),
            text: root_text.into(),
            kind: ArgumentType::Neutral,
            framework: None,
            strength: None,
            parent: None,
            children: Vec::new(),
            level: 0,
        };
        Self {
            nodes: vec![root],
            current_section: None,
            counter: 0,
        }
    }

    /// The section new arguments are routed to.
    pub fn current_section(&self) -> Option<NodeIndex> {
        self.current_section
    }

    /// Append a level-1 section and make it current.
    pub fn open_section(
        &mut self,
        title: &str,
        kind: ArgumentType,
        framework: Framework,
    ) -> Result<NodeIndex, ExtractionError> {
        let index = self.append(NodeIndex::ROOT, "section", title, kind, Some(framework), None)?;
        self.current_section = Some(index);
        Ok(index)
    }

    /// Append a level-2 argument to the current section.
    pub fn push_argument(
        &mut self,
        text: &str,
        classification: Classification,
    ) -> Result<NodeIndex, ExtractionError> {
        let section = self
            .current_section
            .ok_or_else(|| ExtractionError::NoOpenSection {
                text: text.to_string(),
            })?;
        self.append(
            section,
            "arg",
            text,
            classification.kind,
            Some(classification.framework),
            Some(classification.strength),
        )
    }

    /// Append a level-3 detail under `argument`, inheriting its framework.
    pub fn push_detail(
        &mut self,
        argument: NodeIndex,
        text: &str,
        kind: ArgumentType,
    ) -> Result<NodeIndex, ExtractionError> {
        let framework = self.get(argument)?.framework;
        self.append(argument, "detail", text, kind, framework, Some(Strength::BASE))
    }

    fn get(&self, index: NodeIndex) -> Result<&ArgumentNode, ExtractionError> {
        self.nodes
            .get(index.0)
            .ok_or(ExtractionError::DanglingHandle { index: index.0 })
    }

    fn append(
        &mut self,
        parent: NodeIndex,
        prefix: &str,
        text: &str,
        kind: ArgumentType,
        framework: Option<Framework>,
        strength: Option<Strength>,
    ) -> Result<NodeIndex, ExtractionError> {
        let level = self.get(parent)?.level + 1;
        self.counter += 1;
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(ArgumentNode {
            id: format!("{}-{}", prefix, self.counter),
            text: text.to_string(),
            kind,
            framework,
            strength,
            parent: Some(parent),
            children: Vec::new(),
            level,
        });
        self.nodes[parent.0].children.push(index);
        Ok(index)
    }

    /// Verify the arena and compute the aggregate counters.
    pub fn finish(self) -> Result<ArgumentTree, ExtractionError> {
        verify(&self.nodes)?;
        let total_nodes = count_nodes(&self.nodes, NodeIndex::ROOT)?;
        let max_depth = deepest_level(&self.nodes, NodeIndex::ROOT)?;
        Ok(ArgumentTree {
            nodes: self.nodes,
            total_nodes,
            max_depth,
        })
    }
}

fn verify(nodes: &[ArgumentNode]) -> Result<(), ExtractionError> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for (position, node) in nodes.iter().enumerate() {
        if !seen.insert(node.id.as_str()) {
            return Err(ExtractionError::DuplicateId {
                id: node.id.clone(),
            });
        }
        match node.parent {
            None if position == NodeIndex::ROOT.0 => {
                if node.level != 0 {
                    return Err(ExtractionError::LevelMismatch {
                        id: node.id.clone(),
                        expected: 0,
                        found: node.level,
                    });
                }
            }
            None => {
                return Err(ExtractionError::OrphanNode {
                    id: node.id.clone(),
                })
            }
            Some(parent_index) => {
                let parent = nodes.get(parent_index.0).ok_or(ExtractionError::DanglingHandle {
                    index: parent_index.0,
                })?;
                if !parent.children.contains(&NodeIndex(position)) {
                    return Err(ExtractionError::OrphanNode {
                        id: node.id.clone(),
                    });
                }
                if node.level != parent.level + 1 {
                    return Err(ExtractionError::LevelMismatch {
                        id: node.id.clone(),
                        expected: parent.level + 1,
                        found: node.level,
                    });
                }
            }
        }
    }
    Ok(())
}

fn count_nodes(nodes: &[ArgumentNode], index: NodeIndex) -> Result<usize, ExtractionError> {
    let node = nodes
        .get(index.0)
        .ok_or(ExtractionError::DanglingHandle { index: index.0 })?;
    node.children.iter().try_fold(1, |total, &child| {
        Ok(total + count_nodes(nodes, child)?)
    })
}

fn deepest_level(nodes: &[ArgumentNode], index: NodeIndex) -> Result<u32, ExtractionError> {
    let node = nodes
        .get(index.0)
        .ok_or(ExtractionError::DanglingHandle { index: index.0 })?;
    node.children
        .iter()
        .try_fold(node.level, |deepest, &child| {
            Ok(deepest.max(deepest_level(nodes, child)?))
        })
}
