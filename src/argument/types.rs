//! Argument tree data model.
//!
//! Nodes live in a flat arena owned by [`ArgumentTree`]; parent and child
//! links are [`NodeIndex`] handles into that arena. The serialized form is the
//! nested shape consumers expect (`rootNode` with recursive `children`).

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Id of the root node of every tree.
pub const ROOT_ID: &str = "root";

/// Text of the root node of every tree.
pub const ROOT_TEXT: &str = "Ethical Analysis";

/// Role an argument node plays in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    /// Claim in favour of the position.
    Supporting,
    /// Section dedicated to opposing views.
    Opposing,
    /// No detectable stance.
    Neutral,
    /// Factual or empirical backing.
    Evidence,
    /// Remark that challenges a claim.
    Counterargument,
}

impl ArgumentType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentType::Supporting => "supporting",
            ArgumentType::Opposing => "opposing",
            ArgumentType::Neutral => "neutral",
            ArgumentType::Evidence => "evidence",
            ArgumentType::Counterargument => "counterargument",
        }
    }
}

/// Analytical lens a section (and its arguments) is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    ConsequenceBased,
    RuleBased,
    CharacterBased,
    Practical,
    Stakeholder,
    Legal,
    Emotional,
    Economic,
    Social,
    Individual,
    Collective,
    Contextual,
}

impl Framework {
    /// Every framework, in declaration order.
    pub const ALL: [Framework; 12] = [
        Framework::ConsequenceBased,
        Framework::RuleBased,
        Framework::CharacterBased,
        Framework::Practical,
        Framework::Stakeholder,
        Framework::Legal,
        Framework::Emotional,
        Framework::Economic,
        Framework::Social,
        Framework::Individual,
        Framework::Collective,
        Framework::Contextual,
    ];

    /// Wire name of the framework.
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::ConsequenceBased => "consequence-based",
            Framework::RuleBased => "rule-based",
            Framework::CharacterBased => "character-based",
            Framework::Practical => "practical",
            Framework::Stakeholder => "stakeholder",
            Framework::Legal => "legal",
            Framework::Emotional => "emotional",
            Framework::Economic => "economic",
            Framework::Social => "social",
            Framework::Individual => "individual",
            Framework::Collective => "collective",
            Framework::Contextual => "contextual",
        }
    }
}

/// Argument strength, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Strength(u8);

impl Strength {
    /// Weakest strength.
    pub const MIN: Strength = Strength(1);
    /// Strongest strength.
    pub const MAX: Strength = Strength(5);
    /// Starting point before keyword adjustments.
    pub const BASE: Strength = Strength(3);

    /// Build a strength from an unbounded score, clamping into range.
    pub fn clamped(score: i32) -> Self {
        Strength(score.clamp(Self::MIN.0 as i32, Self::MAX.0 as i32) as u8)
    }

    /// Build a strength, rejecting out-of-range values.
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&value)
            .then_some(Strength(value))
    }

    /// Numeric value.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Handle of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// The root is always the first node of the arena.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single node of the argument tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) kind: ArgumentType,
    pub(crate) framework: Option<Framework>,
    pub(crate) strength: Option<Strength>,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) level: u32,
}

impl ArgumentNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ArgumentType {
        self.kind
    }

    pub fn framework(&self) -> Option<Framework> {
        self.framework
    }

    pub fn strength(&self) -> Option<Strength> {
        self.strength
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Children in text order.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Depth below the root (root is 0).
    pub fn level(&self) -> u32 {
        self.level
    }
}

/// Immutable argument tree extracted from one analysis text.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentTree {
    pub(crate) nodes: Vec<ArgumentNode>,
    pub(crate) total_nodes: usize,
    pub(crate) max_depth: u32,
}

impl ArgumentTree {
    pub fn root(&self) -> &ArgumentNode {
        &self.nodes[NodeIndex::ROOT.0]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&ArgumentNode> {
        self.nodes.get(index.0)
    }

    /// Resolve a node by its string id.
    pub fn find(&self, id: &str) -> Option<&ArgumentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Children of `node`, in text order.
    pub fn children_of<'a>(
        &'a self,
        node: &'a ArgumentNode,
    ) -> impl Iterator<Item = &'a ArgumentNode> + 'a {
        node.children.iter().filter_map(move |&c| self.node(c))
    }

    pub fn parent_of(&self, node: &ArgumentNode) -> Option<&ArgumentNode> {
        node.parent.and_then(|p| self.node(p))
    }

    /// All nodes in pre-order (the order they were created).
    pub fn iter(&self) -> impl Iterator<Item = &ArgumentNode> {
        self.nodes.iter()
    }

    /// Level-1 section nodes.
    pub fn sections(&self) -> impl Iterator<Item = &ArgumentNode> {
        self.children_of(self.root())
    }

    /// 1 + the number of descendants of the root.
    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    /// Level of the deepest node.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// True when no section was recognised.
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }
}

impl Serialize for ArgumentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ArgumentTree", 3)?;
        state.serialize_field(
            "rootNode",
            &NodeView {
                tree: self,
                index: NodeIndex::ROOT,
            },
        )?;
        state.serialize_field("totalNodes", &self.total_nodes)?;
        state.serialize_field("maxDepth", &self.max_depth)?;
        state.end()
    }
}

struct NodeView<'a> {
    tree: &'a ArgumentTree,
    index: NodeIndex,
}

struct ChildrenView<'a> {
    tree: &'a ArgumentTree,
    children: &'a [NodeIndex],
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self
            .tree
            .node(self.index)
            .ok_or_else(|| serde::ser::Error::custom("dangling node handle"))?;

        let mut state = serializer.serialize_struct("ArgumentNode", 8)?;
        state.serialize_field("id", &node.id)?;
        state.serialize_field("text", &node.text)?;
        state.serialize_field("type", &node.kind)?;
        match node.framework {
            Some(framework) => state.serialize_field("framework", &framework)?,
            None => state.skip_field("framework")?,
        }
        match node.strength {
            Some(strength) => state.serialize_field("strength", &strength)?,
            None => state.skip_field("strength")?,
        }
        state.serialize_field(
            "children",
            &ChildrenView {
                tree: self.tree,
                children: &node.children,
            },
        )?;
        match self.tree.parent_of(node) {
            Some(parent) => state.serialize_field("parent", &parent.id)?,
            None => state.skip_field("parent")?,
        }
        state.serialize_field("level", &node.level)?;
        state.end()
    }
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.children.iter().map(|&index| NodeView {
            tree: self.tree,
            index,
        }))
    }
}
