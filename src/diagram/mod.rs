//! Diagram DSL validation, rendering and detail-level management.
//!
//! ```text
//! topic ──► DiagramGenerator ──► validate ──► levels[0]
//!                                               │
//!   set_level(L) ──► cache hit? ──► replay      ▼
//!        │                         expand / simplify ──► validate ──► levels[L]
//!        └────────────────────────────────────────────────────────────────┘
//! ```

mod controller;
mod extract;
mod generator;
mod ids;
mod render;
mod validator;

pub use controller::{
    DiagramDocument, DiagramEnhancementController, DiagramSettings, DiagramView, LevelOutcome,
};
pub use extract::extract_diagram;
pub use generator::{
    DiagramGenerator, DiagramKind, Direction, EnhancementRequest, LangbaseDiagramGenerator,
};
pub use ids::{IdAllocator, DEFAULT_CAPACITY, HARD_CAPACITY};
pub use render::{render_tree, RenderedDiagram};
pub use validator::{validate, ValidationReport};
