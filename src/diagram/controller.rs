//! Detail-level management for one session's diagram.
//!
//! The controller owns a [`DiagramDocument`] behind a `tokio::sync::RwLock`.
//! The lock is never held across a generator call: a request plans under the
//! lock, releases it, awaits the generator and re-acquires the lock to commit.
//! Commits stay consistent through three pieces of state:
//!
//! - the level asked for most recently; only a result for that level may move
//!   `current_level`, other results are still cached under their own level
//! - one running generation per level and epoch; a second request for the
//!   same level waits for it instead of calling the generator again
//! - every successful regenerate starts a new epoch; responses from an older
//!   epoch are dropped

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info};

use super::generator::{DiagramGenerator, DiagramKind, Direction, EnhancementRequest};
use super::ids::{IdAllocator, DEFAULT_CAPACITY, HARD_CAPACITY};
use super::validator::validate;
use crate::config::DiagramConfig;
use crate::error::{DiagramError, DiagramResult};

/// Fewest and most new identifiers offered to an expansion.
const EXPAND_MIN_NEW_IDS: usize = 4;
const EXPAND_MAX_NEW_IDS: usize = 6;

/// Bounds and limits applied by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSettings {
    pub min_level: i32,
    pub max_level: i32,
    /// Identifiers one generation prompt may name. Expansions are bounded by
    /// the whole alphabet instead, since each one adds to its basis.
    pub max_node_ids: usize,
    pub timeout: Duration,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            min_level: -2,
            max_level: 10,
            max_node_ids: DEFAULT_CAPACITY,
            timeout: Duration::from_millis(45_000),
        }
    }
}

impl From<&DiagramConfig> for DiagramSettings {
    fn from(config: &DiagramConfig) -> Self {
        Self {
            min_level: config.min_level,
            max_level: config.max_level,
            max_node_ids: config.max_node_ids.min(HARD_CAPACITY),
            timeout: config.timeout(),
        }
    }
}

impl DiagramSettings {
    pub fn contains(&self, level: i32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }
}

/// Diagram text per detail level for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    topic: String,
    kind: DiagramKind,
    epoch: u64,
    levels: BTreeMap<i32, String>,
    current_level: i32,
    created_at: DateTime<Utc>,
}

impl DiagramDocument {
    fn new(topic: String, kind: DiagramKind, epoch: u64) -> Self {
        Self {
            topic,
            kind,
            epoch,
            levels: BTreeMap::new(),
            current_level: 0,
            created_at: Utc::now(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn current_level(&self) -> i32 {
        self.current_level
    }

    pub fn level(&self, level: i32) -> Option<&str> {
        self.levels.get(&level).map(String::as_str)
    }

    /// The diagram on display: the last one committed as current.
    pub fn current_diagram(&self) -> Option<&str> {
        self.level(self.current_level)
    }

    pub fn cached_levels(&self) -> Vec<i32> {
        self.levels.keys().copied().collect()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// What a level request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelOutcome {
    /// Served from the cache without calling the generator.
    CacheHit,
    /// Generated, cached and now current.
    Generated,
    /// A newer request won; the result was cached or dropped but is not shown.
    Superseded,
    /// Requested level lies outside the configured bounds; nothing changed.
    OutOfRange,
}

/// Snapshot returned to callers after each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramView {
    pub topic: String,
    pub kind: DiagramKind,
    pub epoch: u64,
    pub current_level: i32,
    pub diagram: Option<String>,
    pub cached_levels: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<LevelOutcome>,
}

impl DiagramView {
    fn of(document: &DiagramDocument, outcome: Option<LevelOutcome>) -> Self {
        Self {
            topic: document.topic.clone(),
            kind: document.kind,
            epoch: document.epoch,
            current_level: document.current_level,
            diagram: document.current_diagram().map(str::to_string),
            cached_levels: document.cached_levels(),
            outcome,
        }
    }
}

/// Result of a running generation, published once it has committed.
type Completion = Option<DiagramResult<()>>;

struct ControllerState {
    document: DiagramDocument,
    /// Level of the most recent accepted request.
    wanted_level: i32,
    /// Running generations keyed by epoch and level.
    running: HashMap<(u64, i32), watch::Receiver<Completion>>,
}

/// A generator call planned under the lock and executed outside it.
enum Plan {
    Base,
    Enhance(EnhancementRequest),
}

/// Session-scoped diagram state machine.
pub struct DiagramEnhancementController {
    generator: Arc<dyn DiagramGenerator>,
    settings: DiagramSettings,
    topic: String,
    kind: DiagramKind,
    state: RwLock<ControllerState>,
}

impl std::fmt::Debug for DiagramEnhancementController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramEnhancementController")
            .field("topic", &self.topic)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DiagramEnhancementController {
    /// Start with an empty document for `topic`.
    pub fn new(
        generator: Arc<dyn DiagramGenerator>,
        settings: DiagramSettings,
        topic: impl Into<String>,
        kind: DiagramKind,
    ) -> Self {
        let topic = topic.into();
        Self {
            generator,
            settings,
            state: RwLock::new(ControllerState {
                document: DiagramDocument::new(topic.clone(), kind, 0),
                wanted_level: 0,
                running: HashMap::new(),
            }),
            topic,
            kind,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn settings(&self) -> &DiagramSettings {
        &self.settings
    }

    pub async fn view(&self) -> DiagramView {
        DiagramView::of(&self.state.read().await.document, None)
    }

    pub async fn document(&self) -> DiagramDocument {
        self.state.read().await.document.clone()
    }

    /// Produce the level-0 diagram, or replay it when already cached.
    pub async fn generate_base(&self) -> DiagramResult<DiagramView> {
        self.set_level(0).await
    }

    /// Move one step from the current level.
    pub async fn step(&self, delta: i32) -> DiagramResult<DiagramView> {
        let current = self.state.read().await.document.current_level;
        self.set_level(current.saturating_add(delta)).await
    }

    /// Show `level`, generating it when it is not cached yet.
    ///
    /// While a generation for `level` is already running, the request joins
    /// it and shares its result.
    pub async fn set_level(&self, level: i32) -> DiagramResult<DiagramView> {
        if !self.settings.contains(level) {
            debug!(level, "Requested detail level out of range");
            return Ok(DiagramView::of(
                &self.state.read().await.document,
                Some(LevelOutcome::OutOfRange),
            ));
        }

        loop {
            let (plan, key, done) = {
                let mut state = self.state.write().await;
                if state.document.levels.contains_key(&level) {
                    state.wanted_level = level;
                    state.document.current_level = level;
                    debug!(level, "Diagram level served from cache");
                    return Ok(DiagramView::of(
                        &state.document,
                        Some(LevelOutcome::CacheHit),
                    ));
                }

                let key = (state.document.epoch, level);
                if let Some(running) = state.running.get(&key).cloned() {
                    state.wanted_level = level;
                    drop(state);
                    match self.join(key, running).await? {
                        Some(view) => return Ok(view),
                        None => continue,
                    }
                }

                let plan = self.plan(&state.document, level)?;
                let (done, running) = watch::channel(None);
                state.running.insert(key, running);
                state.wanted_level = level;
                (plan, key, done)
            };

            return self.generate_level(plan, key, done).await;
        }
    }

    /// Run a planned generation for `key` and commit it.
    async fn generate_level(
        &self,
        plan: Plan,
        key: (u64, i32),
        done: watch::Sender<Completion>,
    ) -> DiagramResult<DiagramView> {
        let (epoch, level) = key;
        let start = Instant::now();
        let result = self.execute(&plan).await;

        let mut state = self.state.write().await;
        state.running.remove(&key);
        let diagram = match result {
            Ok(diagram) => diagram,
            Err(e) => {
                error!(
                    level,
                    error = %e,
                    kind = ?e.kind(),
                    latency_ms = start.elapsed().as_millis(),
                    "Diagram generation failed"
                );
                done.send_replace(Some(Err(e.clone())));
                return Err(e);
            }
        };

        let view = if state.document.epoch != epoch {
            info!(level, epoch, "Dropping diagram from a replaced document");
            DiagramView::of(&state.document, Some(LevelOutcome::Superseded))
        } else {
            state.document.levels.entry(level).or_insert(diagram);
            let outcome = if state.wanted_level == level {
                state.document.current_level = level;
                LevelOutcome::Generated
            } else {
                LevelOutcome::Superseded
            };
            info!(
                level,
                outcome = ?outcome,
                latency_ms = start.elapsed().as_millis(),
                "Diagram level committed"
            );
            DiagramView::of(&state.document, Some(outcome))
        };
        done.send_replace(Some(Ok(())));
        Ok(view)
    }

    /// Wait for the generation already running for `key`.
    ///
    /// Returns `None` when that request went away without a result; the
    /// caller then starts its own.
    async fn join(
        &self,
        key: (u64, i32),
        mut running: watch::Receiver<Completion>,
    ) -> DiagramResult<Option<DiagramView>> {
        let (epoch, level) = key;
        debug!(level, "Joining running diagram generation");
        let completion = match running.wait_for(Option::is_some).await {
            Ok(completion) => (*completion).clone(),
            Err(_) => None,
        };

        let Some(result) = completion else {
            let mut state = self.state.write().await;
            if state
                .running
                .get(&key)
                .is_some_and(|entry| entry.same_channel(&running))
            {
                state.running.remove(&key);
            }
            return Ok(None);
        };
        result?;

        let state = self.state.read().await;
        let outcome = if state.document.epoch == epoch && state.document.current_level == level {
            LevelOutcome::Generated
        } else {
            LevelOutcome::Superseded
        };
        Ok(Some(DiagramView::of(&state.document, Some(outcome))))
    }

    /// Replace the document with a freshly generated base diagram.
    ///
    /// On failure the existing document, its cached levels and any running
    /// level request are left as they were.
    pub async fn regenerate(&self) -> DiagramResult<DiagramView> {
        let epoch = self.state.read().await.document.epoch;

        let start = Instant::now();
        let diagram = match self.execute(&Plan::Base).await {
            Ok(diagram) => diagram,
            Err(e) => {
                error!(
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Diagram regeneration failed"
                );
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if state.document.epoch != epoch {
            return Ok(DiagramView::of(
                &state.document,
                Some(LevelOutcome::Superseded),
            ));
        }
        let mut document = DiagramDocument::new(self.topic.clone(), self.kind, epoch + 1);
        document.levels.insert(0, diagram);
        state.document = document;
        state.wanted_level = 0;
        info!(
            epoch = epoch + 1,
            latency_ms = start.elapsed().as_millis(),
            "Diagram regenerated"
        );
        Ok(DiagramView::of(
            &state.document,
            Some(LevelOutcome::Generated),
        ))
    }

    fn plan(&self, document: &DiagramDocument, level: i32) -> DiagramResult<Plan> {
        let Some(direction) = Direction::for_level(level) else {
            return Ok(Plan::Base);
        };
        let base = document.level(0).ok_or(DiagramError::NoBaseDiagram)?;

        let (basis, next_ids) = match direction {
            Direction::Expand => {
                // Highest cached level below the target, so expansions chain.
                let basis = document
                    .levels
                    .range(0..level)
                    .next_back()
                    .map(|(_, text)| text.as_str())
                    .unwrap_or(base);
                let used = validate(basis).used_ids();
                let next_ids = IdAllocator::seeded(HARD_CAPACITY, used)
                    .peek(EXPAND_MIN_NEW_IDS, EXPAND_MAX_NEW_IDS)?;
                (basis, next_ids)
            }
            Direction::Simplify => (base, Vec::new()),
        };

        Ok(Plan::Enhance(EnhancementRequest {
            topic: self.topic.clone(),
            basis: basis.to_string(),
            direction,
            target_level: level,
            next_ids,
        }))
    }

    /// Call the generator under the timeout and vet what comes back.
    async fn execute(&self, plan: &Plan) -> DiagramResult<String> {
        let call = async {
            match plan {
                Plan::Base => self.generator.generate(&self.topic, self.kind).await,
                Plan::Enhance(request) => self.generator.enhance(request).await,
            }
        };
        let diagram = tokio::time::timeout(self.settings.timeout, call)
            .await
            .map_err(|_| DiagramError::GenerationUnavailable {
                message: format!(
                    "generator did not answer within {}ms",
                    self.settings.timeout.as_millis()
                ),
            })??;

        validate(&diagram).into_result()?;
        if let Plan::Enhance(request) = plan {
            if request.direction == Direction::Expand {
                ensure_preserved(&request.basis, &diagram)?;
            }
        }
        Ok(diagram)
    }
}

/// Every definition line of `basis` must reappear verbatim in `expanded`.
fn ensure_preserved(basis: &str, expanded: &str) -> DiagramResult<()> {
    let lines: HashSet<&str> = expanded.lines().map(str::trim).collect();
    let missing: Vec<String> = validate(basis)
        .definition_lines
        .into_iter()
        .filter(|line| !lines.contains(line.as_str()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DiagramError::ContentNotPreserved { missing })
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
