//! Progress cascade: content → lesson → unit.
//!
//! A content item's own state is written as-is. Its lesson is then recomputed
//! from every content item in the lesson, and the unit from every lesson in
//! the unit. A level is complete only when all of its children are complete;
//! a high average never implies completion.
//!
//! Writes go through an injected [`ProgressStore`] and are best-effort: a
//! failure at one level is reported and logged but never undoes the writes
//! that already succeeded.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{ProgressItem, ProgressLevel, ProgressUpdate};

/// Persistence for progress items.
pub trait ProgressStore: Sync {
    type Error: std::fmt::Display + Send;

    fn save(
        &self,
        level: ProgressLevel,
        item: &ProgressItem,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Items at `level` whose parent is `parent_id`.
    fn children(
        &self,
        level: ProgressLevel,
        parent_id: i64,
    ) -> impl Future<Output = Result<Vec<ProgressItem>, Self::Error>> + Send;
}

/// Aggregate state of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub percentage: u8,
    pub completed: bool,
}

/// Combine children into their parent's state. `None` when there are none.
pub fn aggregate(children: &[ProgressItem]) -> Option<Aggregate> {
    if children.is_empty() {
        return None;
    }

    let completed = children.iter().all(|c| c.is_completed);
    let percentage = if completed {
        100
    } else {
        let sum: u32 = children.iter().map(|c| u32::from(c.completion_percentage)).sum();
        (f64::from(sum) / children.len() as f64).round().min(100.0) as u8
    };

    Some(Aggregate {
        percentage,
        completed,
    })
}

/// What happened at one level of a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LevelOutcome {
    Written { item: ProgressItem },
    /// Written from the triggering update after the cascade could not read siblings.
    Fallback { item: ProgressItem },
    Skipped,
    Failed { error: String },
}

impl LevelOutcome {
    pub fn item(&self) -> Option<&ProgressItem> {
        match self {
            Self::Written { item } | Self::Fallback { item } => Some(item),
            Self::Skipped | Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-level result of [`update_progress_cascade`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub content: LevelOutcome,
    pub lesson: LevelOutcome,
    pub unit: LevelOutcome,
    /// Set when sibling data could not be read and the fallback path ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record a content update and propagate it to the lesson and unit.
pub async fn update_progress_cascade<S: ProgressStore>(
    store: &S,
    update: &ProgressUpdate,
) -> Result<CascadeReport, ValidationError> {
    update.validate()?;

    let content = update.content_item();
    let content_outcome = write(store, ProgressLevel::Content, content.clone()).await;

    let siblings = match store.children(ProgressLevel::Content, update.lesson_id).await {
        Ok(siblings) => siblings,
        Err(e) => return Ok(fallback(store, update, content_outcome, e.to_string()).await),
    };

    let Some(lesson_state) = level_aggregate(siblings, &content) else {
        return Ok(CascadeReport {
            content: content_outcome,
            lesson: LevelOutcome::Skipped,
            unit: LevelOutcome::Skipped,
            error: None,
        });
    };

    let lesson = ProgressItem::new(
        update.lesson_id,
        update.unit_id,
        lesson_state.percentage,
        lesson_state.completed,
    );
    let lesson_outcome = write(store, ProgressLevel::Lesson, lesson.clone()).await;

    let unit_outcome = match update.unit_id {
        Some(unit_id) => cascade_unit(store, unit_id, &lesson).await,
        None => LevelOutcome::Skipped,
    };

    Ok(CascadeReport {
        content: content_outcome,
        lesson: lesson_outcome,
        unit: unit_outcome,
        error: None,
    })
}

async fn cascade_unit<S: ProgressStore>(store: &S, unit_id: i64, lesson: &ProgressItem) -> LevelOutcome {
    let lessons = match store.children(ProgressLevel::Lesson, unit_id).await {
        Ok(lessons) => lessons,
        Err(e) => {
            tracing::warn!(unit_id, error = %e, "could not read lessons of unit");
            return LevelOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    match level_aggregate(lessons, lesson) {
        Some(state) => {
            let unit = ProgressItem::new(unit_id, None, state.percentage, state.completed);
            write(store, ProgressLevel::Unit, unit).await
        }
        None => LevelOutcome::Skipped,
    }
}

/// Aggregate siblings with the trigger's fresh values folded in.
///
/// With no sibling data at all, a completing trigger stands in as the only
/// child; anything else leaves the level untouched.
fn level_aggregate(mut siblings: Vec<ProgressItem>, trigger: &ProgressItem) -> Option<Aggregate> {
    if siblings.is_empty() {
        if !trigger.is_completed {
            return None;
        }
        siblings.push(trigger.clone());
    } else if let Some(stale) = siblings.iter_mut().find(|s| s.id == trigger.id) {
        *stale = trigger.clone();
    } else {
        siblings.push(trigger.clone());
    }

    aggregate(&siblings)
}

async fn fallback<S: ProgressStore>(
    store: &S,
    update: &ProgressUpdate,
    content_outcome: LevelOutcome,
    error: String,
) -> CascadeReport {
    tracing::warn!(
        content_id = update.content_id,
        lesson_id = update.lesson_id,
        error = %error,
        "progress cascade failed, writing content and lesson directly"
    );

    let content_outcome = if content_outcome.is_failed() {
        write(store, ProgressLevel::Content, update.content_item()).await
    } else {
        content_outcome
    };

    let lesson = ProgressItem::new(
        update.lesson_id,
        update.unit_id,
        update.percentage.min(100) as u8,
        update.completed,
    );
    let lesson_outcome = match write(store, ProgressLevel::Lesson, lesson).await {
        LevelOutcome::Written { item } => LevelOutcome::Fallback { item },
        other => other,
    };

    CascadeReport {
        content: content_outcome,
        lesson: lesson_outcome,
        unit: LevelOutcome::Skipped,
        error: Some(error),
    }
}

async fn write<S: ProgressStore>(store: &S, level: ProgressLevel, item: ProgressItem) -> LevelOutcome {
    match store.save(level, &item).await {
        Ok(()) => LevelOutcome::Written { item },
        Err(e) => {
            tracing::warn!(level = level.as_str(), id = item.id, error = %e, "progress write failed");
            LevelOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// In-process progress store.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    items: Mutex<HashMap<(ProgressLevel, i64), ProgressItem>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read, mainly for inspection.
    pub fn get(&self, level: ProgressLevel, id: i64) -> Option<ProgressItem> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.get(&(level, id)).cloned()
    }

    /// Synchronous write, mainly for seeding.
    pub fn insert(&self, level: ProgressLevel, item: ProgressItem) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert((level, item.id), item);
    }
}

impl ProgressStore for MemoryProgressStore {
    type Error = Infallible;

    async fn save(&self, level: ProgressLevel, item: &ProgressItem) -> Result<(), Infallible> {
        self.insert(level, item.clone());
        Ok(())
    }

    async fn children(&self, level: ProgressLevel, parent_id: i64) -> Result<Vec<ProgressItem>, Infallible> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let mut children: Vec<ProgressItem> = items
            .iter()
            .filter(|((l, _), item)| *l == level && item.parent_id == Some(parent_id))
            .map(|(_, item)| item.clone())
            .collect();
        children.sort_by_key(|c| c.id);
        Ok(children)
    }
}
