//! Undo/redo history over the editable state.
//!
//! Three sequences: `past` (oldest first), `present`, and `future` (next redo
//! first). Every entry is an owned snapshot, so nothing in the stack shares
//! structure with the state the host keeps editing.
//!
//! Edits go through [`HistoryStack::set`]. Anything that must not enter the
//! history (a server refresh, a value restored by the host after an undo)
//! goes through [`HistoryStack::apply_external`].

use crate::config::HistoryConfig;
use crate::persistence::canonical_json;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct Entry<S> {
    state: S,
    canonical: String,
}

impl<S: Serialize> Entry<S> {
    fn new(state: S) -> crate::error::Result<Self> {
        let canonical = canonical_json(&state)?;
        Ok(Self { state, canonical })
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStack<S> {
    past: VecDeque<Entry<S>>,
    present: Entry<S>,
    future: VecDeque<Entry<S>>,
    /// Maximum number of snapshots kept across `past` and `future`
    limit: usize,
}

impl<S> HistoryStack<S>
where
    S: Serialize + Clone,
{
    pub fn new(initial: S, limit: usize) -> crate::error::Result<Self> {
        Ok(Self {
            past: VecDeque::new(),
            present: Entry::new(initial)?,
            future: VecDeque::new(),
            limit: limit.max(1),
        })
    }

    pub fn from_config(initial: S, config: &HistoryConfig) -> crate::error::Result<Self> {
        Self::new(initial, config.limit)
    }

    /// Record an edit. Returns `false` when `state` is structurally equal to
    /// the present one and nothing was recorded.
    pub fn set(&mut self, state: S) -> crate::error::Result<bool> {
        let entry = Entry::new(state)?;
        if entry.canonical == self.present.canonical {
            return Ok(false);
        }

        let previous = std::mem::replace(&mut self.present, entry);
        self.past.push_back(previous);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        if !self.future.is_empty() {
            tracing::debug!(
                discarded = self.future.len(),
                "History: new edit cleared redo path"
            );
            self.future.clear();
        }

        tracing::debug!(past = self.past.len(), "History: recorded edit");
        Ok(true)
    }

    /// Replace the present without recording history or touching the redo path.
    pub fn apply_external(&mut self, state: S) -> crate::error::Result<()> {
        self.present = Entry::new(state)?;
        Ok(())
    }

    /// Step back one edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        tracing::debug!(
            past = self.past.len(),
            future = self.future.len(),
            "History: undo"
        );
        true
    }

    /// Step forward one edit. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        tracing::debug!(
            past = self.past.len(),
            future = self.future.len(),
            "History: redo"
        );
        true
    }

    /// Start over from `state`, e.g. after loading a different entity.
    pub fn reset(&mut self, state: S) -> crate::error::Result<()> {
        self.present = Entry::new(state)?;
        self.past.clear();
        self.future.clear();
        tracing::debug!("History: reset");
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn present(&self) -> &S {
        &self.present.state
    }

    /// Oldest first.
    pub fn past(&self) -> impl Iterator<Item = &S> {
        self.past.iter().map(|entry| &entry.state)
    }

    /// Next redo first.
    pub fn future(&self) -> impl Iterator<Item = &S> {
        self.future.iter().map(|entry| &entry.state)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
