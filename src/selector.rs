//! Picks which model endpoint to call next.
//!
//! [`ModelChoice`] is the process-wide state shared by every request: the
//! last endpoint that answered, endpoints known not to exist, and endpoints
//! that rejected image input. [`SelectionRound`] is the per-request view of
//! candidates already tried, so rate-limited endpoints are only skipped for
//! the request that saw the limit.

use crate::models::{Modality, ModelCandidate};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ChoiceState {
    cached: Option<String>,
    retired: HashSet<String>,
    text_only: HashSet<String>,
}

/// Shared, synchronized cache of the last successful model.
#[derive(Debug, Default)]
pub struct ModelChoice {
    state: Mutex<ChoiceState>,
}

impl ModelChoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, ChoiceState> {
        // State stays consistent even if a holder panicked; every write is a
        // single field update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cached(&self) -> Option<String> {
        self.lock().cached.clone()
    }

    pub fn record_success(&self, id: &str) {
        self.lock().cached = Some(id.to_string());
    }

    /// Clears the cache only if it still points at `id`.
    ///
    /// Returns whether the cache was cleared.
    pub fn invalidate(&self, id: &str) -> bool {
        let mut state = self.lock();
        if state.cached.as_deref() == Some(id) {
            state.cached = None;
            true
        } else {
            false
        }
    }

    /// Removes `id` from consideration for the rest of the process.
    pub fn retire(&self, id: &str) {
        let mut state = self.lock();
        if state.cached.as_deref() == Some(id) {
            state.cached = None;
        }
        state.retired.insert(id.to_string());
    }

    /// Records that `id` rejected image input.
    pub fn mark_text_only(&self, id: &str) {
        let mut state = self.lock();
        if state.cached.as_deref() == Some(id) {
            state.cached = None;
        }
        state.text_only.insert(id.to_string());
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.lock().retired.contains(id)
    }
}

/// Candidates already attempted during one analysis request.
#[derive(Debug, Default)]
pub struct SelectionRound {
    tried: HashSet<String>,
}

impl SelectionRound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_tried(&mut self, id: &str) {
        self.tried.insert(id.to_string());
    }

    pub fn was_tried(&self, id: &str) -> bool {
        self.tried.contains(id)
    }
}

/// Ranked candidate list plus the shared choice cache.
pub struct ModelSelector {
    candidates: Vec<ModelCandidate>,
    choice: Arc<ModelChoice>,
}

impl ModelSelector {
    pub fn new(candidates: Vec<ModelCandidate>, choice: Arc<ModelChoice>) -> Self {
        Self { candidates, choice }
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    pub fn choice(&self) -> &Arc<ModelChoice> {
        &self.choice
    }

    /// Next candidate to call for `modality`, or `None` once exhausted.
    ///
    /// The cached choice is preferred; otherwise candidates are walked in
    /// rank order. Candidates that cannot take the modality are passed over
    /// without a call.
    pub fn select(&self, round: &SelectionRound, modality: Modality) -> Option<ModelCandidate> {
        let state = self.choice.lock();

        let usable = |candidate: &ModelCandidate| {
            !round.was_tried(&candidate.id)
                && !state.retired.contains(&candidate.id)
                && candidate.supports(modality)
                && !(modality == Modality::Image && state.text_only.contains(&candidate.id))
        };

        if let Some(cached) = state.cached.as_deref() {
            if let Some(candidate) = self.candidates.iter().find(|c| c.id == cached) {
                if usable(candidate) {
                    return Some(candidate.clone());
                }
            }
        }

        let next = self.candidates.iter().find(|&c| usable(c)).cloned();
        if next.is_none() {
            tracing::debug!("No usable model candidate left for {:?} input", modality);
        }
        next
    }
}
