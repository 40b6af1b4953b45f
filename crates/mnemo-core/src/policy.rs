//! Compaction policy: distill a batch, append it, reflect while over budget

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::store::ObservationStore;
use crate::tokens::Estimator;
use crate::types::{Message, Observation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One `replace_range` performed by reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Length of the oldest run folded into one observation
    pub observations_merged: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
}

/// Result of a reflection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionOutcome {
    pub merges: Vec<MergeSummary>,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub observations_before: usize,
    pub observations_after: usize,
    /// Still above the ceiling with nothing left to merge
    pub over_budget: bool,
}

impl ReflectionOutcome {
    /// Number of pre-pass observations that ended up inside a merged one
    pub fn observations_folded(&self) -> usize {
        if self.merges.is_empty() {
            return 0;
        }
        self.observations_before - self.observations_after + 1
    }

    pub fn summary(&self) -> String {
        format!(
            "Reflection complete: merged {} observations into 1 ({} -> {} tokens, {} observation(s) remaining)",
            self.observations_folded(),
            self.tokens_before,
            self.tokens_after,
            self.observations_after
        )
    }
}

/// What a single ingestion did to a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub appended: bool,
    /// Content of the observation distilled from this batch, before reflection
    pub distilled: Option<String>,
    pub messages: usize,
    pub tokens_before_reflection: usize,
    pub tokens_after: usize,
    pub merges: usize,
    pub observations_merged: usize,
    pub over_budget: bool,
    pub observation_count: usize,
}

/// Decides when and what to merge. Stateless apart from configuration.
#[derive(Debug, Clone)]
pub struct CompactionPolicy {
    max_tokens: usize,
    max_observation_chars: usize,
    merge_separator: String,
}

impl CompactionPolicy {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            max_observation_chars: config.max_observation_chars,
            merge_separator: config.merge_separator.clone(),
        }
    }

    /// Collapse a batch into one candidate observation, one `[role] content`
    /// line per message. `None` for an empty batch.
    pub fn distill(
        &self,
        thread_id: &str,
        messages: &[Message],
        not_before: Option<DateTime<Utc>>,
    ) -> Option<Observation> {
        if messages.is_empty() {
            return None;
        }

        let lines: Vec<String> = messages.iter().map(tag_message).collect();
        let content = truncate_chars(&lines.join("\n"), self.max_observation_chars);

        let now = Utc::now();
        let created_at = not_before.map_or(now, |last| last.max(now));
        Some(Observation::restore(
            thread_id,
            content,
            created_at,
            messages.len(),
            0,
        ))
    }

    /// Append the distilled batch, then reflect while over budget.
    ///
    /// The append is never undone. If reflection fails the store is rolled
    /// back to the state right after the append and the error is returned.
    pub fn ingest(
        &self,
        thread_id: &str,
        store: &mut ObservationStore,
        messages: &[Message],
        estimator: &Estimator,
    ) -> Result<IngestReport> {
        let last_created = store.last().map(|o| o.created_at());
        let Some(candidate) = self.distill(thread_id, messages, last_created) else {
            debug!(thread_id, "empty batch, nothing to ingest");
            let total = store.token_total(estimator);
            return Ok(IngestReport {
                appended: false,
                distilled: None,
                messages: 0,
                tokens_before_reflection: total,
                tokens_after: total,
                merges: 0,
                observations_merged: 0,
                over_budget: total > self.max_tokens,
                observation_count: store.len(),
            });
        };

        let distilled = candidate.content().to_string();
        store.append(candidate);
        let tokens_before_reflection = store.token_total(estimator);
        debug!(
            thread_id,
            messages = messages.len(),
            tokens = tokens_before_reflection,
            max_tokens = self.max_tokens,
            "observation appended"
        );

        let outcome = isolated(store, |store| self.reflect(store, estimator))?;

        Ok(IngestReport {
            appended: true,
            distilled: Some(distilled),
            messages: messages.len(),
            tokens_before_reflection,
            tokens_after: outcome.tokens_after,
            merges: outcome.merges.len(),
            observations_merged: outcome.observations_folded(),
            over_budget: outcome.over_budget,
            observation_count: store.len(),
        })
    }

    /// Merge oldest runs until the store fits or a single observation remains
    pub fn reflect(
        &self,
        store: &mut ObservationStore,
        estimator: &Estimator,
    ) -> Result<ReflectionOutcome> {
        let tokens_before = store.token_total(estimator);
        let observations_before = store.len();
        let mut merges = Vec::new();
        let mut total = tokens_before;

        while total > self.max_tokens && store.len() > 1 {
            let merge = self.merge_oldest(store, estimator)?;
            total = merge.tokens_after;
            merges.push(merge);
        }

        let over_budget = total > self.max_tokens;
        if over_budget {
            warn!(
                tokens = total,
                max_tokens = self.max_tokens,
                observations = store.len(),
                "store over budget with nothing left to merge"
            );
        }

        Ok(ReflectionOutcome {
            merges,
            tokens_before,
            tokens_after: total,
            observations_before,
            observations_after: store.len(),
            over_budget,
        })
    }

    /// One merge regardless of budget, then regular reflection.
    /// `None` when fewer than two observations exist.
    pub fn force_reflect(
        &self,
        store: &mut ObservationStore,
        estimator: &Estimator,
    ) -> Result<Option<ReflectionOutcome>> {
        if store.len() < 2 {
            return Ok(None);
        }

        let tokens_before = store.token_total(estimator);
        let observations_before = store.len();

        let outcome = isolated(store, |store| {
            let first = self.merge_oldest(store, estimator)?;
            let rest = self.reflect(store, estimator)?;
            let mut merges = vec![first];
            merges.extend(rest.merges);
            Ok(ReflectionOutcome {
                merges,
                tokens_before,
                tokens_after: rest.tokens_after,
                observations_before,
                observations_after: rest.observations_after,
                over_budget: rest.over_budget,
            })
        })?;
        Ok(Some(outcome))
    }

    fn merge_oldest(
        &self,
        store: &mut ObservationStore,
        estimator: &Estimator,
    ) -> Result<MergeSummary> {
        let tokens_before = store.token_total(estimator);
        let run_len = self.select_run_len(store.all(), estimator);
        let merged = self.merge(&store.all()[..run_len]);

        store.replace_range(0, run_len, merged)?;

        let tokens_after = store.token_total(estimator);
        info!(
            observations_merged = run_len,
            tokens_before,
            tokens_after,
            "reflection merged oldest observations"
        );
        Ok(MergeSummary {
            observations_merged: run_len,
            tokens_before,
            tokens_after,
        })
    }

    /// Smallest oldest run (at least 2) whose merge brings the projected total
    /// within budget. The whole store when no run is enough.
    fn select_run_len(&self, observations: &[Observation], estimator: &Estimator) -> usize {
        let total = estimator.estimate_observations(observations);
        let mut removed = 0;
        let mut merged_content = String::new();

        for (i, observation) in observations.iter().enumerate() {
            removed += estimator.estimate_observation(observation);
            if i > 0 {
                merged_content.push_str(&self.merge_separator);
            }
            merged_content.push_str(observation.content());

            let run_len = i + 1;
            if run_len < 2 {
                continue;
            }
            let merged_cost = estimator.estimate(&merged_content) + estimator.observation_overhead();
            if total - removed + merged_cost <= self.max_tokens {
                return run_len;
            }
        }
        observations.len()
    }

    fn merge(&self, run: &[Observation]) -> Observation {
        let content = run
            .iter()
            .map(|o| o.content())
            .collect::<Vec<_>>()
            .join(&self.merge_separator);
        let source_message_count = run.iter().map(|o| o.source_message_count()).sum();
        let generation = run
            .iter()
            .map(|o| o.reflection_generation())
            .max()
            .unwrap_or(0)
            + 1;
        let thread_id = run.first().map(|o| o.thread_id()).unwrap_or_default();
        let created_at = run
            .last()
            .map(|o| o.created_at())
            .unwrap_or_else(Utc::now);

        Observation::restore(
            thread_id,
            content,
            created_at,
            source_message_count,
            generation,
        )
    }
}

/// Run `step` against the store, restoring the pre-step state on error
fn isolated<T>(
    store: &mut ObservationStore,
    step: impl FnOnce(&mut ObservationStore) -> Result<T>,
) -> Result<T> {
    let checkpoint = store.clone();
    match step(store) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(error = %e, "reflection aborted, store rolled back");
            *store = checkpoint;
            Err(e)
        }
    }
}

fn tag_message(message: &Message) -> String {
    let role = match message.role.trim() {
        "" => "unknown",
        role => role,
    };
    let body = message.content.split_whitespace().collect::<Vec<_>>().join(" ");
    if body.is_empty() {
        format!("[{}]", role)
    } else {
        format!("[{}] {}", role, body)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
