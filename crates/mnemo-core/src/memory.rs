//! Unified per-thread memory façade

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::persist::StateStore;
use crate::policy::{CompactionPolicy, IngestReport};
use crate::render::{render_context, ContextSections};
use crate::semantic::SemanticMemory;
use crate::store::ObservationStore;
use crate::tokens::Estimator;
use crate::types::{Message, Observation, ThreadSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Extra section filled from the semantic service
const SEMANTIC_SECTION: &str = "semantic_recall";

/// Observational-memory statistics for one thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStats {
    pub thread_id: String,
    pub observation_count: usize,
    pub token_total: usize,
    pub max_tokens: usize,
    /// Above the ceiling with a single observation left
    pub over_budget: bool,
    pub messages_processed: usize,
    pub reflection_count: usize,
    pub source_message_total: usize,
    pub max_reflection_generation: u32,
    pub estimator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticStatus {
    pub enabled: bool,
    pub backend: Option<String>,
}

/// Stats across all memory components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedStats {
    pub observational_memory: ThreadStats,
    pub semantic_memory: SemanticStatus,
    pub timestamp: DateTime<Utc>,
}

struct ThreadState {
    thread_id: String,
    store: ObservationStore,
    messages_processed: usize,
    reflection_count: usize,
    /// False when the persisted copy could not be read; never overwrite it
    persistable: bool,
}

impl ThreadState {
    fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            store: ObservationStore::new(),
            messages_processed: 0,
            reflection_count: 0,
            persistable: true,
        }
    }

    fn from_snapshot(thread_id: &str, snapshot: ThreadSnapshot) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            store: ObservationStore::from_observations(snapshot.observations),
            messages_processed: snapshot.messages_processed,
            reflection_count: snapshot.reflection_count,
            persistable: true,
        }
    }

    fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            thread_id: self.thread_id.clone(),
            observations: self.store.all().to_vec(),
            messages_processed: self.messages_processed,
            reflection_count: self.reflection_count,
        }
    }
}

enum Loaded {
    Found(ThreadState),
    Missing,
    Unreadable,
}

/// Composes estimator, store, policy and renderer per thread.
///
/// Each thread has its own lock, held for the whole of an operation. The
/// registry lock is only held to look a thread up.
pub struct UnifiedMemory {
    config: MemoryConfig,
    estimator: Estimator,
    policy: CompactionPolicy,
    threads: Mutex<HashMap<String, Arc<Mutex<ThreadState>>>>,
    persistence: Option<Box<dyn StateStore>>,
    semantic: Option<Box<dyn SemanticMemory>>,
}

impl UnifiedMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            estimator: Estimator::from_config(&config),
            policy: CompactionPolicy::new(&config),
            config,
            threads: Mutex::new(HashMap::new()),
            persistence: None,
            semantic: None,
        }
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_persistence(mut self, persistence: Box<dyn StateStore>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_semantic(mut self, semantic: Box<dyn SemanticMemory>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Ingest a batch and return the rendered context.
    ///
    /// Only a `Range` error from a failed reflection step is returned; the new
    /// observation is kept either way.
    pub fn process_interaction(
        &self,
        thread_id: &str,
        messages: &[Message],
        extras: ContextSections,
    ) -> Result<String> {
        self.process_interaction_with_report(thread_id, messages, extras)
            .map(|(context, _)| context)
    }

    pub fn process_interaction_with_report(
        &self,
        thread_id: &str,
        messages: &[Message],
        mut extras: ContextSections,
    ) -> Result<(String, IngestReport)> {
        self.recall(messages, &mut extras);

        let thread = self.thread_or_create(thread_id);
        let (context, report) = {
            let mut state = lock(&thread);
            let result =
                self.policy
                    .ingest(thread_id, &mut state.store, messages, &self.estimator);
            state.messages_processed += messages.len();
            if matches!(&result, Ok(report) if report.merges > 0) {
                state.reflection_count += 1;
            }
            self.persist(&state);

            let report = result?;
            (render_context(state.store.all(), &extras), report)
        };

        if let Some(content) = &report.distilled {
            self.remember(content);
        }
        Ok((context, report))
    }

    /// Render the thread without ingesting anything
    pub fn get_context(&self, thread_id: &str) -> String {
        match self.existing_thread(thread_id) {
            Some(thread) => render_context(lock(&thread).store.all(), &ContextSections::new()),
            None => render_context(&[], &ContextSections::new()),
        }
    }

    pub fn get_stats(&self, thread_id: &str) -> UnifiedStats {
        let observational_memory = match self.existing_thread(thread_id) {
            Some(thread) => self.thread_stats(&lock(&thread)),
            None => self.thread_stats(&ThreadState::new(thread_id)),
        };
        UnifiedStats {
            observational_memory,
            semantic_memory: SemanticStatus {
                enabled: self.semantic.is_some(),
                backend: self.semantic.as_ref().map(|s| s.name().to_string()),
            },
            timestamp: Utc::now(),
        }
    }

    /// Merge the oldest observations now, whatever the budget says
    pub fn force_reflection(&self, thread_id: &str) -> Result<String> {
        let Some(thread) = self.existing_thread(thread_id) else {
            return Ok(nothing_to_reflect(thread_id, 0));
        };
        let mut state = lock(&thread);

        match self.policy.force_reflect(&mut state.store, &self.estimator)? {
            None => Ok(nothing_to_reflect(thread_id, state.store.len())),
            Some(outcome) => {
                state.reflection_count += 1;
                self.persist(&state);
                info!(
                    thread_id,
                    merges = outcome.merges.len(),
                    tokens_after = outcome.tokens_after,
                    "forced reflection finished"
                );
                Ok(outcome.summary())
            }
        }
    }

    /// Drop every observation and counter of a thread
    pub fn clear(&self, thread_id: &str) {
        if let Some(thread) = self.existing_thread(thread_id) {
            let mut state = lock(&thread);
            state.store.clear();
            state.messages_processed = 0;
            state.reflection_count = 0;
            self.persist(&state);
            info!(thread_id, "thread cleared");
        }
    }

    /// Threads known in memory or to the persistence adapter
    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> = lock(&self.threads).keys().cloned().collect();
        if let Some(persistence) = &self.persistence {
            match persistence.thread_ids() {
                Ok(stored) => ids.extend(stored),
                Err(e) => warn!(error = %e, "failed to list persisted threads"),
            }
        }
        ids.into_iter().collect()
    }

    /// Copy of a thread's observations, oldest first
    pub fn observations(&self, thread_id: &str) -> Vec<Observation> {
        self.existing_thread(thread_id)
            .map(|thread| lock(&thread).store.all().to_vec())
            .unwrap_or_default()
    }

    fn thread_stats(&self, state: &ThreadState) -> ThreadStats {
        let observations = state.store.all();
        let token_total = state.store.token_total(&self.estimator);
        ThreadStats {
            thread_id: state.thread_id.clone(),
            observation_count: observations.len(),
            token_total,
            max_tokens: self.config.max_tokens,
            over_budget: token_total > self.config.max_tokens,
            messages_processed: state.messages_processed,
            reflection_count: state.reflection_count,
            source_message_total: observations.iter().map(|o| o.source_message_count()).sum(),
            max_reflection_generation: observations
                .iter()
                .map(|o| o.reflection_generation())
                .max()
                .unwrap_or(0),
            estimator: self.estimator.strategy().to_string(),
        }
    }

    fn thread_or_create(&self, thread_id: &str) -> Arc<Mutex<ThreadState>> {
        if let Some(thread) = self.cached(thread_id) {
            return thread;
        }
        let state = match self.load(thread_id) {
            Loaded::Found(state) => state,
            Loaded::Missing => ThreadState::new(thread_id),
            Loaded::Unreadable => ThreadState {
                persistable: false,
                ..ThreadState::new(thread_id)
            },
        };
        self.cache(thread_id, state)
    }

    fn existing_thread(&self, thread_id: &str) -> Option<Arc<Mutex<ThreadState>>> {
        if let Some(thread) = self.cached(thread_id) {
            return Some(thread);
        }
        let Loaded::Found(state) = self.load(thread_id) else {
            return None;
        };
        Some(self.cache(thread_id, state))
    }

    fn cached(&self, thread_id: &str) -> Option<Arc<Mutex<ThreadState>>> {
        lock(&self.threads).get(thread_id).cloned()
    }

    /// First insert wins when two callers loaded the same thread concurrently
    fn cache(&self, thread_id: &str, state: ThreadState) -> Arc<Mutex<ThreadState>> {
        let mut threads = lock(&self.threads);
        let thread = threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(state)));
        Arc::clone(thread)
    }

    fn load(&self, thread_id: &str) -> Loaded {
        let Some(persistence) = &self.persistence else {
            return Loaded::Missing;
        };
        match persistence.load(thread_id) {
            Ok(Some(snapshot)) => {
                debug!(
                    thread_id,
                    observations = snapshot.observations.len(),
                    "thread loaded"
                );
                Loaded::Found(ThreadState::from_snapshot(thread_id, snapshot))
            }
            Ok(None) => Loaded::Missing,
            Err(e) => {
                warn!(thread_id, error = %e, "failed to load thread state, keeping it in memory only");
                Loaded::Unreadable
            }
        }
    }

    fn persist(&self, state: &ThreadState) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if !state.persistable {
            return;
        }
        if let Err(e) = persistence.save(&state.snapshot()) {
            warn!(thread_id = %state.thread_id, error = %e, "failed to persist thread state");
        }
    }

    /// Query the semantic service with the latest user text. Runs before any
    /// thread lock is taken.
    fn recall(&self, messages: &[Message], extras: &mut ContextSections) {
        let Some(semantic) = &self.semantic else {
            return;
        };
        if extras.contains(SEMANTIC_SECTION) {
            return;
        }
        let has_text = |m: &&Message| !m.content.trim().is_empty();
        let cue = messages
            .iter()
            .rev()
            .filter(has_text)
            .find(|m| m.role == "user")
            .or_else(|| messages.iter().rev().find(has_text));
        let Some(cue) = cue else {
            return;
        };

        match semantic.query(&cue.content) {
            Ok(answer) => {
                if let Some(text) = answer.render() {
                    extras.insert(SEMANTIC_SECTION, text);
                }
            }
            Err(e) => {
                warn!(backend = semantic.name(), error = %e, "semantic query failed, continuing without recall");
            }
        }
    }

    /// Push a new observation to the semantic service. Runs after the thread
    /// lock is released.
    fn remember(&self, content: &str) {
        if !self.config.store_observations_semantically {
            return;
        }
        let Some(semantic) = &self.semantic else {
            return;
        };
        match semantic.store(content) {
            Ok(true) => debug!(backend = semantic.name(), "observation stored semantically"),
            Ok(false) => debug!(backend = semantic.name(), "semantic service declined observation"),
            Err(e) => warn!(backend = semantic.name(), error = %e, "semantic store failed"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn nothing_to_reflect(thread_id: &str, observations: usize) -> String {
    format!(
        "Nothing to reflect: thread '{}' has {} observation(s)",
        thread_id, observations
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::InMemoryStateStore;
    use crate::render::{MEMORY_SECTION, NO_MEMORY};
    use crate::semantic::SemanticQuery;
    use crate::tokens::TokenEstimator;

    struct FailingSemantic;

    impl SemanticMemory for FailingSemantic {
        fn name(&self) -> &str {
            "failing"
        }

        fn store(&self, _text: &str) -> anyhow::Result<bool> {
            anyhow::bail!("connection refused")
        }

        fn query(&self, _text: &str) -> anyhow::Result<SemanticQuery> {
            anyhow::bail!("timed out")
        }
    }

    #[derive(Default)]
    struct RecordingSemantic {
        stored: Arc<Mutex<Vec<String>>>,
        queried: Arc<Mutex<Vec<String>>>,
    }

    impl SemanticMemory for RecordingSemantic {
        fn name(&self) -> &str {
            "recording"
        }

        fn store(&self, text: &str) -> anyhow::Result<bool> {
            self.stored.lock().unwrap().push(text.to_string());
            Ok(true)
        }

        fn query(&self, text: &str) -> anyhow::Result<SemanticQuery> {
            self.queried.lock().unwrap().push(text.to_string());
            Ok(SemanticQuery {
                confidence_tier: "medium".to_string(),
                items: vec!["User is building a parser".to_string()],
                token_count: 6,
            })
        }
    }

    struct BrokenStateStore;

    impl StateStore for BrokenStateStore {
        fn load(&self, _thread_id: &str) -> anyhow::Result<Option<ThreadSnapshot>> {
            Ok(None)
        }

        fn save(&self, _snapshot: &ThreadSnapshot) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn thread_ids(&self) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("disk full")
        }
    }

    fn hello() -> Vec<Message> {
        vec![Message::user("hello")]
    }

    #[test]
    fn test_empty_thread_context_is_sentinel() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        assert_eq!(memory.get_context("t1"), NO_MEMORY);
        assert!(memory.thread_ids().is_empty());
    }

    #[test]
    fn test_single_hello() {
        let memory = UnifiedMemory::new(MemoryConfig::new());

        let context = memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();

        let observations = memory.observations("t1");
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].source_message_count(), 1);
        assert_eq!(context, memory.get_context("t1"));
        assert_eq!(
            memory.get_context("t1"),
            format!("## {}\n[user] hello", MEMORY_SECTION)
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();
        assert_eq!(memory.get_context("t1"), memory.get_context("t1"));
    }

    #[test]
    fn test_extras_are_rendered_but_not_stored() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        let context = memory
            .process_interaction(
                "t1",
                &hello(),
                ContextSections::new().with("research_notes", "new paper on BPE"),
            )
            .unwrap();

        assert!(context.contains("## Research Notes\nnew paper on BPE"));
        assert!(!memory.get_context("t1").contains("Research Notes"));
    }

    #[test]
    fn test_threads_are_independent() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        memory
            .process_interaction("a", &hello(), ContextSections::new())
            .unwrap();
        memory
            .process_interaction("b", &[Message::user("other")], ContextSections::new())
            .unwrap();

        assert!(!memory.get_context("a").contains("other"));
        assert_eq!(memory.thread_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_overflow_triggers_reflection() {
        let memory = UnifiedMemory::new(MemoryConfig::new().with_max_tokens(100));
        let batch = vec![Message::user("tell me about the borrow checker rules")];

        let mut report = None;
        for _ in 0..10 {
            let (_, r) = memory
                .process_interaction_with_report("t1", &batch, ContextSections::new())
                .unwrap();
            report = Some(r);
        }

        let stats = memory.get_stats("t1").observational_memory;
        assert!(stats.token_total <= 100 || stats.observation_count == 1);
        assert!(stats.reflection_count >= 1);
        assert_eq!(stats.source_message_total, 10);
        assert_eq!(stats.messages_processed, 10);
        assert!(report.unwrap().appended);
    }

    #[test]
    fn test_force_reflection_on_single_observation() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();
        let before = memory.observations("t1");

        let message = memory.force_reflection("t1").unwrap();

        assert!(message.starts_with("Nothing to reflect"));
        assert_eq!(memory.observations("t1"), before);
    }

    #[test]
    fn test_force_reflection_unknown_thread_creates_nothing() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        let message = memory.force_reflection("ghost").unwrap();
        assert!(message.contains("0 observation(s)"));
        assert!(memory.thread_ids().is_empty());
    }

    #[test]
    fn test_force_reflection_merges() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        for text in ["one", "two", "three"] {
            memory
                .process_interaction("t1", &[Message::user(text)], ContextSections::new())
                .unwrap();
        }

        let message = memory.force_reflection("t1").unwrap();

        assert!(message.starts_with("Reflection complete"));
        let observations = memory.observations("t1");
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].content(), "[user] one\n[user] two");
        assert_eq!(observations[0].reflection_generation(), 1);
        assert_eq!(memory.get_stats("t1").observational_memory.reflection_count, 1);
    }

    #[test]
    fn test_stats_for_fresh_thread() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        let stats = memory.get_stats("t1");
        assert_eq!(stats.observational_memory.observation_count, 0);
        assert_eq!(stats.observational_memory.token_total, 0);
        assert_eq!(stats.observational_memory.estimator, "heuristic");
        assert!(!stats.semantic_memory.enabled);
    }

    #[test]
    fn test_failing_semantic_service_is_not_fatal() {
        let config = MemoryConfig {
            store_observations_semantically: true,
            ..MemoryConfig::new()
        };
        let memory = UnifiedMemory::new(config).with_semantic(Box::new(FailingSemantic));

        let context = memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();

        assert_eq!(context, format!("## {}\n[user] hello", MEMORY_SECTION));
        assert_eq!(memory.observations("t1").len(), 1);
    }

    #[test]
    fn test_semantic_recall_and_store() {
        let semantic = RecordingSemantic::default();
        let stored = Arc::clone(&semantic.stored);
        let queried = Arc::clone(&semantic.queried);
        let config = MemoryConfig {
            store_observations_semantically: true,
            ..MemoryConfig::new()
        };
        let memory = UnifiedMemory::new(config).with_semantic(Box::new(semantic));

        let context = memory
            .process_interaction(
                "t1",
                &[
                    Message::user("how do I write a lexer"),
                    Message::assistant("start with tokens"),
                ],
                ContextSections::new(),
            )
            .unwrap();

        assert!(context.contains("## Semantic Recall\nConfidence: medium\n- User is building a parser"));
        assert_eq!(*queried.lock().unwrap(), vec!["how do I write a lexer".to_string()]);
        assert_eq!(stored.lock().unwrap().len(), 1);
        assert!(stored.lock().unwrap()[0].starts_with("[user] how do I write a lexer"));
        assert_eq!(memory.get_stats("t1").semantic_memory.backend.as_deref(), Some("recording"));
    }

    #[test]
    fn test_semantic_store_gets_distilled_text_when_reflection_merges_it() {
        let semantic = RecordingSemantic::default();
        let stored = Arc::clone(&semantic.stored);
        let config = MemoryConfig {
            max_tokens: 30,
            store_observations_semantically: true,
            ..MemoryConfig::new()
        };
        let memory = UnifiedMemory::new(config).with_semantic(Box::new(semantic));

        memory
            .process_interaction("t1", &[Message::user("first message here")], ContextSections::new())
            .unwrap();
        let (_, report) = memory
            .process_interaction_with_report("t1", &[Message::user("second")], ContextSections::new())
            .unwrap();

        assert_eq!(report.merges, 1);
        assert_eq!(memory.observations("t1").len(), 1);
        assert_eq!(
            *stored.lock().unwrap(),
            vec!["[user] first message here".to_string(), "[user] second".to_string()]
        );
    }

    struct CharCount;

    impl TokenEstimator for CharCount {
        fn name(&self) -> &'static str {
            "chars"
        }

        fn estimate(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn test_custom_estimator_drives_budget_and_stats() {
        let memory = UnifiedMemory::new(MemoryConfig::new().with_max_tokens(30))
            .with_estimator(Estimator::with_strategy(Box::new(CharCount), 0, 0));

        memory
            .process_interaction("t1", &[Message::user("abcdefghij")], ContextSections::new())
            .unwrap();
        let stats = memory.get_stats("t1").observational_memory;
        assert_eq!(stats.estimator, "chars");
        assert_eq!(stats.token_total, "[user] abcdefghij".len());

        let (_, report) = memory
            .process_interaction_with_report("t1", &[Message::user("klmnopqrst")], ContextSections::new())
            .unwrap();
        assert_eq!(report.merges, 1);
        assert_eq!(memory.observations("t1").len(), 1);
    }

    #[test]
    fn test_state_survives_reload() {
        let persistence = Arc::new(InMemoryStateStore::new());

        struct Shared(Arc<InMemoryStateStore>);
        impl StateStore for Shared {
            fn load(&self, thread_id: &str) -> anyhow::Result<Option<ThreadSnapshot>> {
                self.0.load(thread_id)
            }
            fn save(&self, snapshot: &ThreadSnapshot) -> anyhow::Result<()> {
                self.0.save(snapshot)
            }
            fn thread_ids(&self) -> anyhow::Result<Vec<String>> {
                self.0.thread_ids()
            }
        }

        let first = UnifiedMemory::new(MemoryConfig::new())
            .with_persistence(Box::new(Shared(Arc::clone(&persistence))));
        first
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();
        let context = first.get_context("t1");
        drop(first);

        let second = UnifiedMemory::new(MemoryConfig::new())
            .with_persistence(Box::new(Shared(Arc::clone(&persistence))));
        assert_eq!(second.thread_ids(), vec!["t1".to_string()]);
        assert_eq!(second.get_context("t1"), context);
        assert_eq!(second.get_stats("t1").observational_memory.messages_processed, 1);
    }

    #[test]
    fn test_persistence_failure_keeps_memory() {
        let memory = UnifiedMemory::new(MemoryConfig::new())
            .with_persistence(Box::new(BrokenStateStore));

        memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();

        assert_eq!(memory.observations("t1").len(), 1);
        assert_eq!(memory.thread_ids(), vec!["t1".to_string()]);
    }

    #[test]
    fn test_clear_resets_thread() {
        let memory = UnifiedMemory::new(MemoryConfig::new());
        memory
            .process_interaction("t1", &hello(), ContextSections::new())
            .unwrap();

        memory.clear("t1");

        assert_eq!(memory.get_context("t1"), NO_MEMORY);
        assert_eq!(memory.get_stats("t1").observational_memory.messages_processed, 0);
    }

    #[test]
    fn test_concurrent_callers_on_one_thread() {
        let memory = UnifiedMemory::new(MemoryConfig::new().with_max_tokens(200));

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let memory = &memory;
                scope.spawn(move || {
                    for turn in 0..25 {
                        let batch = vec![Message::user(format!("worker {} turn {}", worker, turn))];
                        memory
                            .process_interaction("shared", &batch, ContextSections::new())
                            .unwrap();
                    }
                });
            }
        });

        let stats = memory.get_stats("shared").observational_memory;
        assert_eq!(stats.messages_processed, 100);
        assert_eq!(stats.source_message_total, 100);
        assert!(stats.token_total <= 200 || stats.observation_count == 1);
    }
}
