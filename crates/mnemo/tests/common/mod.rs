#![allow(dead_code)]

use mnemo_core::{ContextSections, MemoryConfig, Message, UnifiedMemory};

pub fn sample_config(max_tokens: usize) -> MemoryConfig {
    MemoryConfig::new().with_max_tokens(max_tokens)
}

/// A user/assistant exchange of roughly `words` words per side
pub fn exchange(turn: usize, words: usize) -> Vec<Message> {
    let filler = vec!["token"; words.saturating_sub(2)].join(" ");
    vec![
        Message::user(format!("question {} {}", turn, filler)),
        Message::assistant(format!("answer {} {}", turn, filler)),
    ]
}

pub fn feed(memory: &UnifiedMemory, thread_id: &str, turns: usize, words: usize) -> String {
    let mut context = String::new();
    for turn in 0..turns {
        context = memory
            .process_interaction(thread_id, &exchange(turn, words), ContextSections::new())
            .unwrap();
    }
    context
}
