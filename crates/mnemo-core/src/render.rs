//! Context rendering for the downstream agent

use crate::types::Observation;

/// Returned when a thread has nothing to show
pub const NO_MEMORY: &str = "No memory available.";

/// Heading of the observation section
pub const MEMORY_SECTION: &str = "Conversation Memory";

/// Ordered named context fragments appended after the observations.
///
/// Entries with an empty name or blank text are dropped on insert; inserting
/// an existing name replaces its text in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSections {
    sections: Vec<(String, String)>,
}

impl ContextSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        if name.trim().is_empty() || text.trim().is_empty() {
            return;
        }
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = text,
            None => self.sections.push((name, text)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl<N, T> FromIterator<(N, T)> for ContextSections
where
    N: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut sections = Self::new();
        for (name, text) in iter {
            sections.insert(name, text);
        }
        sections
    }
}

/// `semantic_recall` -> `Semantic Recall`
pub fn title_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render observations (oldest first) followed by the extra sections
pub fn render_context(observations: &[Observation], extras: &ContextSections) -> String {
    let mut blocks = Vec::new();

    let memory: Vec<&str> = observations
        .iter()
        .map(|o| o.content().trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !memory.is_empty() {
        blocks.push(format!("## {}\n{}", MEMORY_SECTION, memory.join("\n\n")));
    }

    for (name, text) in extras.iter() {
        blocks.push(format!("## {}\n{}", title_case(name), text.trim()));
    }

    if blocks.is_empty() {
        NO_MEMORY.to_string()
    } else {
        blocks.join("\n\n")
    }
}
