use serde::{Deserialize, Serialize};

/// Labels attached to a rule for selection, e.g. `container`, `mitre_execution`.
/// Tags never take part in evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tags(pub Vec<String>);

impl Tags {
    /// Create new empty tags collection
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Check if any of the provided tags are present in this collection
    pub fn has_any(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.0.contains(tag))
    }

    /// Check for a single tag
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Add a tag, ignoring duplicates
    pub fn add(&mut self, tag: String) {
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tags
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        let mut out = Tags::new();
        tags.into_iter().for_each(|t| out.add(t));
        out
    }
}

impl From<&[&str]> for Tags {
    fn from(tags: &[&str]) -> Self {
        Self::from(tags.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }
}
