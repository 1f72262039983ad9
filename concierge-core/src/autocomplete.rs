use crate::airport::{AirportDirectory, AirportRecord};

pub const MAX_SUGGESTIONS: usize = 8;
pub const MIN_QUERY_CHARS: usize = 2;

/// Directory entries matching `query`, in directory order, capped at
/// [`MAX_SUGGESTIONS`].
pub fn suggest<'a>(directory: &'a AirportDirectory, query: &str) -> Vec<&'a AirportRecord> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    directory
        .records()
        .iter()
        .filter(|record| record.matches(&needle))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Where a document-level click landed, relative to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickArea<K> {
    Input(K),
    Suggestions(K),
    Elsewhere,
}

/// A text input bound to the airport directory plus its suggestion list.
#[derive(Debug, Clone)]
pub struct AutocompleteField<K> {
    key: K,
    value: String,
    suggestions: Vec<AirportRecord>,
}

impl<K: Copy + PartialEq> AutocompleteField<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            value: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn key(&self) -> K {
        self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn suggestions(&self) -> &[AirportRecord] {
        &self.suggestions
    }

    pub fn is_open(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub fn on_input(&mut self, directory: &AirportDirectory, text: &str) -> &[AirportRecord] {
        self.value = text.to_string();
        self.suggestions = suggest(directory, text).into_iter().cloned().collect();
        &self.suggestions
    }

    /// Writes the chosen airport's code into the input and closes the list.
    pub fn pick(&mut self, index: usize) -> Option<&str> {
        let record = self.suggestions.get(index)?;
        self.value = record.iata.clone();
        self.suggestions.clear();
        Some(&self.value)
    }

    /// Closes the list unless the click hit this field's input or list.
    pub fn on_document_click(&mut self, target: ClickArea<K>) {
        let inside = match target {
            ClickArea::Input(k) | ClickArea::Suggestions(k) => k == self.key,
            ClickArea::Elsewhere => false,
        };
        if !inside {
            self.suggestions.clear();
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.suggestions.clear();
    }
}
