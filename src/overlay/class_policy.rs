/// Class filtering, label mapping and the session class registry
use std::collections::{HashMap, HashSet};
use log::debug;

use crate::error::ConfigError;

/// Class name -> dense index, in order of first appearance
///
/// Indices are never reassigned and the registry never shrinks, so a class keeps
/// its color for the lifetime of the session.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with known classes, in order
    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for class in classes {
            registry.get_or_insert(&class.into());
        }
        registry
    }

    pub fn get(&self, class_name: &str) -> Option<usize> {
        self.indices.get(class_name).copied()
    }

    /// Index of a class, appending it when unseen
    pub fn get_or_insert(&mut self, class_name: &str) -> usize {
        if let Some(&index) = self.indices.get(class_name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(class_name.to_string());
        self.indices.insert(class_name.to_string(), index);
        debug!("Registered class {:?} as index {}", class_name, index);
        index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(index, name)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, name)| (i, name.as_str()))
    }
}

/// Which classes are drawn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassFilter {
    #[default]
    All,
    /// Draw everything except these classes
    Ignore(HashSet<String>),
    /// Draw only these classes
    Only(HashSet<String>),
}

impl ClassFilter {
    /// Build the filter from the two optional name sets; both set is an error
    pub fn from_sets(
        ignore_names: Option<HashSet<String>>,
        not_ignore_names: Option<HashSet<String>>,
    ) -> Result<Self, ConfigError> {
        match (ignore_names, not_ignore_names) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingClassFilters),
            (Some(ignore), None) => Ok(ClassFilter::Ignore(ignore)),
            (None, Some(only)) => Ok(ClassFilter::Only(only)),
            (None, None) => Ok(ClassFilter::All),
        }
    }

    pub fn allows(&self, class_name: &str) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Ignore(names) => !names.contains(class_name),
            ClassFilter::Only(names) => names.contains(class_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClass {
    pub label: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ClassPolicy {
    name_mapping: HashMap<String, String>,
    filter: ClassFilter,
}

impl ClassPolicy {
    pub fn new(name_mapping: HashMap<String, String>, filter: ClassFilter) -> Self {
        Self { name_mapping, filter }
    }

    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    /// Display label for a class; unmapped classes display as themselves
    pub fn label_for<'a>(&'a self, class_name: &'a str) -> &'a str {
        self.name_mapping
            .get(class_name)
            .map(String::as_str)
            .unwrap_or(class_name)
    }

    /// Decide whether a box of `class_name` is drawn, and with which label and color index
    ///
    /// Suppressed classes return `None` and are not added to the registry.
    pub fn resolve(&self, class_name: &str, registry: &mut ClassRegistry) -> Option<ResolvedClass> {
        if !self.filter.allows(class_name) {
            return None;
        }
        let index = registry.get_or_insert(class_name);
        Some(ResolvedClass {
            label: self.label_for(class_name).to_string(),
            index,
        })
    }
}
