//! Domain decision tree: preferred solvers per problem domain and size.

use optiroute_kernel::problem::SizeClass;
use std::collections::{BTreeMap, HashMap};

/// Maps a domain (e.g. `"scheduling"`) and size class to an ordered list
/// of preferred solvers.
///
/// Lookup normalizes the domain (trimmed, lowercase, `-`/space to `_`). An
/// exact key wins; otherwise the longest key contained in the domain is
/// used, so `"production_scheduling"` falls back to a `"scheduling"` entry.
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    entries: HashMap<String, BTreeMap<SizeClass, Vec<String>>>,
}

fn normalize(domain: &str) -> String {
    domain.trim().to_lowercase().replace(['-', ' '], "_")
}

impl DecisionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str, size: SizeClass, solvers: Vec<String>) {
        self.entries
            .entry(normalize(domain))
            .or_default()
            .insert(size, solvers);
    }

    /// Same preference list for each of `sizes`.
    pub fn with_entry(mut self, domain: &str, sizes: &[SizeClass], solvers: &[&str]) -> Self {
        for size in sizes {
            self.insert(
                domain,
                *size,
                solvers.iter().map(|s| s.to_string()).collect(),
            );
        }
        self
    }

    pub fn preferred(&self, domain: &str, size: SizeClass) -> Option<&[String]> {
        let domain = normalize(domain);
        if let Some(list) = self.entries.get(&domain).and_then(|by_size| by_size.get(&size)) {
            return Some(list.as_slice());
        }
        self.entries
            .iter()
            .filter(|(key, by_size)| domain.contains(key.as_str()) && by_size.contains_key(&size))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .and_then(|(_, by_size)| by_size.get(&size))
            .map(Vec::as_slice)
    }

    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        domains.sort();
        domains
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
