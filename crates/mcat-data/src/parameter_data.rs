//! Ordered per-parameter column storage.

use mcat_core::Value;

/// One fetched column: one cell per stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// A dependent parameter's columns: the parameter first, then its
/// dependencies in declared order. Empty when nothing was stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTree {
    columns: Vec<Column>,
}

impl ParameterTree {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of fetched rows.
    pub fn len(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// True when the fetch returned no rows and so no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Requested parameter name -> its [`ParameterTree`], in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterData {
    entries: Vec<(String, ParameterTree)>,
}

impl ParameterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterTree> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tree)| tree)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterTree)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Insert or replace one entry.
    pub fn insert(&mut self, name: impl Into<String>, tree: ParameterTree) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = tree,
            None => self.entries.push((name, tree)),
        }
    }

    /// Add the entries of `other` that are not already present. Existing
    /// entries are kept as they are.
    pub fn merge(&mut self, other: ParameterData) {
        for (name, tree) in other.entries {
            if !self.contains(&name) {
                self.entries.push((name, tree));
            }
        }
    }

    /// Entries for `names`, in that order. Names that are not present are skipped.
    pub fn select(&self, names: &[String]) -> ParameterData {
        let entries = names
            .iter()
            .filter_map(|n| self.get(n).map(|t| (n.clone(), t.clone())))
            .collect();
        ParameterData { entries }
    }
}

impl FromIterator<(String, ParameterTree)> for ParameterData {
    fn from_iter<I: IntoIterator<Item = (String, ParameterTree)>>(iter: I) -> Self {
        let mut data = ParameterData::new();
        for (name, tree) in iter {
            data.insert(name, tree);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(name: &str, values: &[f64]) -> ParameterTree {
        ParameterTree::new(vec![Column {
            name: name.to_string(),
            values: values.iter().map(|v| Value::from(*v)).collect(),
        }])
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let mut cache = ParameterData::new();
        cache.insert("a", tree("a", &[1.0]));

        let mut fetched = ParameterData::new();
        fetched.insert("a", tree("a", &[9.0, 9.0]));
        fetched.insert("b", tree("b", &[2.0]));
        cache.merge(fetched);

        assert_eq!(cache.names(), vec!["a", "b"]);
        assert_eq!(cache.get("a").unwrap().len(), 1);
    }

    #[test]
    fn select_follows_request_order() {
        let data: ParameterData = vec![
            ("a".to_string(), tree("a", &[1.0])),
            ("b".to_string(), tree("b", &[2.0])),
        ]
        .into_iter()
        .collect();
        let picked = data.select(&["b".to_string(), "missing".to_string(), "a".to_string()]);
        assert_eq!(picked.names(), vec!["b", "a"]);
    }
}
