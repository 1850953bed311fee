use std::collections::HashSet;

/// Keys of the currently selected rows, in the order they were selected.
#[derive(Clone, Debug, Default)]
pub struct SelectionSet {
    order: Vec<String>,
    keys: HashSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make membership of `key` follow `selected`. Returns whether anything
    /// changed.
    pub fn sync(&mut self, key: &str, selected: bool) -> bool {
        if selected {
            if self.keys.insert(key.to_string()) {
                self.order.push(key.to_string());
                return true;
            }
            false
        } else {
            self.remove(key)
        }
    }

    /// Flip membership of `key`; returns the new membership.
    pub fn toggle(&mut self, key: &str) -> bool {
        let selected = !self.contains(key);
        self.sync(key, selected);
        selected
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            self.order.retain(|k| k != key);
            return true;
        }
        false
    }

    pub fn retain<F>(&mut self, keep: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        let before = self.order.len();
        self.order.retain(|key| keep(key));
        if self.order.len() == before {
            return false;
        }
        self.keys = self.order.iter().cloned().collect();
        true
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.keys.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn has_selection(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.order
    }
}
