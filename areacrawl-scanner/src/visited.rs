use std::collections::HashMap;

/// Per-run record of the uids whose children were already requested,
/// with how many times each uid has been seen.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    seen: HashMap<String, usize>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an occurrence of `uid`. Returns true only for the first one.
    pub fn mark(&mut self, uid: &str) -> bool {
        match self.seen.get_mut(uid) {
            Some(count) => {
                *count += 1;
                false
            }
            None => {
                self.seen.insert(uid.to_string(), 1);
                true
            }
        }
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.seen.contains_key(uid)
    }

    pub fn count(&self, uid: &str) -> usize {
        self.seen.get(uid).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
