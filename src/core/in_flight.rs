use std::collections::HashSet;
use std::sync::Mutex;

use uuid::Uuid;

/// Tracks which ids currently have work running against them, so a second
/// attempt for the same id can be skipped and shutdown can wait for
/// drainage. Shared by the scheduler's backup dispatch and the daemon's
/// restore-job dispatch.
#[derive(Default)]
pub struct InFlightSet {
    ids: Mutex<HashSet<Uuid>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as started. Returns `false` (and leaves the set
    /// unchanged) if it was already in flight.
    pub fn start(&self, id: Uuid) -> bool {
        self.ids.lock().unwrap().insert(id)
    }

    pub fn finish(&self, id: Uuid) {
        self.ids.lock().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_for_the_same_id_is_rejected_until_finished() {
        let set = InFlightSet::new();
        let id = Uuid::new_v4();
        assert!(set.start(id));
        assert!(!set.start(id));
        assert_eq!(set.len(), 1);
        set.finish(id);
        assert!(set.is_empty());
        assert!(set.start(id));
    }
}
