use std::collections::HashMap;
use std::sync::RwLock;

use crease_core::{BallId, Entity, ExpectedVersion, MatchId};
use crease_scoring::{BallEvent, MatchAggregate};

use super::r#trait::{BallStore, MatchStore, StoreError, StoredMatch};

/// In-memory match store.
///
/// Intended for tests/dev. The version check and the write happen under one
/// write lock, so two writers holding the same version cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    inner: RwLock<HashMap<MatchId, StoredMatch>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn get(&self, id: MatchId) -> Result<Option<StoredMatch>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("match store"))?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, aggregate: MatchAggregate, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("match store"))?;

        let id = aggregate.id_typed();
        let current = map.get(&id).map(|stored| stored.version);
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "match {id}: expected {expected:?}, found {current:?}"
            )));
        }

        let version = current.unwrap_or(0) + 1;
        map.insert(id, StoredMatch { aggregate, version });
        Ok(version)
    }

    fn delete(&self, id: MatchId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("match store"))?;
        Ok(map.remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<StoredMatch>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("match store"))?;
        let mut all: Vec<StoredMatch> = map.values().cloned().collect();
        all.sort_by_key(|stored| stored.aggregate.id_typed());
        Ok(all)
    }
}

/// In-memory ball store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBallStore {
    inner: RwLock<HashMap<BallId, BallEvent>>,
}

impl InMemoryBallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BallStore for InMemoryBallStore {
    fn get(&self, id: BallId) -> Result<Option<BallEvent>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("ball store"))?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, ball: BallEvent) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("ball store"))?;
        map.insert(*ball.id(), ball);
        Ok(())
    }

    fn delete(&self, id: BallId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("ball store"))?;
        Ok(map.remove(&id).is_some())
    }

    fn list_for_match(&self, match_id: MatchId) -> Result<Vec<BallEvent>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("ball store"))?;
        let mut balls: Vec<BallEvent> = map
            .values()
            .filter(|ball| ball.match_id() == match_id)
            .cloned()
            .collect();
        balls.sort_by_key(|ball| (ball.recorded_at(), ball.id_typed()));
        Ok(balls)
    }

    fn delete_for_match(&self, match_id: MatchId) -> Result<usize, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("ball store"))?;
        let before = map.len();
        map.retain(|_, ball| ball.match_id() != match_id);
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crease_scoring::BallDetails;

    fn ball(match_id: MatchId, runs: u32) -> BallEvent {
        BallEvent::record(match_id, BallDetails::new(runs, "A", "B", "X", false), Utc::now())
            .unwrap()
    }

    #[test]
    fn versions_advance_and_stale_writes_are_rejected() {
        let store = InMemoryMatchStore::new();
        let id = MatchId::new();

        let v1 = store
            .save(MatchAggregate::empty(id, Utc::now()), ExpectedVersion::NoAggregate)
            .unwrap();
        assert_eq!(v1, 1);

        let err = store
            .save(MatchAggregate::empty(id, Utc::now()), ExpectedVersion::NoAggregate)
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let v2 = store
            .save(MatchAggregate::empty(id, Utc::now()), ExpectedVersion::Exact(1))
            .unwrap();
        assert_eq!(v2, 2);

        let err = store
            .save(MatchAggregate::empty(id, Utc::now()), ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(store.get(id).unwrap().unwrap().version, 2);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let store = InMemoryMatchStore::new();
        let id = MatchId::new();
        store.save(MatchAggregate::empty(id, Utc::now()), ExpectedVersion::Any).unwrap();

        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert!(store.get(id).unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn balls_are_scoped_to_their_match() {
        let store = InMemoryBallStore::new();
        let ours = MatchId::new();
        let theirs = MatchId::new();

        let first = ball(ours, 1);
        let second = ball(ours, 2);
        store.save(first.clone()).unwrap();
        store.save(second.clone()).unwrap();
        store.save(ball(theirs, 3)).unwrap();

        let listed = store.list_for_match(ours).unwrap();
        assert_eq!(listed, vec![first.clone(), second]);

        assert_eq!(store.delete_for_match(ours).unwrap(), 2);
        assert!(store.get(first.id_typed()).unwrap().is_none());
        assert_eq!(store.list_for_match(theirs).unwrap().len(), 1);
    }
}
