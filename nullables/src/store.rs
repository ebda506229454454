//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokengate_store::{
    BindingStore, ConsumeOutcome, EntitlementRule, RuleStore, SessionStore, StoreError,
    VerificationSession, VerifiedBinding,
};
use tokengate_types::{SessionId, SubjectId, Timestamp};

#[derive(Default)]
struct State {
    sessions: HashMap<SessionId, VerificationSession>,
    bindings: BTreeMap<SubjectId, VerifiedBinding>,
    rules: BTreeMap<u64, EntitlementRule>,
    next_rule_id: u64,
}

/// An in-memory session + binding + rule store for testing.
///
/// All tables sit behind one mutex, so `consume_and_bind` is atomic the same
/// way a single LMDB write transaction is.
pub struct NullStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    read_latency_ms: AtomicU64,
    write_latency_ms: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            unavailable: AtomicBool::new(false),
            read_latency_ms: AtomicU64::new(0),
            write_latency_ms: AtomicU64::new(0),
        }
    }

    /// Block the calling thread this long before every read.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Block the calling thread this long before every write, like a
    /// writer queued behind LMDB's write lock.
    pub fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Seed a binding directly, bypassing verification.
    pub fn insert_binding(&self, binding: VerifiedBinding) {
        self.state
            .lock()
            .unwrap()
            .bindings
            .insert(binding.subject_id.clone(), binding);
    }

    fn read(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        Self::stall(&self.read_latency_ms);
        self.lock()
    }

    fn write(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        Self::stall(&self.write_latency_ms);
        self.lock()
    }

    fn stall(latency_ms: &AtomicU64) {
        let ms = latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store switched off".into()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("null store mutex poisoned".into()))
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for NullStore {
    fn create_session(
        &self,
        subject_id: &SubjectId,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<VerificationSession, StoreError> {
        let session = VerificationSession {
            session_id: SessionId::generate(),
            subject_id: subject_id.clone(),
            created_at,
            expires_at,
        };
        self.write()?
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<VerificationSession>, StoreError> {
        Ok(self.read()?.sessions.get(session_id).cloned())
    }

    fn consume_and_bind(
        &self,
        session_id: &SessionId,
        binding: &VerifiedBinding,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut state = self.write()?;
        if state.sessions.remove(session_id).is_none() {
            return Ok(ConsumeOutcome::Missing);
        }
        let merged = binding
            .clone()
            .superseding(state.bindings.get(&binding.subject_id));
        state.bindings.insert(merged.subject_id.clone(), merged);
        Ok(ConsumeOutcome::Consumed)
    }

    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - state.sessions.len())
    }
}

impl BindingStore for NullStore {
    fn get_binding(&self, subject_id: &SubjectId) -> Result<Option<VerifiedBinding>, StoreError> {
        Ok(self.read()?.bindings.get(subject_id).cloned())
    }

    fn list_bindings(&self) -> Result<Vec<VerifiedBinding>, StoreError> {
        Ok(self.read()?.bindings.values().cloned().collect())
    }

    fn record_sync(&self, subject_id: &SubjectId, at: Timestamp) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let binding = state
            .bindings
            .get_mut(subject_id)
            .ok_or_else(|| StoreError::NotFound(subject_id.to_string()))?;
        binding.last_sync_at = Some(at);
        Ok(())
    }
}

impl RuleStore for NullStore {
    fn list_rules(&self) -> Result<Vec<EntitlementRule>, StoreError> {
        Ok(self.read()?.rules.values().cloned().collect())
    }

    fn add_rule(&self, mut rule: EntitlementRule) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        state.next_rule_id += 1;
        rule.id = state.next_rule_id;
        state.rules.insert(rule.id, rule);
        Ok(state.next_rule_id)
    }

    fn remove_rule(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.write()?.rules.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokengate_types::WalletAddress;

    fn subject() -> SubjectId {
        SubjectId::new("1001").unwrap()
    }

    #[test]
    fn consume_is_single_use() {
        let store = NullStore::new();
        let s = store
            .create_session(&subject(), Timestamp::new(0), Timestamp::new(600))
            .unwrap();
        let b = VerifiedBinding::new(subject(), WalletAddress::new("WalletA"));
        assert_eq!(store.consume_and_bind(&s.session_id, &b).unwrap(), ConsumeOutcome::Consumed);
        assert_eq!(store.consume_and_bind(&s.session_id, &b).unwrap(), ConsumeOutcome::Missing);
        assert_eq!(store.get_binding(&subject()).unwrap(), Some(b));
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = NullStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.list_bindings(), Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.list_bindings().unwrap().is_empty());
    }

    #[test]
    fn write_latency_leaves_reads_fast() {
        let store = NullStore::new();
        store.set_write_latency(Duration::from_millis(200));
        let started = std::time::Instant::now();
        store.list_bindings().unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
        store.purge_expired(Timestamp::new(0)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
