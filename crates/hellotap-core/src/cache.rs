use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::fingerprint::{ClientHello, DecodeError, FingerprintEngine, FingerprintKind};

struct Entry {
    fingerprint: String,
    lease: u64,
}

/// Client address (`host:port`) to fingerprint, shared by every interceptor
/// of a process.
///
/// Writers are serialized against all readers; readers run concurrently.
/// Decoding and hashing happen before the write lock is taken. Entries are
/// never evicted except by [`clear`](Self::clear) or connection close.
pub struct FingerprintCache {
    engine: Arc<dyn FingerprintEngine>,
    entries: RwLock<HashMap<String, Entry>>,
    next_lease: AtomicU64,
}

impl FingerprintCache {
    pub fn new(engine: Arc<dyn FingerprintEngine>) -> Self {
        Self {
            engine,
            entries: RwLock::new(HashMap::new()),
            next_lease: AtomicU64::new(1),
        }
    }

    pub fn with_kind(kind: FingerprintKind) -> Self {
        Self::new(kind.engine())
    }

    pub fn engine(&self) -> &dyn FingerprintEngine {
        self.engine.as_ref()
    }

    /// Decode `record`, fingerprint it and store the result under `addr`,
    /// replacing any previous entry. On a decode error nothing is written.
    pub fn set(&self, addr: &str, record: &[u8]) -> Result<ClientHello, DecodeError> {
        self.insert(addr, record).map(|(hello, _)| hello)
    }

    pub fn get(&self, addr: &str) -> Option<String> {
        self.entries
            .read()
            .get(addr)
            .map(|entry| entry.fingerprint.clone())
    }

    /// Remove the entry for `addr`. Clearing an absent address is a no-op.
    pub fn clear(&self, addr: &str) {
        self.entries.write().remove(addr);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn insert(&self, addr: &str, record: &[u8]) -> Result<(ClientHello, u64), DecodeError> {
        let hello = self.engine.decode(record)?;
        let fingerprint = self.engine.fingerprint(&hello);
        let lease = self.next_lease.fetch_add(1, Ordering::Relaxed);

        self.entries
            .write()
            .insert(addr.to_string(), Entry { fingerprint, lease });
        Ok((hello, lease))
    }

    /// Remove `addr` only if it still holds the entry written under `lease`.
    fn release(&self, addr: &str, lease: u64) -> bool {
        let mut entries = self.entries.write();
        match entries.get(addr) {
            Some(entry) if entry.lease == lease => {
                entries.remove(addr);
                true
            }
            _ => false,
        }
    }

    /// Like [`set`](Self::set), but the entry is tied to the returned
    /// [`Lease`]: dropping the lease removes the entry unless a newer `set`
    /// for the same address has replaced it in the meantime.
    pub(crate) fn lease(
        self: &Arc<Self>,
        addr: &str,
        record: &[u8],
        owner: &Arc<LeaseSet>,
    ) -> Result<(ClientHello, Lease), DecodeError> {
        let (hello, id) = self.insert(addr, record)?;
        owner.open.lock().insert(id, addr.to_string());
        let lease = Lease {
            cache: Arc::clone(self),
            owner: Arc::clone(owner),
            addr: addr.to_string(),
            id,
        };
        Ok((hello, lease))
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::with_kind(FingerprintKind::default())
    }
}

/// Entries handed out by one interceptor that are still held by open connections.
#[derive(Default)]
pub(crate) struct LeaseSet {
    open: Mutex<HashMap<u64, String>>,
}

impl LeaseSet {
    /// Release every outstanding lease. Returns how many entries were removed.
    pub(crate) fn release_all(&self, cache: &FingerprintCache) -> usize {
        let drained: Vec<(u64, String)> = self.open.lock().drain().collect();
        drained
            .into_iter()
            .filter(|(id, addr)| cache.release(addr, *id))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.open.lock().len()
    }
}

/// Keeps one cache entry alive for as long as its connection is open.
pub struct Lease {
    cache: Arc<FingerprintCache>,
    owner: Arc<LeaseSet>,
    addr: String,
    id: u64,
}

impl Lease {
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn fingerprint(&self) -> Option<String> {
        self.cache.get(&self.addr)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.owner.open.lock().remove(&self.id);
        if self.cache.release(&self.addr, self.id) {
            debug!(peer = %self.addr, "released fingerprint");
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("addr", &self.addr)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::ja3::ja3;
    use crate::testing::HelloSpec;

    const ADDR: &str = "1.2.3.4:50000";

    fn expected(spec: &HelloSpec) -> String {
        let hello = crate::fingerprint::decode_client_hello(&spec.record()).unwrap();
        ja3(&hello).hash
    }

    #[test]
    fn set_then_get_is_stable() {
        let cache = FingerprintCache::default();
        let spec = HelloSpec::default();
        let hello = cache.set(ADDR, &spec.record()).unwrap();

        assert_eq!(hello.server_name.as_deref(), Some("example.com"));
        for _ in 0..3 {
            assert_eq!(cache.get(ADDR), Some(expected(&spec)));
        }
    }

    #[test]
    fn unknown_address_is_absent() {
        let cache = FingerprintCache::default();
        cache.set(ADDR, &HelloSpec::default().record()).unwrap();
        assert_eq!(cache.get("1.2.3.4:50001"), None);
        assert_eq!(cache.get("5.6.7.8:50000"), None);
    }

    #[test]
    fn later_set_overwrites() {
        let cache = FingerprintCache::default();
        let second = HelloSpec {
            ciphers: vec![0xc02b, 0xc02f, 0xcca9],
            ..Default::default()
        };
        cache.set(ADDR, &HelloSpec::default().record()).unwrap();
        cache.set(ADDR, &second.record()).unwrap();

        assert_eq!(cache.get(ADDR), Some(expected(&second)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let cache = FingerprintCache::default();
        cache.set(ADDR, &HelloSpec::default().record()).unwrap();

        cache.clear(ADDR);
        cache.clear(ADDR);
        cache.clear("never-set:1");
        assert_eq!(cache.get(ADDR), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn decode_error_writes_nothing() {
        let cache = FingerprintCache::default();
        let err = cache.set(ADDR, &[0x16, 0x03, 0x01, 0x00, 0x02, 0x01, 0x00]);
        assert!(err.is_err());
        assert_eq!(cache.get(ADDR), None);
    }

    #[test]
    fn ja4_cache_stores_ja4_strings() {
        let cache = FingerprintCache::with_kind(FingerprintKind::Ja4);
        cache.set(ADDR, &HelloSpec::default().record()).unwrap();
        assert_eq!(
            cache.get(ADDR).as_deref(),
            Some("t13d0306h2_55b375c5d22e_fb71836bce29")
        );
        assert_eq!(cache.engine().name(), "ja4");
    }

    #[test]
    fn concurrent_sets_on_distinct_addresses_stay_isolated() {
        let cache = FingerprintCache::default();
        let specs: Vec<(String, Vec<u8>, String)> = (0..8u16)
            .map(|i| {
                let spec = HelloSpec {
                    ciphers: vec![0x1301, 0xc000 + i],
                    ..Default::default()
                };
                (format!("10.0.0.{}:443", i), spec.record(), expected(&spec))
            })
            .collect();

        std::thread::scope(|s| {
            for (addr, record, _) in &specs {
                let cache = &cache;
                s.spawn(move || {
                    for _ in 0..200 {
                        cache.set(addr, record).unwrap();
                        cache.get(addr).unwrap();
                    }
                });
            }
        });

        assert_eq!(cache.len(), specs.len());
        for (addr, _, fingerprint) in &specs {
            assert_eq!(cache.get(addr).as_ref(), Some(fingerprint));
        }
    }

    #[test]
    fn dropping_lease_removes_entry() {
        let cache = Arc::new(FingerprintCache::default());
        let owner = Arc::new(LeaseSet::default());
        let (_, lease) = cache.lease(ADDR, &HelloSpec::default().record(), &owner).unwrap();

        assert_eq!(lease.fingerprint(), cache.get(ADDR));
        assert_eq!(owner.len(), 1);
        drop(lease);
        assert_eq!(cache.get(ADDR), None);
        assert_eq!(owner.len(), 0);
    }

    #[test]
    fn stale_lease_leaves_newer_entry() {
        let cache = Arc::new(FingerprintCache::default());
        let owner = Arc::new(LeaseSet::default());
        let newer = HelloSpec {
            ciphers: vec![0xc02b],
            ..Default::default()
        };

        let (_, old) = cache.lease(ADDR, &HelloSpec::default().record(), &owner).unwrap();
        let (_, _new) = cache.lease(ADDR, &newer.record(), &owner).unwrap();
        drop(old);

        assert_eq!(cache.get(ADDR), Some(expected(&newer)));
    }

    #[test]
    fn release_all_only_touches_its_own_leases() {
        let cache = Arc::new(FingerprintCache::default());
        let owner = Arc::new(LeaseSet::default());
        let record = HelloSpec::default().record();

        let (_, a) = cache.lease("10.0.0.1:1000", &record, &owner).unwrap();
        let (_, b) = cache.lease("10.0.0.2:1000", &record, &owner).unwrap();
        cache.set("10.0.0.3:1000", &record).unwrap();

        assert_eq!(owner.release_all(&cache), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("10.0.0.3:1000").is_some());

        // Leases outliving the release are harmless.
        drop(a);
        drop(b);
        assert_eq!(cache.len(), 1);
    }
}
