use crate::{Context, Result};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt::{self, Debug},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

struct CachedPrepared<P> {
    prepared: Arc<P>,
    last_touched: Instant,
}

type EvictionHook<P> = Box<dyn Fn(&str, &P) + Send + Sync>;

/// Time bounded cache of compiled statements, keyed by the literal query text.
///
/// Every `get`/`set` refreshes the entry, entries idle for longer than the TTL
/// are evicted either lazily by `get` or by the background [`Sweeper`].
/// Handles are reference counted: evicting an entry while a caller is still
/// using it defers the release (the `Drop` of `P`) to that caller, so each
/// handle is released exactly once.
///
/// The index is guarded by a mutex which is never held while a handle is
/// compiled, executed or released.
pub struct PreparedCache<P> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPrepared<P>>>,
    stats: CacheStats,
    on_evict: Option<EvictionHook<P>>,
}

impl<P> PreparedCache<P> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Default::default(),
            stats: Default::default(),
            on_evict: None,
        }
    }

    /// Called with every entry removed from the cache, right before its handle is dropped.
    pub fn on_evict(mut self, hook: impl Fn(&str, &P) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(hook));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tick of the background sweep: half the TTL, between 10ms and 1s.
    pub fn sweep_interval(&self) -> Duration {
        (self.ttl / 2).clamp(Duration::from_millis(10), Duration::from_secs(1))
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, query: &str) -> bool {
        self.entries.lock().contains_key(query)
    }

    fn is_expired(&self, entry: &CachedPrepared<P>, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_touched) > self.ttl
    }

    /// Returns the live handle for `query`, refreshing it.
    pub fn get(&self, query: &str) -> Option<Arc<P>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(query) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.last_touched = now;
                self.stats.record_hit();
                return Some(entry.prepared.clone());
            }
            _ => {}
        }
        let expired = entries.remove_entry(query);
        drop(entries);
        self.stats.record_miss();
        if let Some((query, entry)) = expired {
            self.release(vec![(query, entry.prepared)]);
        }
        None
    }

    /// Stores `prepared` unless another handle for `query` is already live.
    ///
    /// Returns the handle that ended up in the cache, a rejected one is dropped.
    pub fn set(&self, query: impl Into<String>, prepared: P) -> Arc<P> {
        let now = Instant::now();
        let (live, rejected) = {
            let mut entries = self.entries.lock();
            match entries.entry(query.into()) {
                Entry::Occupied(mut entry) => {
                    let entry = entry.get_mut();
                    entry.last_touched = now;
                    (entry.prepared.clone(), Some(prepared))
                }
                Entry::Vacant(entry) => {
                    let prepared = Arc::new(prepared);
                    entry.insert(CachedPrepared {
                        prepared: prepared.clone(),
                        last_touched: now,
                    });
                    self.stats.record_insert();
                    (prepared, None)
                }
            }
        };
        drop(rejected);
        live
    }

    /// Evicts the entries idle past the TTL, returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.entries.lock().retain(|query, entry| {
            if self.is_expired(entry, now) {
                expired.push((query.clone(), entry.prepared.clone()));
                false
            } else {
                true
            }
        });
        let count = expired.len();
        self.release(expired);
        count
    }

    /// Evicts every entry before returning.
    pub fn destroy(&self) {
        let all = self
            .entries
            .lock()
            .drain()
            .map(|(query, entry)| (query, entry.prepared))
            .collect();
        self.release(all);
    }

    fn release(&self, evicted: Vec<(String, Arc<P>)>) {
        for (query, prepared) in evicted {
            self.stats.record_eviction();
            if let Some(hook) = &self.on_evict {
                hook(&query, &prepared);
            }
            drop(prepared);
        }
    }
}

impl<P: Send + Sync + 'static> PreparedCache<P> {
    /// Starts the background thread evicting expired entries every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Result<Sweeper> {
        let (stop, stopped) = flume::bounded::<()>(1);
        let cache = self.clone();
        let handle = thread::Builder::new()
            .name("tabula-sweeper".into())
            .spawn(move || {
                log::debug!("Statement cache sweeper started, ticking every {:?}", interval);
                while let Err(flume::RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                    let evicted = cache.evict_expired();
                    if evicted > 0 {
                        log::debug!("Evicted {} expired statements", evicted);
                    }
                }
                log::debug!("Statement cache sweeper stopped");
            })
            .context("Could not spawn the statement cache sweeper thread")?;
        Ok(Sweeper {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl<P> Debug for PreparedCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Handle of the background sweep thread, stopping it joins the thread.
#[derive(Debug)]
pub struct Sweeper {
    stop: Option<flume::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes the thread up
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("The statement cache sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Counters of the cache operations.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of handles stored, that is the number of compilations kept.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            inserts: self.inserts(),
            evictions: self.evictions(),
        }
    }
}

/// Point in time copy of [`CacheStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}
