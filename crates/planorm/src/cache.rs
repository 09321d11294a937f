//! Shape-keyed plan cache and the registry that owns it.
//!
//! A shape signature is a plain string built per call into a pooled buffer:
//!
//! ```text
//! <file>:<line>:<col>|<op>|<table>|<use name>|<destination or source>|<clause kind>:<clause sql>|...
//! ```
//!
//! Calls that differ only in bound values render the same signature. The table name and the
//! naming flag are part of it, so one call expression serving several tables keeps one plan
//! per table. Lookups borrow the
//! signature as `&str`, so a hit allocates nothing.

use crate::clause::Clause;
use crate::config::RegistryConfig;
use crate::plan::{CompiledPlan, Operation};
use crate::pool::BufferPool;
use crate::record::{Record, RecordShape};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Write the call-site, operation and table prefix of a signature.
pub(crate) fn write_call_site(
    out: &mut String,
    site: &Location<'_>,
    op: Operation,
    table: &str,
    use_name_when_tag_empty: bool,
) {
    let _ = write!(
        out,
        "{}:{}:{}|{}|{}|{}|",
        site.file(),
        site.line(),
        site.column(),
        op.as_str(),
        table,
        u8::from(use_name_when_tag_empty)
    );
}

/// Append each clause's kind and rendered SQL.
pub(crate) fn write_clauses(out: &mut String, clauses: &[Clause]) {
    for clause in clauses {
        out.push('|');
        out.push_str(clause.kind().as_str());
        out.push(':');
        clause.emit_sql(out);
    }
}

struct CacheInner {
    capacity: Option<usize>,
    map: HashMap<Box<str>, (Arc<CompiledPlan>, u64)>,
    generation: u64,
}

impl CacheInner {
    fn evict(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        if capacity == 0 {
            self.map.clear();
            return;
        }

        while self.map.len() > capacity {
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, (_, last_access))| *last_access)
                .map(|(k, _)| k.clone());

            match oldest {
                Some(key) => {
                    self.map.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Signature → plan map with optional least-recently-used eviction.
///
/// Touching an entry bumps a generation counter; eviction scans for the smallest one.
pub struct ShapeCache {
    inner: Mutex<CacheInner>,
}

impl ShapeCache {
    /// `None` keeps every plan.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                capacity,
                map: HashMap::new(),
                generation: 0,
            }),
        }
    }

    pub fn get(&self, signature: &str) -> Option<Arc<CompiledPlan>> {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let generation = inner.generation;
        let entry = inner.map.get_mut(signature)?;
        entry.1 = generation;
        Some(Arc::clone(&entry.0))
    }

    /// Store a plan. A concurrent compile of the same signature may have stored first; the
    /// later write replaces it.
    pub fn insert(&self, signature: &str, plan: Arc<CompiledPlan>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.generation += 1;
        let generation = inner.generation;
        if let Some(entry) = inner.map.get_mut(signature) {
            *entry = (plan, generation);
            return;
        }
        inner.map.insert(Box::from(signature), (plan, generation));
        inner.evict();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().map.clear();
    }
}

impl std::fmt::Debug for ShapeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ShapeCache")
            .field("capacity", &inner.capacity)
            .field("len", &inner.map.len())
            .finish()
    }
}

/// Snapshot of registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Plans currently cached.
    pub plans: usize,
    /// Record shapes resolved so far.
    pub shapes: usize,
}

/// Process-wide (or explicitly shared) state behind every [`Table`](crate::Table): compiled
/// plans, resolved record shapes and scratch buffers.
#[derive(Debug)]
pub struct PlanRegistry {
    plans: ShapeCache,
    shapes: RwLock<HashMap<TypeId, Arc<RecordShape>>>,
    pool: BufferPool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for PlanRegistry {
    fn default() -> Self {
        Self::with_config(&RegistryConfig::default())
    }
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            plans: ShapeCache::new(config.plan_capacity),
            shapes: RwLock::new(HashMap::new()),
            pool: BufferPool::new(config.max_idle_buffers),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The registry tables use unless given another one.
    pub fn global() -> Arc<PlanRegistry> {
        static GLOBAL: OnceLock<Arc<PlanRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PlanRegistry::new())))
    }

    /// Resolved shape of `R`, built on first use.
    pub fn shape_of<R: Record>(&self) -> Arc<RecordShape> {
        let id = TypeId::of::<R>();
        if let Some(shape) = self.shapes.read().get(&id) {
            return Arc::clone(shape);
        }
        let mut shapes = self.shapes.write();
        Arc::clone(
            shapes
                .entry(id)
                .or_insert_with(|| Arc::new(RecordShape::of::<R>())),
        )
    }

    /// Look up a plan, counting the hit or miss.
    pub fn lookup(&self, signature: &str) -> Option<Arc<CompiledPlan>> {
        let found = self.plans.get(signature);
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn store(&self, signature: &str, plan: CompiledPlan) -> Arc<CompiledPlan> {
        let plan = Arc::new(plan);
        self.plans.insert(signature, Arc::clone(&plan));
        plan
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            plans: self.plans.len(),
            shapes: self.shapes.read().len(),
        }
    }

    /// Drop every plan and shape and reset the counters.
    pub fn clear(&self) {
        self.plans.clear();
        self.shapes.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}
