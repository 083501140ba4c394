//! Cache backend that fails on demand, for exercising degraded paths

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheBackend, CacheError, CacheResult, MemoryCache};

enum Op {
    Read,
    Write,
    Delete,
}

#[derive(Default)]
struct Faults {
    reads: Vec<String>,
    writes: Vec<String>,
    deletes: Vec<String>,
}

/// [`MemoryCache`] that times out for keys under the configured prefixes
#[derive(Clone, Default)]
pub struct FaultyCache {
    inner: MemoryCache,
    faults: Arc<Mutex<Faults>>,
}

impl FaultyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, prefix: &str) {
        self.faults.lock().unwrap().reads.push(prefix.to_owned());
    }

    pub fn fail_writes(&self, prefix: &str) {
        self.faults.lock().unwrap().writes.push(prefix.to_owned());
    }

    pub fn fail_deletes(&self, prefix: &str) {
        self.faults.lock().unwrap().deletes.push(prefix.to_owned());
    }

    pub fn heal(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }

    fn check(&self, op: Op, key: &str) -> CacheResult<()> {
        let faults = self.faults.lock().unwrap();
        let prefixes = match op {
            Op::Read => &faults.reads,
            Op::Write => &faults.writes,
            Op::Delete => &faults.deletes,
        };
        if prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())) {
            return Err(CacheError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FaultyCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check(Op::Read, key)?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check(Op::Write, key)?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check(Op::Delete, key)?;
        self.inner.delete(key).await
    }
}
