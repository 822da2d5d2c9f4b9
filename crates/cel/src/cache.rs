use std::sync::Arc;

use moka::sync::Cache;

use crate::error::CelError;
use crate::program::Program;

/// Default bound on the number of cached compiled programs.
pub const DEFAULT_CAPACITY: u64 = 1000;

/// A bounded LRU of compiled programs keyed by expression text.
///
/// Rule evaluation compiles each distinct expression once; subsequent
/// routing calls reuse the cached [`Program`]. Compile failures are not
/// cached, so a rule fixed in place recovers immediately.
#[derive(Debug, Clone)]
pub struct ProgramCache {
    programs: Cache<String, Arc<Program>>,
}

impl ProgramCache {
    /// A cache bounded at [`DEFAULT_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A cache bounded at `capacity` entries; least-recently-used
    /// entries are evicted on insert overflow.
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            programs: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Fetch the compiled program for `source`, compiling on miss.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Program>, CelError> {
        if let Some(program) = self.programs.get(source) {
            return Ok(program);
        }
        let program = Arc::new(Program::compile(source)?);
        self.programs.insert(source.to_owned(), Arc::clone(&program));
        Ok(program)
    }

    /// Number of cached programs (approximate under concurrency).
    #[must_use]
    pub fn len(&self) -> u64 {
        self.programs.entry_count()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Activation;
    use crate::value::Value;

    #[test]
    fn caches_compiled_programs() {
        let cache = ProgramCache::new();
        let first = cache.get_or_compile("1 + 1").unwrap();
        let second = cache.get_or_compile("1 + 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.eval(&Activation::new()).unwrap(), Value::Int(2));
    }

    #[test]
    fn compile_errors_are_not_cached() {
        let cache = ProgramCache::new();
        assert!(cache.get_or_compile("a ==").is_err());
        cache.programs.run_pending_tasks();
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = ProgramCache::with_capacity(4);
        for i in 0..32 {
            cache.get_or_compile(&format!("{i} + 1")).unwrap();
        }
        cache.programs.run_pending_tasks();
        assert!(cache.len() <= 4);
    }
}
