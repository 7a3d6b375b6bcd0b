use lazy_static::lazy_static;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::compiler::{CompileOptions, CompiledArtifact};
use crate::host::HostEnvironment;

lazy_static! {
    static ref TEMPLATE_CACHE: Arc<TemplateCache> = Arc::new(TemplateCache::new());
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Id-selector template lookups, memoized for the lifetime of the process.
///
/// Entries are never evicted: the host document's selector to markup mapping is assumed
/// stable once read. Misses are memoized too.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> Arc<TemplateCache> {
        Arc::clone(&TEMPLATE_CACHE)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<String>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inner markup of the element `selector` points at, querying the host on first use.
    pub fn lookup(&self, selector: &str, host: &dyn HostEnvironment) -> Option<String> {
        if let Some(entry) = self.lock().get(selector) {
            return entry.clone();
        }

        let markup = host.query(selector).and_then(|el| host.inner_html(&el));
        self.lock().insert(selector.to_string(), markup.clone());
        markup
    }

    pub fn get(&self, selector: &str) -> Option<Option<String>> {
        self.lock().get(selector).cloned()
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.lock().contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiled artifacts keyed by a hash of the template source and every option that
/// changes the output.
#[derive(Default)]
pub struct CompileCache {
    entries: RefCell<HashMap<String, CompiledArtifact>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(source: &str, options: &CompileOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(options.cache_key().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, source: &str, options: &CompileOptions) -> Option<CompiledArtifact> {
        let key = Self::compute_hash(source, options);
        self.entries.borrow().get(&key).cloned()
    }

    pub fn set(&self, source: &str, options: &CompileOptions, artifact: CompiledArtifact) {
        let key = Self::compute_hash(source, options);
        self.entries.borrow_mut().insert(key, artifact);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Document;

    #[test]
    fn test_lookup_memoizes_hits_and_misses() {
        let doc = Document::parse(r#"<html><body><div id="app">Hello</div></body></html>"#);
        let cache = TemplateCache::new();

        assert_eq!(cache.lookup("#app", &doc).as_deref(), Some("Hello"));
        assert_eq!(cache.lookup("#nope", &doc), None);
        assert_eq!(cache.get("#app"), Some(Some("Hello".to_string())));
        assert_eq!(cache.get("#nope"), Some(None));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_compile_hash_depends_on_options() {
        let plain = CompileOptions::default();
        let custom = CompileOptions {
            delimiters: Some(("${".to_string(), "}".to_string())),
            ..CompileOptions::default()
        };
        assert_eq!(
            CompileCache::compute_hash("<p></p>", &plain),
            CompileCache::compute_hash("<p></p>", &plain)
        );
        assert_ne!(
            CompileCache::compute_hash("<p></p>", &plain),
            CompileCache::compute_hash("<p></p>", &custom)
        );
        assert_ne!(
            CompileCache::compute_hash("<p></p>", &plain),
            CompileCache::compute_hash("<p> </p>", &plain)
        );
    }
}
