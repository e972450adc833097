//! Thread-local compilation cache for tree-sitter queries.
//!
//! A patch's search pattern is the same for every file it is applied to, so
//! each distinct query string is compiled once per thread and shared.
//! Cache is capped at 64 entries; it is cleared when full.

use crate::ts::{QueryEngine, TreeSitterError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const MAX_CACHE_ENTRIES: usize = 64;

thread_local! {
    static QUERY_CACHE: RefCell<HashMap<String, Rc<QueryEngine>>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled query from cache, or compile and cache it.
///
/// Invalid queries are not cached; every call reports the compile error.
pub fn get_or_compile_query(query_str: &str) -> Result<Rc<QueryEngine>, TreeSitterError> {
    QUERY_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(q) = cache.get(query_str) {
            return Ok(Rc::clone(q));
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Rc::new(QueryEngine::new(query_str)?);
        cache.insert(query_str.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    })
}

/// Clear the query cache (mainly for testing).
pub fn clear_cache() {
    QUERY_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    QUERY_CACHE.with(|cache| cache.borrow().len())
}
