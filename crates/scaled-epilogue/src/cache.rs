//! Process-wide cache of configured epilogues.
//!
//! Composing and validating an expression tree is cheap but not free; launch
//! paths that run the same variant and element types repeatedly share one
//! [`ScaledMmEpilogue`] per key instead of rebuilding it per call.

use crate::builder::ScaledMmEpilogue;
use crate::config::EpilogueConfig;
use crate::error::{EpilogueError, Result};
use crate::variants::EpilogueVariant;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

type CacheKey = (EpilogueVariant, EpilogueConfig);

/// Lazily initialized on first use, persists for process lifetime.
static EPILOGUE_CACHE: OnceCell<Mutex<HashMap<CacheKey, Arc<ScaledMmEpilogue>>>> =
    OnceCell::new();

/// Get or build the epilogue for `variant` under `config`.
///
/// Thread-safe; concurrent callers with the same key receive the same
/// instance. Configuration errors are returned without populating the cache.
pub fn cached_epilogue(
    variant: EpilogueVariant,
    config: &EpilogueConfig,
) -> Result<Arc<ScaledMmEpilogue>> {
    let cache = EPILOGUE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = cache.lock().map_err(|_| EpilogueError::CachePoisoned)?;

    let key = (variant, *config);
    if let Some(epi) = map.get(&key) {
        return Ok(Arc::clone(epi));
    }

    let epi = Arc::new(ScaledMmEpilogue::new(variant, config)?);
    debug!(%variant, entries = map.len() + 1, "cached epilogue");
    map.insert(key, Arc::clone(&epi));
    Ok(epi)
}

/// Number of cached epilogues.
pub fn cached_count() -> Result<usize> {
    match EPILOGUE_CACHE.get() {
        Some(cache) => Ok(cache.lock().map_err(|_| EpilogueError::CachePoisoned)?.len()),
        None => Ok(0),
    }
}
