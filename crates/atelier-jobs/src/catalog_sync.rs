//! Read-through catalog refresh.
//!
//! The cache itself never touches the network; this is the glue that
//! decides when to. A forced refresh bypasses the cached entry entirely
//! and, on success, overwrites it with a new fetch timestamp. A failed
//! refresh leaves the prior entry intact.

use atelier_catalog::CatalogCache;
use atelier_provider::ProviderApi;
use atelier_types::catalog::CatalogEntry;
use atelier_types::now_ms;

use crate::Result;

/// Return the catalog entry for `provider`, refreshing through the
/// provider boundary when the cached entry is absent or stale, or when
/// `force` is set.
pub async fn read_or_refresh<P: ProviderApi>(
    api: &P,
    cache: &CatalogCache,
    provider: &str,
    key: &str,
    force: bool,
    ttl_ms: u64,
) -> Result<CatalogEntry> {
    let now = now_ms();

    if !force {
        if let Some(entry) = cache.read(provider).await? {
            if !entry.is_stale(now) {
                return Ok(entry);
            }
            tracing::debug!(provider, "catalog entry stale, refreshing");
        }
    }

    let response = api.fetch_models(provider, key, force).await?;
    let entry = cache
        .write(provider, response.models, ttl_ms, now_ms())
        .await?;
    Ok(entry)
}
