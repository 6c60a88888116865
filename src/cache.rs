use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tracing::debug;

use crate::{
    context::RequestContext,
    error::Result,
    scheme::{NavDetails, RedeemSchemeDetails, SchemeDetails, SchemeFlags, SchemeKey},
    storage::{RegistrarSource, SchemeCatalog, SchemeFlagsSource},
};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Capacity-bounded LRU cache whose entries expire after a fixed TTL
pub struct TtlCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                Entry {
                    value,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Read-through cache in front of a scheme store
///
/// Caches registrars, scheme details and NAVs. Failed lookups are never
/// stored. Scheme flags carry cutoff-derived allowed flags computed against
/// the clock, so they are read through on every call along with redemption
/// details, folio and eATM lookups.
pub struct CachedSchemeStore<S> {
    inner: S,
    registrars: TtlCache<i64, String>,
    details: TtlCache<SchemeKey, SchemeDetails>,
    navs: TtlCache<SchemeKey, NavDetails>,
}

impl<S> CachedSchemeStore<S> {
    pub fn new(inner: S, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            registrars: TtlCache::new(capacity, ttl),
            details: TtlCache::new(capacity, ttl),
            navs: TtlCache::new(capacity, ttl),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached entry
    pub fn invalidate(&self) {
        self.registrars.clear();
        self.details.clear();
        self.navs.clear();
    }
}

#[async_trait]
impl<S: SchemeFlagsSource> SchemeFlagsSource for CachedSchemeStore<S> {
    async fn scheme_flags(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeFlags> {
        self.inner.scheme_flags(ctx, key).await
    }
}

#[async_trait]
impl<S: RegistrarSource> RegistrarSource for CachedSchemeStore<S> {
    async fn company_registrar(&self, ctx: &RequestContext, comp_code: i64) -> Result<String> {
        if let Some(registrar) = self.registrars.get(&comp_code) {
            debug!("Cache hit: registrar {}", comp_code);
            return Ok(registrar);
        }

        let registrar = self.inner.company_registrar(ctx, comp_code).await?;
        self.registrars.insert(comp_code, registrar.clone());
        Ok(registrar)
    }
}

#[async_trait]
impl<S: SchemeCatalog> SchemeCatalog for CachedSchemeStore<S> {
    async fn scheme_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeDetails> {
        if let Some(details) = self.details.get(key) {
            debug!("Cache hit: scheme details {}", key);
            return Ok(details);
        }

        let details = self.inner.scheme_details(ctx, key).await?;
        self.details.insert(key.clone(), details.clone());
        Ok(details)
    }

    async fn redeem_scheme_details(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        holding_mode: &str,
        account_type: &str,
    ) -> Result<RedeemSchemeDetails> {
        self.inner
            .redeem_scheme_details(ctx, key, holding_mode, account_type)
            .await
    }

    async fn nav_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<NavDetails> {
        if let Some(nav) = self.navs.get(key) {
            debug!("Cache hit: nav {}", key);
            return Ok(nav);
        }

        let nav = self.inner.nav_details(ctx, key).await?;
        self.navs.insert(key.clone(), nav.clone());
        Ok(nav)
    }

    async fn company_folio(&self, ctx: &RequestContext, comp_code: i64) -> Result<String> {
        self.inner.company_folio(ctx, comp_code).await
    }

    async fn is_param_eatm_enabled(&self, ctx: &RequestContext) -> Result<bool> {
        self.inner.is_param_eatm_enabled(ctx).await
    }

    async fn is_scheme_eatm_enabled(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<bool> {
        self.inner.is_scheme_eatm_enabled(ctx, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemeError;
    use crate::scheme::Flag;
    use crate::storage::traits::{MockRegistrarSource, MockSchemeFlagsSource};
    use crate::storage::{SchemeRow, SqliteSchemeStore};
    use crate::validation::SchemeValidator;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn key() -> SchemeKey {
        SchemeKey::new(19, "10GP")
    }

    #[tokio::test]
    async fn test_flags_are_read_through() {
        let mut inner = MockSchemeFlagsSource::new();
        inner.expect_scheme_flags().times(2).returning(|_, _| {
            Ok(SchemeFlags {
                online_flag: Flag::Yes,
                ..Default::default()
            })
        });

        let store = CachedSchemeStore::new(inner, 16, Duration::from_secs(60));
        let ctx = RequestContext::new();

        store.scheme_flags(&ctx, &key()).await.unwrap();
        let second = store.scheme_flags(&ctx, &key()).await.unwrap();
        assert_eq!(second.online_flag, Flag::Yes);
    }

    #[tokio::test]
    async fn test_purchase_rejected_once_cutoff_passes() {
        let past_cutoff = Arc::new(AtomicBool::new(false));
        let clock = Arc::clone(&past_cutoff);
        let end_date = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap();

        let sqlite = SqliteSchemeStore::in_memory().unwrap().with_clock(move || {
            let hour = if clock.load(Ordering::SeqCst) { 15 } else { 14 };
            end_date.and_hms_opt(hour, 30, 0).unwrap()
        });
        sqlite
            .upsert_scheme(&SchemeRow {
                start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
                end_date: Some(end_date),
                purchase_cutoff: Some("15:00".to_string()),
                ..SchemeRow::open_ended(19, "10GP")
            })
            .unwrap();

        let store = Arc::new(CachedSchemeStore::new(sqlite, 16, Duration::from_secs(30)));
        let validator = SchemeValidator::from_store(Arc::clone(&store));
        let ctx = RequestContext::new();

        let flags = validator.validate_purchase(&ctx, &key(), false).await.unwrap();
        assert_eq!(flags.purchase_allowed_flag, Flag::Yes);

        past_cutoff.store(true, Ordering::SeqCst);
        let err = validator.validate_purchase(&ctx, &key(), false).await.unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::NoFurtherTransaction));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut inner = MockRegistrarSource::new();
        inner
            .expect_company_registrar()
            .times(2)
            .returning(|_, _| Err(SchemeError::NoRegistrarFound.into()));

        let store = CachedSchemeStore::new(inner, 16, Duration::from_secs(60));
        let ctx = RequestContext::new();

        assert!(store.company_registrar(&ctx, 19).await.is_err());
        assert!(store.company_registrar(&ctx, 19).await.is_err());
        assert!(store.registrars.is_empty());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let mut inner = MockRegistrarSource::new();
        inner
            .expect_company_registrar()
            .times(2)
            .returning(|_, _| Ok("CAMS".to_string()));

        let store = CachedSchemeStore::new(inner, 16, Duration::from_millis(20));
        let ctx = RequestContext::new();

        store.company_registrar(&ctx, 19).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.company_registrar(&ctx, 19).await.unwrap(), "CAMS");
    }

    #[test]
    fn test_lru_bound() {
        let cache = TtlCache::new(NonZeroUsize::new(2).unwrap(), Duration::from_secs(60));
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.get(&1);
        cache.insert(3, "c");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let mut inner = MockRegistrarSource::new();
        inner
            .expect_company_registrar()
            .times(2)
            .returning(|_, _| Ok("KARVY".to_string()));

        let store = CachedSchemeStore::new(inner, 16, Duration::from_secs(60));
        let ctx = RequestContext::new();

        store.company_registrar(&ctx, 19).await.unwrap();
        store.invalidate();
        store.company_registrar(&ctx, 19).await.unwrap();
    }
}
