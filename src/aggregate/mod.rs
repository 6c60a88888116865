use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, Instrument};

use crate::{
    config::FetchConfig,
    context::RequestContext,
    error::Result,
    fetch::FetchGroup,
    scheme::{
        NavDetails, RedeemSchemeDetails, SchemeDetails, SchemeFlags, SchemeKey, TransactionKind,
        ValidationContext, DEFAULT_ACCOUNT_TYPE,
    },
    storage::SchemeStore,
    validation::SchemeValidator,
};

/// One transaction the caller wants to place
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub key: SchemeKey,
    pub kind: TransactionKind,
    pub situation: ValidationContext,
    /// Investor account type, defaults to resident individual
    pub account_type: Option<String>,
}

impl QuoteRequest {
    pub fn new(key: SchemeKey, kind: TransactionKind) -> Self {
        Self {
            key,
            kind,
            situation: ValidationContext::default(),
            account_type: None,
        }
    }

    pub fn with_situation(mut self, situation: ValidationContext) -> Self {
        self.situation = situation;
        self
    }

    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = Some(account_type.into());
        self
    }

    pub fn account_type(&self) -> &str {
        self.account_type.as_deref().unwrap_or(DEFAULT_ACCOUNT_TYPE)
    }
}

/// Validated scheme data for one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionQuote {
    pub request_id: String,
    pub kind: TransactionKind,
    pub key: SchemeKey,
    pub flags: SchemeFlags,
    pub details: SchemeDetails,
    pub nav: NavDetails,
    /// Present for redeem, switch, SWP and STP
    pub redemption: Option<RedeemSchemeDetails>,
}

pub struct SchemeAggregator<S> {
    store: Arc<S>,
    validator: SchemeValidator,
    fetch: FetchConfig,
}

impl<S: SchemeStore + 'static> SchemeAggregator<S> {
    pub fn new(store: Arc<S>, fetch: FetchConfig) -> Self {
        let validator = SchemeValidator::from_store(Arc::clone(&store));
        Self {
            store,
            validator,
            fetch,
        }
    }

    pub fn validator(&self) -> &SchemeValidator {
        &self.validator
    }

    /// Fetch everything the transaction needs concurrently, then validate it
    pub async fn quote(&self, ctx: &RequestContext, request: &QuoteRequest) -> Result<TransactionQuote> {
        let span = ctx.span();
        self.quote_inner(ctx, request).instrument(span).await
    }

    async fn quote_inner(&self, parent: &RequestContext, request: &QuoteRequest) -> Result<TransactionQuote> {
        let ctx = parent.with_timeout(self.fetch.request_timeout());
        let _cancel = ctx.cancel_on_drop();

        info!("Quoting {} for scheme {}", request.kind, request.key);

        let mut group = FetchGroup::new(&ctx, self.fetch.sub_timeout(), self.fetch.drain_policy);

        let flags = {
            let (store, key) = (Arc::clone(&self.store), request.key.clone());
            group.spawn(move |ctx: RequestContext| async move { store.scheme_flags(&ctx, &key).await })
        };
        let details = {
            let (store, key) = (Arc::clone(&self.store), request.key.clone());
            group.spawn(move |ctx: RequestContext| async move { store.scheme_details(&ctx, &key).await })
        };
        let nav = {
            let (store, key) = (Arc::clone(&self.store), request.key.clone());
            group.spawn(move |ctx: RequestContext| async move { store.nav_details(&ctx, &key).await })
        };
        let redemption = if request.kind.is_outflow() {
            let (store, key) = (Arc::clone(&self.store), request.key.clone());
            let holding_mode = request.situation.holding_mode();
            let account_type = request.account_type().to_string();
            Some(group.spawn(move |ctx: RequestContext| async move {
                store
                    .redeem_scheme_details(&ctx, &key, holding_mode, &account_type)
                    .await
            }))
        } else {
            None
        };

        debug!("Dispatched {} lookups", group.dispatched());
        group.join().await?;

        let flags = flags.take()?;
        let details = details.take()?;
        let nav = nav.take()?;
        let redemption = redemption.map(|slot| slot.take()).transpose()?;

        let flags = self
            .validator
            .check(&ctx, request.kind, &request.key, flags, &request.situation)
            .await?;

        info!("{} for scheme {} is allowed", request.kind, request.key);

        Ok(TransactionQuote {
            request_id: ctx.request_id().to_string(),
            kind: request.kind,
            key: request.key.clone(),
            flags,
            details,
            nav,
            redemption,
        })
    }
}
