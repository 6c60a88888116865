use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    context::RequestContext,
    error::Result,
    scheme::{NavDetails, RedeemSchemeDetails, SchemeDetails, SchemeFlags, SchemeKey},
};

/// Source of scheme eligibility records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SchemeFlagsSource: Send + Sync {
    /// Fails with `NoSchemeFound` when the scheme does not exist
    async fn scheme_flags(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeFlags>;
}

/// Source of a company's registrar and transfer agent
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistrarSource: Send + Sync {
    /// Upper-cased registrar name; `NoRegistrarFound` when the company is unknown
    async fn company_registrar(&self, ctx: &RequestContext, comp_code: i64) -> Result<String>;
}

/// Remaining per-scheme lookups used when composing a response
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SchemeCatalog: Send + Sync {
    async fn scheme_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeDetails>;

    async fn redeem_scheme_details(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        holding_mode: &str,
        account_type: &str,
    ) -> Result<RedeemSchemeDetails>;

    async fn nav_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<NavDetails>;

    async fn company_folio(&self, ctx: &RequestContext, comp_code: i64) -> Result<String>;

    async fn is_param_eatm_enabled(&self, ctx: &RequestContext) -> Result<bool>;

    async fn is_scheme_eatm_enabled(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<bool>;
}

/// Every lookup the aggregator needs from one backing store
pub trait SchemeStore: SchemeFlagsSource + RegistrarSource + SchemeCatalog {}

impl<T> SchemeStore for T where T: SchemeFlagsSource + RegistrarSource + SchemeCatalog {}
