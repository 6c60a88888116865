pub mod rules;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    context::RequestContext,
    error::{Result, SchemeError},
    scheme::{SchemeFlags, SchemeKey, TransactionKind, ValidationContext},
    storage::{RegistrarSource, SchemeFlagsSource},
};

/// Registrar whose demat holdings cannot place STP orders
pub const DISALLOWED_DEMAT_STP_REGISTRAR: &str = "KARVY";

/// Eligibility validator for the six transaction kinds
///
/// Every entry point fetches the scheme's flags, walks the ordered checks in
/// [`rules`] and hands the flags back unchanged on success. Lookup failures
/// are returned as-is; only rule failures become [`SchemeError`]s here.
#[derive(Clone)]
pub struct SchemeValidator {
    flags: Arc<dyn SchemeFlagsSource>,
    registrars: Arc<dyn RegistrarSource>,
}

impl SchemeValidator {
    pub fn new(flags: Arc<dyn SchemeFlagsSource>, registrars: Arc<dyn RegistrarSource>) -> Self {
        Self { flags, registrars }
    }

    /// Validator over a single store providing both lookups
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SchemeFlagsSource + RegistrarSource + 'static,
    {
        Self {
            flags: store.clone(),
            registrars: store,
        }
    }

    pub async fn validate_purchase(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_offline_request: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default().offline(is_offline_request);
        self.validate(ctx, TransactionKind::Purchase, key, &situation).await
    }

    pub async fn validate_sip(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_offline_request: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default().offline(is_offline_request);
        self.validate(ctx, TransactionKind::Sip, key, &situation).await
    }

    pub async fn validate_redeem(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_special_interval: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default().special_interval(is_special_interval);
        self.validate(ctx, TransactionKind::Redeem, key, &situation).await
    }

    pub async fn validate_swp(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_special_interval: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default().special_interval(is_special_interval);
        self.validate(ctx, TransactionKind::Swp, key, &situation).await
    }

    pub async fn validate_switch(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_special_interval: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default().special_interval(is_special_interval);
        self.validate(ctx, TransactionKind::Switch, key, &situation).await
    }

    pub async fn validate_stp(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        is_special_interval: bool,
        is_booster_stp: bool,
        is_demat_holding: bool,
    ) -> Result<SchemeFlags> {
        let situation = ValidationContext::default()
            .special_interval(is_special_interval)
            .booster_stp(is_booster_stp)
            .demat_holding(is_demat_holding);
        self.validate(ctx, TransactionKind::Stp, key, &situation).await
    }

    /// Fetch the scheme's flags and validate them for `kind`
    pub async fn validate(
        &self,
        ctx: &RequestContext,
        kind: TransactionKind,
        key: &SchemeKey,
        situation: &ValidationContext,
    ) -> Result<SchemeFlags> {
        let flags = self.flags.scheme_flags(ctx, key).await?;
        self.check(ctx, kind, key, flags, situation).await
    }

    /// Validate flags that were already fetched
    pub async fn check(
        &self,
        ctx: &RequestContext,
        kind: TransactionKind,
        key: &SchemeKey,
        flags: SchemeFlags,
        situation: &ValidationContext,
    ) -> Result<SchemeFlags> {
        if let Err(e) = rules::check(kind, &flags, situation) {
            warn!("{} rejected for scheme {}: {}", kind, key, e);
            return Err(e.into());
        }

        if kind == TransactionKind::Stp && situation.is_demat_holding {
            self.check_demat_registrar(ctx, key).await?;
        }

        debug!("{} allowed for scheme {}", kind, key);
        Ok(flags)
    }

    async fn check_demat_registrar(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<()> {
        match self.registrars.company_registrar(ctx, key.comp_code).await {
            Ok(registrar) if registrar != DISALLOWED_DEMAT_STP_REGISTRAR => Ok(()),
            Ok(registrar) => {
                warn!("STP rejected for scheme {}: demat holding with registrar {}", key, registrar);
                Err(SchemeError::StpNotAllowed.into())
            }
            Err(e) => {
                warn!("STP rejected for scheme {}: registrar lookup failed: {}", key, e);
                Err(SchemeError::StpNotAllowed.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregatorError;
    use crate::scheme::{Closure, Flag};
    use crate::storage::traits::{MockRegistrarSource, MockSchemeFlagsSource};

    fn key() -> SchemeKey {
        SchemeKey::new(19, "10GP")
    }

    fn permissive() -> SchemeFlags {
        SchemeFlags {
            closure: Closure::OpenEnded,
            booster_stp_flag: Flag::Yes,
            offline_flag: Flag::Yes,
            online_flag: Flag::Yes,
            purchase_flag: Flag::Yes,
            purchase_allowed_flag: Flag::Yes,
            redeem_flag: Flag::Yes,
            redeem_allowed_flag: Flag::Yes,
            sip_flag: Flag::Yes,
            special_interval_flag: Flag::Yes,
            stp_out_flag: Flag::Yes,
            switch_flag: Flag::Yes,
            switch_allowed_flag: Flag::Yes,
            swp_flag: Flag::Yes,
            etf_flag: Flag::No,
            ..Default::default()
        }
    }

    fn flags_source(flags: SchemeFlags) -> MockSchemeFlagsSource {
        let mut source = MockSchemeFlagsSource::new();
        source
            .expect_scheme_flags()
            .returning(move |_, _| Ok(flags.clone()));
        source
    }

    fn registrar(name: &'static str) -> MockRegistrarSource {
        let mut source = MockRegistrarSource::new();
        source
            .expect_company_registrar()
            .times(1)
            .returning(move |_, _| Ok(name.to_string()));
        source
    }

    fn no_registrar_calls() -> MockRegistrarSource {
        let mut source = MockRegistrarSource::new();
        source.expect_company_registrar().never();
        source
    }

    fn validator(flags: MockSchemeFlagsSource, registrars: MockRegistrarSource) -> SchemeValidator {
        SchemeValidator::new(Arc::new(flags), Arc::new(registrars))
    }

    #[tokio::test]
    async fn test_happy_path_returns_fetched_flags() {
        let v = validator(flags_source(permissive()), no_registrar_calls());
        let ctx = RequestContext::new();
        let k = key();

        assert_eq!(v.validate_purchase(&ctx, &k, false).await.unwrap(), permissive());
        assert_eq!(v.validate_sip(&ctx, &k, true).await.unwrap(), permissive());
        assert_eq!(v.validate_redeem(&ctx, &k, true).await.unwrap(), permissive());
        assert_eq!(v.validate_swp(&ctx, &k, false).await.unwrap(), permissive());
        assert_eq!(v.validate_switch(&ctx, &k, true).await.unwrap(), permissive());
        assert_eq!(v.validate_stp(&ctx, &k, false, true, false).await.unwrap(), permissive());
    }

    #[tokio::test]
    async fn test_purchase_ordering_through_validator() {
        let flags = SchemeFlags {
            offline_flag: Flag::No,
            purchase_allowed_flag: Flag::No,
            ..permissive()
        };
        let v = validator(flags_source(flags), no_registrar_calls());
        let ctx = RequestContext::new();

        let err = v.validate_purchase(&ctx, &key(), true).await.unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::NotOfflineEnabled));

        let err = v.validate_purchase(&ctx, &key(), false).await.unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::NoFurtherTransaction));
    }

    #[tokio::test]
    async fn test_demat_stp_blocked_for_karvy() {
        let v = validator(flags_source(permissive()), registrar("KARVY"));
        let err = v
            .validate_stp(&RequestContext::new(), &key(), false, false, true)
            .await
            .unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::StpNotAllowed));
    }

    #[tokio::test]
    async fn test_demat_stp_allowed_for_other_registrars() {
        let v = validator(flags_source(permissive()), registrar("CAMS"));
        let flags = v
            .validate_stp(&RequestContext::new(), &key(), false, false, true)
            .await
            .unwrap();
        assert_eq!(flags, permissive());
    }

    #[tokio::test]
    async fn test_demat_stp_registrar_failure_is_not_allowed() {
        let mut registrars = MockRegistrarSource::new();
        registrars
            .expect_company_registrar()
            .returning(|_, _| Err(SchemeError::NoRegistrarFound.into()));

        let v = validator(flags_source(permissive()), registrars);
        let err = v
            .validate_stp(&RequestContext::new(), &key(), false, false, true)
            .await
            .unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::StpNotAllowed));
    }

    #[tokio::test]
    async fn test_registrar_skipped_when_rules_fail() {
        let flags = SchemeFlags {
            stp_out_flag: Flag::No,
            ..permissive()
        };
        let v = validator(flags_source(flags), no_registrar_calls());
        let err = v
            .validate_stp(&RequestContext::new(), &key(), false, false, true)
            .await
            .unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::StpNotEnabled));
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate_unchanged() {
        let mut source = MockSchemeFlagsSource::new();
        source
            .expect_scheme_flags()
            .returning(|_, _| Err(AggregatorError::DeadlineExceeded));
        let v = validator(source, no_registrar_calls());

        let err = v.validate_switch(&RequestContext::new(), &key(), false).await.unwrap_err();
        assert!(matches!(err, AggregatorError::DeadlineExceeded));

        let mut source = MockSchemeFlagsSource::new();
        source
            .expect_scheme_flags()
            .returning(|_, _| Err(SchemeError::NoSchemeFound.into()));
        let v = validator(source, no_registrar_calls());

        let err = v.validate_redeem(&RequestContext::new(), &key(), false).await.unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::NoSchemeFound));
    }

    #[tokio::test]
    async fn test_check_reuses_fetched_flags() {
        let mut source = MockSchemeFlagsSource::new();
        source.expect_scheme_flags().never();
        let v = validator(source, no_registrar_calls());

        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            switch_flag: Flag::No,
            ..permissive()
        };
        let err = v
            .check(
                &RequestContext::new(),
                TransactionKind::Switch,
                &key(),
                flags,
                &ValidationContext::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.scheme(), Some(&SchemeError::SwitchCloseEnded));
    }

    #[tokio::test]
    async fn test_flags_source_receives_key() {
        let mut source = MockSchemeFlagsSource::new();
        source
            .expect_scheme_flags()
            .withf(|_, key| key.comp_code == 19 && key.scheme_code == "10GP")
            .times(1)
            .returning(|_, _| Ok(permissive()));
        let v = validator(source, no_registrar_calls());

        v.validate_purchase(&RequestContext::new(), &key(), false).await.unwrap();
    }
}
