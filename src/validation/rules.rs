//! Ordered eligibility checks per transaction kind
//!
//! Each chain stops at the first failing check. The registrar gate for demat
//! STP needs a lookup and lives in [`SchemeValidator`](super::SchemeValidator).

use crate::error::SchemeError;
use crate::scheme::{SchemeFlags, TransactionKind, ValidationContext};

pub type RuleResult = std::result::Result<(), SchemeError>;

fn ensure(violated: bool, error: SchemeError) -> RuleResult {
    if violated {
        Err(error)
    } else {
        Ok(())
    }
}

/// Request channel must be enabled on the scheme
fn channel(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    if situation.is_offline_request {
        ensure(flags.offline_flag.is_no(), SchemeError::NotOfflineEnabled)
    } else {
        ensure(flags.online_flag.is_no(), SchemeError::NotOnlineEnabled)
    }
}

fn special_interval(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    ensure(
        situation.is_special_interval && flags.special_interval_flag.is_no(),
        SchemeError::NotSpecialInterval,
    )
}

pub fn purchase(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    channel(flags, situation)?;
    ensure(flags.purchase_flag.is_no(), SchemeError::PurchaseNotEnabled)?;
    ensure(flags.purchase_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)
}

pub fn sip(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    channel(flags, situation)?;
    ensure(flags.sip_flag.is_no(), SchemeError::SipNotEnabled)?;
    ensure(flags.purchase_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)
}

pub fn redeem(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    let close_ended = flags.closure.is_close_ended();
    ensure(close_ended && flags.redeem_flag.is_no(), SchemeError::RedeemCloseEnded)?;
    ensure(flags.redeem_flag.is_no(), SchemeError::ActivityNotAllowed)?;
    ensure(flags.redeem_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)?;
    special_interval(flags, situation)
}

pub fn swp(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    ensure(flags.swp_flag.is_no(), SchemeError::ActivityNotAllowed)?;
    ensure(flags.redeem_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)?;
    special_interval(flags, situation)
}

pub fn switch(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    let close_ended = flags.closure.is_close_ended();
    ensure(close_ended && flags.switch_flag.is_no(), SchemeError::SwitchCloseEnded)?;
    ensure(flags.switch_flag.is_no(), SchemeError::ActivityNotAllowed)?;
    ensure(flags.switch_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)?;
    special_interval(flags, situation)
}

/// STP checks up to, not including, the registrar gate
pub fn stp(flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    // booster STP is governed by its own flag instead of the STP-out flag
    let (stp_disabled, not_enabled) = if situation.is_booster_stp {
        (flags.booster_stp_flag.is_no(), SchemeError::BoosterStpNotEnabled)
    } else {
        (flags.stp_out_flag.is_no(), SchemeError::StpNotEnabled)
    };

    ensure(flags.closure.is_close_ended() && stp_disabled, SchemeError::StpCloseEnded)?;
    ensure(stp_disabled, not_enabled)?;
    ensure(flags.switch_allowed_flag.is_no(), SchemeError::NoFurtherTransaction)?;
    special_interval(flags, situation)
}

/// Run the chain for `kind`
pub fn check(kind: TransactionKind, flags: &SchemeFlags, situation: &ValidationContext) -> RuleResult {
    match kind {
        TransactionKind::Purchase => purchase(flags, situation),
        TransactionKind::Sip => sip(flags, situation),
        TransactionKind::Redeem => redeem(flags, situation),
        TransactionKind::Switch => switch(flags, situation),
        TransactionKind::Swp => swp(flags, situation),
        TransactionKind::Stp => stp(flags, situation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{Closure, Flag};

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
            ..Default::default()
        }
    }

    fn offline() -> ValidationContext {
        ValidationContext::default().offline(true)
    }

    fn online() -> ValidationContext {
        ValidationContext::default()
    }

    #[test]
    fn test_every_kind_passes_with_permissive_flags() {
        let flags = permissive();
        for kind in TransactionKind::ALL {
            for situation in [online(), offline().special_interval(true).booster_stp(true)] {
                assert_eq!(check(kind, &flags, &situation), Ok(()), "{}", kind);
            }
        }
    }

    #[test]
    fn test_purchase_channel_precedes_cutoff() {
        let flags = SchemeFlags {
            offline_flag: Flag::No,
            online_flag: Flag::Yes,
            purchase_allowed_flag: Flag::No,
            purchase_flag: Flag::Yes,
            ..permissive()
        };

        assert_eq!(purchase(&flags, &offline()), Err(SchemeError::NotOfflineEnabled));
        assert_eq!(purchase(&flags, &online()), Err(SchemeError::NoFurtherTransaction));
    }

    #[test]
    fn test_purchase_order() {
        let flags = SchemeFlags {
            online_flag: Flag::No,
            purchase_flag: Flag::No,
            purchase_allowed_flag: Flag::No,
            ..permissive()
        };
        assert_eq!(purchase(&flags, &online()), Err(SchemeError::NotOnlineEnabled));
        assert_eq!(purchase(&flags, &offline()), Err(SchemeError::PurchaseNotEnabled));
    }

    #[test]
    fn test_sip_order() {
        let flags = SchemeFlags {
            sip_flag: Flag::No,
            purchase_allowed_flag: Flag::No,
            ..permissive()
        };
        assert_eq!(sip(&flags, &online()), Err(SchemeError::SipNotEnabled));

        let flags = SchemeFlags {
            purchase_flag: Flag::No,
            purchase_allowed_flag: Flag::No,
            ..permissive()
        };
        // purchase-enabled is not consulted for SIP
        assert_eq!(sip(&flags, &online()), Err(SchemeError::NoFurtherTransaction));
    }

    #[test]
    fn test_unknown_flags_do_not_fail() {
        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            ..Default::default()
        };
        for kind in TransactionKind::ALL {
            assert_eq!(check(kind, &flags, &offline().special_interval(true)), Ok(()));
        }
    }

    #[test]
    fn test_redeem_order() {
        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            redeem_flag: Flag::No,
            redeem_allowed_flag: Flag::No,
            special_interval_flag: Flag::No,
            ..permissive()
        };
        let special = online().special_interval(true);

        assert_eq!(redeem(&flags, &special), Err(SchemeError::RedeemCloseEnded));

        let open = SchemeFlags { closure: Closure::OpenEnded, ..flags.clone() };
        assert_eq!(redeem(&open, &special), Err(SchemeError::ActivityNotAllowed));

        let enabled = SchemeFlags { redeem_flag: Flag::Yes, ..open.clone() };
        assert_eq!(redeem(&enabled, &special), Err(SchemeError::NoFurtherTransaction));

        let allowed = SchemeFlags { redeem_allowed_flag: Flag::Yes, ..enabled };
        assert_eq!(redeem(&allowed, &special), Err(SchemeError::NotSpecialInterval));
        assert_eq!(redeem(&allowed, &online()), Ok(()));
    }

    #[test]
    fn test_swp_order() {
        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            swp_flag: Flag::No,
            redeem_flag: Flag::No,
            redeem_allowed_flag: Flag::No,
            ..permissive()
        };

        // SWP has no close-ended check
        assert_eq!(swp(&flags, &online()), Err(SchemeError::ActivityNotAllowed));

        let enabled = SchemeFlags { swp_flag: Flag::Yes, ..flags };
        assert_eq!(swp(&enabled, &online()), Err(SchemeError::NoFurtherTransaction));
    }

    #[test]
    fn test_switch_close_ended_precedence() {
        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            switch_flag: Flag::No,
            switch_allowed_flag: Flag::Yes,
            special_interval_flag: Flag::Yes,
            ..permissive()
        };

        assert_eq!(switch(&flags, &online()), Err(SchemeError::SwitchCloseEnded));

        let open = SchemeFlags { closure: Closure::OpenEnded, ..flags };
        assert_eq!(switch(&open, &online()), Err(SchemeError::ActivityNotAllowed));
    }

    #[test]
    fn test_switch_cutoff_then_special_interval() {
        let flags = SchemeFlags {
            switch_allowed_flag: Flag::No,
            special_interval_flag: Flag::No,
            ..permissive()
        };
        let special = online().special_interval(true);
        assert_eq!(switch(&flags, &special), Err(SchemeError::NoFurtherTransaction));

        let allowed = SchemeFlags { switch_allowed_flag: Flag::Yes, ..flags };
        assert_eq!(switch(&allowed, &special), Err(SchemeError::NotSpecialInterval));
    }

    #[test]
    fn test_stp_selects_flag_by_variant() {
        let flags = SchemeFlags {
            booster_stp_flag: Flag::No,
            stp_out_flag: Flag::Yes,
            ..permissive()
        };

        assert_eq!(stp(&flags, &online()), Ok(()));
        assert_eq!(
            stp(&flags, &online().booster_stp(true)),
            Err(SchemeError::BoosterStpNotEnabled)
        );

        let flags = SchemeFlags {
            booster_stp_flag: Flag::Yes,
            stp_out_flag: Flag::No,
            ..permissive()
        };
        assert_eq!(stp(&flags, &online()), Err(SchemeError::StpNotEnabled));
        assert_eq!(stp(&flags, &online().booster_stp(true)), Ok(()));
    }

    #[test]
    fn test_stp_order() {
        let flags = SchemeFlags {
            closure: Closure::CloseEnded,
            stp_out_flag: Flag::No,
            switch_allowed_flag: Flag::No,
            special_interval_flag: Flag::No,
            ..permissive()
        };
        let special = online().special_interval(true);

        assert_eq!(stp(&flags, &special), Err(SchemeError::StpCloseEnded));
        // close-ended with the booster flag enabled passes the close-ended check
        assert_eq!(
            stp(&flags, &special.booster_stp(true)),
            Err(SchemeError::NoFurtherTransaction)
        );

        let allowed = SchemeFlags {
            closure: Closure::OpenEnded,
            stp_out_flag: Flag::Yes,
            switch_allowed_flag: Flag::Yes,
            ..flags
        };
        assert_eq!(stp(&allowed, &special), Err(SchemeError::NotSpecialInterval));
    }

    #[test]
    fn test_redeem_allowed_does_not_gate_switch() {
        let flags = SchemeFlags {
            redeem_allowed_flag: Flag::No,
            ..permissive()
        };
        assert_eq!(check(TransactionKind::Switch, &flags, &online()), Ok(()));
        assert_eq!(check(TransactionKind::Stp, &flags, &online()), Ok(()));
        assert_eq!(
            check(TransactionKind::Swp, &flags, &online()),
            Err(SchemeError::NoFurtherTransaction)
        );
    }
}
