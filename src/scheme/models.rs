use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemeError;
use crate::scheme::flags::{Closure, Flag};

/// Company code plus scheme code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemeKey {
    pub comp_code: i64,
    pub scheme_code: String,
}

impl SchemeKey {
    pub fn new(comp_code: i64, scheme_code: impl Into<String>) -> Self {
        Self {
            comp_code,
            scheme_code: scheme_code.into(),
        }
    }
}

impl fmt::Display for SchemeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.comp_code, self.scheme_code)
    }
}

/// Eligibility record of a scheme
///
/// Read-only once fetched; the validator hands it back unchanged so callers
/// can inspect any flag without a second lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeFlags {
    pub booster_stp_flag: Flag,
    pub closure: Closure,
    pub direct_scheme_flag: Flag,
    pub dr_flag: Flag,
    pub div_reinvest_flag: Flag,
    pub etf_flag: Flag,
    pub freedom_flag: Flag,
    pub free_insure_flag: Flag,
    pub multi_trans_allowed_flag: Flag,
    pub offline_flag: Flag,
    pub online_flag: Flag,
    pub purchase_allowed_flag: Flag,
    pub purchase_flag: Flag,
    pub recommend_flag: Flag,
    pub redeem_flag: Flag,
    pub redeem_allowed_flag: Flag,
    pub renewal_flag: Flag,
    pub sip_flag: Flag,
    pub special_interval_flag: Flag,
    pub step_up_flag: Flag,
    pub stp_out_flag: Flag,
    pub switch_flag: Flag,
    pub switch_allowed_flag: Flag,
    pub swp_flag: Flag,
    pub target_fund_flag: Flag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavDetails {
    pub amfi_code: String,
    pub nav_date: String,
    pub nav_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeDetails {
    pub min_purchase_amount: f64,
    pub min_sip_amount: f64,
    pub multi_purchase_amount: f64,
    pub multi_sip_amount: f64,
    pub max_sip_amount: f64,
    pub max_sub_amount: f64,
    pub nfo_exec_date: String,
    pub scheme_desc: String,
    pub scheme_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedeemSchemeDetails {
    pub amfi_code: String,
    pub scheme_desc: String,
    pub nav_date: String,
    pub nav_value: f64,
    pub redeem_cutoff_time: String,
    pub siso_cutoff_time: String,
    pub min_redeem_amount: f64,
    pub multi_redeem_amount: f64,
    pub min_redeem_units: f64,
    pub multi_redeem_units: f64,
    pub scheme_remarks: String,
    pub stp_min_amount: f64,
    pub stp_max_amount: f64,
    pub stp_min_holding_amount: f64,
    pub account_type_allowed_flag: Flag,
}

/// Holding mode codes used by redemption lookups
pub const DEMAT_HOLDING: &str = "D";
pub const PHYSICAL_HOLDING: &str = "P";

/// Account type used when the caller does not name one (resident individual)
pub const DEFAULT_ACCOUNT_TYPE: &str = "O";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Sip,
    Redeem,
    Switch,
    Swp,
    Stp,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 6] = [
        TransactionKind::Purchase,
        TransactionKind::Sip,
        TransactionKind::Redeem,
        TransactionKind::Switch,
        TransactionKind::Swp,
        TransactionKind::Stp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sip => "sip",
            TransactionKind::Redeem => "redeem",
            TransactionKind::Switch => "switch",
            TransactionKind::Swp => "swp",
            TransactionKind::Stp => "stp",
        }
    }

    /// Money leaves the scheme, so redemption limits apply
    pub fn is_outflow(self) -> bool {
        !matches!(self, TransactionKind::Purchase | TransactionKind::Sip)
    }
}

impl FromStr for TransactionKind {
    type Err = SchemeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purchase" | "p" => Ok(TransactionKind::Purchase),
            "sip" => Ok(TransactionKind::Sip),
            "redeem" | "r" => Ok(TransactionKind::Redeem),
            "switch" | "s" => Ok(TransactionKind::Switch),
            "swp" => Ok(TransactionKind::Swp),
            "stp" => Ok(TransactionKind::Stp),
            _ => Err(SchemeError::InvalidTransactionCode),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Situational parameters of one validation call
///
/// Each transaction kind reads only the fields relevant to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub is_offline_request: bool,
    pub is_special_interval: bool,
    pub is_booster_stp: bool,
    pub is_demat_holding: bool,
}

impl ValidationContext {
    pub fn offline(mut self, value: bool) -> Self {
        self.is_offline_request = value;
        self
    }

    pub fn special_interval(mut self, value: bool) -> Self {
        self.is_special_interval = value;
        self
    }

    pub fn booster_stp(mut self, value: bool) -> Self {
        self.is_booster_stp = value;
        self
    }

    pub fn demat_holding(mut self, value: bool) -> Self {
        self.is_demat_holding = value;
        self
    }

    pub fn holding_mode(&self) -> &'static str {
        if self.is_demat_holding {
            DEMAT_HOLDING
        } else {
            PHYSICAL_HOLDING
        }
    }
}
