use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scheme::{Flag, SchemeKey};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyRow {
    pub comp_code: i64,
    pub name: Option<String>,
    pub registrar: Option<String>,
    pub folio_flag: Flag,
    pub eatm_flag: Flag,
}

impl CompanyRow {
    pub fn new(comp_code: i64, registrar: impl Into<String>) -> Self {
        Self {
            comp_code,
            registrar: Some(registrar.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRow {
    pub code: String,
    pub eatm_flag: Flag,
}

/// One scheme master row
///
/// Flags left `Unknown` are stored as NULL. Cutoffs are `HH:MM` and combine
/// with `end_date` to derive the purchase/redeem/switch allowed flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeRow {
    pub comp_code: i64,
    pub scheme_code: String,
    pub category_code: Option<String>,
    pub description: Option<String>,
    pub scheme_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub nfo_exec_date: Option<NaiveDate>,
    pub purchase_cutoff: Option<String>,
    pub redeem_cutoff: Option<String>,
    pub switch_cutoff: Option<String>,

    pub booster_stp: Flag,
    pub close: Flag,
    pub direct: Flag,
    pub dr: Flag,
    pub div_reinvest: Flag,
    pub etf: Flag,
    pub freedom: Flag,
    pub free_insure: Flag,
    pub multi_trans: Flag,
    pub offline: Flag,
    pub online: Flag,
    pub purchase: Flag,
    pub redeem: Flag,
    pub renewal: Flag,
    pub sip: Flag,
    pub special_interval: Flag,
    pub step_up: Flag,
    pub stp_out: Flag,
    pub switch: Flag,
    pub swp: Flag,
    pub target_fund: Flag,
    pub eatm: Flag,
    pub recommend: Flag,

    pub min_purchase_amount: Option<f64>,
    pub purchase_multi_amount: Option<f64>,
    pub min_sip_amount: Option<f64>,
    pub sip_multi_amount: Option<f64>,
    pub max_sub_amount: Option<f64>,
    pub max_sip_amount: Option<f64>,
    pub min_redeem_amount: Option<f64>,
    pub redeem_multi_amount: Option<f64>,
    pub min_redeem_units: Option<f64>,
    pub redeem_multi_units: Option<f64>,
    pub stp_out_min_amount: Option<f64>,
    pub stp_out_max_amount: Option<f64>,
    pub stp_min_holding_amount: Option<f64>,
    pub remarks: Option<String>,

    pub nre: Flag,
    pub npnre: Flag,
    pub nro: Flag,
    pub npnro: Flag,
    pub ri: Flag,
}

impl SchemeRow {
    /// Open-ended scheme with every transaction type enabled
    pub fn open_ended(comp_code: i64, scheme_code: impl Into<String>) -> Self {
        Self {
            comp_code,
            scheme_code: scheme_code.into(),
            close: Flag::No,
            offline: Flag::Yes,
            online: Flag::Yes,
            purchase: Flag::Yes,
            redeem: Flag::Yes,
            sip: Flag::Yes,
            special_interval: Flag::No,
            stp_out: Flag::Yes,
            booster_stp: Flag::Yes,
            switch: Flag::Yes,
            swp: Flag::Yes,
            ..Default::default()
        }
    }

    pub fn key(&self) -> SchemeKey {
        SchemeKey::new(self.comp_code, self.scheme_code.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavRow {
    pub comp_code: i64,
    pub scheme_code: String,
    pub amfi_code: Option<String>,
    pub nav_date: Option<NaiveDate>,
    pub nav: Option<f64>,
}

/// Seed document accepted by `SqliteSchemeStore::import`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub param_eatm: Flag,
    pub companies: Vec<CompanyRow>,
    pub categories: Vec<CategoryRow>,
    pub schemes: Vec<SchemeRow>,
    pub navs: Vec<NavRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub companies: usize,
    pub categories: usize,
    pub schemes: usize,
    pub navs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_json() {
        let raw = r#"{
            "param_eatm": "Y",
            "companies": [{ "comp_code": 19, "registrar": "cams" }],
            "schemes": [{ "comp_code": 19, "scheme_code": "10GP", "online": "Y", "end_date": "2031-03-31" }]
        }"#;

        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.param_eatm, Flag::Yes);
        assert_eq!(catalog.companies[0].registrar.as_deref(), Some("cams"));
        assert_eq!(catalog.schemes[0].online, Flag::Yes);
        assert_eq!(catalog.schemes[0].offline, Flag::Unknown);
        assert_eq!(catalog.schemes[0].end_date, NaiveDate::from_ymd_opt(2031, 3, 31));
        assert!(catalog.navs.is_empty());
    }
}
