pub mod flags;
pub mod models;

pub use flags::{Closure, Flag};
pub use models::{
    NavDetails, RedeemSchemeDetails, SchemeDetails, SchemeFlags, SchemeKey, TransactionKind,
    ValidationContext, DEFAULT_ACCOUNT_TYPE, DEMAT_HOLDING, PHYSICAL_HOLDING,
};
