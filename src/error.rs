use thiserror::Error;

/// Not-found and business-rule outcomes for scheme lookups and validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("No scheme found")]
    NoSchemeFound,

    #[error("No registrar found for the company")]
    NoRegistrarFound,

    #[error("No company found")]
    NoCompanyFound,

    #[error("No nav found")]
    NoNavFound,

    #[error("No user found")]
    NoUserFound,

    #[error("Invalid transaction code")]
    InvalidTransactionCode,

    #[error("The scheme is closed for further transaction")]
    NoFurtherTransaction,

    #[error("Scheme not offline enabled")]
    NotOfflineEnabled,

    #[error("Scheme not online enabled")]
    NotOnlineEnabled,

    #[error("This Scheme is not enabled for time the market STP")]
    BoosterStpNotEnabled,

    #[error("Scheme is not Special Interval")]
    NotSpecialInterval,

    #[error("This scheme is not enabled for Purchase")]
    PurchaseNotEnabled,

    #[error("This scheme is not enabled for SIP")]
    SipNotEnabled,

    #[error("STP order not allowed")]
    StpNotAllowed,

    #[error("Scheme not enabled for STP Out")]
    StpNotEnabled,

    #[error("Requested activity not allowed on this scheme")]
    ActivityNotAllowed,

    #[error("This scheme is close ended scheme and currently not available for redemption")]
    RedeemCloseEnded,

    #[error("This scheme is close ended scheme and currently not available for switch out")]
    SwitchCloseEnded,

    #[error("This scheme is close ended scheme and currently not available for STP out")]
    StpCloseEnded,
}

impl SchemeError {
    /// A required record is absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchemeError::NoSchemeFound
                | SchemeError::NoRegistrarFound
                | SchemeError::NoCompanyFound
                | SchemeError::NoNavFound
                | SchemeError::NoUserFound
        )
    }

    /// An eligibility rule rejected the requested transaction
    pub fn is_rule_violation(&self) -> bool {
        !self.is_not_found() && *self != SchemeError::InvalidTransactionCode
    }
}

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Context cancelled")]
    Cancelled,

    #[error("Fetch operation panicked: {0}")]
    TaskPanicked(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AggregatorError {
    /// The business error carried by this error, if any
    pub fn scheme(&self) -> Option<&SchemeError> {
        match self {
            AggregatorError::Scheme(e) => Some(e),
            _ => None,
        }
    }

    /// Timeout or cancellation observed through a request context
    pub fn is_context_error(&self) -> bool {
        matches!(self, AggregatorError::DeadlineExceeded | AggregatorError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
