pub mod aggregate;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod scheme;
pub mod storage;
pub mod utils;
pub mod validation;

pub use aggregate::{QuoteRequest, SchemeAggregator, TransactionQuote};
pub use config::Config;
pub use context::RequestContext;
pub use error::{AggregatorError, Result, SchemeError};
pub use validation::SchemeValidator;
