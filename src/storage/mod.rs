pub mod db;
pub mod models;
pub mod traits;

pub use db::SqliteSchemeStore;
pub use models::{Catalog, CategoryRow, CompanyRow, ImportSummary, NavRow, SchemeRow};
pub use traits::{RegistrarSource, SchemeCatalog, SchemeFlagsSource, SchemeStore};
