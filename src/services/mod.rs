pub mod ledger;
pub mod notifier;
pub mod price_cache;
pub mod risk;
pub mod sqlite_store;

pub use ledger::{LedgerError, LedgerService};
pub use notifier::AdvisoryNotifier;
pub use price_cache::PriceCache;
pub use risk::{compute_risk_metrics, RiskService};
pub use sqlite_store::SqliteStore;
