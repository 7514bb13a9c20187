pub mod identity;
pub mod outcome;
pub mod pricelist;
pub mod row;

pub use identity::{IdentityCache, Resolution};
pub use outcome::{OutcomeStatus, ProductId, RowOutcome, RunReport, RunSummary};
pub use pricelist::{actionable_rows, filter_rows, GroupCount, PriceList, PriceListStats, Selection};
pub use row::{PricedRow, SupplierRow};
