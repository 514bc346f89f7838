//! Subscription records: filters, change cache and the shared handle.

mod cache;
mod filter;
mod handle;

pub use cache::ChangeCache;
pub use filter::FilterCriterion;
pub use handle::SubscriptionHandle;
