mod converter;
mod jsonl_store;
mod models;
mod store;

pub use converter::{Conversion, CurrencyConverter, RateConverter};
pub use jsonl_store::JsonlFxRateStore;
pub use models::FxRatePoint;
pub use store::{FxRateStore, MemoryFxRateStore};
