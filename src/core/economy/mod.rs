// Economy module - domain types and the storage port for the bot's currency

mod economy_models;
mod economy_store;

pub use economy_models::{timestamp_or_epoch, AccountKey, PlayerBalance};
pub use economy_store::{EconomyError, EconomyStore};
