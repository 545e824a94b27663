pub mod client;
pub mod memory;
mod record;
pub mod store;

pub use store::{DbError, PostStore, Result, SaveOutcome};
