//! Cross-store result merging and boosted re-ranking.

mod scorer;
mod types;


pub use scorer::ResultRanker;
pub use types::{BoostConfig, RankedResult};
