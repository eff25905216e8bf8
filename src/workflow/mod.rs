pub mod dedup_flow;

pub use dedup_flow::{DedupFlow, HIGH_MATCH_REASON};
