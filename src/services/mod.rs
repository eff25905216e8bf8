pub mod arbiter;
pub mod lexical;
pub mod lifecycle;
pub mod relation_graph;
pub mod selection_validator;
pub mod similarity;

pub use arbiter::{Judgement, VerdictArbiter};
pub use lexical::{LexicalDisambiguator, LexicalReport};
pub use lifecycle::{LifecycleService, StatusCounts};
pub use relation_graph::{LinkOutcome, RelationGraph};
pub use selection_validator::{SelectionReport, SelectionValidator};
pub use similarity::SimilarityScorer;
