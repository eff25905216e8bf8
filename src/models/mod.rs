pub mod loader;
pub mod question;

pub use loader::load_submission_file;
pub use question::{
    DuplicateMatch, MatchRecord, NewQuestion, PendingMatch, Question, QuestionId, QuestionStatus,
    RelationType, Verdict,
};
