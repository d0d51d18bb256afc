mod answer;
mod history;
mod ids;
mod mistake;
mod question;
mod results;
mod session;

pub use answer::Answer;
pub use history::HistoryItem;
pub use ids::{ParseIdError, PracticeSetId, QuestionId, SessionId, WordlistId};
pub use mistake::{Mistake, QueuedMistake};
pub use question::{
    ChoiceOption, FillBlankQuestion, MatchPair, MatchingQuestion, MultipleChoiceQuestion,
    QuestionCategory, QuestionRef, QuestionSet,
};
pub use results::{CategoryScore, SessionResults};
pub use session::{SessionSnapshot, SessionState};
