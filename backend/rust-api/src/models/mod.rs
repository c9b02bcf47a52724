pub mod progress;
pub mod requests;

pub use progress::{
    AdaptiveQuestion, Attempt, ConceptStat, Difficulty, StudentProgress, TopicStat,
    RECENT_ATTEMPTS_LIMIT,
};
pub use requests::{
    AdaptiveQuestionRequest, ProgressMetadata, ProgressUpdate, ProgressUpdateResponse,
    SubmitAttemptRequest,
};
