pub mod evaluation;
pub mod oracle;
pub mod screen;
pub mod session;
pub mod store;
pub mod topic;

pub use session::{InterviewSession, MAX_TURNS, SessionEvent, SessionStatus, TranscriptEntry};
