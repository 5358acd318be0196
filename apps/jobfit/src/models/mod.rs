pub mod conversation;
pub mod report;

pub use conversation::{ConversationTurn, Role};
pub use report::{MatchBand, MatchReport};
