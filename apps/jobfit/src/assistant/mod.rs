// Follow-up conversation about a completed analysis.
// All chat calls go through scoring_client; the session only reads its report.

pub mod session;

pub use session::{AskOutcome, AssistantSession, FALLBACK_ANSWER};
