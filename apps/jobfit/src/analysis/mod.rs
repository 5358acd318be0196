// Analysis workflow: upload draft → submit → normalize → report.
// The remote call goes through scoring_client; this module owns the sequencing.

pub mod draft;
pub mod normalizer;
pub mod recommendations;
pub mod workflow;

pub use draft::{DraftInput, UploadDraft, UploadFile};
pub use normalizer::{normalize, ScoreScale};
pub use recommendations::display_recommendations;
pub use workflow::{AnalysisWorkflow, SubmitOutcome, WorkflowEvent, WorkflowStep};
