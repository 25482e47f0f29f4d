use serde::{Deserialize, Serialize};

use crate::scoring::evaluator::{PracticeOutcome, SubmitOutcome};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitFlagRequest {
    #[schema(example = "flag{sm4ll_e}")]
    pub flag: String,
}

/// Accepted competitive submission.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitFlagResponse {
    pub ok: bool,
    /// The team held credit already; nothing was awarded.
    pub already_solved: bool,
    /// Points awarded by this submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

impl From<SubmitOutcome> for SubmitFlagResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Solved { points } => Self {
                ok: true,
                already_solved: false,
                points: Some(points),
            },
            SubmitOutcome::AlreadySolved => Self {
                ok: true,
                already_solved: true,
                points: None,
            },
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PracticeSubmitResponse {
    pub correct: bool,
    pub already_solved: bool,
}

impl From<PracticeOutcome> for PracticeSubmitResponse {
    fn from(outcome: PracticeOutcome) -> Self {
        let (correct, already_solved) = match outcome {
            PracticeOutcome::Correct => (true, false),
            PracticeOutcome::AlreadySolved => (true, true),
            PracticeOutcome::Incorrect => (false, false),
        };
        Self {
            correct,
            already_solved,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct HintRequest {
    /// 1 (general) to 3 (most specific).
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub tier: u8,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HintResponse {
    pub tier: u8,
    #[schema(example = "Identify the cipher or scheme used.")]
    pub hint: String,
    /// Whether a more specific tier exists.
    pub has_more: bool,
}
