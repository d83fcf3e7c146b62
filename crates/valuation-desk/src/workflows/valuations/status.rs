use serde::{Deserialize, Serialize};

/// Closed set of workflow statuses. Raw strings cross into this enum exactly
/// once, through [`normalize`]; everything downstream compares enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "on-progress")]
    OnProgress,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "rework")]
    Rework,
}

impl ValuationStatus {
    pub const ALL: [ValuationStatus; 5] = [
        ValuationStatus::Pending,
        ValuationStatus::OnProgress,
        ValuationStatus::Approved,
        ValuationStatus::Rejected,
        ValuationStatus::Rework,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ValuationStatus::Pending => "pending",
            ValuationStatus::OnProgress => "on-progress",
            ValuationStatus::Approved => "approved",
            ValuationStatus::Rejected => "rejected",
            ValuationStatus::Rework => "rework",
        }
    }
}

/// Maps a raw status value onto the closed enum. Trims surrounding
/// whitespace, lowercases, and accepts only exact label matches; anything
/// else yields `None`. Total: never panics, whatever the input.
pub fn normalize(raw: Option<&str>) -> Option<ValuationStatus> {
    let cleaned = raw?.trim().to_ascii_lowercase();
    match cleaned.as_str() {
        "pending" => Some(ValuationStatus::Pending),
        "on-progress" => Some(ValuationStatus::OnProgress),
        "approved" => Some(ValuationStatus::Approved),
        "rejected" => Some(ValuationStatus::Rejected),
        "rework" => Some(ValuationStatus::Rework),
        _ => None,
    }
}
