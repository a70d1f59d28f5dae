// SPDX-License-Identifier: MIT

//! Funnel lead capture model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lead captured by the quiz/checklist funnel pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Which funnel page captured the lead (e.g. "quiz", "checklist")
    #[serde(default)]
    pub source: Option<String>,
    pub captured_at: DateTime<Utc>,
}
