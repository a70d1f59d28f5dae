// SPDX-License-Identifier: MIT

//! Prompt content model.
//!
//! Prompts are authored out of band and read-only from the API's
//! perspective.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prompt template document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Document ID (opaque slug)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Template text with `{{field}}` placeholders
    pub template: String,
    /// Fields the user fills in before using the template
    #[serde(default)]
    pub fields: Vec<PromptField>,
    pub category: String,
    /// Difficulty/maturity level (e.g. "iniciante", "avancado")
    pub level: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

/// A fill-in field within a prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
}
