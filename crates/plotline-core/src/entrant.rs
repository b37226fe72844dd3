//! Entrant model - one applicant on the garden waitlist.

use crate::error::{Error, FieldError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, immutable entrant identifier.
///
/// Generated once at admission and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntrantId(String);

impl EntrantId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier (Blake3 over email, admission time and a nonce).
    pub fn generate(email: &str, created_at: u64) -> Self {
        let nonce: u64 = rand::random();
        let content = format!("{}:{}:{}", email, created_at, nonce);
        Self(hex::encode(blake3::hash(content.as_bytes()).as_bytes()))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines and CLI tables.
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(12).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for EntrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntrantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntrantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Self-reported gardening experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "No experience")]
    NoExperience,
    Beginner,
    Intermediate,
    Experienced,
    Expert,
}

impl ExperienceLevel {
    /// Every level, least to most experienced.
    pub const ALL: [Self; 5] = [
        Self::NoExperience,
        Self::Beginner,
        Self::Intermediate,
        Self::Experienced,
        Self::Expert,
    ];

    /// Display label (also the stored value).
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoExperience => "No experience",
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Experienced => "Experienced",
            Self::Expert => "Expert",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExperienceLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no experience" | "no-experience" | "none" => Ok(Self::NoExperience),
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "experienced" => Ok(Self::Experienced),
            "expert" => Ok(Self::Expert),
            other => Err(Error::Validation(vec![FieldError::new(
                "experience",
                format!(
                    "Unknown experience level '{}' (expected one of: {})",
                    other,
                    Self::ALL.map(|level| level.label()).join(", ")
                ),
            )])),
        }
    }
}

/// Descriptive entrant fields. Irrelevant to ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    /// Unique across the waitlist (compared via [`normalize_email`])
    pub email: String,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience: Option<ExperienceLevel>,

    /// Free-text notes from the applicant
    pub notes: Option<String>,
}

impl Profile {
    /// Profile with only the required fields set.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            address: None,
            experience: None,
            notes: None,
        }
    }
}

/// One waitlist applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,

    /// 1-based rank in the waitlist
    pub line_position: u32,

    #[serde(flatten)]
    pub profile: Profile,

    /// Unix milliseconds, set by the store
    pub created_at: u64,

    /// Unix milliseconds, set by the store
    pub updated_at: u64,
}

impl Entrant {
    /// Create an entrant admitted at `now`.
    pub fn new(id: EntrantId, profile: Profile, line_position: u32, now: u64) -> Self {
        Self {
            id,
            line_position,
            profile,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single position assignment produced by the re-sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: EntrantId,
    pub line_position: u32,
}

impl PositionUpdate {
    pub fn new(id: EntrantId, line_position: u32) -> Self {
        Self { id, line_position }
    }
}

/// Canonical form of an email address for uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
