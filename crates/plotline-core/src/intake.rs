//! Intake validation for the public sign-up form and admin edits.
//!
//! Loosely-typed payloads are checked field by field before anything reaches
//! the allocator. Every problem is collected so the caller can report them
//! all at once.

use crate::entrant::{ExperienceLevel, Profile};
use crate::error::{Error, FieldError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

static PHONE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-()+.]+$").expect("phone pattern"));

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern"));

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// Public sign-up payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Single-line address; used when the structured parts are blank
    pub address: String,
    pub address_street: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zip: String,
    pub experience: Option<String>,
    pub notes: Option<String>,
    pub captcha_token: Option<String>,
}

impl SignUpForm {
    /// Validate into a storable profile. Phone and an address are required:
    /// either a street line or the single-line `address`.
    pub fn validate(&self) -> Result<Profile> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        check_email(&self.email, &mut errors);
        let phone = check_phone(&self.phone, true, &mut errors);
        if self.address_street.trim().is_empty() && self.address.trim().is_empty() {
            errors.push(FieldError::new("addressStreet", "Street address is required"));
        }
        let zip = self.address_zip.trim();
        if !zip.is_empty() && !ZIP_RE.is_match(zip) {
            errors.push(FieldError::new(
                "addressZip",
                "Please enter a valid ZIP code (e.g., 12345 or 12345-6789)",
            ));
        }
        let experience = check_experience(self.experience.as_deref(), &mut errors);

        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(Profile {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone,
            address: self.full_address(),
            experience,
            notes: non_blank(self.notes.as_deref()),
        })
    }

    /// Address parts joined with `", "`, blanks skipped. Falls back to the
    /// single-line address.
    pub fn full_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.address_street,
            &self.address_city,
            &self.address_state,
            &self.address_zip,
        ]
        .into_iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
        if parts.is_empty() {
            return non_blank(Some(self.address.as_str()));
        }
        Some(parts.join(", "))
    }

    /// Whether the applicant gave a ZIP other than the garden's own.
    pub fn is_outside_service_area(&self, home_zip: &str) -> bool {
        let zip = self.address_zip.trim();
        !zip.is_empty() && zip != home_zip
    }

    /// The CAPTCHA token, if one was supplied and is not blank.
    pub fn captcha_token(&self) -> Option<&str> {
        self.captcha_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Admin-entered entrant. Phone is optional here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrantForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience: Option<String>,
    pub notes: Option<String>,
}

impl EntrantForm {
    /// Validate into a storable profile.
    pub fn validate(&self) -> Result<Profile> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        check_email(&self.email, &mut errors);
        let phone = check_phone(self.phone.as_deref().unwrap_or(""), false, &mut errors);
        let experience = check_experience(self.experience.as_deref(), &mut errors);

        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(Profile {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone,
            address: non_blank(self.address.as_deref()),
            experience,
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

impl From<&Profile> for EntrantForm {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            experience: profile.experience.map(|e| e.label().to_string()),
            notes: profile.notes.clone(),
        }
    }
}

/// Partial profile edit. `None` keeps a field; an empty string clears an
/// optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrantPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience: Option<String>,
    pub notes: Option<String>,
}

impl EntrantPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `profile` and re-validate the result.
    pub fn apply(&self, profile: &Profile) -> Result<Profile> {
        let mut form = EntrantForm::from(profile);
        if let Some(name) = &self.name {
            form.name = name.clone();
        }
        if let Some(email) = &self.email {
            form.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            form.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            form.address = Some(address.clone());
        }
        if let Some(experience) = &self.experience {
            form.experience = Some(experience.clone());
        }
        if let Some(notes) = &self.notes {
            form.notes = Some(notes.clone());
        }
        form.validate()
    }
}

/// Format a phone number for storage.
///
/// 10 digits become `(XXX) XXX-XXXX`, 11 digits with a leading 1 become
/// `+1 (XXX) XXX-XXXX`, and 12-15 digit international numbers get a `+`
/// country-code prefix. Anything else is returned as bare digits.
pub fn format_phone(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("+1 ({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        12 | 13 => format!("+{} {}", &digits[..2], &digits[2..]),
        14 | 15 => format!("+{} {}", &digits[..3], &digits[3..]),
        _ => digits,
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !EMAIL_RE.is_match(email) {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
    }
}

fn check_phone(phone: &str, required: bool, errors: &mut Vec<FieldError>) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        if required {
            errors.push(FieldError::new("phone", "Phone is required"));
        }
        return None;
    }
    if !PHONE_CHARS_RE.is_match(phone) {
        errors.push(FieldError::new(
            "phone",
            "Phone number can only contain digits, spaces, dashes, parentheses, periods, and +",
        ));
        return None;
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        errors.push(FieldError::new("phone", "Please enter at least 10 digits"));
        return None;
    }
    if digits > MAX_PHONE_DIGITS {
        errors.push(FieldError::new("phone", "Phone number cannot have more than 15 digits"));
        return None;
    }
    Some(format_phone(phone))
}

fn check_experience(
    experience: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<ExperienceLevel> {
    let value = experience.map(str::trim).filter(|v| !v.is_empty())?;
    match value.parse::<ExperienceLevel>() {
        Ok(level) => Some(level),
        Err(Error::Validation(mut field_errors)) => {
            errors.append(&mut field_errors);
            None
        }
        Err(other) => {
            errors.push(FieldError::new("experience", other.to_string()));
            None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
