use std::borrow::Cow;
use std::collections::HashMap;

use crate::entities::CoordKey;
use crate::transfer::MAX_FILE_SIZE_IN_BYTES;
use crate::utils::str_utils::StringExtensions;

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// The unvalidated payload of one add-memory action. Lives only for the
/// duration of the submission, never persisted as-is.
#[derive(Clone, Default)]
pub struct RawSubmission {
    pub name: String,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
    pub files: Vec<RawFile>,
}

#[derive(Clone)]
pub struct RawFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for RawFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A submission that passed every field rule. Name and description are
/// trimmed and case-folded, coordinates are parsed and range-checked.
#[derive(Clone, Debug)]
pub struct NormalizedSubmission {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub files: Vec<RawFile>,
}

impl NormalizedSubmission {
    pub fn coord_key(&self) -> CoordKey {
        CoordKey::new(self.latitude, self.longitude)
    }
}

/// Field-keyed validation errors, accumulated across all fields in one pass
/// so the caller can show every violated field simultaneously.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
}

impl FieldErrors {
    pub fn push(&mut self, field: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[Cow<'static, str>]> {
        self.errors.get(field).map(|x| x.as_slice())
    }

    pub fn into_map(self) -> HashMap<Cow<'static, str>, Vec<Cow<'static, str>>> {
        self.errors
    }
}

/// Check every field rule independently and collect the full error set.
/// Normalization happens only after all rules pass.
pub fn validate(raw: &RawSubmission) -> Result<NormalizedSubmission, FieldErrors> {
    let mut errors = FieldErrors::default();

    if raw.name.trim().is_empty() {
        errors.push("name", "Name is required");
    }
    if raw.description.trim().is_empty() {
        errors.push("description", "Description is required");
    }

    let latitude = validate_coordinate(&raw.latitude, "latitude", "Latitude", LATITUDE_RANGE, &mut errors);
    let longitude = validate_coordinate(&raw.longitude, "longitude", "Longitude", LONGITUDE_RANGE, &mut errors);

    if raw.files.is_empty() {
        errors.push("files", "At least one image is required");
    }
    for file in &raw.files {
        if !is_image_type(&file.content_type) {
            errors.push("files", format!("Invalid file type: {}", file.content_type));
        }
        if file.bytes.len() > MAX_FILE_SIZE_IN_BYTES {
            errors.push("files", "File size too large. Maximum size is 5MB");
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NormalizedSubmission {
        name: raw.name.case_fold(),
        description: raw.description.case_fold(),
        latitude: latitude.unwrap_or_default(),
        longitude: longitude.unwrap_or_default(),
        files: raw.files.clone(),
    })
}

fn validate_coordinate(
    raw: &str,
    field: &'static str,
    label: &str,
    (min, max): (f64, f64),
    errors: &mut FieldErrors,
) -> Option<f64> {
    let raw = raw.trim();
    if !is_decimal(raw) {
        errors.push(field, format!("{label} is required and must be a number"));
        return None;
    }
    let value: f64 = match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            errors.push(field, format!("{label} is required and must be a number"));
            return None;
        }
    };
    if value < min || value > max {
        errors.push(field, format!("{label} must be between {min} and {max}"));
        return None;
    }
    Some(value)
}

/// Decimal number format: optional leading minus sign, digits with at most
/// one fractional dot, nothing else, and at least one digit.
fn is_decimal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit())
}

pub fn is_image_type(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false)
}
