//! Input validation utilities.
//!
//! Shared checks for values that arrive from forms, the relay and the model provider.

use crate::error::{ValidationError, ValidationResult};

/// Longest location string accepted from a form or relay request.
const MAX_LOCATION_LEN: usize = 512;

/// Validates that a location is present and of sane length.
///
/// # Errors
///
/// Returns a `ValidationError::InvalidInput` if the location is empty or too long.
pub fn validate_location(location: &str) -> ValidationResult<()> {
    if location.trim().is_empty() {
        return Err(ValidationError::InvalidInput(
            "location cannot be empty".into(),
        ));
    }

    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "location exceeds maximum length of {} characters",
            MAX_LOCATION_LEN
        )));
    }

    Ok(())
}

/// Validates a latitude/longitude pair.
///
/// # Errors
///
/// Returns a `ValidationError::InvalidInput` if either value is not finite or out of range.
pub fn validate_coordinates(lat: f64, lng: f64) -> ValidationResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::InvalidInput(format!(
            "latitude out of range: {lat}"
        )));
    }

    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::InvalidInput(format!(
            "longitude out of range: {lng}"
        )));
    }

    Ok(())
}

/// Validates that an amount is a finite, strictly positive number.
pub(crate) fn validate_positive_amount(name: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidInput(format!(
            "{name} must be a positive amount, got {value}"
        )))
    }
}
