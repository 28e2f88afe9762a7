//! Request Validation
//!
//! Checks shared by the text and file render handlers.

use puml_core::OutputFormat;

use crate::constants::ALLOWED_UPLOAD_CONTENT_TYPES;
use crate::error::{ApiError, ApiResult};

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// use puml_api::validation::ValidateNonEmpty;
///
/// fn generate(text: &str) -> ApiResult<()> {
///     text.validate_non_empty("text")?;
///     // ... rest of logic
/// }
/// ```
pub trait ValidateNonEmpty {
    /// Validate that the value is non-empty.
    ///
    /// # Errors
    /// Returns `ApiError::missing_field` if the value is empty or whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for &str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        (*self).validate_non_empty(field_name)
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ApiError::missing_field(field_name)),
        }
    }
}

/// Resolve the optional `outputType` field. Absent or blank means PNG.
pub fn parse_output_type(raw: Option<&str>) -> ApiResult<OutputFormat> {
    match raw.map(str::trim).filter(|name| !name.is_empty()) {
        None => Ok(OutputFormat::default()),
        Some(name) => OutputFormat::from_name(name)
            .ok_or_else(|| ApiError::invalid_format("outputType", "PNG or SVG")),
    }
}

/// Check an uploaded diagram file's media type and size.
///
/// Media type parameters such as `charset` are ignored. A missing content
/// type is rejected.
pub fn validate_upload(
    content_type: Option<&str>,
    len: usize,
    max_bytes: usize,
) -> ApiResult<()> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_UPLOAD_CONTENT_TYPES.contains(&essence.as_str()) {
        let found = if essence.is_empty() { "none" } else { essence.as_str() };
        return Err(ApiError::unsupported_media_type(
            found,
            ALLOWED_UPLOAD_CONTENT_TYPES,
        ));
    }
    if len == 0 {
        return Err(ApiError::missing_field("file"));
    }
    if len > max_bytes {
        return Err(ApiError::payload_too_large(max_bytes));
    }
    Ok(())
}
