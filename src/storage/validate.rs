use std::fmt;

use crate::config::UploadConfig;

/// Why an uploaded file was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    Empty,
    /// `size` is the number of bytes seen before the upload was refused.
    TooLarge { size: usize, max: usize },
    UnsupportedType(String),
    MissingName,
    BatchLimit { max: usize },
}

impl UploadRejection {
    pub fn is_size(&self) -> bool {
        matches!(self, UploadRejection::TooLarge { .. })
    }
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadRejection::Empty => write!(f, "file is empty"),
            UploadRejection::TooLarge { max, .. } => write!(f, "file exceeds the maximum of {} bytes", max),
            UploadRejection::UnsupportedType(ct) => write!(f, "content type '{}' is not allowed", ct),
            UploadRejection::MissingName => write!(f, "file name is missing"),
            UploadRejection::BatchLimit { max } => write!(f, "batch limit of {} files reached", max),
        }
    }
}

pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    size: usize,
    limits: &UploadConfig,
) -> Result<(), UploadRejection> {
    if sanitize_file_name(file_name).is_empty() {
        return Err(UploadRejection::MissingName);
    }
    if size == 0 {
        return Err(UploadRejection::Empty);
    }
    if size > limits.max_file_bytes {
        return Err(UploadRejection::TooLarge {
            size,
            max: limits.max_file_bytes,
        });
    }
    let content_type = content_type.trim().to_ascii_lowercase();
    if !limits.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&content_type)) {
        return Err(UploadRejection::UnsupportedType(content_type));
    }
    Ok(())
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`, dropping any path.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    trimmed.chars().take(120).collect()
}

/// Relative path with no parent, root or empty segments.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
