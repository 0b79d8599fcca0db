//! Naming rules for uploaded files.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssetNameError {
    #[error("file name cannot be empty")]
    EmptyFileName,
    #[error("file name `{0}` has no extension")]
    MissingExtension(String),
}

/// Reduce a client-supplied file name to one safe path segment.
///
/// Directory parts are dropped, whitespace becomes `-` and anything outside
/// `[A-Za-z0-9._-]` becomes `_`.
///
/// # Errors
///
/// Returns `AssetNameError::EmptyFileName` if nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> Result<String, AssetNameError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => c,
            c if c.is_whitespace() => '-',
            _ => '_',
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        return Err(AssetNameError::EmptyFileName);
    }
    Ok(cleaned)
}

/// Lowercased extension of `file_name`, without the dot.
///
/// # Errors
///
/// Returns `AssetNameError` if the name is empty or has no extension.
pub fn file_extension(file_name: &str) -> Result<String, AssetNameError> {
    let name = sanitize_file_name(file_name)?;
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok(ext.to_ascii_lowercase()),
        _ => Err(AssetNameError::MissingExtension(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my sea.jpg").unwrap(), "my-sea.jpg");
        assert_eq!(sanitize_file_name("çardak?.png").unwrap(), "_ardak_.png");
    }

    #[test]
    fn sanitize_rejects_empty_names() {
        assert_eq!(sanitize_file_name("  "), Err(AssetNameError::EmptyFileName));
        assert_eq!(sanitize_file_name("photos/.."), Err(AssetNameError::EmptyFileName));
        assert_eq!(sanitize_file_name("dir/"), Err(AssetNameError::EmptyFileName));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Fox.JPG").unwrap(), "jpg");
        assert_eq!(file_extension("archive.tar.gz").unwrap(), "gz");
        assert!(matches!(file_extension("README"), Err(AssetNameError::MissingExtension(_))));
        assert!(matches!(file_extension(".env"), Err(AssetNameError::MissingExtension(_))));
    }
}
