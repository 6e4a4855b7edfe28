//! Output file naming.
//!
//! When the caller names only a directory (or nothing), the file name is
//! taken from the last path segment of the URL and sanitized for the local
//! filesystem.

use std::path::{Component, Path, PathBuf};

use url::Url;

use super::error::DownloadError;

/// Name used when the URL has no usable last segment.
const FALLBACK_FILENAME: &str = "download.bin";

/// Resolves where a download of `url` should be written.
///
/// - `None`: a file named after the URL in the current directory
/// - an existing directory: a file named after the URL inside it
/// - anything else: used as-is
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] if a name must be derived and `url`
/// does not parse.
pub fn resolve_output_path(url: &str, output: Option<&Path>) -> Result<PathBuf, DownloadError> {
    match output {
        Some(path) if !path.is_dir() => Ok(path.to_path_buf()),
        dir => {
            let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
            let name = filename_from_url(&parsed);
            Ok(dir.map_or_else(|| PathBuf::from(&name), |d| d.join(&name)))
        }
    }
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// File name from the URL's last path segment, or `download.bin`.
pub(crate) fn filename_from_url(url: &Url) -> String {
    if let Some(mut segments) = url.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        let name = sanitize_filename(last);
        if !name.trim_matches('_').is_empty() {
            return name;
        }
    }
    FALLBACK_FILENAME.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("file/name.iso"), "file_name.iso");
        assert_eq!(sanitize_filename("file\\name.iso"), "file_name.iso");
        assert_eq!(sanitize_filename("file:name.iso"), "file_name.iso");
        assert_eq!(sanitize_filename("a*b?c\"d<e>f|g"), "a_b_c_d_e_f_g");
    }

    #[test]
    fn test_sanitize_filename_rewrites_dot_segments() {
        assert_eq!(sanitize_filename(".."), "__");
        assert_eq!(sanitize_filename("."), "_");
    }

    #[test]
    fn test_sanitize_filename_preserves_valid_chars() {
        assert_eq!(sanitize_filename("ubuntu-24.04.1-desktop.iso"), "ubuntu-24.04.1-desktop.iso");
    }

    #[test]
    fn test_filename_from_url_uses_last_path_segment() {
        let url = Url::parse("https://example.com/media/clip.mp4?sig=abc").unwrap();
        assert_eq!(filename_from_url(&url), "clip.mp4");
    }

    #[test]
    fn test_filename_from_url_empty_path_falls_back() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), "download.bin");
    }

    #[test]
    fn test_filename_from_url_dot_segment_falls_back() {
        let url = Url::parse("https://example.com/a/%2E%2E").unwrap();
        assert_eq!(filename_from_url(&url), "download.bin");
    }

    #[test]
    fn test_resolve_output_path_without_output_uses_url_name() {
        let path = resolve_output_path("https://example.com/files/big.tar", None).unwrap();
        assert_eq!(path, PathBuf::from("big.tar"));
    }

    #[test]
    fn test_resolve_output_path_directory_joins_url_name() {
        let temp_dir = TempDir::new().unwrap();
        let path =
            resolve_output_path("https://example.com/files/big.tar", Some(temp_dir.path())).unwrap();
        assert_eq!(path, temp_dir.path().join("big.tar"));
    }

    #[test]
    fn test_resolve_output_path_explicit_file_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("renamed.bin");
        let path = resolve_output_path("not a url", Some(&target)).unwrap();
        assert_eq!(path, target);
    }

    #[test]
    fn test_resolve_output_path_invalid_url() {
        let result = resolve_output_path("not a url", None);
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
