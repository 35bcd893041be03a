//! Filename sanitising and output-root containment.

use std::path::{Component, Path, PathBuf};

use crate::error::{JobError, Result};

/// Longest filename stem kept from a video title, in bytes.
///
/// Filesystems cap names at 255 bytes; this leaves room for the extension.
pub const MAX_STEM_BYTES: usize = 200;

/// Strip characters that are invalid in filenames and truncate.
///
/// Truncation happens on a character boundary so multibyte titles stay
/// valid UTF-8. Returns an empty string when nothing usable remains;
/// callers pick their own fallback.
pub fn safe_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    let end = trimmed
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= MAX_STEM_BYTES)
        .last()
        .unwrap_or(0);
    trimmed[..end].trim_end().to_string()
}

/// Join `sub_path` onto `root`, rejecting anything that would leave it.
///
/// Absolute paths and `..` segments that climb above `root` are refused.
/// This is purely lexical; [`ensure_creatable_within`] and
/// [`ensure_contained`] check the real filesystem before and after the
/// destination is created so symlinks inside the root cannot redirect it.
pub fn resolve_within(root: &Path, sub_path: &str) -> Result<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(sub_path).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(escape_error());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape_error()),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(parts);
    Ok(resolved)
}

/// Verify that an existing `path` canonicalises to a descendant of `root`.
pub async fn ensure_contained(root: &Path, path: &Path) -> Result<PathBuf> {
    let canonical_root = tokio::fs::canonicalize(root).await?;
    let canonical = tokio::fs::canonicalize(path).await?;
    if canonical.starts_with(&canonical_root) {
        Ok(canonical)
    } else {
        Err(escape_error())
    }
}

/// Verify that the deepest existing ancestor of `path` lies inside `root`.
///
/// Run before creating directories along `path` so a symlink already
/// planted under `root` cannot make `create_dir_all` build outside it.
pub async fn ensure_creatable_within(root: &Path, path: &Path) -> Result<()> {
    let canonical_root = tokio::fs::canonicalize(root).await?;
    for ancestor in path.ancestors() {
        if tokio::fs::symlink_metadata(ancestor).await.is_err() {
            continue;
        }
        // A dangling link cannot be resolved, so it cannot be trusted.
        let canonical = tokio::fs::canonicalize(ancestor)
            .await
            .map_err(|_| escape_error())?;
        return if canonical.starts_with(&canonical_root) {
            Ok(())
        } else {
            Err(escape_error())
        };
    }
    Err(escape_error())
}

/// Media type served for an artifact, by extension.
pub fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

fn escape_error() -> JobError {
    JobError::Validation("Invalid path: must be within OUTPUT_DIR".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_strips_reserved_characters() {
        assert_eq!(safe_filename("AC/DC: Back in Black?"), "ACDC Back in Black");
        assert_eq!(safe_filename("  <*>  "), "");
        assert_eq!(safe_filename("line\u{0}break\n"), "linebreak");
    }

    #[test]
    fn test_safe_filename_truncates() {
        let long = "a".repeat(500);
        assert_eq!(safe_filename(&long).len(), MAX_STEM_BYTES);
    }

    #[test]
    fn test_safe_filename_multibyte_fits_byte_budget() {
        // 3 bytes per character: 120 chars would be 360 bytes
        let title = "歌".repeat(120);
        let stem = safe_filename(&title);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert_eq!(stem, "歌".repeat(MAX_STEM_BYTES / 3));

        let mixed = format!("a{}", "é".repeat(150));
        let stem = safe_filename(&mixed);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(stem.starts_with('a'));
    }

    #[test]
    fn test_resolve_within_accepts_nested_paths() {
        let root = Path::new("/srv/music");
        assert_eq!(
            resolve_within(root, "artists/queen").unwrap(),
            PathBuf::from("/srv/music/artists/queen")
        );
        assert_eq!(
            resolve_within(root, "a/../b/./c").unwrap(),
            PathBuf::from("/srv/music/b/c")
        );
        assert_eq!(resolve_within(root, "").unwrap(), PathBuf::from("/srv/music"));
    }

    #[test]
    fn test_resolve_within_rejects_escapes() {
        let root = Path::new("/srv/music");
        for attack in ["..", "../etc", "a/../../etc", "/etc", "./../music2", "a/b/../../../x"] {
            let err = resolve_within(root, attack).unwrap_err();
            assert!(matches!(err, JobError::Validation(_)), "{attack}");
        }
    }

    #[tokio::test]
    async fn test_ensure_contained_rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let inside = root.path().join("ok");
        std::fs::create_dir(&inside).unwrap();
        assert!(ensure_contained(root.path(), &inside).await.is_ok());

        #[cfg(unix)]
        {
            let link = root.path().join("sneaky");
            std::os::unix::fs::symlink(outside.path(), &link).unwrap();
            let err = ensure_contained(root.path(), &link).await.unwrap_err();
            assert!(matches!(err, JobError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_ensure_creatable_within_checks_existing_ancestor() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("albums")).unwrap();

        let fresh = root.path().join("albums/queen/live");
        assert!(ensure_creatable_within(root.path(), &fresh).await.is_ok());
        assert!(!fresh.exists());

        #[cfg(unix)]
        {
            let outside = tempfile::tempdir().unwrap();
            let link = root.path().join("sneaky");
            std::os::unix::fs::symlink(outside.path(), &link).unwrap();
            let err = ensure_creatable_within(root.path(), &link.join("planted"))
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::Validation(_)));

            let dangling = root.path().join("dangling");
            std::os::unix::fs::symlink(outside.path().join("missing"), &dangling).unwrap();
            let err = ensure_creatable_within(root.path(), &dangling.join("planted"))
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::Validation(_)));
        }
    }

    #[test]
    fn test_media_types() {
        assert_eq!(media_type_for(Path::new("x/Song.mp4")), "video/mp4");
        assert_eq!(media_type_for(Path::new("Song.mp3")), "audio/mpeg");
        assert_eq!(media_type_for(Path::new("Song")), "application/octet-stream");
    }
}
