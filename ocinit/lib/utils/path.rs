use crate::{OcinitError, OcinitResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The filename of the OCI layout's image index JSON document.
pub const OCI_INDEX_FILENAME: &str = "index.json";

/// The sub directory of an OCI layout holding content-addressed blobs.
pub const OCI_BLOBS_SUBDIR: &str = "blobs";

/// Basename prefix marking an AUFS-style whiteout entry.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// Basename marking the entry's parent directory as opaque.
pub const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A whiteout instruction decoded from a layer tar entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Whiteout {
    /// Hides a single sibling path (and its descendants) in lower layers.
    File(String),

    /// Marks a directory opaque: lower layers contribute nothing at or
    /// below it.
    Opaque(String),
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Cleans a raw tar entry name into the merge-key form: no leading slash, no
/// `.` or empty segments. An empty string comes back for the archive root
/// itself. Names with `..` segments are rejected, a layer has no business
/// referencing its parent.
pub fn clean_entry_path(raw: &str) -> OcinitResult<String> {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(OcinitError::MalformedPath(raw.to_string())),
            _ => segments.push(segment),
        }
    }
    Ok(segments.join("/"))
}

/// Splits a cleaned path into `(parent, basename)`. The parent is empty for
/// top-level entries.
pub fn split_basename(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Classifies a cleaned entry path as a whiteout instruction, if it is one.
pub fn classify_whiteout(path: &str) -> Option<Whiteout> {
    let (parent, base) = split_basename(path);
    if base == OPAQUE_WHITEOUT {
        return Some(Whiteout::Opaque(parent.to_string()));
    }
    if let Some(target) = base.strip_prefix(WHITEOUT_PREFIX) {
        return Some(Whiteout::File(join_path(parent, target)));
    }
    None
}

/// True when `path` is `dir` itself or lies underneath it. An empty `dir`
/// denotes the archive root, which contains everything.
pub fn path_within(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    match path.strip_prefix(dir) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Rewrites a merge-key path into the emitted archive form: `./` prefix,
/// trailing `/` for directories.
pub fn archive_name(cleaned: &str, is_dir: bool) -> String {
    if is_dir {
        format!("./{}/", cleaned)
    } else {
        format!("./{}", cleaned)
    }
}

fn join_path(parent: &str, base: &str) -> String {
    if parent.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent, base)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_entry_path() -> OcinitResult<()> {
        assert_eq!(clean_entry_path("./etc/passwd")?, "etc/passwd");
        assert_eq!(clean_entry_path("/etc/passwd")?, "etc/passwd");
        assert_eq!(clean_entry_path("etc//passwd")?, "etc/passwd");
        assert_eq!(clean_entry_path("etc/./passwd")?, "etc/passwd");
        assert_eq!(clean_entry_path("usr/share/")?, "usr/share");
        assert_eq!(clean_entry_path("./")?, "");
        assert_eq!(clean_entry_path(".")?, "");
        Ok(())
    }

    #[test]
    fn test_clean_entry_path_rejects_parent_segments() {
        assert!(matches!(
            clean_entry_path("etc/../../passwd"),
            Err(OcinitError::MalformedPath(_))
        ));
        assert!(matches!(
            clean_entry_path(".."),
            Err(OcinitError::MalformedPath(_))
        ));
    }

    #[test]
    fn test_split_basename() {
        assert_eq!(split_basename("etc/passwd"), ("etc", "passwd"));
        assert_eq!(split_basename("passwd"), ("", "passwd"));
        assert_eq!(split_basename("a/b/c"), ("a/b", "c"));
    }

    #[test]
    fn test_classify_whiteout() {
        assert_eq!(classify_whiteout("etc/passwd"), None);
        assert_eq!(
            classify_whiteout("etc/.wh.passwd"),
            Some(Whiteout::File("etc/passwd".to_string()))
        );
        assert_eq!(
            classify_whiteout(".wh.file1.txt"),
            Some(Whiteout::File("file1.txt".to_string()))
        );
        assert_eq!(
            classify_whiteout("dir1/.wh..wh..opq"),
            Some(Whiteout::Opaque("dir1".to_string()))
        );
        assert_eq!(
            classify_whiteout(".wh..wh..opq"),
            Some(Whiteout::Opaque(String::new()))
        );
    }

    #[test]
    fn test_path_within() {
        assert!(path_within("d", "d"));
        assert!(path_within("d/x", "d"));
        assert!(path_within("d/x/y", "d"));
        assert!(!path_within("dd", "d"));
        assert!(!path_within("dd/x", "d"));
        assert!(!path_within("e/x", "d"));
        assert!(path_within("anything", ""));
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name("etc", true), "./etc/");
        assert_eq!(archive_name("etc/passwd", false), "./etc/passwd");
    }
}
