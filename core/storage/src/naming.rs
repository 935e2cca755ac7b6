//! Storage key normalization.
//!
//! Turns a caller-supplied logical name such as `"uploads/my file.png"` into a
//! key every backend can address safely. Only the leaf filename is rewritten;
//! the directory prefix is kept segment by segment.
//!
//! Normalization is pure: it never looks at backend state, and applying it to
//! an already normalized key returns that key unchanged.

use stowage_common::{Error, Result};

/// Longest leaf filename produced, in bytes.
pub(crate) const MAX_LEAF_LEN: usize = 240;

/// Device names Windows refuses as file stems.
const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Normalize a logical name into a storage key.
///
/// # Postconditions
/// - The leaf only contains `[A-Za-z0-9._-]`, never starts with `.`, `-` or `_`
///   (except the `_` guarding a reserved device name) and never contains `..`
/// - Non-empty prefix segments other than `.` are preserved verbatim
///
/// # Errors
/// - `Error::InvalidName` if the name is empty, contains a `..` segment, has
///   control characters in its prefix, or its leaf has no usable characters
pub fn normalize(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName("Name cannot be empty".to_string()));
    }

    let (prefix, leaf) = split_prefix(name);
    let prefix = match prefix {
        Some(prefix) => normalize_prefix(prefix)?,
        None => String::new(),
    };

    let leaf = sanitize_leaf(leaf);
    if leaf.is_empty() {
        return Err(Error::InvalidName(format!(
            "Name has no usable characters: {:?}",
            name
        )));
    }

    if prefix.is_empty() {
        Ok(leaf)
    } else {
        Ok(format!("{}/{}", prefix, leaf))
    }
}

/// Split a name on its last `/` into the raw directory prefix and leaf.
///
/// The prefix is `None` when the name has no separator at all.
pub fn split_prefix(name: &str) -> (Option<&str>, &str) {
    match name.rfind('/') {
        Some(idx) => (Some(&name[..idx]), &name[idx + 1..]),
        None => (None, name),
    }
}

/// Split a leaf filename into stem and suffix.
///
/// The suffix starts at the last `.` and keeps it. A leading dot (`.env`) or a
/// trailing dot (`name.`) does not start a suffix.
pub fn split_suffix(leaf: &str) -> (&str, &str) {
    match leaf.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < leaf.len() => (&leaf[..idx], &leaf[idx..]),
        _ => (leaf, ""),
    }
}

fn normalize_prefix(prefix: &str) -> Result<String> {
    let mut segments = Vec::new();

    for segment in prefix.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(Error::InvalidName(format!(
                "Path traversal is not allowed: {:?}",
                prefix
            )));
        }
        if segment.chars().any(char::is_control) {
            return Err(Error::InvalidName(format!(
                "Directory contains control characters: {:?}",
                prefix
            )));
        }
        segments.push(segment);
    }

    Ok(segments.join("/"))
}

fn sanitize_leaf(leaf: &str) -> String {
    let mut leaf = clean_leaf(leaf);

    let reserved = is_reserved(&leaf);
    let limit = leaf_limit(reserved);
    if leaf.len() > limit {
        leaf = strip_edges(&truncate_leaf(&leaf, limit)).to_string();
    }

    if reserved {
        leaf.insert(0, '_');
    }

    leaf
}

/// Whether the leaf of `name` normalizes without being shortened.
pub(crate) fn leaf_fits(name: &str) -> bool {
    let (_, leaf) = split_prefix(name);
    let leaf = clean_leaf(leaf);
    leaf.len() <= leaf_limit(is_reserved(&leaf))
}

/// Map, filter and collapse leaf characters, then strip unsafe edges.
fn clean_leaf(leaf: &str) -> String {
    let mut out = String::with_capacity(leaf.len());

    for c in leaf.chars() {
        let mapped = if c.is_whitespace() || c.is_control() || c == '\\' {
            '_'
        } else if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            continue;
        };

        // Collapse runs of separators.
        if (mapped == '_' || mapped == '.') && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }

    strip_edges(&out).to_string()
}

fn is_reserved(leaf: &str) -> bool {
    let (stem, _) = leaf.split_once('.').unwrap_or((leaf, ""));
    RESERVED_STEMS.contains(&stem.to_ascii_uppercase().as_str())
}

/// Leaf budget before the reserved-name guard is prepended.
fn leaf_limit(reserved: bool) -> usize {
    if reserved {
        MAX_LEAF_LEN - 1
    } else {
        MAX_LEAF_LEN
    }
}

fn strip_edges(leaf: &str) -> &str {
    leaf.trim_start_matches(&['.', '-', '_'][..])
        .trim_end_matches(&['.', '_'][..])
}

/// Shorten an ASCII leaf to `limit` bytes, keeping a short extension intact.
fn truncate_leaf(leaf: &str, limit: usize) -> String {
    let (stem, suffix) = split_suffix(leaf);

    if suffix.len() < MAX_LEAF_LEN / 2 {
        let keep = limit - suffix.len();
        let stem = stem[..keep.min(stem.len())].trim_end_matches(&['.', '_'][..]);
        format!("{}{}", stem, suffix)
    } else {
        leaf[..limit].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'
    }

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(normalize("a.png").unwrap(), "a.png");
        assert_eq!(normalize("report-2024_final.pdf").unwrap(), "report-2024_final.pdf");
    }

    #[test]
    fn test_whitespace_becomes_underscore() {
        assert_eq!(normalize("my file.png").unwrap(), "my_file.png");
        assert_eq!(normalize("my   cool\tfile.png").unwrap(), "my_cool_file.png");
    }

    #[test]
    fn test_prefix_preserved() {
        assert_eq!(normalize("uploads/my file.png").unwrap(), "uploads/my_file.png");
        assert_eq!(
            normalize("users/42/avatars/me (1).jpg").unwrap(),
            "users/42/avatars/me_1.jpg"
        );
    }

    #[test]
    fn test_prefix_cleanup() {
        assert_eq!(normalize("/uploads//a.png").unwrap(), "uploads/a.png");
        assert_eq!(normalize("./uploads/./a.png").unwrap(), "uploads/a.png");
        assert_eq!(normalize("/a.png").unwrap(), "a.png");
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(matches!(
            normalize("../../etc/passwd"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            normalize("uploads/../secret.txt"),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn test_backslash_traversal_flattened() {
        assert_eq!(normalize("..\\..\\windows\\win.ini").unwrap(), "windows_win.ini");
    }

    #[test]
    fn test_leading_dots_and_dashes_stripped() {
        assert_eq!(normalize(".htaccess").unwrap(), "htaccess");
        assert_eq!(normalize("--help.txt").unwrap(), "help.txt");
        assert_eq!(normalize("_.bashrc").unwrap(), "bashrc");
        assert_eq!(normalize("name.").unwrap(), "name");
    }

    #[test]
    fn test_dot_runs_collapse() {
        assert_eq!(normalize("a..png").unwrap(), "a.png");
        assert_eq!(normalize("a__b.png").unwrap(), "a_b.png");
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(normalize("résumé.pdf").unwrap(), "rsum.pdf");
        assert_eq!(normalize("data/日本語 notes.txt").unwrap(), "data/notes.txt");
    }

    #[test]
    fn test_reserved_device_names_guarded() {
        assert_eq!(normalize("con.txt").unwrap(), "_con.txt");
        assert_eq!(normalize("LPT1").unwrap(), "_LPT1");
        assert_eq!(normalize("console.txt").unwrap(), "console.txt");
    }

    #[test]
    fn test_empty_and_unsafe_rejected() {
        assert!(matches!(normalize(""), Err(Error::InvalidName(_))));
        assert!(matches!(normalize("   "), Err(Error::InvalidName(_))));
        assert!(matches!(normalize("日本語"), Err(Error::InvalidName(_))));
        assert!(matches!(normalize("uploads/"), Err(Error::InvalidName(_))));
        assert!(matches!(normalize("..."), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_control_characters_in_prefix_rejected() {
        assert!(matches!(normalize("up\u{0}loads/a.png"), Err(Error::InvalidName(_))));
        assert_eq!(normalize("a\u{7}b.png").unwrap(), "a_b.png");
    }

    #[test]
    fn test_long_leaf_truncated_keeping_extension() {
        let name = format!("{}.png", "x".repeat(400));
        let key = normalize(&name).unwrap();
        assert_eq!(key.len(), MAX_LEAF_LEN);
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_long_reserved_leaf_stays_within_limit() {
        let name = format!("con.{}", "x".repeat(300));
        let key = normalize(&name).unwrap();
        assert!(key.starts_with("_con."));
        assert_eq!(key.len(), MAX_LEAF_LEN);
        assert_eq!(normalize(&key).unwrap(), key);
    }

    #[test]
    fn test_leaf_fits() {
        assert!(leaf_fits("uploads/a.png"));
        assert!(leaf_fits(&format!("{}.png", "x".repeat(236))));
        assert!(!leaf_fits(&format!("{}.png", "x".repeat(237))));
        assert!(leaf_fits(&format!("{}.png", "é".repeat(400))));
    }

    #[test]
    fn test_split_suffix() {
        assert_eq!(split_suffix("a.png"), ("a", ".png"));
        assert_eq!(split_suffix("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_suffix(".env"), (".env", ""));
        assert_eq!(split_suffix("name."), ("name.", ""));
        assert_eq!(split_suffix("README"), ("README", ""));
    }

    #[test]
    fn test_split_prefix() {
        assert_eq!(split_prefix("a.png"), (None, "a.png"));
        assert_eq!(split_prefix("up/a.png"), (Some("up"), "a.png"));
        assert_eq!(split_prefix("/a.png"), (Some(""), "a.png"));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(name in ".{0,300}") {
            if let Ok(key) = normalize(&name) {
                prop_assert_eq!(normalize(&key).unwrap(), key);
            }
        }

        #[test]
        fn prop_leaf_never_exceeds_limit(name in "[A-Za-z0-9 ._-]{0,400}") {
            if let Ok(key) = normalize(&name) {
                let (_, leaf) = split_prefix(&key);
                prop_assert!(leaf.len() <= MAX_LEAF_LEN);
            }
        }

        #[test]
        fn prop_leaf_uses_allowed_characters(name in "\\PC{0,64}") {
            if let Ok(key) = normalize(&name) {
                let (_, leaf) = split_prefix(&key);
                prop_assert!(!leaf.is_empty());
                prop_assert!(leaf.chars().all(is_allowed));
                prop_assert!(!leaf.contains(".."));
            }
        }

        #[test]
        fn prop_prefix_segments_preserved(
            segments in prop::collection::vec("[a-z0-9]{1,8}", 1..4),
            leaf in "[A-Za-z0-9]{1,16}[ !#é]{0,4}\\.[a-z]{1,4}",
        ) {
            let prefix = segments.join("/");
            let key = normalize(&format!("{}/{}", prefix, leaf)).unwrap();
            let expected_prefix = format!("{}/", prefix);
            prop_assert!(key.starts_with(&expected_prefix));
        }
    }
}
