//! Filename collision resolution.
//!
//! Given a desired logical name and a way to ask the backend whether a key is
//! taken, find a name whose normalized key is free by appending `_1`, `_2`, ...
//! to the stem.
//!
//! The answer is only valid at the moment of the last probe. Nothing stops
//! another writer from claiming the same key before the caller uploads.

use std::future::Future;
use tracing::debug;

use stowage_common::{Error, Result};

use crate::naming::{leaf_fits, normalize, split_prefix, split_suffix, MAX_LEAF_LEN};

/// Resolve `desired_name` to a name whose normalized key does not exist.
///
/// `exists` receives normalized keys. It must answer `Ok(false)` only for a
/// confirmed absence; any other failure is returned as an error and
/// propagated unchanged.
///
/// # Postconditions
/// - Returns `desired_name` unchanged when its key is free
/// - Otherwise returns `{prefix}/{stem}_{n}{suffix}` in pre-normalization form,
///   for the smallest `n >= 1` whose key is free
/// - When that form would be shortened by normalization, the candidate is
///   built from the normalized key with its stem trimmed so `_{n}` survives
///
/// # Errors
/// - `Error::InvalidName` if the name cannot be normalized, or if two
///   successive candidates map to the same key
/// - Whatever `exists` reports when a check fails
pub async fn resolve<F, Fut>(desired_name: &str, mut exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let original = normalize(desired_name)?;
    if !exists(original.clone()).await? {
        return Ok(desired_name.to_string());
    }

    let (prefix, leaf) = split_prefix(desired_name);
    let (stem, suffix) = split_suffix(leaf);

    // No upper bound: a backend that reports every candidate as taken keeps us here.
    let mut previous: Option<String> = None;
    let mut counter: u64 = 0;
    loop {
        counter += 1;
        let mut candidate = candidate_name(prefix, stem, suffix, counter);
        if !leaf_fits(&candidate) {
            candidate = shortened_candidate(&original, counter);
        }

        let key = normalize(&candidate)?;
        debug!(%candidate, %key, "Probing candidate name");
        if previous.as_deref() == Some(key.as_str()) {
            return Err(Error::InvalidName(format!(
                "Cannot derive a distinct name from {:?}",
                desired_name
            )));
        }

        if !exists(key.clone()).await? {
            return Ok(candidate);
        }
        previous = Some(key);
    }
}

fn candidate_name(prefix: Option<&str>, stem: &str, suffix: &str, counter: u64) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}_{}{}", prefix, stem, counter, suffix),
        None => format!("{}_{}{}", stem, counter, suffix),
    }
}

/// Candidate derived from a normalized key whose leaf is already at the length cap.
fn shortened_candidate(key: &str, counter: u64) -> String {
    let (prefix, leaf) = split_prefix(key);
    let (stem, suffix) = match split_suffix(leaf) {
        (stem, suffix) if suffix.len() < MAX_LEAF_LEN / 2 => (stem, suffix),
        _ => (leaf, ""),
    };

    let tag = format!("_{}", counter);
    // One byte stays free for the reserved-name guard.
    let keep = (MAX_LEAF_LEN - 1).saturating_sub(tag.len() + suffix.len());
    let stem = stem[..keep.min(stem.len())].trim_end_matches(&['.', '_'][..]);

    candidate_name(prefix, stem, suffix, counter)
}
