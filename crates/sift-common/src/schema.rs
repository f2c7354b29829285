//! Record and report schema versions.
//!
//! Versions are `MAJOR.MINOR.PATCH`. Readers accept anything with the same
//! major version; a new data type or optional attribute bumps the minor.

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Whether data written under `version` can be read by this build.
pub fn is_compatible(version: &str) -> bool {
    match (major(SCHEMA_VERSION), major(version)) {
        (Some(ours), Some(theirs)) => ours == theirs,
        _ => false,
    }
}

fn major(version: &str) -> Option<u32> {
    let (major, rest) = version.split_once('.')?;
    if rest.is_empty() {
        return None;
    }
    major.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_and_patch_are_compatible() {
        assert!(is_compatible(SCHEMA_VERSION));
        assert!(is_compatible("1.3.0"));
        assert!(is_compatible("1.0.7"));
    }

    #[test]
    fn test_other_major_or_garbage_rejected() {
        assert!(!is_compatible("2.0.0"));
        assert!(!is_compatible("0.1.0"));
        assert!(!is_compatible("1"));
        assert!(!is_compatible(""));
        assert!(!is_compatible("one.two.three"));
    }
}
