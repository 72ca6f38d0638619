//! String and byte matching primitives

use glob::{MatchOptions, Pattern as GlobPattern};
use memchr::memmem;

/// Substring test
pub fn str_contains(value: &str, token: &str) -> bool {
    memmem::find(value.as_bytes(), token.as_bytes()).is_some()
}

/// Case-insensitive substring test using Unicode lowercase folding
pub fn str_icontains(value: &str, token: &str) -> bool {
    if value.is_ascii() && token.is_ascii() {
        // fold without allocating a second copy of the needle
        let needle = token.as_bytes();
        return needle.is_empty()
            || value
                .as_bytes()
                .windows(needle.len())
                .any(|w| w.eq_ignore_ascii_case(needle));
    }
    str_contains(&value.to_lowercase(), &token.to_lowercase())
}

/// Prefix test
pub fn str_starts_with(value: &str, token: &str) -> bool {
    value.starts_with(token)
}

/// Suffix test
pub fn str_ends_with(value: &str, token: &str) -> bool {
    value.ends_with(token)
}

/// Wildcard match. `*` does match `/`.
pub fn glob_match(pattern: &GlobPattern, value: &str, case_sensitive: bool) -> bool {
    let options = MatchOptions {
        case_sensitive,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    pattern.matches_with(value, options)
}

/// Byte-substring test
pub fn bytes_contains(value: &[u8], needle: &[u8]) -> bool {
    memmem::find(value, needle).is_some()
}

/// Byte-prefix test
pub fn bytes_starts_with(value: &[u8], prefix: &[u8]) -> bool {
    value.starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        assert!(str_contains("/bin/bash -c id", "bash"));
        assert!(!str_contains("/bin/bash", "BASH"));
        assert!(str_contains("anything", ""));
    }

    #[test]
    fn test_icontains() {
        assert!(str_icontains("/bin/BASH -c id", "bash"));
        assert!(str_icontains("ÉTÉ", "été"));
        assert!(!str_icontains("sh", "bash"));
    }

    #[test]
    fn test_prefix_suffix() {
        assert!(str_starts_with("/etc/passwd", "/etc/"));
        assert!(!str_starts_with("/ETC/passwd", "/etc/"));
        assert!(str_ends_with("id_rsa.pub", ".pub"));
    }

    #[test]
    fn test_glob_match() {
        let pattern = GlobPattern::new("/home/*/.ssh/*").unwrap();
        assert!(glob_match(&pattern, "/home/alice/.ssh/id_rsa", true));
        assert!(!glob_match(&pattern, "/HOME/alice/.ssh/id_rsa", true));
        assert!(glob_match(&pattern, "/HOME/alice/.ssh/id_rsa", false));

        let pattern = GlobPattern::new("/tmp/*").unwrap();
        assert!(glob_match(&pattern, "/tmp/a/b", true));
    }

    #[test]
    fn test_bytes() {
        let elf = b"\x7fELF\x02\x01";
        assert!(bytes_contains(elf, b"ELF"));
        assert!(bytes_starts_with(elf, &[0x7f, b'E']));
        assert!(!bytes_starts_with(elf, b"ELF"));
    }
}
