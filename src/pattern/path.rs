//! Path-prefix matching for `pmatch`

/// True when `value` equals `prefix` or lies strictly beneath it.
///
/// A trailing `/` on the prefix is ignored, so `/etc` and `/etc/` both match
/// `/etc/passwd` but neither matches `/etcetera`.
pub fn path_match(value: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        // "/" covers every absolute path
        return value.starts_with('/');
    }
    match value.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/etc", "/etc", true)]
    #[case("/etc/passwd", "/etc", true)]
    #[case("/etc/passwd", "/etc/", true)]
    #[case("/etc/ssh/sshd_config", "/etc", true)]
    #[case("/etcetera", "/etc", false)]
    #[case("/et", "/etc", false)]
    #[case("/usr/bin/ls", "/", true)]
    #[case("relative/path", "/", false)]
    #[case("/Etc/passwd", "/etc", false)]
    fn test_path_match(#[case] value: &str, #[case] prefix: &str, #[case] expected: bool) {
        assert_eq!(path_match(value, prefix), expected);
    }
}
