//! Text placed around relayed child output.

/// Prefix for child stderr when it is forwarded.
pub const STDERR_LABEL: &str = "STDERR: ";

/// Label child stderr for forwarding. Empty stderr is not forwarded at all.
pub fn labeled_stderr(stderr: &str) -> Option<String> {
    if stderr.is_empty() {
        return None;
    }
    let mut buf = String::with_capacity(STDERR_LABEL.len() + stderr.len() + 1);
    buf.push_str(STDERR_LABEL);
    buf.push_str(stderr);
    if !stderr.ends_with('\n') {
        buf.push('\n');
    }
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stderr_is_skipped() {
        assert_eq!(labeled_stderr(""), None);
    }

    #[test]
    fn stderr_gets_label_and_single_newline() {
        assert_eq!(
            labeled_stderr("boom\n").as_deref(),
            Some("STDERR: boom\n")
        );
        assert_eq!(labeled_stderr("boom").as_deref(), Some("STDERR: boom\n"));
    }

    #[test]
    fn multiline_stderr_is_kept_verbatim() {
        assert_eq!(
            labeled_stderr("a\nb\n").as_deref(),
            Some("STDERR: a\nb\n")
        );
    }
}
