//! Render document composition.

use framereel_common::error::{FramereelError, FramereelResult};

/// Splice `logic` into `template` in place of its single `marker`.
///
/// The logic is inserted verbatim. A template with no marker, or with more
/// than one, is rejected rather than guessed at.
pub fn compose_document(template: &str, marker: &str, logic: &str) -> FramereelResult<String> {
    match template.matches(marker).count() {
        1 => Ok(template.replacen(marker, logic, 1)),
        0 => Err(FramereelError::workspace(format!(
            "Template does not contain the episode marker {marker:?}"
        ))),
        n => Err(FramereelError::workspace(format!(
            "Template contains the episode marker {marker:?} {n} times; expected exactly one"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "/*__EPISODE__*/";

    #[test]
    fn test_logic_replaces_marker_verbatim() {
        let template = "<script>\n/*__EPISODE__*/\n</script>";
        let logic = "document.title = \"DONE\"; // $& $1 {{x}}";
        let doc = compose_document(template, MARKER, logic).unwrap();
        assert_eq!(doc, format!("<script>\n{logic}\n</script>"));
    }

    #[test]
    fn test_missing_marker_is_rejected() {
        let err = compose_document("<html></html>", MARKER, "x").unwrap_err();
        assert!(err.to_string().contains("does not contain"));
    }

    #[test]
    fn test_duplicate_marker_is_rejected() {
        let template = format!("{MARKER}{MARKER}");
        let err = compose_document(&template, MARKER, "x").unwrap_err();
        assert!(err.to_string().contains("2 times"));
    }

    #[test]
    fn test_logic_containing_marker_is_inserted_once() {
        let doc = compose_document("a/*__EPISODE__*/b", MARKER, MARKER).unwrap();
        assert_eq!(doc, format!("a{MARKER}b"));
    }
}
