//! Newline normalization for inference requests.

use std::borrow::Cow;

/// Make sure `text` ends in a newline, appending exactly one if it does not.
///
/// The engine treats the newline as the end-of-document marker; without it
/// the last word is tokenized differently. Nothing else is touched.
pub fn normalize(text: &str) -> Cow<'_, str> {
    if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        let mut owned = String::with_capacity(text.len() + 1);
        owned.push_str(text);
        owned.push('\n');
        Cow::Owned(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_missing_newline() {
        assert_eq!(normalize("great product"), "great product\n");
        assert_eq!(normalize(""), "\n");
    }

    #[test]
    fn test_keeps_existing_newline() {
        assert!(matches!(normalize("done\n"), Cow::Borrowed("done\n")));
        assert_eq!(normalize("two\n\n"), "two\n\n");
    }

    #[test]
    fn test_no_other_changes() {
        assert_eq!(normalize("  padded\t"), "  padded\t\n");
        assert_eq!(normalize("crlf\r"), "crlf\r\n");
    }
}
