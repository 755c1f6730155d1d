//! Normalization applied to a metadata payload before it is stored.

use std::borrow::Cow;

/// Prepare metadata text for storage: optionally resolve character
/// references, then normalize line endings to `\n`.
pub fn normalize(metadata: &str, resolve_entities: bool) -> String {
    let text = if resolve_entities {
        decode_entities(metadata)
    } else {
        Cow::Borrowed(metadata)
    };
    normalize_newlines(&text).into_owned()
}

/// Resolve named (`&amp;`, `&eacute;`) and numeric (`&#233;`, `&#xE9;`)
/// character references to the characters they stand for. Unknown names are
/// left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    html_escape::decode_html_entities(text)
}

/// Turn `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_amp_when_enabled() {
        assert_eq!(
            normalize("<dc><title>A &amp; B</title></dc>", true),
            "<dc><title>A & B</title></dc>"
        );
    }

    #[test]
    fn test_passes_entities_through_when_disabled() {
        assert_eq!(
            normalize("<dc><title>A &amp; B</title></dc>", false),
            "<dc><title>A &amp; B</title></dc>"
        );
    }

    #[test]
    fn test_named_and_numeric_references() {
        assert_eq!(decode_entities("caf&eacute;"), "café");
        assert_eq!(decode_entities("caf&#233;"), "café");
        assert_eq!(decode_entities("caf&#xE9;"), "café");
    }

    #[test]
    fn test_unknown_entity_is_left_alone() {
        assert_eq!(decode_entities("a &notanentity; b"), "a &notanentity; b");
    }

    #[test]
    fn test_text_without_references_is_borrowed() {
        assert!(matches!(decode_entities("<a>plain</a>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_newlines_are_normalized() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize("a\r\nb", false), "a\nb");
    }
}
