//! Attachment references.
//!
//! Attachments are not first-class entities: a message carries an ordered
//! list of public URLs, and the display name shown next to each one is
//! derived from the URL's last path segment.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that must be percent-encoded in a file-name path segment.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Derive a human-readable file name from an attachment URL.
///
/// Takes the last path segment (ignoring any query string) and
/// percent-decodes it. Falls back to the whole input when the URL has no
/// path segments, and to the encoded segment when decoding does not yield
/// valid UTF-8.
pub fn display_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let segment = if segment.is_empty() { path } else { segment };
    percent_decode_str(segment)
        .decode_utf8()
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Percent-encode a file name for use as a URL path segment. The inverse
/// of the decoding done by [`display_name`].
pub fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, FILE_NAME_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_file_name() {
        assert_eq!(
            display_name("https://files.example.com/files/abc/resume.pdf"),
            "resume.pdf"
        );
    }

    #[test]
    fn query_string_ignored() {
        assert_eq!(
            display_name("https://files.example.com/files/abc/resume.pdf?token=xyz"),
            "resume.pdf"
        );
    }

    #[test]
    fn percent_encoded_japanese_name() {
        // "履歴書.pdf" percent-encoded
        assert_eq!(
            display_name("https://x/files/a/%E5%B1%A5%E6%AD%B4%E6%9B%B8.pdf"),
            "履歴書.pdf"
        );
    }

    #[test]
    fn invalid_escape_kept_verbatim() {
        assert_eq!(display_name("https://x/a/file%ZZname"), "file%ZZname");
    }

    #[test]
    fn bare_name_passes_through() {
        assert_eq!(display_name("report.xlsx"), "report.xlsx");
    }

    #[test]
    fn encode_decode_round_trip() {
        for name in ["resume.pdf", "職務経歴書 (最新).docx", "a+b&c.txt"] {
            let url = format!("https://x/files/id/{}", encode_file_name(name));
            assert_eq!(display_name(&url), name);
        }
    }
}
