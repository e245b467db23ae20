//! HTML body script injection.

use crate::embed::REFRESH_SCRIPT;

const BODY_CLOSE: &[u8] = b"</body>";

/// Splice the embedded refresh listener into an HTML body.
///
/// The script is inserted immediately before the *last* `</body>` tag;
/// bodies without one pass through unchanged.
pub fn inject_sse(body: &[u8]) -> Vec<u8> {
    let Some(pos) = body.windows(BODY_CLOSE.len()).rposition(|w| w == BODY_CLOSE) else {
        return body.to_vec();
    };

    let script = format!("<script>{REFRESH_SCRIPT}</script>");

    let mut out = Vec::with_capacity(body.len() + script.len());
    out.extend_from_slice(&body[..pos]);
    out.extend_from_slice(script.as_bytes());
    out.extend_from_slice(&body[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_before_last_body_tag() {
        let page = b"<!DOCTYPE html><html><head><title>t</title><body></body></html>";
        let out = inject_sse(page);
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("<!DOCTYPE html><html><head><title>t</title><body>"));
        assert!(text.ends_with("</body></html>"));
        assert!(text.contains(REFRESH_SCRIPT));
        // exactly one script tag inserted
        assert_eq!(text.matches("<script>").count(), 1);
    }

    #[test]
    fn test_inject_picks_last_of_multiple_tags() {
        let page = b"<body>a</body><body>b</body>";
        let text = String::from_utf8(inject_sse(page)).unwrap();

        let script_pos = text.find("<script>").unwrap();
        let first_close = text.find("</body>").unwrap();
        assert!(script_pos > first_close);
        assert!(text.ends_with("</script></body>"));
    }

    #[test]
    fn test_no_body_tag_passes_through() {
        let page = b"<!DOCTYPE html><html><head><title>t</title></html>";
        assert_eq!(inject_sse(page), page.to_vec());
    }

    #[test]
    fn test_injection_is_case_sensitive() {
        // only the literal lowercase tag is recognized
        let page = b"<html><BODY>x</BODY></html>";
        assert_eq!(inject_sse(page), page.to_vec());
    }
}
