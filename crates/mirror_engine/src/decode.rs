use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use engine_logging::engine_debug;

use crate::{FailureKind, FetchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode page bytes to UTF-8: BOM → Content-Type charset → chardetng guess.
///
/// An explicit encoding (BOM or header) must decode cleanly; a guessed one
/// is decoded with replacement characters.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, FetchError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_strict(bytes, encoding);
    }

    if let Some(encoding) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_strict(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        engine_debug!("Lossy decode with guessed encoding {}", encoding.name());
    }
    Ok(DecodedPage {
        text: text.into_owned(),
        encoding: encoding.name(),
    })
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(&['"', '\''][..]).to_string())
    })
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedPage, FetchError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::new(
            FailureKind::Decode,
            format!("invalid {} byte sequence", encoding.name()),
        ));
    }
    Ok(DecodedPage {
        text: text.into_owned(),
        encoding: encoding.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::{charset_param, decode_page};

    #[test]
    fn charset_param_is_case_insensitive_and_unquoted() {
        assert_eq!(
            charset_param("text/html; Charset=\"ISO-8859-1\"").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn header_charset_wins_over_guessing() {
        let decoded = decode_page(b"caf\xe9", Some("text/html; charset=ISO-8859-1")).unwrap();
        assert_eq!(decoded.text, "café");
    }

    #[test]
    fn bom_marks_utf8() {
        let decoded = decode_page(b"\xEF\xBB\xBFhello", Some("text/html")).unwrap();
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn declared_utf8_with_bad_bytes_is_an_error() {
        assert!(decode_page(b"ok \xff\xfe nope", Some("text/html; charset=utf-8")).is_err());
    }
}
