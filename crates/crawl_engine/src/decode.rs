use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Set when some byte sequences were invalid and got replaced.
    pub had_errors: bool,
}

/// Decode raw bytes into UTF-8 by sniffing the content: BOM -> chardetng guess.
///
/// The declared `Content-Type` charset is deliberately not consulted; the
/// sites this crawls mislabel it often enough that sniffing is more reliable.
pub fn decode_html(bytes: &[u8]) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, used, had_errors) = enc.decode(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: used.name().to_string(),
        had_errors,
    }
}
