//! Upload normalization: encoding detection and decoding to UTF-8.
//!
//! Spreadsheet exports arrive as UTF-8, Latin-1 or Windows-1252. Uploads are
//! decoded once when staged so the melt core always reads UTF-8 and header
//! labels can be shown as text. Field delimiters are never guessed here; the
//! caller always names one.

/// UTF-8 byte order mark.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Upload contents decoded to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUpload {
    /// Decoded text, without byte order mark.
    pub text: String,
    /// Encoding the bytes were decoded from.
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(UTF8_BOM) {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8 decoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => {
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        }
        // WHATWG maps the Latin-1 labels to windows-1252.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the encoding of an upload and decode it to UTF-8.
pub fn normalize_upload(bytes: &[u8]) -> NormalizedUpload {
    // Valid UTF-8 is kept as is; chardet can misreport short UTF-8 samples.
    if let Ok(text) = std::str::from_utf8(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)) {
        return NormalizedUpload {
            text: text.to_string(),
            encoding: "utf-8".to_string(),
        };
    }

    let mut encoding = detect_encoding(bytes);
    if encoding == "utf-8" {
        // Not valid UTF-8 after all: assume the common spreadsheet default.
        encoding = "windows-1252".to_string();
    }
    let text = decode_content(bytes, &encoding);
    NormalizedUpload { text, encoding }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        let upload = normalize_upload("site;température\nnord;12\n".as_bytes());
        assert_eq!(upload.encoding, "utf-8");
        assert!(upload.text.contains("température"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"a,b\n1,2\n");
        let upload = normalize_upload(&bytes);
        assert_eq!(upload.text, "a,b\n1,2\n");
        assert_eq!(detect_encoding(&bytes), "utf-8");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_currency_sign_is_not_euro() {
        assert_eq!(decode_content(&[0xA4], "iso-8859-1"), "\u{A4}");
        assert_eq!(decode_content(&[0x80], "windows-1252"), "\u{20AC}");
    }

    #[test]
    fn test_non_utf8_upload_is_decoded() {
        let bytes: &[u8] = b"station,temp\xe9rature\nnord,12\n";
        let upload = normalize_upload(bytes);
        assert_ne!(upload.encoding, "utf-8");
        assert!(upload.text.starts_with("station,temp"));
    }

    #[test]
    fn test_unknown_encoding_falls_back_to_lossy() {
        let decoded = decode_content(b"ab\xffc", "no-such-encoding");
        assert_eq!(decoded, "ab\u{FFFD}c");
    }
}
