//! `data:` URI decoding for inline supplier images.
//!
//! Grammar: `data:<mime>[;param=value]*[;base64],<data>`. Bodies are
//! percent-decoded first, then base64-decoded when the `;base64` marker is
//! present, so both `data:image/png;base64,iVBO...` and
//! `data:image/png,%89PNG...` are accepted.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use percent_encoding::percent_decode_str;

use super::ImageError;

/// Standard alphabet, padding optional. Suppliers are inconsistent about `=`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header of a data URI, split from its still-encoded body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DataUri<'a> {
    /// Lower-cased media type, e.g. `image/png`. Empty when omitted.
    pub mime: String,
    pub base64: bool,
    pub body: &'a str,
}

impl<'a> DataUri<'a> {
    /// Splits `payload` into media type, encoding flag, and body without
    /// decoding the body.
    pub(crate) fn parse(payload: &'a str) -> Result<Self, ImageError> {
        let payload = payload.trim();
        let rest = payload
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &payload[5..])
            .ok_or_else(|| ImageError::InvalidPayload("not a data URI".to_string()))?;

        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidPayload("data URI has no ',' separator".to_string()))?;

        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let base64 = parts.any(|param| param.trim().eq_ignore_ascii_case("base64"));

        Ok(Self { mime, base64, body })
    }

    /// Decodes the body into raw bytes.
    pub(crate) fn decode(&self) -> Result<Vec<u8>, ImageError> {
        let unescaped: Vec<u8> = percent_decode_str(self.body).collect();

        let bytes = if self.base64 {
            let compact: Vec<u8> = unescaped
                .into_iter()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            LENIENT_BASE64
                .decode(compact)
                .map_err(|e| ImageError::InvalidPayload(format!("invalid base64 body: {e}")))?
        } else {
            unescaped
        };

        if bytes.is_empty() {
            return Err(ImageError::InvalidPayload("image body is empty".to_string()));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_header() {
        let uri = DataUri::parse("data:image/PNG;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime, "image/png");
        assert!(uri.base64);
        assert_eq!(uri.body, "iVBORw0KGgo=");
    }

    #[test]
    fn parses_parameters_before_base64_marker() {
        let uri = DataUri::parse("data:image/jpeg;name=label.jpg;base64,/9j/").unwrap();
        assert_eq!(uri.mime, "image/jpeg");
        assert!(uri.base64);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let uri = DataUri::parse("DATA:image/png;base64,AAAA").unwrap();
        assert_eq!(uri.mime, "image/png");
    }

    #[test]
    fn rejects_non_data_uri() {
        let err = DataUri::parse("https://cdn.example/label.png").unwrap_err();
        assert!(matches!(err, ImageError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_missing_comma() {
        let err = DataUri::parse("data:image/png;base64").unwrap_err();
        assert!(matches!(err, ImageError::InvalidPayload(_)));
    }

    #[test]
    fn short_payload_is_rejected_without_panicking() {
        assert!(DataUri::parse("dat").is_err());
        assert!(DataUri::parse("").is_err());
        assert!(DataUri::parse("dätä:x").is_err());
    }

    #[test]
    fn decodes_base64_with_and_without_padding() {
        let padded = DataUri::parse("data:image/png;base64,aGk=").unwrap();
        let bare = DataUri::parse("data:image/png;base64,aGk").unwrap();
        assert_eq!(padded.decode().unwrap(), b"hi");
        assert_eq!(bare.decode().unwrap(), b"hi");
    }

    #[test]
    fn decodes_base64_with_embedded_whitespace_and_escapes() {
        let uri = DataUri::parse("data:image/png;base64,aG%6B%3D\n").unwrap();
        assert_eq!(uri.decode().unwrap(), b"hi");
    }

    #[test]
    fn decodes_percent_encoded_body() {
        let uri = DataUri::parse("data:image/png,%89PNG%0D%0A").unwrap();
        assert!(!uri.base64);
        assert_eq!(uri.decode().unwrap(), b"\x89PNG\r\n");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let uri = DataUri::parse("data:image/png;base64,!!!not-base64!!!").unwrap();
        assert!(matches!(uri.decode(), Err(ImageError::InvalidPayload(_))));
    }

    #[test]
    fn empty_body_is_rejected() {
        let uri = DataUri::parse("data:image/png;base64,").unwrap();
        assert!(matches!(uri.decode(), Err(ImageError::InvalidPayload(_))));
    }
}
