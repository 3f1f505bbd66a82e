use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::HeaderMap;

/// Message framing that `http` only exposes as raw headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Framing {
    /// Declared body length, if known
    pub content_length: Option<u64>,
    /// Transfer codings, outermost last
    pub transfer_encoding: Vec<String>,
    /// The connection closes after this message
    pub close: bool,
    /// Trailer fields sent after the body
    pub trailers: Option<HeaderMap>,
}

impl Framing {
    /// Read framing out of a header map
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());

        let transfer_encoding = headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|coding| coding.trim().to_ascii_lowercase())
            .filter(|coding| !coding.is_empty())
            .collect();

        let close = headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("close"));

        Self {
            content_length,
            transfer_encoding,
            close,
            trailers: None,
        }
    }
}
