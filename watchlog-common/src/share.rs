//! Shareable URL payloads
//!
//! The whole collection travels in one query parameter:
//! JSON, then percent-encoding with `encodeURIComponent` semantics, then
//! standard base64. Decoding reverses the same steps, so links produced by the
//! browser build of the tracker decode here and vice versa.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::models::ShowSeason;
use crate::{Error, Result};

/// Query parameter carrying the payload
pub const SHARE_PARAM: &str = "data";

/// Characters `encodeURIComponent` leaves alone that `urlencoding` escapes
const UNRESERVED_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%2A", "*"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
];

fn encode_uri_component(input: &str) -> String {
    let mut encoded = urlencoding::encode(input).into_owned();
    for (escaped, literal) in UNRESERVED_MARKS {
        encoded = encoded.replace(escaped, literal);
    }
    encoded
}

/// Encode a collection into a share payload
pub fn encode_payload(seasons: &[ShowSeason]) -> Result<String> {
    let json = serde_json::to_string(seasons)?;
    Ok(STANDARD.encode(encode_uri_component(&json)))
}

/// Decode a share payload back into records
pub fn decode_payload(payload: &str) -> Result<Vec<ShowSeason>> {
    // Form decoding turns '+' into ' ' when the payload was not escaped
    let cleaned: String = payload
        .trim()
        .chars()
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("Share payload is not valid base64: {}", e)))?;
    let escaped = String::from_utf8(bytes)
        .map_err(|_| Error::InvalidInput("Share payload is not valid text".to_string()))?;
    let json = urlencoding::decode(&escaped)
        .map_err(|e| Error::InvalidInput(format!("Share payload is not valid percent-encoding: {}", e)))?;

    serde_json::from_str(&json)
        .map_err(|e| Error::InvalidInput(format!("Share payload does not contain seasons: {}", e)))
}

/// Build a share URL on top of `base_url`
pub fn share_url(base_url: &str, seasons: &[ShowSeason]) -> Result<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid share base URL '{}': {}", base_url, e)))?;
    let payload = encode_payload(seasons)?;
    url.query_pairs_mut().append_pair(SHARE_PARAM, &payload);
    Ok(url.into())
}

/// Extract and decode the payload from a share URL or a bare payload
pub fn decode_share_input(input: &str) -> Result<Vec<ShowSeason>> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        let payload = url
            .query_pairs()
            .find(|(key, _)| key == SHARE_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Share link has no '{}' parameter", SHARE_PARAM))
            })?;
        return decode_payload(&payload);
    }
    decode_payload(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroundingLink, SeasonDraft, SeasonStatus};
    use chrono::NaiveDate;

    fn sample() -> Vec<ShowSeason> {
        let mut a = SeasonDraft {
            title: "Ted Lasso (Season's end!) & 100% \"fun\"".to_string(),
            season: 3,
            network: "Apple TV+".to_string(),
            genres: vec!["Comedy".into(), "Sports".into()],
            rating: Some(4.2),
            status: SeasonStatus::Completed,
            review: "Ünïcödé review… with 🏈".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 3, 15),
            episodes: Some(12),
            runtime: Some(50),
            ..Default::default()
        }
        .into_season("id-1".to_string(), 1_690_000_000_000);
        a.sources = Some(vec![GroundingLink {
            title: "Wikipedia".into(),
            uri: "https://en.wikipedia.org/wiki/Ted_Lasso".into(),
        }]);
        let b = SeasonDraft {
            title: "Slow Horses".to_string(),
            season: 4,
            status: SeasonStatus::Watching,
            ongoing: true,
            ..Default::default()
        }
        .into_season("id-2".to_string(), 1_700_000_000_000);
        vec![a, b]
    }

    #[test]
    fn test_payload_round_trip() {
        let seasons = sample();
        let payload = encode_payload(&seasons).unwrap();
        assert_eq!(decode_payload(&payload).unwrap(), seasons);
    }

    #[test]
    fn test_share_url_round_trip() {
        let seasons = sample();
        let url = share_url("https://example.com/tracker/", &seasons).unwrap();
        assert!(url.starts_with("https://example.com/tracker/?data="));
        assert_eq!(decode_share_input(&url).unwrap(), seasons);
    }

    #[test]
    fn test_uri_component_semantics() {
        assert_eq!(encode_uri_component("a b!*'()~"), "a%20b!*'()~");
        assert_eq!(encode_uri_component("{\"x\":1}"), "%7B%22x%22%3A1%7D");
    }

    #[test]
    fn test_plus_turned_space_is_tolerated() {
        let seasons = sample();
        let payload = encode_payload(&seasons).unwrap().replace('+', " ");
        assert_eq!(decode_payload(&payload).unwrap(), seasons);
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert!(matches!(decode_payload("***"), Err(Error::InvalidInput(_))));
        let not_seasons = STANDARD.encode("%7B%7D");
        assert!(matches!(decode_payload(&not_seasons), Err(Error::InvalidInput(_))));
        assert!(matches!(
            decode_share_input("https://example.com/?other=1"),
            Err(Error::InvalidInput(_))
        ));
    }
}
