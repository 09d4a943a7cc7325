//! Versioned blob envelope for fitted backend state.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    state: &'a T,
}

#[derive(Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    state: T,
}

/// Wrap `state` in a `{format, version, state}` JSON envelope.
pub(crate) fn encode<T: Serialize>(format: &str, version: u32, state: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&EnvelopeRef { format, version, state })?)
}

/// Unwrap an envelope, rejecting other formats and versions.
pub(crate) fn decode<T: DeserializeOwned>(format: &str, version: u32, bytes: &[u8]) -> Result<T> {
    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| Error::persistence(format!("unreadable {format} state blob: {e}")))?;
    if header.format != format {
        return Err(Error::persistence(format!(
            "state blob belongs to '{}', expected '{format}'",
            header.format
        )));
    }
    if header.version != version {
        return Err(Error::persistence(format!(
            "unsupported {format} state version {} (this build reads version {version})",
            header.version
        )));
    }
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    Ok(envelope.state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let bytes = encode("demo", 1, &vec![1.5_f64, -0.25]).unwrap();
        let back: Vec<f64> = decode("demo", 1, &bytes).unwrap();
        assert_eq!(back, vec![1.5, -0.25]);
    }

    #[test]
    fn test_rejects_other_format_and_version() {
        let bytes = encode("demo", 1, &0_u8).unwrap();
        assert!(matches!(decode::<u8>("other", 1, &bytes), Err(Error::Persistence(_))));
        assert!(matches!(decode::<u8>("demo", 2, &bytes), Err(Error::Persistence(_))));
        assert!(matches!(decode::<u8>("demo", 1, b"not json"), Err(Error::Persistence(_))));
    }
}
