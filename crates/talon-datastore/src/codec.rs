//! Payload codec
//!
//! A record's bytes are produced by encoding a structured message per
//! the encoding tag its path carries: `Json` is the self-describing
//! text form, `Binary` the compact form. The store itself never looks
//! inside the bytes; everything else round-trips through these two
//! functions.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use talon_common::{Error, PayloadKind, Result};

/// Encode a message per the given tag
pub fn encode<T: Serialize>(kind: PayloadKind, message: &T) -> Result<Bytes> {
    let data = match kind {
        PayloadKind::Json => serde_json::to_vec(message).map_err(Error::encode)?,
        PayloadKind::Binary => bincode::serialize(message).map_err(Error::encode)?,
    };
    Ok(Bytes::from(data))
}

/// Decode payload bytes per the given tag
pub fn decode<T: DeserializeOwned>(kind: PayloadKind, data: &[u8]) -> Result<T> {
    match kind {
        PayloadKind::Json => serde_json::from_slice(data).map_err(Error::decode),
        PayloadKind::Binary => bincode::deserialize(data).map_err(Error::decode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct ClientPing {
        client_id: String,
        last_seen: u64,
    }

    fn sample() -> ClientPing {
        ClientPing {
            client_id: "C.4f9a".into(),
            last_seen: 1_700_000_000,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let data = encode(PayloadKind::Json, &sample()).unwrap();
        // JSON payloads are self-describing text.
        assert!(data.starts_with(b"{"));
        let decoded: ClientPing = decode(PayloadKind::Json, &data).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_binary_round_trip() {
        let data = encode(PayloadKind::Binary, &sample()).unwrap();
        let decoded: ClientPing = decode(PayloadKind::Binary, &data).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_error_kind() {
        let err = decode::<ClientPing>(PayloadKind::Json, b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
