//! Helpers for encoding/decoding session payloads for storage.
//!
//! Payloads are stored as a plain JSON object, so records written by other implementations of the
//! same scheme stay readable.

use crate::{session::Payload, store};

/// Encode a payload into the bytes persisted by a store.
pub fn encode_payload(payload: &Payload) -> store::Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|err| store::Error::Encode(err.to_string()))
}

/// Decode stored bytes back into a payload.
///
/// Anything other than a JSON object is rejected.
pub fn decode_payload(bytes: &[u8]) -> store::Result<Payload> {
    serde_json::from_slice(bytes).map_err(|err| store::Error::Decode(err.to_string()))
}
