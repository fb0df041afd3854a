// ABOUTME: Self-describing record codec shared by both storage tiers
// ABOUTME: Serializes whole Preference records to field-tagged JSON bytes

use crate::StorageResult;
use prefstore_core::Preference;

/// Encode a record to its at-rest byte representation.
pub fn encode(preference: &Preference) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(preference)?)
}

/// Decode a record from its at-rest byte representation.
pub fn decode(payload: &[u8]) -> StorageResult<Preference> {
    Ok(serde_json::from_slice(payload)?)
}
