//! Versioned JSON documents for user records and the group registry.
//!
//! Every document carries a `_v` format tag. Documents with an unknown
//! version are rejected rather than guessed at.

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::BackendError;
use crate::{Result, group::Group, user::UserRecord};

/// The current record format version.
const FORMAT_VERSION: u8 = 1;

fn validate_format_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != FORMAT_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported format version {version}; only version {FORMAT_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize)]
struct RecordOut<'a> {
    #[serde(rename = "_v")]
    version: u8,
    #[serde(flatten)]
    record: &'a UserRecord,
}

#[derive(Deserialize)]
struct RecordIn {
    #[serde(rename = "_v", deserialize_with = "validate_format_version")]
    #[allow(dead_code)]
    version: u8,
    #[serde(flatten)]
    record: UserRecord,
}

#[derive(Serialize)]
struct GroupsOut<'a> {
    #[serde(rename = "_v")]
    version: u8,
    groups: &'a [Group],
}

#[derive(Deserialize)]
struct GroupsIn {
    #[serde(rename = "_v", deserialize_with = "validate_format_version")]
    #[allow(dead_code)]
    version: u8,
    groups: Vec<Group>,
}

pub fn encode_record(record: &UserRecord) -> Result<String> {
    let doc = RecordOut {
        version: FORMAT_VERSION,
        record,
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|source| BackendError::SerializationFailed { source }.into())
}

/// Decode a record document, checking its structural invariants.
///
/// Returns the failure reason on error; callers attach the location.
pub fn decode_record(json: &str) -> std::result::Result<UserRecord, String> {
    let doc: RecordIn = serde_json::from_str(json).map_err(|e| e.to_string())?;
    doc.record.check_invariants()?;
    Ok(doc.record)
}

pub fn encode_groups(groups: &[Group]) -> Result<String> {
    let doc = GroupsOut {
        version: FORMAT_VERSION,
        groups,
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|source| BackendError::SerializationFailed { source }.into())
}

pub fn decode_groups(json: &str) -> std::result::Result<Vec<Group>, String> {
    let doc: GroupsIn = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(doc.groups)
}

/// Best-effort uid extraction from a document that failed to decode.
pub fn peek_uid(json: &str) -> Option<crate::user::Uid> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value
        .get("uid")?
        .as_u64()
        .and_then(|uid| u32::try_from(uid).ok())
}
