use serde::{Serialize, Serializer};

/// Reserved string the persistence and email collaborators expect in place of
/// an absent field. Internal code uses `Option`; this only exists at the
/// serialization boundary.
pub const NOT_FOUND: &str = "No encontrado";

pub fn is_sentinel(value: &str) -> bool {
    value.trim().is_empty() || value.trim().eq_ignore_ascii_case(NOT_FOUND)
}

/// Drops sentinel strings coming back from the LLM so the rest of the
/// pipeline only ever sees real values or `None`.
pub fn non_sentinel(value: Option<String>) -> Option<String> {
    value.and_then(|v| match is_sentinel(&v) {
        true => None,
        false => Some(v.trim().to_string()),
    })
}

pub fn serialize_opt<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_str(v),
        None => serializer.serialize_str(NOT_FOUND),
    }
}

pub fn serialize_list<S>(value: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.is_empty() {
        true => serializer.serialize_str(NOT_FOUND),
        false => value.join(", ").serialize(serializer),
    }
}
