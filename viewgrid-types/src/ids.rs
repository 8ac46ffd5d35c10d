use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Stable column identity inside a view schema.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ControlGuid(pub String);

impl ControlGuid {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ControlGuid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a view definition on the backend.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ViewId(pub String);

impl From<&str> for ViewId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Stable row identity, unchanged across matrix requests.
///
/// Backends deliver either strings or integers here; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(from = "UidRepr", into = "String")]
pub struct RowUid(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum UidRepr {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<UidRepr> for RowUid {
    fn from(repr: UidRepr) -> Self {
        match repr {
            UidRepr::Text(text) => Self(text),
            UidRepr::Signed(value) => Self(value.to_string()),
            UidRepr::Unsigned(value) => Self(value.to_string()),
        }
    }
}

impl From<RowUid> for String {
    fn from(uid: RowUid) -> Self {
        uid.0
    }
}

impl From<&str> for RowUid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl RowUid {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_uid_accepts_numbers_and_strings() {
        let uids: Vec<RowUid> = serde_json::from_str(r#"[17, "a-1", -3]"#).unwrap();
        assert_eq!(
            uids,
            vec![RowUid::from("17"), RowUid::from("a-1"), RowUid::from("-3")]
        );
        assert_eq!(serde_json::to_string(&uids[0]).unwrap(), r#""17""#);
    }

    #[test]
    fn blank_guid_is_empty() {
        assert!(ControlGuid::from("  ").is_empty());
        assert!(!ControlGuid::from("c1").is_empty());
    }
}
