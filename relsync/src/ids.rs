//! Identifier values and set utilities
//!
//! Identifiers are the primary keys of target entities. They can be scalar
//! (integer or text) or composite. Equality, hashing and ordering go through a
//! canonical key, so `Text("42")` equals `Int(42)` and hyphenated GUIDs compare
//! case-insensitively however the identifier was built. The text itself is
//! kept as given and is what hosts receive back.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Primary key of a target entity
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Value")]
pub enum Identifier {
    Int(i64),
    Text(String),
    /// Multi-column key, components in key order
    Composite(Vec<Identifier>),
}

/// Comparison form of an identifier
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Key<'a> {
    Int(i64),
    Text(Cow<'a, str>),
    Composite(Vec<Key<'a>>),
}

/// Canonical integer value of `text`, if it is written as one
fn as_int(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|n| n.to_string() == text)
}

/// Only the 36-character hyphenated form counts as a GUID; simple, braced and
/// urn forms are left as opaque text.
fn is_hyphenated_guid(text: &str) -> bool {
    text.len() == 36 && Uuid::try_parse(text).is_ok()
}

impl Identifier {
    /// Build a text identifier; integer text becomes `Int`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        match as_int(&value) {
            Some(n) => Identifier::Int(n),
            None => Identifier::Text(value),
        }
    }

    fn key(&self) -> Key<'_> {
        match self {
            Identifier::Int(n) => Key::Int(*n),
            Identifier::Text(s) => match as_int(s) {
                Some(n) => Key::Int(n),
                None if is_hyphenated_guid(s) => Key::Text(Cow::Owned(s.to_ascii_lowercase())),
                None => Key::Text(Cow::Borrowed(s)),
            },
            Identifier::Composite(parts) => Key::Composite(parts.iter().map(Identifier::key).collect()),
        }
    }

    /// Convert a single JSON value into an identifier.
    ///
    /// Arrays and objects become composite identifiers (object components are
    /// taken in key order). Null, booleans, floats and empty containers are
    /// rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Identifier::Int)
                .ok_or_else(|| invalid(value)),
            Value::String(s) if !s.is_empty() => Ok(Identifier::text(s.as_str())),
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(Identifier::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Identifier::Composite),
            Value::Object(map) if !map.is_empty() => map
                .values()
                .map(Identifier::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Identifier::Composite),
            _ => Err(invalid(value)),
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

fn invalid(value: &Value) -> SyncError {
    SyncError::InvalidIdentifier {
        value: value.to_string(),
    }
}

impl TryFrom<Value> for Identifier {
    type Error = SyncError;

    fn try_from(value: Value) -> Result<Self> {
        Identifier::from_json(&value)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Identifier::Int(n) => serializer.serialize_i64(*n),
            Identifier::Text(s) => serializer.serialize_str(s),
            Identifier::Composite(parts) => serializer.collect_seq(parts),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Int(n) => write!(f, "{}", n),
            Identifier::Text(s) => write!(f, "{}", s),
            Identifier::Composite(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Identifier::Int(n)
    }
}

impl From<i32> for Identifier {
    fn from(n: i32) -> Self {
        Identifier::Int(n as i64)
    }
}

impl From<u32> for Identifier {
    fn from(n: u32) -> Self {
        Identifier::Int(n as i64)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::text(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::text(s)
    }
}

/// Elements of `a` that are not in `b`.
///
/// Output follows the order of `a` with duplicates dropped, so it is
/// deterministic for a given input order.
pub fn diff(a: &[Identifier], b: &[Identifier]) -> Vec<Identifier> {
    let exclude: HashSet<&Identifier> = b.iter().collect();
    let mut seen: HashSet<&Identifier> = HashSet::new();

    a.iter()
        .filter(|id| !exclude.contains(id) && seen.insert(*id))
        .cloned()
        .collect()
}

/// Whether two identifier collections hold the same set of values
pub fn same_set(a: &[Identifier], b: &[Identifier]) -> bool {
    let a: HashSet<&Identifier> = a.iter().collect();
    let b: HashSet<&Identifier> = b.iter().collect();
    a == b
}

/// Drop repeated identifiers, keeping first occurrences
pub fn dedup(ids: impl IntoIterator<Item = Identifier>) -> Vec<Identifier> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Coerce an assigned value into a canonical identifier list.
///
/// - empty values (`null`, `false`, `0`, `"0"`, `""`, `[]`, `{}`) give an empty list
/// - an array is a collection; `null` and `""` members are skipped, nested
///   arrays and objects are composite identifiers
/// - anything else is a single identifier
pub fn normalize(value: &Value) -> Result<Vec<Identifier>> {
    if is_empty_value(value) {
        return Ok(Vec::new());
    }

    match value {
        Value::Array(items) => {
            let ids = items
                .iter()
                .filter(|item| !item.is_null() && item.as_str() != Some(""))
                .map(Identifier::from_json)
                .collect::<Result<Vec<_>>>()?;
            Ok(dedup(ids))
        }
        other => Ok(vec![Identifier::from_json(other)?]),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_i64() == Some(0) || n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ints(values: &[i64]) -> Vec<Identifier> {
        values.iter().map(|v| Identifier::Int(*v)).collect()
    }

    #[test]
    fn test_diff_is_order_independent_as_a_set() {
        assert_eq!(diff(&ints(&[1, 2, 3]), &ints(&[2, 3, 4])), ints(&[1]));
        assert_eq!(diff(&ints(&[2, 3, 4]), &ints(&[1, 2, 3])), ints(&[4]));
        assert_eq!(diff(&ints(&[3, 1, 2]), &ints(&[4, 3, 2])), ints(&[1]));
    }

    #[test]
    fn test_diff_drops_duplicates() {
        assert_eq!(diff(&ints(&[5, 1, 5, 1]), &ints(&[])), ints(&[5, 1]));
    }

    #[test]
    fn test_same_set_ignores_order_and_repeats() {
        assert!(same_set(&ints(&[1, 2, 2]), &ints(&[2, 1])));
        assert!(!same_set(&ints(&[1, 2]), &ints(&[1, 2, 3])));
    }

    #[test]
    fn test_normalize_empty_values() {
        for value in [json!(null), json!(""), json!(0), json!("0"), json!(false), json!([]), json!({})] {
            assert!(normalize(&value).unwrap().is_empty(), "{} should be empty", value);
        }
    }

    #[test]
    fn test_normalize_scalar_and_collection() {
        assert_eq!(normalize(&json!(7)).unwrap(), ints(&[7]));
        assert_eq!(normalize(&json!([1, "2", null, "", 1])).unwrap(), ints(&[1, 2]));
        assert_eq!(
            normalize(&json!("slug")).unwrap(),
            vec![Identifier::Text("slug".to_string())]
        );
    }

    #[test]
    fn test_normalize_composite_members() {
        let ids = normalize(&json!([[1, "a"], {"post": 2, "lang": "en"}])).unwrap();

        assert_eq!(
            ids,
            vec![
                Identifier::Composite(vec![Identifier::Int(1), Identifier::Text("a".to_string())]),
                // object components are taken in key order: lang, post
                Identifier::Composite(vec![Identifier::Text("en".to_string()), Identifier::Int(2)]),
            ]
        );
    }

    #[test]
    fn test_normalize_rejects_non_identifiers() {
        assert!(matches!(
            normalize(&json!(true)),
            Err(SyncError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            normalize(&json!([1, 2.5])),
            Err(SyncError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_guid_text_is_case_insensitive() {
        let upper = Identifier::text("6F9619FF-8B86-D011-B42D-00C04FC964FF");
        let lower = Identifier::text("6f9619ff-8b86-d011-b42d-00c04fc964ff");

        assert_eq!(upper, lower);
    }

    #[test]
    fn test_host_built_guid_text_matches_normalized_value() {
        let from_host = Identifier::Text("6F9619FF-8B86-D011-B42D-00C04FC964FF".to_string());
        let assigned = normalize(&json!(["6f9619ff-8b86-d011-b42d-00c04fc964ff"])).unwrap();

        assert_eq!(assigned, vec![from_host.clone()]);
        assert!(diff(&[from_host.clone()], &assigned).is_empty());
        assert!(same_set(&[from_host.clone()], &assigned));
        // host text is kept as supplied
        assert_eq!(from_host.to_string(), "6F9619FF-8B86-D011-B42D-00C04FC964FF");
    }

    #[test]
    fn test_unhyphenated_hex_text_kept_verbatim() {
        let md5 = "d41d8cd98f00b204e9800998ecf8427e";
        let ids = normalize(&json!([md5])).unwrap();

        assert_eq!(ids, vec![Identifier::Text(md5.to_string())]);
        assert_eq!(ids[0].to_string(), md5);
        assert_ne!(ids[0], Identifier::text("d41d8cd9-8f00-b204-e980-0998ecf8427e"));
        assert_ne!(
            Identifier::text("{6F9619FF-8B86-D011-B42D-00C04FC964FF}"),
            Identifier::text("{6f9619ff-8b86-d011-b42d-00c04fc964ff}")
        );
    }

    #[test]
    fn test_numeric_text_matches_integer() {
        assert_eq!(Identifier::text("42"), Identifier::Int(42));
        assert_eq!(Identifier::Text("42".to_string()), Identifier::Int(42));
        // leading zeros are not the same key
        assert_eq!(Identifier::text("007"), Identifier::Text("007".to_string()));
        assert_ne!(Identifier::text("007"), Identifier::Int(7));
    }

    #[test]
    fn test_equal_identifiers_hash_alike() {
        let set: HashSet<Identifier> = [
            Identifier::Text("42".to_string()),
            Identifier::Int(42),
            Identifier::Text("6F9619FF-8B86-D011-B42D-00C04FC964FF".to_string()),
            Identifier::text("6f9619ff-8b86-d011-b42d-00c04fc964ff"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_shape() {
        let ids: Vec<Identifier> = serde_json::from_value(json!([1, "x", [2, "y"]])).unwrap();
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!([1, "x", [2, "y"]]));
        assert!(serde_json::from_value::<Identifier>(json!(true)).is_err());
    }
}
