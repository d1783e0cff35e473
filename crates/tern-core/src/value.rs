//! Tagged value type for descriptor content.
//!
//! Every YAML document Tern reads is converted into [`Value`] once, at the
//! file boundary. Downstream code matches on the tag instead of re-asserting
//! types, and every conversion is total: it either succeeds or fails with a
//! named [`ValueError`].

use crate::error::ValueError;
use std::fmt;

/// A descriptor value.
///
/// Mappings preserve document order; merge rules and deterministic output
/// depend on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Scalar string. YAML nulls land here as the empty string.
    Str(String),
    /// Ordered sequence.
    Sequence(Vec<Value>),
    /// Ordered mapping with string keys.
    Mapping(Vec<(String, Value)>),
}

impl Value {
    /// Kind name used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Convert a parsed YAML document into a [`Value`].
    ///
    /// Nulls become empty strings, so an empty `pkg.deps:` entry reads as an
    /// absent scalar rather than a distinct null type. Tagged values and
    /// non-string mapping keys are rejected.
    pub fn from_yaml(yaml: serde_yaml::Value) -> Result<Self, ValueError> {
        match yaml {
            serde_yaml::Value::Null => Ok(Self::Str(String::new())),
            serde_yaml::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else {
                    Err(ValueError::Unsupported {
                        reason: format!("non-integer number {n}"),
                    })
                }
            }
            serde_yaml::Value::String(s) => Ok(Self::Str(s)),
            serde_yaml::Value::Sequence(seq) => Ok(Self::Sequence(
                seq.into_iter()
                    .map(Self::from_yaml)
                    .collect::<Result<_, _>>()?,
            )),
            serde_yaml::Value::Mapping(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (k, v) in map {
                    let key = match k {
                        serde_yaml::Value::String(s) => s,
                        other => {
                            return Err(ValueError::NonStringKey {
                                text: format!("{other:?}"),
                            });
                        }
                    };
                    entries.push((key, Self::from_yaml(v)?));
                }
                Ok(Self::Mapping(entries))
            }
            serde_yaml::Value::Tagged(tag) => Err(ValueError::Unsupported {
                reason: format!("tagged value !{}", tag.tag),
            }),
        }
    }

    /// Get the integer value, coercing numeric strings.
    ///
    /// Accepts decimal and `0x` hexadecimal string forms; booleans read as
    /// 0/1 the way descriptor authors expect.
    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Str(s) => parse_int(s).ok_or_else(|| ValueError::NotAnInt {
                found: "string",
                text: s.clone(),
            }),
            other => Err(ValueError::NotAnInt {
                found: other.kind(),
                text: other.render(),
            }),
        }
    }

    /// Get the boolean value, coercing `"true"`/`"false"` and integers.
    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(i) => Ok(*i != 0),
            Self::Str(s) => match s.as_str() {
                "true" | "True" | "1" => Ok(true),
                "false" | "False" | "0" => Ok(false),
                _ => Err(ValueError::NotABool {
                    found: "string",
                    text: s.clone(),
                }),
            },
            other => Err(ValueError::NotABool {
                found: other.kind(),
                text: other.render(),
            }),
        }
    }

    /// Get the scalar string value. Ints and bools render to their literal
    /// form; sequences and mappings are rejected.
    pub fn as_str(&self) -> Result<String, ValueError> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::Int(i) => Ok(i.to_string()),
            Self::Bool(b) => Ok(b.to_string()),
            other => Err(ValueError::NotAString {
                found: other.kind(),
            }),
        }
    }

    /// Get the sequence items. A scalar is promoted to a one-element
    /// sequence; the empty string reads as the empty sequence.
    pub fn as_sequence(&self) -> Result<Vec<Value>, ValueError> {
        match self {
            Self::Sequence(items) => Ok(items.clone()),
            Self::Str(s) if s.is_empty() => Ok(Vec::new()),
            Self::Int(_) | Self::Bool(_) | Self::Str(_) => Ok(vec![self.clone()]),
            Self::Mapping(_) => Err(ValueError::NotASequence { found: "mapping" }),
        }
    }

    /// Get the mapping entries. The empty string reads as the empty mapping.
    pub fn as_mapping(&self) -> Result<&[(String, Value)], ValueError> {
        match self {
            Self::Mapping(entries) => Ok(entries),
            Self::Str(s) if s.is_empty() => Ok(&[]),
            other => Err(ValueError::NotAMapping {
                found: other.kind(),
            }),
        }
    }

    /// Look up a key in a mapping value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Mapping(entries) => entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Is this the empty scalar (a YAML null or explicit `""`)?
    #[must_use]
    pub fn is_empty_scalar(&self) -> bool {
        matches!(self, Self::Str(s) if s.is_empty())
    }

    /// One-line rendering for error messages.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
            Self::Sequence(items) => {
                let inner: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Mapping(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.render()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Parse a decimal or `0x`-prefixed integer literal.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(neg) = s.strip_prefix('-') {
        neg.parse::<i64>().ok().map(|v| -v)
    } else {
        s.parse::<i64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn yaml(text: &str) -> Value {
        let parsed: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        Value::from_yaml(parsed).unwrap()
    }

    #[test]
    fn from_yaml_scalars() {
        assert_eq!(yaml("3"), Value::Int(3));
        assert_eq!(yaml("true"), Value::Bool(true));
        assert_eq!(yaml("hello"), Value::Str("hello".to_string()));
    }

    #[test]
    fn from_yaml_null_is_empty_string() {
        assert_eq!(yaml("~"), Value::Str(String::new()));
        assert!(yaml("~").is_empty_scalar());
    }

    #[test]
    fn from_yaml_preserves_mapping_order() {
        let v = yaml("z: 1\na: 2\nm: 3\n");
        let keys: Vec<&str> = v
            .as_mapping()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn from_yaml_rejects_float() {
        let parsed: serde_yaml::Value = serde_yaml::from_str("1.5").unwrap();
        assert!(matches!(
            Value::from_yaml(parsed),
            Err(ValueError::Unsupported { .. })
        ));
    }

    #[test_case("12", 12 ; "decimal")]
    #[test_case("0x10", 16 ; "hex")]
    #[test_case("-4", -4 ; "negative")]
    fn int_coercion(text: &str, expected: i64) {
        assert_eq!(Value::Str(text.to_string()).as_int().unwrap(), expected);
    }

    #[test]
    fn int_coercion_failure_names_the_value() {
        let err = Value::Str("abc".to_string()).as_int().unwrap_err();
        assert_eq!(
            err,
            ValueError::NotAnInt {
                found: "string",
                text: "abc".to_string()
            }
        );
    }

    #[test]
    fn bool_coercion() {
        assert!(Value::Str("true".to_string()).as_bool().unwrap());
        assert!(!Value::Int(0).as_bool().unwrap());
        assert!(Value::Int(7).as_bool().unwrap());
        assert!(Value::Str("maybe".to_string()).as_bool().is_err());
    }

    #[test]
    fn scalar_promotes_to_sequence() {
        let v = Value::Str("one".to_string());
        assert_eq!(v.as_sequence().unwrap(), vec![v.clone()]);
        assert_eq!(Value::Str(String::new()).as_sequence().unwrap(), vec![]);
    }

    #[test]
    fn mapping_get_prefers_latest_entry() {
        let v = Value::Mapping(vec![
            ("k".to_string(), Value::Int(1)),
            ("k".to_string(), Value::Int(2)),
        ]);
        assert_eq!(v.get("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn empty_scalar_reads_as_empty_mapping() {
        assert_eq!(Value::Str(String::new()).as_mapping().unwrap(), &[]);
        assert!(Value::Int(1).as_mapping().is_err());
    }
}
