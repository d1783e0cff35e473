//! Individual settings and their definitions.

use tern_core::{PkgRef, Value};
use tern_expr::EvalValue;

/// Declared type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingType {
    /// Integer; the final value must evaluate to an integer.
    Int,
    /// Boolean; the final value must evaluate to truthiness.
    Bool,
    /// Free-form string.
    Str,
    /// Uninterpreted text passed through to emitters.
    #[default]
    Raw,
}

impl SettingType {
    /// Parse the descriptor spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(Self::Int),
            "bool" => Some(Self::Bool),
            "string" | "str" => Some(Self::Str),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// One override applied to a setting, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// The package whose vals produced this override.
    pub pkg: PkgRef,
    /// The raw value text.
    pub value: String,
}

/// A registered setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    /// Setting name.
    pub name: String,
    /// Declared type.
    pub stype: SettingType,
    /// Human description from the definition.
    pub description: String,
    /// Default value text from the definition.
    pub default: String,
    /// Permitted values, when the definition restricts them.
    pub restricted_to: Option<Vec<String>>,
    /// The single defining package.
    pub defining_pkg: PkgRef,
    /// Current value text.
    pub value: String,
    /// Overrides applied so far, oldest first.
    pub history: Vec<Override>,
}

impl Setting {
    /// Build a setting from its `syscfg.defs` entry.
    ///
    /// The definition is a mapping with `value`, and optionally
    /// `description`, `type`, and `restricted_to`. A malformed shape
    /// degrades to a raw setting with an empty default.
    #[must_use]
    pub fn from_def(name: String, defining_pkg: PkgRef, def: &Value) -> Self {
        let description = def
            .get("description")
            .and_then(|v| v.as_str().ok())
            .unwrap_or_default();
        let default = def
            .get("value")
            .and_then(|v| v.as_str().ok())
            .unwrap_or_default();
        let stype = def
            .get("type")
            .and_then(|v| v.as_str().ok())
            .and_then(|s| SettingType::parse(&s))
            .unwrap_or_default();
        let restricted_to = def.get("restricted_to").and_then(|v| {
            v.as_sequence().ok().map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().ok())
                    .collect::<Vec<_>>()
            })
        });

        Self {
            name,
            stype,
            description,
            restricted_to,
            defining_pkg,
            value: default.clone(),
            default,
            history: Vec::new(),
        }
    }

    /// The value as the expression evaluator sees it.
    ///
    /// Int and bool settings surface as integers when their text parses;
    /// anything else surfaces as the raw string.
    #[must_use]
    pub fn eval_value(&self) -> EvalValue {
        match self.stype {
            SettingType::Int | SettingType::Bool => match parse_scalar_int(&self.value) {
                Some(i) => EvalValue::Int(i),
                None => EvalValue::Str(self.value.clone()),
            },
            SettingType::Str | SettingType::Raw => EvalValue::Str(self.value.clone()),
        }
    }
}

/// Parse `0x`-hex, decimal, and boolean literal forms to an integer.
#[must_use]
pub fn parse_scalar_int(text: &str) -> Option<i64> {
    let text = text.trim();
    match text {
        "true" | "True" => return Some(1),
        "false" | "False" => return Some(0),
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    text.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn def(text: &str) -> Value {
        Value::from_yaml(serde_yaml::from_str(text).unwrap()).unwrap()
    }

    #[test]
    fn from_def_reads_all_fields() {
        let s = Setting::from_def(
            "LOG_LEVEL".to_string(),
            PkgRef::new("core", "sys/log"),
            &def("description: verbosity\nvalue: 2\ntype: int\nrestricted_to: [0, 1, 2]\n"),
        );
        assert_eq!(s.stype, SettingType::Int);
        assert_eq!(s.default, "2");
        assert_eq!(s.value, "2");
        assert_eq!(
            s.restricted_to,
            Some(vec!["0".to_string(), "1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn missing_type_defaults_to_raw() {
        let s = Setting::from_def(
            "X".to_string(),
            PkgRef::new("core", "a"),
            &def("value: hello\n"),
        );
        assert_eq!(s.stype, SettingType::Raw);
        assert_eq!(s.eval_value(), EvalValue::Str("hello".to_string()));
    }

    #[test]
    fn eval_value_coerces_ints_and_bools() {
        let mut s = Setting::from_def(
            "F".to_string(),
            PkgRef::new("core", "a"),
            &def("value: 0x10\ntype: int\n"),
        );
        assert_eq!(s.eval_value(), EvalValue::Int(16));
        s.stype = SettingType::Bool;
        s.value = "true".to_string();
        assert_eq!(s.eval_value(), EvalValue::Int(1));
    }
}
