//! UI-agnostic parameter schemas.
//!
//! A [`Schema`] tells a host how to collect input for a parameter set
//! without the core knowing anything about widgets. It serializes to an
//! ordered JSON object:
//!
//! ```json
//! {
//!   "kernel_size": {"kind": "slider", "min": 3, "max": 21, "step": 2, "default": 3},
//!   "sigma": {"kind": "slider", "min": 0.1, "max": 5.0, "step": 0.1, "default": 1.0}
//! }
//! ```

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::params::{ParamValue, ParamValues};

/// A slider bound or default, integer or real.
///
/// Integer fields carry [`Number::Int`] so a host that echoes the
/// default back produces a value the integer field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer.
    Int(i64),
    /// Real.
    Real(f64),
}

impl Number {
    /// The value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Real(v) => v,
        }
    }
}

impl From<Number> for ParamValue {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => Self::Int(v),
            Number::Real(v) => Self::Float(v),
        }
    }
}

/// Ordered `value -> label` options for a dropdown or radio field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices(Vec<(&'static str, &'static str)>);

impl Choices {
    /// Options in display order.
    #[must_use]
    pub fn new(options: Vec<(&'static str, &'static str)>) -> Self {
        Self(options)
    }

    /// Iterate over `(value, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().copied()
    }

    /// The label for `value`, if it is one of the options.
    #[must_use]
    pub fn label(&self, value: &str) -> Option<&'static str> {
        self.iter().find(|(v, _)| *v == value).map(|(_, l)| l)
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Choices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// How a single field should be presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldDescriptor {
    /// A bounded numeric range.
    Slider {
        /// Lower bound.
        min: Number,
        /// Upper bound.
        max: Number,
        /// Increment between selectable values.
        step: Number,
        /// Initial value.
        default: Number,
    },
    /// A drop-down list of options.
    Dropdown {
        /// `value -> label` options.
        options: Choices,
        /// Initially selected value.
        default: &'static str,
    },
    /// A group of mutually exclusive options.
    Radio {
        /// `value -> label` options.
        options: Choices,
        /// Initially selected value.
        default: &'static str,
    },
}

impl FieldDescriptor {
    /// An integer slider.
    #[must_use]
    pub const fn int_slider(min: i64, max: i64, step: i64, default: i64) -> Self {
        Self::Slider {
            min: Number::Int(min),
            max: Number::Int(max),
            step: Number::Int(step),
            default: Number::Int(default),
        }
    }

    /// A real-valued slider.
    #[must_use]
    pub const fn real_slider(min: f64, max: f64, step: f64, default: f64) -> Self {
        Self::Slider {
            min: Number::Real(min),
            max: Number::Real(max),
            step: Number::Real(step),
            default: Number::Real(default),
        }
    }

    /// The field's default as a host value.
    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        match self {
            Self::Slider { default, .. } => (*default).into(),
            Self::Dropdown { default, .. } | Self::Radio { default, .. } => (*default).into(),
        }
    }
}

/// Ordered mapping from field name to [`FieldDescriptor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(&'static str, FieldDescriptor)>,
}

impl Schema {
    /// A schema with no fields.
    #[must_use]
    pub const fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field (builder style).
    #[must_use]
    pub fn field(mut self, name: &'static str, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name, descriptor));
        self
    }

    /// The descriptor for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| d)
    }

    /// Iterate over `(name, descriptor)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, d)| (*n, d))
    }

    /// Field names in display order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every field's default, ready to feed back into
    /// [`ParameterSet::from_values`](crate::ParameterSet::from_values).
    #[must_use]
    pub fn defaults(&self) -> ParamValues {
        self.iter()
            .map(|(name, descriptor)| (name, descriptor.default_value()))
            .collect()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, descriptor) in &self.fields {
            map.serialize_entry(name, descriptor)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::empty()
            .field(
                "method",
                FieldDescriptor::Radio {
                    options: Choices::new(vec![("a", "Alpha"), ("b", "Beta")]),
                    default: "a",
                },
            )
            .field("amount", FieldDescriptor::real_slider(0.0, 2.0, 0.01, 1.0))
            .field("size", FieldDescriptor::int_slider(3, 21, 2, 3))
    }

    #[test]
    fn fields_keep_insertion_order() {
        let names: Vec<_> = sample().names().collect();
        assert_eq!(names, vec!["method", "amount", "size"]);
    }

    #[test]
    fn serializes_as_ordered_tagged_map() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"method":{"kind":"radio","options":{"a":"Alpha","b":"Beta"},"default":"a"},"#,
                r#""amount":{"kind":"slider","min":0.0,"max":2.0,"step":0.01,"default":1.0},"#,
                r#""size":{"kind":"slider","min":3,"max":21,"step":2,"default":3}}"#,
            )
        );
    }

    #[test]
    fn dropdown_kind_tag() {
        let d = FieldDescriptor::Dropdown {
            options: Choices::new(vec![("x", "X")]),
            default: "x",
        };
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["kind"], "dropdown");
        assert_eq!(value["options"]["x"], "X");
    }

    #[test]
    fn defaults_keep_integer_kind() {
        let defaults = sample().defaults();
        assert_eq!(defaults.get("size"), Some(&ParamValue::Int(3)));
        assert_eq!(defaults.get("amount"), Some(&ParamValue::Float(1.0)));
        assert_eq!(
            defaults.get("method"),
            Some(&ParamValue::Text("a".to_owned()))
        );
    }

    #[test]
    fn choices_label_lookup() {
        let choices = Choices::new(vec![("a", "Alpha")]);
        assert_eq!(choices.label("a"), Some("Alpha"));
        assert_eq!(choices.label("z"), None);
    }

    #[test]
    fn empty_schema_serializes_to_empty_object() {
        assert_eq!(serde_json::to_string(&Schema::empty()).unwrap(), "{}");
    }
}
