//! Parameter sets: validated configuration bound to one operation kind.
//!
//! Every operation declares exactly one [`ParameterSet`] type. A
//! parameter set can be built directly (struct literal / `Default`) or
//! from host-supplied [`ParamValues`], which is how a UI that only knows
//! the [`Schema`] hands user input back to the core.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::operation::OperationKind;
use crate::schema::Schema;

/// Validated configuration for one operation kind.
///
/// [`validate`](Self::validate) must succeed before the parameters are
/// consumed by an operation's `apply`; every operation calls it first.
pub trait ParameterSet: fmt::Debug + Clone + Default + Send + Sync {
    /// The operation kind these parameters belong to.
    const KIND: OperationKind;

    /// Check every field against its domain.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    fn validate(&self) -> Result<(), ValidationError>;

    /// UI-agnostic description of the fields, in display order.
    ///
    /// Carries hints only; it never participates in `apply`.
    fn schema() -> Schema;

    /// Build and validate a parameter set from host-supplied values.
    ///
    /// Missing fields take their default. Unknown field names, values of
    /// the wrong kind, and values outside the field's domain are errors.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the offending field.
    fn from_values(values: &ParamValues) -> Result<Self, ValidationError>;
}

/// Errors raised while validating a parameter set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// An integer field received a non-integer value.
    #[error("{field} must be an integer, got {value}")]
    NotAnInteger {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: ParamValue,
    },

    /// A numeric field received a non-numeric value.
    #[error("{field} must be a number, got {value}")]
    NotANumber {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: ParamValue,
    },

    /// A numeric field is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NotFinite {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A categorical field received a value outside its option set.
    #[error("{field} must be one of {expected:?}, got {value}")]
    UnknownOption {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: ParamValue,
        /// Accepted option values.
        expected: &'static [&'static str],
    },

    /// `kernel_size` is even.
    #[error("kernel_size must be odd, got {0}")]
    EvenKernelSize(i64),

    /// `kernel_size` is below the minimum.
    #[error("kernel_size must be at least {min}, got {actual}")]
    KernelTooSmall {
        /// Smallest accepted size.
        min: i64,
        /// The rejected size.
        actual: i64,
    },

    /// An integer value does not fit the field's storage type.
    #[error("{field} is out of range: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A field that must be strictly positive is zero, negative, or NaN.
    #[error("{field} must be positive, got {value}")]
    NotPositive {
        /// Field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The host supplied a field the parameter set does not have.
    #[error("unknown parameter {field:?} for {operation}")]
    UnknownField {
        /// Operation the values were meant for.
        operation: OperationKind,
        /// The unrecognized field name.
        field: String,
    },
}

/// A single host-supplied scalar.
///
/// Deserializes from a JSON number or string; parses from text via
/// [`FromStr`] (integer first, then real, otherwise text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer.
    Int(i64),
    /// Real number.
    Float(f64),
    /// String (enumerated options).
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl FromStr for ParamValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self::Int(v));
        }
        if let Ok(v) = s.parse::<f64>() {
            return Ok(Self::Float(v));
        }
        Ok(Self::Text(s.to_owned()))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Host-supplied field values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamValues(BTreeMap<String, ParamValue>);

impl ParamValues {
    /// An empty set of values (every field takes its default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set `field` to `value`, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// The value supplied for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.0.get(field)
    }

    /// Iterate over `(field, value)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of supplied fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no field was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Typed access to [`ParamValues`] for one parameter set.
///
/// Construction rejects field names outside `known`.
pub(crate) struct FieldReader<'a> {
    values: &'a ParamValues,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(
        values: &'a ParamValues,
        operation: OperationKind,
        known: &[&str],
    ) -> Result<Self, ValidationError> {
        if let Some((field, _)) = values.iter().find(|(k, _)| !known.contains(k)) {
            return Err(ValidationError::UnknownField {
                operation,
                field: field.to_owned(),
            });
        }
        Ok(Self { values })
    }

    /// An integer field. Reals are rejected, even with a zero fraction.
    pub(crate) fn int(&self, field: &'static str, default: i64) -> Result<i64, ValidationError> {
        match self.values.get(field) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(other) => Err(ValidationError::NotAnInteger {
                field,
                value: other.clone(),
            }),
        }
    }

    /// A real field. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn real(&self, field: &'static str, default: f64) -> Result<f64, ValidationError> {
        match self.values.get(field) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(other @ ParamValue::Text(_)) => Err(ValidationError::NotANumber {
                field,
                value: other.clone(),
            }),
        }
    }

    /// A categorical field parsed with `parse`.
    pub(crate) fn choice<T>(
        &self,
        field: &'static str,
        expected: &'static [&'static str],
        parse: impl Fn(&str) -> Option<T>,
        default: T,
    ) -> Result<T, ValidationError> {
        match self.values.get(field) {
            None => Ok(default),
            Some(value @ ParamValue::Text(s)) => {
                parse(s).ok_or_else(|| ValidationError::UnknownOption {
                    field,
                    value: value.clone(),
                    expected,
                })
            }
            Some(other) => Err(ValidationError::UnknownOption {
                field,
                value: other.clone(),
                expected,
            }),
        }
    }

    /// An odd kernel size of at least 3.
    pub(crate) fn kernel_size(&self, default: u32) -> Result<u32, ValidationError> {
        let raw = self.int("kernel_size", i64::from(default))?;
        check_kernel_size(raw)?;
        u32::try_from(raw).map_err(|_| ValidationError::OutOfRange {
            field: "kernel_size",
            value: raw,
        })
    }
}

/// Smallest accepted convolution kernel size.
pub const MIN_KERNEL_SIZE: u32 = 3;

/// Oddness is checked before the lower bound, so `2` reports "must be odd".
pub(crate) fn check_kernel_size(size: i64) -> Result<(), ValidationError> {
    if size % 2 == 0 {
        return Err(ValidationError::EvenKernelSize(size));
    }
    if size < i64::from(MIN_KERNEL_SIZE) {
        return Err(ValidationError::KernelTooSmall {
            min: i64::from(MIN_KERNEL_SIZE),
            actual: size,
        });
    }
    Ok(())
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

pub(crate) fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field, value });
    }
    Ok(())
}
