//! Read-only lookup from operation identifier to schema and builder.
//!
//! The operation set is closed, so the table is a `static` array in
//! [`OperationKind::ALL`] order. Hosts that only know identifiers (a CLI,
//! a config file, a UI) use it to discover schemas and turn
//! [`ParamValues`] into validated [`Params`].

use crate::convolution::{AverageParams, GaussianParams, SharpeningParams};
use crate::edge::{RobertsParams, SobelParams};
use crate::grayscale::GrayscaleParams;
use crate::operation::{OperationKind, Params};
use crate::params::{ParamValues, ParameterSet, ValidationError};
use crate::schema::Schema;
use crate::tone::{BinarizationParams, BrightnessParams, ContrastParams, NegativeParams};

/// One registered operation.
#[derive(Debug)]
pub struct RegistryEntry {
    /// The operation kind.
    pub kind: OperationKind,
    schema: fn() -> Schema,
    build: fn(&ParamValues) -> Result<Params, ValidationError>,
}

impl RegistryEntry {
    /// Stable identifier (same as [`OperationKind::id`]).
    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.kind.id()
    }

    /// The parameter schema.
    #[must_use]
    pub fn schema(&self) -> Schema {
        (self.schema)()
    }

    /// Build validated parameters from host values.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for unknown fields, values of the
    /// wrong kind, or values outside their domain.
    pub fn build(&self, values: &ParamValues) -> Result<Params, ValidationError> {
        (self.build)(values)
    }
}

fn build_with<P: ParameterSet + Into<Params>>(
    values: &ParamValues,
) -> Result<Params, ValidationError> {
    P::from_values(values).map(Into::into)
}

const fn entry<P: ParameterSet + Into<Params>>() -> RegistryEntry {
    RegistryEntry {
        kind: P::KIND,
        schema: P::schema,
        build: build_with::<P>,
    }
}

static ENTRIES: [RegistryEntry; 10] = [
    entry::<BrightnessParams>(),
    entry::<ContrastParams>(),
    entry::<GrayscaleParams>(),
    entry::<BinarizationParams>(),
    entry::<NegativeParams>(),
    entry::<AverageParams>(),
    entry::<GaussianParams>(),
    entry::<SharpeningParams>(),
    entry::<SobelParams>(),
    entry::<RobertsParams>(),
];

/// Every registered operation, in display order.
#[must_use]
pub fn entries() -> &'static [RegistryEntry] {
    &ENTRIES
}

/// The entry for `id`, if any.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static RegistryEntry> {
    ENTRIES.iter().find(|e| e.id() == id)
}

/// The entry for `kind`.
#[must_use]
pub fn entry_for(kind: OperationKind) -> &'static RegistryEntry {
    // `ENTRIES` is laid out in `OperationKind::ALL` order.
    &ENTRIES[kind as usize]
}

/// Build validated parameters for `kind` from host values.
///
/// # Errors
///
/// See [`RegistryEntry::build`].
pub fn build(kind: OperationKind, values: &ParamValues) -> Result<Params, ValidationError> {
    entry_for(kind).build(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_the_closed_set() {
        let ids: Vec<_> = entries().iter().map(RegistryEntry::id).collect();
        assert_eq!(
            ids,
            [
                "brightness",
                "contrast",
                "grayscale",
                "binarization",
                "negative",
                "average",
                "gaussian",
                "sharpening",
                "sobel",
                "roberts",
            ]
        );
    }

    #[test]
    fn table_order_matches_kind_order() {
        for kind in OperationKind::ALL {
            assert_eq!(entry_for(kind).kind, kind);
        }
    }

    #[test]
    fn lookup_unknown_is_none() {
        assert!(lookup("emboss").is_none());
        assert!(lookup("Gaussian").is_none());
    }

    #[test]
    fn lookup_builds_params() {
        let entry = lookup("gaussian").unwrap();
        let params = entry
            .build(
                &ParamValues::new()
                    .with("kernel_size", 5_i64)
                    .with("sigma", 2.0),
            )
            .unwrap();
        assert_eq!(
            params,
            Params::Gaussian(GaussianParams {
                kernel_size: 5,
                sigma: 2.0,
            })
        );
    }

    #[test]
    fn build_propagates_validation_errors() {
        let err = build(
            OperationKind::Gaussian,
            &ParamValues::new().with("kernel_size", 4_i64),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::EvenKernelSize(4));
    }

    #[test]
    fn entry_schema_matches_parameter_set() {
        assert_eq!(
            lookup("sharpening").unwrap().schema(),
            SharpeningParams::schema()
        );
        assert!(lookup("negative").unwrap().schema().is_empty());
    }
}
