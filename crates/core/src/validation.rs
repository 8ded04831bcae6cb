//! Request-body validation helpers built on the `validator` crate.

use validator::{Validate, ValidationErrors};

use crate::error::CoreError;

/// Run `validator` rules on `input`, flattening failures into a
/// [`CoreError::Validation`] with one `field: message` entry per failure.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(describe(&errors)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: failed '{}' check", e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
