//! Garde validation utilities.

use crate::domain::DomainError;
use garde::{Report, Validate};
use std::collections::BTreeMap;

/// Validate a request, converting the garde report into a `ValidationError`
/// whose message lists each failing field once, in field-name order.
pub fn validate<T>(value: &T) -> Result<(), DomainError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| DomainError::ValidationError(describe_report(&report)))
}

/// Renders a report as `field: message and message; field: message`.
/// Errors on the request itself are listed under `request`.
fn describe_report(report: &Report) -> String {
    let mut by_field: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, error) in report.iter() {
        let field = match path.to_string() {
            path if path.is_empty() => "request".to_string(),
            path => path,
        };
        by_field
            .entry(field)
            .or_default()
            .push(error.message().to_string());
    }

    by_field
        .into_iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" and ")))
        .collect::<Vec<_>>()
        .join("; ")
}
