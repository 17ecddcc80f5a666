//! Application services for the administrative surface.

pub mod categories;
pub mod posts;

/// Collapses duplicate category ids while keeping first-seen order.
pub(crate) fn dedupe_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub(crate) fn ensure_non_empty(
    value: &str,
    field: &'static str,
) -> Result<(), crate::domain::error::DomainError> {
    if value.trim().is_empty() {
        return Err(crate::domain::error::DomainError::validation(
            field,
            "must not be empty",
        ));
    }
    Ok(())
}
