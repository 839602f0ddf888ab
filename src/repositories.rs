pub mod clicks;
pub mod merchants;
pub mod offers;
pub mod transactions;
pub mod users;
pub mod wallet;
pub mod withdrawals;

#[cfg(test)]
pub(crate) mod test_support;

/// True when `err` is a unique-constraint violation, optionally on a specific constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => match constraint {
            Some(name) => db_err.constraint() == Some(name),
            None => true,
        },
        _ => false,
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string()
}
