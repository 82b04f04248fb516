use std::time::Duration;

/// The ban duration for peers whose received DAG violates a structural
/// bound (depth, branching, reachability).
pub(crate) const MEDIUM_BAN: Duration = Duration::from_secs(60 * 60 * 24);

/// The ban duration for peers that sent a summary failing semantic
/// validation.
pub(crate) const LONG_BAN: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks that the ban time increases with the severity of the offence.
    #[test]
    fn ban_times_sanity_check() {
        assert!(MEDIUM_BAN < LONG_BAN);
    }
}
