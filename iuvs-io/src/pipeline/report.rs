//! Per-run record of dataset decisions.

use std::fmt;

use iuvs_core::Staleness;

/// What happened to every dataset visited during a run, in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivationReport {
    entries: Vec<(String, Staleness)>,
}

impl DerivationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the decision taken for `path`.
    pub fn record(&mut self, path: String, decision: Staleness) {
        self.entries.push((path, decision));
    }

    /// Appends the entries of another report.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Every decision in order.
    pub fn entries(&self) -> &[(String, Staleness)] {
        &self.entries
    }

    /// Decision taken for `path`, if it was visited.
    pub fn decision(&self, path: &str) -> Option<Staleness> {
        self.entries
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, d)| *d)
    }

    /// Number of decisions equal to `decision`.
    pub fn count(&self, decision: Staleness) -> usize {
        self.entries.iter().filter(|(_, d)| *d == decision).count()
    }

    /// Paths that were written, created or updated.
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, d)| d.needs_write())
            .map(|(p, _)| p.as_str())
    }

    /// Returns true when nothing had to be written.
    pub fn is_up_to_date(&self) -> bool {
        self.entries.iter().all(|(_, d)| !d.needs_write())
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was decided.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DerivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped",
            self.count(Staleness::Create),
            self.count(Staleness::Update),
            self.count(Staleness::Skip)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut report = DerivationReport::new();
        report.record("a/x".into(), Staleness::Create);
        report.record("a/y".into(), Staleness::Skip);
        let mut other = DerivationReport::new();
        other.record("a/z".into(), Staleness::Update);
        report.merge(other);

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(Staleness::Skip), 1);
        assert_eq!(report.decision("a/z"), Some(Staleness::Update));
        assert_eq!(report.written().collect::<Vec<_>>(), vec!["a/x", "a/z"]);
        assert!(!report.is_up_to_date());
        assert_eq!(report.to_string(), "1 created, 1 updated, 1 skipped");
    }

    #[test]
    fn test_empty_report_is_up_to_date() {
        assert!(DerivationReport::new().is_up_to_date());
    }
}
