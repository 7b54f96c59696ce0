// ABOUTME: Diagnostics accumulator for runtime output that could not be fully read.
// ABOUTME: Skipped records and dropped fields are logged and counted, never fatal.

/// Counts what normalization had to leave out, logging each case once.
#[derive(Debug, Default)]
pub struct Diagnostics {
    skipped: usize,
    unreadable_fields: usize,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        match warning.kind {
            WarningKind::SkippedRecord => self.skipped += 1,
            WarningKind::UnreadableField => self.unreadable_fields += 1,
        }
    }

    /// Records dropped from the output entirely.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Fields left empty on records that were kept.
    pub fn unreadable_fields(&self) -> usize {
        self.unreadable_fields
    }
}

/// A non-fatal problem found while reading one record.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn skipped_record(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SkippedRecord,
            message: message.into(),
        }
    }

    pub fn unreadable_field(field: &str, value: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::UnreadableField,
            message: format!("ignoring unreadable {field}: {value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A line or object was dropped from the listing.
    SkippedRecord,
    /// A record was kept but one of its fields was not.
    UnreadableField,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_skipped_records_count_as_skipped() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::skipped_record("line 2: expected value"));
        diag.warn(Warning::unreadable_field("createdAt", "yesterday"));
        diag.warn(Warning::unreadable_field("port protocol", "sctp"));

        assert_eq!(diag.skipped(), 1);
        assert_eq!(diag.unreadable_fields(), 2);
    }
}
