//! Final run report.

use std::fmt;

use crate::collector::SlotTable;
use crate::config::Mode;

/// Results of a completed run, printed as two whitespace-delimited tables:
/// items acked, then completion times, one row per communicating node and
/// one column per measured slot.
pub struct RunReport {
    mode: Mode,
    table: SlotTable,
    short_deliveries: u32,
}

impl RunReport {
    pub(crate) fn new(mode: Mode, table: SlotTable, short_deliveries: u32) -> Self {
        Self {
            mode,
            table,
            short_deliveries,
        }
    }

    /// Synchronization strategy of the run.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of communicating nodes.
    pub fn comm_nodes(&self) -> usize {
        self.table.nodes()
    }

    /// Number of measured slots.
    pub fn total_slots(&self) -> usize {
        self.table.slots()
    }

    /// Item counts for one node, slot by slot.
    pub fn items(&self, rank: usize) -> &[u32] {
        self.table.items_row(rank)
    }

    /// Completion times for one node, slot by slot. Relative to slot start
    /// in the barrier modes, to run start in the staggered mode.
    pub fn times_us(&self, rank: usize) -> &[u64] {
        self.table.times_row(rank)
    }

    /// Slots across all nodes that delivered fewer items than expected.
    pub fn short_deliveries(&self) -> u32 {
        self.short_deliveries
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Items acked [rank, slot]:")?;
        for rank in 1..=self.table.nodes() {
            write!(f, "rank {}:", rank)?;
            for items in self.table.items_row(rank) {
                write!(f, " {}", items)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        let times_label = match self.mode {
            Mode::Pairwise | Mode::Acked => "relative to slot start",
            Mode::Staggered => "relative to run start",
        };
        writeln!(f, "Times acked ({}) [rank, slot]:", times_label)?;
        for rank in 1..=self.table.nodes() {
            write!(f, "rank {}:", rank)?;
            for time_us in self.table.times_row(rank) {
                write!(f, " {}", time_us)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "short deliveries: {}", self.short_deliveries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SlotTable {
        let mut table = SlotTable::new(2, 3);
        for slot in 0..3 {
            table.record(1, slot, 1, 100 + slot as u64);
            table.record(2, slot, 1, 200 + slot as u64);
        }
        table
    }

    #[test]
    fn test_display_tables() {
        let report = RunReport::new(Mode::Acked, sample_table(), 0);
        let text = report.to_string();
        assert!(text.contains("Items acked [rank, slot]:"));
        assert!(text.contains("rank 1: 1 1 1"));
        assert!(text.contains("rank 2: 1 1 1"));
        assert!(text.contains("Times acked (relative to slot start) [rank, slot]:"));
        assert!(text.contains("rank 1: 100 101 102"));
        assert!(text.contains("rank 2: 200 201 202"));
        assert!(text.contains("short deliveries: 0"));
    }

    #[test]
    fn test_display_staggered_label() {
        let report = RunReport::new(Mode::Staggered, sample_table(), 0);
        let text = report.to_string();
        assert!(text.contains("Times acked (relative to run start) [rank, slot]:"));
    }

    #[test]
    fn test_display_short_deliveries() {
        let report = RunReport::new(Mode::Pairwise, sample_table(), 4);
        assert!(report.to_string().contains("short deliveries: 4"));
    }
}
