//! Rotor matching generation.
//!
//! Communicating nodes are ranked `1..=n`. Slots cycle through `n - 1`
//! matchings; in slot `s` the active matching is row `s % (n - 1)`. The
//! tables are generated by rotating a base sequence, which yields, for
//! every slot column, a cyclic shift of the node set: a fixed-point-free
//! permutation whose receive relation is the exact inverse of the send
//! relation.

use crate::error::{Error, Result};

/// Send and receive partner tables for a set of communicating nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchingTable {
    send_to: Vec<Vec<usize>>,
    recv_from: Vec<Vec<usize>>,
}

impl MatchingTable {
    /// Generate the matching tables for `comm_nodes` communicating nodes.
    ///
    /// The cycle length is `comm_nodes - 1`, so every node meets every
    /// other node exactly once per cycle.
    pub fn generate(comm_nodes: usize) -> Result<Self> {
        if comm_nodes < 2 {
            return Err(Error::InvalidConfig(format!(
                "matching needs at least 2 communicating nodes, got {}",
                comm_nodes
            )));
        }
        let nmatch = comm_nodes - 1;

        // Shift-based connection generation: seed with [1..=n], pre-rotate
        // by the cycle length, then one more rotation per row. Element 0 of
        // the rotated sequence is the row's own rank, so partners start at
        // element 1.
        let mut base: Vec<usize> = (1..=comm_nodes).collect();
        base.rotate_left(nmatch);

        let mut send_to = Vec::with_capacity(comm_nodes);
        for _ in 0..comm_nodes {
            base.rotate_left(1);
            send_to.push(base[1..=nmatch].to_vec());
        }

        // Node i receives from k in slot j iff k sends to i in slot j;
        // for the rotation scheme that is the reversed send row.
        let recv_from = send_to
            .iter()
            .map(|row| row.iter().rev().copied().collect())
            .collect();

        Ok(Self { send_to, recv_from })
    }

    /// Number of communicating nodes covered by the table.
    pub fn comm_nodes(&self) -> usize {
        self.send_to.len()
    }

    /// Number of distinct matchings before the pattern repeats.
    pub fn cycle_len(&self) -> usize {
        self.comm_nodes() - 1
    }

    /// Partner that `rank` sends to in slot `slot`.
    pub fn send_partner(&self, rank: usize, slot: usize) -> usize {
        self.send_to[rank - 1][slot % self.cycle_len()]
    }

    /// Partner that `rank` receives from in slot `slot`.
    pub fn recv_partner(&self, rank: usize, slot: usize) -> usize {
        self.recv_from[rank - 1][slot % self.cycle_len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_node_static_table() {
        // Fixed reference topology: 1 coordinator + 3 communicating nodes.
        let table = MatchingTable::generate(3).unwrap();
        assert_eq!(table.send_to, vec![vec![2, 3], vec![3, 1], vec![1, 2]]);
        assert_eq!(table.recv_from, vec![vec![3, 2], vec![1, 3], vec![2, 1]]);
    }

    #[test]
    fn test_four_node_static_table() {
        let table = MatchingTable::generate(4).unwrap();
        assert_eq!(
            table.send_to,
            vec![
                vec![2, 3, 4],
                vec![3, 4, 1],
                vec![4, 1, 2],
                vec![1, 2, 3],
            ]
        );
        assert_eq!(
            table.recv_from,
            vec![
                vec![4, 3, 2],
                vec![1, 4, 3],
                vec![2, 1, 4],
                vec![3, 2, 1],
            ]
        );
    }

    #[test]
    fn test_columns_are_fixed_point_free_permutations() {
        for n in 3..=9 {
            let table = MatchingTable::generate(n).unwrap();
            for slot in 0..table.cycle_len() {
                let mut targets = vec![false; n + 1];
                for rank in 1..=n {
                    let to = table.send_partner(rank, slot);
                    assert_ne!(to, rank, "n={} slot={}: rank {} sends to itself", n, slot, rank);
                    assert!(
                        (1..=n).contains(&to),
                        "n={} slot={}: target {} out of range",
                        n,
                        slot,
                        to
                    );
                    assert!(
                        !targets[to],
                        "n={} slot={}: {} receives from two senders",
                        n,
                        slot,
                        to
                    );
                    targets[to] = true;
                }
            }
        }
    }

    #[test]
    fn test_receive_is_inverse_of_send() {
        for n in 2..=9 {
            let table = MatchingTable::generate(n).unwrap();
            for slot in 0..table.cycle_len() {
                for rank in 1..=n {
                    let from = table.recv_partner(rank, slot);
                    assert_eq!(
                        table.send_partner(from, slot),
                        rank,
                        "n={} slot={}: recv table is not the inverse of send",
                        n,
                        slot
                    );
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        for n in [2, 3, 5, 8] {
            let a = MatchingTable::generate(n).unwrap();
            let b = MatchingTable::generate(n).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_slot_index_wraps_cycle() {
        let table = MatchingTable::generate(3).unwrap();
        for slot in 0..10 {
            assert_eq!(table.send_partner(1, slot), table.send_partner(1, slot % 2));
            assert_eq!(table.recv_partner(2, slot), table.recv_partner(2, slot % 2));
        }
    }

    #[test]
    fn test_rejects_degenerate_sizes() {
        assert!(matches!(
            MatchingTable::generate(0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            MatchingTable::generate(1),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_two_nodes_alternate() {
        let table = MatchingTable::generate(2).unwrap();
        assert_eq!(table.send_partner(1, 0), 2);
        assert_eq!(table.send_partner(2, 0), 1);
        assert_eq!(table.recv_partner(1, 0), 2);
        assert_eq!(table.recv_partner(2, 0), 1);
    }
}
