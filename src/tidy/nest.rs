//! Nesting observations into per-group tables and back.

use std::collections::HashMap;

use crate::domain::{GroupRow, GroupTable, GroupedTable, Observation};

/// Partition observations by `group_id`.
///
/// Groups appear in order of first occurrence; rows keep their input order.
pub fn nest(observations: &[Observation]) -> GroupedTable {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupTable> = Vec::new();

    for o in observations {
        let slot = *index.entry(o.group_id.as_str()).or_insert_with(|| {
            groups.push(GroupTable {
                group_id: o.group_id.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(GroupRow {
            time: o.time,
            value: o.value,
            elapsed: o.elapsed,
            delta: o.delta,
        });
    }

    GroupedTable { groups }
}

impl GroupedTable {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupTable> {
        self.groups.iter()
    }

    pub fn get(&self, group_id: &str) -> Option<&GroupTable> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.group_id.as_str()).collect()
    }

    /// Total rows across all groups.
    pub fn total_rows(&self) -> usize {
        self.groups.iter().map(GroupTable::len).sum()
    }

    /// Flatten back to observations, group by group.
    pub fn unnest(&self) -> Vec<Observation> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.rows.iter().map(move |r| Observation {
                    group_id: g.group_id.clone(),
                    time: r.time,
                    value: r.value,
                    elapsed: r.elapsed,
                    delta: r.delta,
                })
            })
            .collect()
    }
}
