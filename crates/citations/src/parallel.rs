//! Parallel citation detection
//!
//! Parallel citations are different reporters citing the same decision in one
//! span of text, as in `22 U.S. 44, 46 (13 Atl. 33)`. Citations whose reporter
//! tokens sit close together are grouped.

use crate::citation::Citation;
use std::collections::HashSet;

/// Distance two reporter abbreviations can be from each other and still be
/// parallel reporters (exclusive).
pub const PARALLEL_DISTANCE: usize = 4;

/// Two or more citations referring to one decision, in text order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParallelCitationGroup(Vec<Citation>);

impl ParallelCitationGroup {
    pub fn citations(&self) -> &[Citation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn reversed(&self) -> Self {
        Self(self.0.iter().rev().cloned().collect())
    }
}

/// Group citations that are physically near each other.
///
/// `citations` must be in text order. Adjacent citations whose reporter
/// indexes differ by less than `max_distance` join the same group. A group is
/// skipped when its exact reverse is already in the result. Other
/// permutations of groups longer than two are kept as distinct groups.
pub fn identify_parallel_citations(
    citations: &[Citation],
    max_distance: usize,
) -> HashSet<ParallelCitationGroup> {
    let mut groups = HashSet::new();
    let Some(first) = citations.first() else {
        return groups;
    };

    let mut current = vec![first.clone()];
    for pair in citations.windows(2) {
        let (here, next) = (&pair[0], &pair[1]);
        if here.reporter_index.saturating_add(max_distance) > next.reporter_index {
            current.push(next.clone());
        } else {
            let finished = std::mem::replace(&mut current, vec![next.clone()]);
            add_group(&mut groups, finished);
        }
    }
    add_group(&mut groups, current);

    groups
}

fn add_group(groups: &mut HashSet<ParallelCitationGroup>, citations: Vec<Citation>) {
    if citations.len() < 2 {
        return;
    }
    let group = ParallelCitationGroup(citations);
    if !groups.contains(&group.reversed()) {
        groups.insert(group);
    }
}
