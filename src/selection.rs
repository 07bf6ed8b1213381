//! Impactful-commit selection.

use std::cmp::Reverse;

use itertools::Itertools;

use crate::git::CommitRef;

const TOP_BY_IMPACT: usize = 9;

/// Choose up to ten commits to snapshot: the nine highest-impact commits
/// plus HEAD (which replaces the lowest of the nine when absent).
///
/// `commits` is newest-first, as enumerated; the returned list is
/// oldest-first, so HEAD is always the final entry. Ties on impact keep the
/// enumeration order, making the selection reproducible for identical git
/// output.
pub fn select_impactful(commits: &[CommitRef]) -> Vec<CommitRef> {
    if commits.is_empty() {
        return Vec::new();
    }

    let mut top = (0..commits.len())
        .sorted_by_key(|&i| Reverse(commits[i].impact))
        .take(TOP_BY_IMPACT)
        .collect_vec();

    if !top.contains(&0) {
        top.pop();
        top.push(0);
    }

    top.sort_by_key(|&i| Reverse(i));
    top.into_iter().map(|i| commits[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(n: usize, impact: u64) -> CommitRef {
        CommitRef { hash: format!("hash{}", n), date: format!("date{}", n), impact }
    }

    fn commits(impacts: &[u64]) -> Vec<CommitRef> {
        impacts.iter().enumerate().map(|(i, &imp)| commit(i, imp)).collect()
    }

    #[test]
    fn empty_history_selects_nothing() {
        assert!(select_impactful(&[]).is_empty());
    }

    #[test]
    fn head_replaces_lowest_of_top_nine() {
        // HEAD has impact 5 and is not among the top nine; the ninth-ranked
        // commit (impact 20) is dropped to make room.
        let list = commits(&[5, 100, 90, 80, 70, 60, 50, 40, 30, 20, 10, 9, 8, 7, 6]);
        let selected = select_impactful(&list);

        assert_eq!(selected.len(), 9);
        let impacts: Vec<u64> = selected.iter().map(|c| c.impact).collect();
        assert_eq!(impacts, vec![30, 40, 50, 60, 70, 80, 90, 100, 5]);
        assert_eq!(selected.last().unwrap().hash, "hash0");
    }

    #[test]
    fn head_already_in_top_is_not_duplicated() {
        let list = commits(&[100, 90, 80]);
        let selected = select_impactful(&list);

        assert_eq!(selected.len(), 3);
        let hashes: Vec<&str> = selected.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["hash2", "hash1", "hash0"]);
    }

    #[test]
    fn selection_is_capped_at_ten() {
        let mut impacts = vec![0u64];
        impacts.extend((1..=20).map(|i| i * 10));
        let selected = select_impactful(&commits(&impacts));

        assert!(selected.len() <= 10);
        assert_eq!(selected.last().unwrap().hash, "hash0");
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let list = commits(&[7, 7, 7, 7]);
        let selected = select_impactful(&list);

        // All fit in the top nine; output is oldest-first.
        let hashes: Vec<&str> = selected.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["hash3", "hash2", "hash1", "hash0"]);
    }

    #[test]
    fn single_commit_is_head_and_selected() {
        let selected = select_impactful(&commits(&[3]));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].hash, "hash0");
    }
}
