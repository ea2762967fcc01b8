/*!
Aggregation and analysis of regional election scenarios.

A scenario is a list of candidates and, for each region, the number of votes received by
every candidate. This crate computes the national and per-grouping totals, the winner and
margin of every region, and a number of rankings built on top of them.

```
use scenario_engine::*;

let mut builder = ScenarioBuilder::new(RoundMode::SecondRound)
    .candidates(&["Anna".to_string(), "Bob".to_string()])?;
builder.add_region("BR-SP", &[700, 300])?;
builder.add_region("BR-RJ", &[520, 480])?;
let store = builder.build();

let national = national_totals(store.candidates(), store.votes());
assert_eq!(national.totals, vec![1220, 780]);

let swing = swing_regions(store.candidates(), store.votes());
assert_eq!(swing.len(), 1);
# Ok::<(), ScenarioErrors>(())
```

All the functions are pure: they read a snapshot of the scenario and never fail.
*/

mod analysis;
pub mod builder;
pub mod manual;
mod model;
mod regions;
mod store;

use log::{debug, warn};

pub use crate::analysis::*;
pub use crate::builder::ScenarioBuilder;
pub use crate::model::*;
pub use crate::regions::*;
pub use crate::store::{ScenarioStore, MAX_CANDIDATE_SLOTS, MAX_VOTE_COUNT};

/// Label used when a candidate cannot be found.
pub const MISSING_LABEL: &str = "N/A";

/// The share of `part` in `total`, in percent. A zero total gives zero.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Adds up vote counts, stopping at `u64::MAX` instead of overflowing.
pub fn sum_votes<I: Iterator<Item = u64>>(counts: I) -> u64 {
    counts.fold(0, u64::saturating_add)
}

pub fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// The display name of a candidate, or [MISSING_LABEL].
pub fn candidate_label(candidates: &[Candidate], cid: CandidateId) -> &str {
    candidates
        .iter()
        .find(|c| c.ordinal == cid)
        .map(|c| c.name.as_str())
        .unwrap_or(MISSING_LABEL)
}

/// The votes of one region, restricted to a set of candidates and sorted by ordinal.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionTally {
    pub counts: Vec<(CandidateId, u64)>,
    pub total: u64,
}

impl RegionTally {
    /// Reads the votes of the given candidates. Ordinals outside of the vote list count as
    /// zero, and entries that belong to no candidate are ignored.
    pub fn for_candidates(candidates: &[Candidate], region_votes: &[u64]) -> RegionTally {
        let mut counts: Vec<(CandidateId, u64)> = candidates
            .iter()
            .map(|c| {
                (
                    c.ordinal,
                    region_votes.get(c.ordinal.index()).cloned().unwrap_or(0),
                )
            })
            .collect();
        counts.sort_by_key(|p| p.0);
        let total = sum_votes(counts.iter().map(|p| p.1));
        RegionTally { counts, total }
    }

    /// Every position of the vote list is a candidate.
    pub fn from_raw(region_votes: &[u64]) -> RegionTally {
        let counts: Vec<(CandidateId, u64)> = region_votes
            .iter()
            .enumerate()
            .map(|(idx, v)| (CandidateId(idx as u32), *v))
            .collect();
        let total = sum_votes(counts.iter().map(|p| p.1));
        RegionTally { counts, total }
    }

    pub fn is_configured(&self) -> bool {
        self.total > 0
    }

    /// The candidate with the most votes. Ties go to the lowest ordinal.
    /// A region without votes has no leader.
    pub fn leader(&self) -> Option<(CandidateId, u64)> {
        if !self.is_configured() {
            return None;
        }
        best_of(self.counts.iter().cloned())
    }

    /// The candidate with the most votes among all the candidates except `winner`.
    /// Ties go to the lowest ordinal, so a tie for first place gives the next ordinal.
    pub fn runner_up(&self, winner: CandidateId) -> Option<(CandidateId, u64)> {
        best_of(self.counts.iter().cloned().filter(|(cid, _)| *cid != winner))
    }

    /// All the counts by decreasing number of votes, in ordinal order for equal counts.
    pub fn ranked(&self) -> Vec<(CandidateId, u64)> {
        let mut res = self.counts.clone();
        res.sort_by(|a, b| b.1.cmp(&a.1));
        res
    }
}

// Linear scan: only a strictly greater count replaces the current best.
fn best_of<I: Iterator<Item = (CandidateId, u64)>>(it: I) -> Option<(CandidateId, u64)> {
    let mut best: Option<(CandidateId, u64)> = None;
    for (cid, count) in it {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((cid, count)),
        }
    }
    best
}

/// Sums the votes of each candidate over all the regions.
///
/// `totals` follows the order of `candidates`. Vote entries that do not belong to a
/// current candidate are ignored.
pub fn national_totals(candidates: &[Candidate], votes: &VoteMatrix) -> NationalTotals {
    let mut totals: Vec<u64> = vec![0; candidates.len()];
    for (rid, region_votes) in votes.iter() {
        if region_votes.len() > candidates.len() {
            debug!(
                "national_totals: region {} has {} entries for {} candidates",
                rid,
                region_votes.len(),
                candidates.len()
            );
        }
        for (idx, c) in candidates.iter().enumerate() {
            if let Some(v) = region_votes.get(c.ordinal.index()) {
                totals[idx] = totals[idx].saturating_add(*v);
            }
        }
    }
    let grand_total = sum_votes(totals.iter().cloned());
    NationalTotals {
        totals,
        grand_total,
    }
}

/// Sums the votes of each candidate over the regions of every grouping of the table.
///
/// Regions that are not in the table are skipped.
pub fn group_totals(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    table: &RegionTable,
) -> Vec<GroupTotals> {
    let mut res: Vec<GroupTotals> = table
        .groups()
        .iter()
        .map(|g| GroupTotals {
            group: g.clone(),
            totals: vec![0; candidates.len()],
            group_total: 0,
        })
        .collect();

    for (rid, region_votes) in votes.iter() {
        let group = match table.group_of(rid) {
            Some(g) => g,
            None => {
                warn!("group_totals: skipping unknown region {}", rid);
                continue;
            }
        };
        if let Some(gt) = res.iter_mut().find(|gt| gt.group == group) {
            for (idx, c) in candidates.iter().enumerate() {
                if let Some(v) = region_votes.get(c.ordinal.index()) {
                    gt.totals[idx] = gt.totals[idx].saturating_add(*v);
                    gt.group_total = gt.group_total.saturating_add(*v);
                }
            }
        }
    }
    res
}

/// The winner of a region, where each position of `region_votes` is a candidate ordinal.
///
/// Ties go to the lowest ordinal. A region without votes has no winner.
pub fn region_winner(region_votes: &[u64]) -> Option<RegionWinner> {
    let tally = RegionTally::from_raw(region_votes);
    tally.leader().map(|(winner, count)| RegionWinner {
        winner,
        winner_pct: round_one_decimal(percentage(count, tally.total)),
        total: tally.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cands(n: u32) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate {
                name: format!("C{}", i),
                party: format!("P{}", i),
                color: "#000000".to_string(),
                ordinal: CandidateId(i),
                is_others: false,
            })
            .collect()
    }

    fn matrix(entries: &[(&str, &[u64])]) -> VoteMatrix {
        entries
            .iter()
            .map(|(rid, v)| (RegionId::new(rid), v.to_vec()))
            .collect()
    }

    #[test]
    fn national_totals_two_regions() {
        let m = matrix(&[("BR-SP", &[700, 300]), ("BR-RJ", &[520, 480])]);
        let nt = national_totals(&cands(2), &m);
        assert_eq!(nt.totals, vec![1220, 780]);
        assert_eq!(nt.grand_total, 2000);
    }

    #[test]
    fn national_totals_ignores_stale_entries() {
        let m = matrix(&[("BR-SP", &[700, 300, 50]), ("BR-RJ", &[520])]);
        let nt = national_totals(&cands(2), &m);
        assert_eq!(nt.totals, vec![1220, 300]);
        assert_eq!(nt.grand_total, 1520);
    }

    #[test]
    fn national_totals_empty_inputs() {
        let nt = national_totals(&[], &matrix(&[("BR-SP", &[1, 2])]));
        assert!(nt.totals.is_empty());
        assert_eq!(nt.grand_total, 0);
        let nt = national_totals(&cands(3), &VoteMatrix::new());
        assert_eq!(nt.totals, vec![0, 0, 0]);
    }

    #[test]
    fn group_totals_skip_unknown_regions() {
        let m = matrix(&[
            ("BR-SP", &[700, 300]),
            ("XX-ZZ", &[1000, 1000]),
            ("BR-RJ", &[520, 480]),
            ("BR-BA", &[10, 90]),
        ]);
        let gts = group_totals(&cands(2), &m, &RegionTable::brazil());
        assert_eq!(gts.len(), 5);
        let sudeste = gts.iter().find(|g| g.group == "Sudeste").unwrap();
        assert_eq!(sudeste.totals, vec![1220, 780]);
        assert_eq!(sudeste.group_total, 2000);
        let nordeste = gts.iter().find(|g| g.group == "Nordeste").unwrap();
        assert_eq!(nordeste.totals, vec![10, 90]);
        let sul = gts.iter().find(|g| g.group == "Sul").unwrap();
        assert_eq!(sul.group_total, 0);
        let all: u64 = gts.iter().map(|g| g.group_total).sum();
        assert_eq!(all, 2100);
    }

    #[test]
    fn region_winner_tie_goes_to_lowest_ordinal() {
        let w = region_winner(&[100, 300, 300]).unwrap();
        assert_eq!(w.winner, CandidateId(1));
        assert_eq!(w.total, 700);
        assert_eq!(w.winner_pct, 42.9);
        let w = region_winner(&[100, 100, 100]).unwrap();
        assert_eq!(w.winner, CandidateId(0));
    }

    #[test]
    fn region_winner_requires_votes() {
        assert_eq!(region_winner(&[0, 0]), None);
        assert_eq!(region_winner(&[]), None);
    }

    #[test]
    fn runner_up_is_distinct_from_winner() {
        let t = RegionTally::from_raw(&[100, 100, 100]);
        let (w, _) = t.leader().unwrap();
        assert_eq!(w, CandidateId(0));
        assert_eq!(t.runner_up(w), Some((CandidateId(1), 100)));
        let t = RegionTally::from_raw(&[5]);
        assert_eq!(t.runner_up(CandidateId(0)), None);
    }

    #[test]
    fn tally_orders_by_ordinal() {
        let mut cs = cands(3);
        cs.reverse();
        let t = RegionTally::for_candidates(&cs, &[3, 2, 1, 99]);
        assert_eq!(
            t.counts,
            vec![(CandidateId(0), 3), (CandidateId(1), 2), (CandidateId(2), 1)]
        );
        assert_eq!(t.total, 6);
        assert_eq!(
            t.ranked(),
            vec![(CandidateId(0), 3), (CandidateId(1), 2), (CandidateId(2), 1)]
        );
    }

    #[test]
    fn missing_candidate_label() {
        assert_eq!(candidate_label(&cands(2), CandidateId(1)), "C1");
        assert_eq!(candidate_label(&cands(2), CandidateId(7)), MISSING_LABEL);
    }

    #[test]
    fn sums_stop_at_the_largest_count() {
        let m = matrix(&[("BR-SP", &[u64::MAX, 1]), ("BR-RJ", &[u64::MAX - 1, 0])]);
        let nt = national_totals(&cands(2), &m);
        assert_eq!(nt.totals, vec![u64::MAX, 1]);
        assert_eq!(nt.grand_total, u64::MAX);
        let gts = group_totals(&cands(2), &m, &RegionTable::brazil());
        let sudeste = gts.iter().find(|g| g.group == "Sudeste").unwrap();
        assert_eq!(sudeste.group_total, u64::MAX);
        let w = region_winner(&[u64::MAX, 1]).unwrap();
        assert_eq!(w.winner, CandidateId(0));
        assert_eq!(w.total, u64::MAX);
    }

    #[test]
    fn percentage_of_zero_total() {
        assert_eq!(percentage(10, 0), 0.0);
        assert_eq!(round_one_decimal(percentage(1, 3)), 33.3);
    }
}
