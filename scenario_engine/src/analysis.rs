// Derived views: margins, swing regions, rankings and regional breakdowns.
//
// Every function recomputes from the snapshot it is given. Nothing is cached.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::model::*;
use crate::regions::RegionTable;
use crate::store::ScenarioStore;
use crate::{
    candidate_label, group_totals, national_totals, percentage, round_one_decimal, sum_votes,
    RegionTally, MISSING_LABEL,
};

/// Below this margin (in percentage points), a region is a swing region.
pub const SWING_THRESHOLD: f64 = 10.0;

/// The margin between the first two candidates of every configured region, from the most
/// contested region to the least contested one.
///
/// Regions with the same margin keep the order of the vote matrix.
pub fn region_margins(candidates: &[Candidate], votes: &VoteMatrix) -> Vec<RegionMargin> {
    let mut margins: Vec<RegionMargin> = Vec::new();
    for (rid, region_votes) in votes.iter() {
        let tally = RegionTally::for_candidates(candidates, region_votes);
        let (winner, winner_count) = match tally.leader() {
            Some(x) => x,
            None => continue,
        };
        let runner = tally.runner_up(winner);
        let winner_pct = percentage(winner_count, tally.total);
        let runner_up_pct = runner
            .map(|(_, c)| percentage(c, tally.total))
            .unwrap_or(0.0);
        let margin = round_one_decimal(winner_pct - runner_up_pct);
        debug!(
            "region_margins: {} winner {} ({:.1}%) runner-up {:?} margin {}",
            rid, winner, winner_pct, runner, margin
        );
        margins.push(RegionMargin {
            region: rid.clone(),
            winner,
            winner_pct: round_one_decimal(winner_pct),
            runner_up: runner.map(|(cid, _)| cid),
            runner_up_pct: round_one_decimal(runner_up_pct),
            margin,
            total_votes: tally.total,
            swing: margin < SWING_THRESHOLD,
            absolute_majority: winner_count >= tally.total - winner_count,
        });
    }
    margins.sort_by(|a, b| a.margin.total_cmp(&b.margin));
    margins
}

/// The regions whose margin is below [SWING_THRESHOLD], most contested first.
pub fn swing_regions(candidates: &[Candidate], votes: &VoteMatrix) -> Vec<RegionMargin> {
    region_margins(candidates, votes)
        .into_iter()
        .filter(|m| m.swing)
        .collect()
}

// Leader of totals that are aligned with the candidate list.
fn leader_of_totals(candidates: &[Candidate], totals: &[u64]) -> Option<(CandidateId, u64)> {
    let mut counts: Vec<(CandidateId, u64)> = candidates
        .iter()
        .map(|c| c.ordinal)
        .zip(totals.iter().cloned())
        .collect();
    counts.sort_by_key(|p| p.0);
    let total = sum_votes(counts.iter().map(|p| p.1));
    RegionTally { counts, total }.leader()
}

/// Totals, winner and completion of every grouping of the table.
pub fn regional_stats(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    table: &RegionTable,
) -> Vec<RegionalStats> {
    group_totals(candidates, votes, table)
        .into_iter()
        .map(|gt| {
            let leader = leader_of_totals(candidates, &gt.totals);
            let members: Vec<&RegionId> = table.regions_in(&gt.group).map(|r| &r.id).collect();
            let configured_regions = members
                .iter()
                .filter(|rid| match votes.get(rid) {
                    Some(v) => RegionTally::for_candidates(candidates, v).is_configured(),
                    None => false,
                })
                .count();

            RegionalStats {
                group: gt.group.clone(),
                totals: gt.totals.clone(),
                group_total: gt.group_total,
                winner: leader.map(|(cid, _)| cid),
                winner_pct: leader
                    .map(|(_, c)| round_one_decimal(percentage(c, gt.group_total)))
                    .unwrap_or(0.0),
                configured_regions,
                total_regions: members.len(),
            }
        })
        .collect()
}

/// The `n` configured regions with the most votes.
///
/// Regions with the same number of votes keep the order of the vote matrix.
pub fn top_regions_by_volume(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    table: &RegionTable,
    n: usize,
) -> Vec<RegionVolume> {
    let mut res: Vec<RegionVolume> = votes
        .iter()
        .filter_map(|(rid, region_votes)| {
            let tally = RegionTally::for_candidates(candidates, region_votes);
            if !tally.is_configured() {
                return None;
            }
            Some(RegionVolume {
                region: rid.clone(),
                name: table.name_of(rid),
                group: table
                    .group_of(rid)
                    .unwrap_or(MISSING_LABEL)
                    .to_string(),
                total: tally.total,
            })
        })
        .collect();
    res.sort_by(|a, b| b.total.cmp(&a.total));
    res.truncate(n);
    res
}

/// For each candidate who won at least one region, the `n` regions won with the largest
/// margins.
pub fn top_margins_by_candidate(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    n: usize,
) -> BTreeMap<CandidateId, Vec<RegionMargin>> {
    let mut res: BTreeMap<CandidateId, Vec<RegionMargin>> = BTreeMap::new();
    for m in region_margins(candidates, votes) {
        res.entry(m.winner).or_insert_with(Vec::new).push(m);
    }
    for ms in res.values_mut() {
        ms.sort_by(|a, b| b.margin.total_cmp(&a.margin));
        ms.truncate(n);
    }
    res
}

/// How many regions each candidate won. Every candidate is present, even without a win.
pub fn regions_won(candidates: &[Candidate], votes: &VoteMatrix) -> Vec<CandidateWins> {
    let mut res: Vec<CandidateWins> = candidates
        .iter()
        .map(|c| CandidateWins {
            candidate: c.ordinal,
            name: c.name.clone(),
            regions_won: 0,
            absolute_majorities: 0,
            votes_in_regions_won: 0,
        })
        .collect();
    for m in region_margins(candidates, votes) {
        if let Some(cw) = res.iter_mut().find(|cw| cw.candidate == m.winner) {
            cw.regions_won += 1;
            cw.votes_in_regions_won = cw.votes_in_regions_won.saturating_add(m.total_votes);
            if m.absolute_majority {
                cw.absolute_majorities += 1;
            }
        }
    }
    res
}

/// The share of each candidate in each grouping.
pub fn regional_distribution(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    table: &RegionTable,
) -> Vec<CandidateDistribution> {
    let gts = group_totals(candidates, votes, table);
    candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| CandidateDistribution {
            candidate: c.ordinal,
            name: c.name.clone(),
            groups: gts
                .iter()
                .map(|gt| {
                    let v = gt.totals.get(idx).cloned().unwrap_or(0);
                    GroupShare {
                        group: gt.group.clone(),
                        votes: v,
                        pct: round_one_decimal(percentage(v, gt.group_total)),
                        group_total: gt.group_total,
                    }
                })
                .collect(),
        })
        .collect()
}

fn decided_margins(candidates: &[Candidate], votes: &VoteMatrix) -> Vec<RegionMargin> {
    region_margins(candidates, votes)
        .into_iter()
        .filter(|m| m.margin > 0.0)
        .collect()
}

/// The `n` regions with the smallest non-zero margins.
pub fn most_balanced_regions(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    n: usize,
) -> Vec<RegionMargin> {
    let mut res = decided_margins(candidates, votes);
    res.sort_by(|a, b| a.margin.total_cmp(&b.margin));
    res.truncate(n);
    res
}

/// The `n` regions with the largest margins.
pub fn most_concentrated_regions(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    n: usize,
) -> Vec<RegionMargin> {
    let mut res = decided_margins(candidates, votes);
    res.sort_by(|a, b| b.margin.total_cmp(&a.margin));
    res.truncate(n);
    res
}

/// The national leader. `None` while no vote has been allocated.
///
/// The leader wins in the first round with at least half of all the votes.
pub fn national_outcome(candidates: &[Candidate], votes: &VoteMatrix) -> Option<NationalOutcome> {
    let nt = national_totals(candidates, votes);
    if nt.grand_total == 0 {
        return None;
    }
    let (leader, count) = leader_of_totals(candidates, &nt.totals)?;
    let pct = round_one_decimal(percentage(count, nt.grand_total));
    Some(NationalOutcome {
        leader,
        name: candidate_label(candidates, leader).to_string(),
        votes: count,
        pct,
        grand_total: nt.grand_total,
        decided_in_first_round: pct >= 50.0,
    })
}

/// The candidates of one region by decreasing number of votes.
/// An unknown region lists every candidate with zero votes.
pub fn region_breakdown(
    candidates: &[Candidate],
    votes: &VoteMatrix,
    region: &RegionId,
) -> Vec<CandidateShare> {
    let tally = RegionTally::for_candidates(candidates, votes.get(region).unwrap_or(&[]));
    tally
        .ranked()
        .into_iter()
        .map(|(cid, v)| CandidateShare {
            candidate: cid,
            name: candidate_label(candidates, cid).to_string(),
            votes: v,
            pct: round_one_decimal(percentage(v, tally.total)),
        })
        .collect()
}

/// Computes every view on the current content of the store.
pub fn analyze(
    store: &ScenarioStore,
    table: &RegionTable,
    limits: &AnalysisLimits,
) -> AnalysisReport {
    let candidates = store.candidates();
    let votes = store.votes();
    info!(
        "analyze: {} candidates, {} regions, revision {}",
        candidates.len(),
        votes.len(),
        store.revision()
    );
    AnalysisReport {
        national: national_totals(candidates, votes),
        outcome: national_outcome(candidates, votes),
        group_totals: group_totals(candidates, votes, table),
        margins: region_margins(candidates, votes),
        swing_regions: swing_regions(candidates, votes),
        regional_stats: regional_stats(candidates, votes, table),
        top_regions: top_regions_by_volume(candidates, votes, table, limits.top_regions),
        top_margins: top_margins_by_candidate(candidates, votes, limits.top_margins),
        regions_won: regions_won(candidates, votes),
        distribution: regional_distribution(candidates, votes, table),
        most_balanced: most_balanced_regions(candidates, votes, limits.balanced),
        most_concentrated: most_concentrated_regions(candidates, votes, limits.concentrated),
    }
}
