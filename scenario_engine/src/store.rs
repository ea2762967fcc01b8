use log::{debug, info, warn};

use crate::model::*;
use crate::regions::{RegionTable, FALLBACK_REGION_TOTAL};

// Percentages may exceed 100 by this much, to absorb the rounding of the sliders.
const PERCENT_TOLERANCE: f64 = 0.05;

/// Ordinals of a scenario stay below this limit, removed candidates included.
pub const MAX_CANDIDATE_SLOTS: usize = 1024;

/// The largest vote count accepted for one candidate in one region.
pub const MAX_VOTE_COUNT: u64 = 1_000_000_000_000;

const OTHERS_NAME: &str = "Others";
const OTHERS_PARTY: &str = "Candidates";
const OTHERS_COLOR: &str = "#999999";
const DEFAULT_COLOR: &str = "#3366cc";

/// The authoritative state of a scenario: round mode, candidates and votes.
///
/// Invariants:
/// - candidates are sorted by ordinal, and ordinals are never reused.
/// - every vote vector has one slot per ordinal ever allocated, so that it can be indexed
///   by any candidate ordinal.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ScenarioStore {
    round: RoundMode,
    candidates: Vec<Candidate>,
    votes: VoteMatrix,
    // Number of ordinals allocated so far.
    slots: usize,
    revision: u64,
}

impl ScenarioStore {
    pub fn new() -> ScenarioStore {
        ScenarioStore::default()
    }

    /// Rebuilds a store from imported data.
    ///
    /// Vote vectors that do not match the candidate ordinals are padded with zeros or
    /// truncated. Ordinals from [MAX_CANDIDATE_SLOTS] on and counts above [MAX_VOTE_COUNT]
    /// are rejected.
    pub fn from_parts(
        round: RoundMode,
        candidates: Vec<Candidate>,
        votes: VoteMatrix,
    ) -> Result<ScenarioStore, ScenarioErrors> {
        let mut candidates = candidates;
        candidates.sort_by_key(|c| c.ordinal);
        for pair in candidates.windows(2) {
            if pair[0].ordinal == pair[1].ordinal {
                return Err(ScenarioErrors::DuplicateOrdinal(pair[0].ordinal));
            }
        }
        if let Some(c) = candidates
            .iter()
            .find(|c| c.ordinal.index() >= MAX_CANDIDATE_SLOTS)
        {
            return Err(ScenarioErrors::OrdinalOutOfRange {
                ordinal: c.ordinal,
                limit: MAX_CANDIDATE_SLOTS,
            });
        }
        for (rid, v) in votes.iter() {
            check_counts(rid, v)?;
        }
        if round == RoundMode::SecondRound {
            let real = candidates.iter().filter(|c| !c.is_others).count();
            if real != 2 || candidates.len() != 2 {
                return Err(ScenarioErrors::SecondRoundNeedsTwoCandidates {
                    got: candidates.len(),
                });
            }
        }
        let slots = candidates.last().map(|c| c.ordinal.index() + 1).unwrap_or(0);
        let mut votes = votes;
        for (rid, v) in votes.vectors_mut() {
            if v.len() != slots {
                warn!(
                    "from_parts: region {} has {} vote entries, resizing to {}",
                    rid,
                    v.len(),
                    slots
                );
                v.resize(slots, 0);
            }
        }
        info!(
            "from_parts: {:?} with {} candidates and {} regions",
            round,
            candidates.len(),
            votes.len()
        );
        Ok(ScenarioStore {
            round,
            candidates,
            votes,
            slots,
            revision: 0,
        })
    }

    pub fn round_mode(&self) -> RoundMode {
        self.round
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, cid: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.ordinal == cid)
    }

    pub fn votes(&self) -> &VoteMatrix {
        &self.votes
    }

    /// Incremented by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Starts a new scenario. All the votes are cleared.
    ///
    /// The first round gets an extra "Others" candidate. The second round takes exactly two
    /// candidates.
    pub fn configure(
        &mut self,
        round: RoundMode,
        specs: &[CandidateSpec],
    ) -> Result<(), ScenarioErrors> {
        if round == RoundMode::SecondRound && specs.len() != 2 {
            return Err(ScenarioErrors::SecondRoundNeedsTwoCandidates { got: specs.len() });
        }
        // Plus one for "Others".
        if specs.len() >= MAX_CANDIDATE_SLOTS {
            return Err(ScenarioErrors::OrdinalOutOfRange {
                ordinal: CandidateId(specs.len() as u32),
                limit: MAX_CANDIDATE_SLOTS,
            });
        }
        self.round = round;
        self.candidates.clear();
        self.votes = VoteMatrix::new();
        self.slots = 0;
        for spec in specs {
            self.push_candidate(spec, false);
        }
        if round == RoundMode::FirstRound {
            self.push_candidate(
                &CandidateSpec {
                    name: OTHERS_NAME.to_string(),
                    party: OTHERS_PARTY.to_string(),
                    color: OTHERS_COLOR.to_string(),
                },
                true,
            );
        }
        info!(
            "configure: {:?} with candidates {:?}",
            round,
            self.candidates.iter().map(|c| &c.name).collect::<Vec<_>>()
        );
        self.touch();
        Ok(())
    }

    fn push_candidate(&mut self, spec: &CandidateSpec, is_others: bool) -> CandidateId {
        let cid = CandidateId(self.slots as u32);
        let n = self.slots + 1;
        let name = if spec.name.trim().is_empty() {
            format!("Candidate {}", n)
        } else {
            spec.name.trim().to_string()
        };
        let party = if spec.party.trim().is_empty() {
            format!("P{}", n)
        } else {
            spec.party.trim().to_string()
        };
        let color = if spec.color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            spec.color.trim().to_string()
        };
        self.candidates.push(Candidate {
            name,
            party,
            color,
            ordinal: cid,
            is_others,
        });
        self.slots += 1;
        for (_, v) in self.votes.vectors_mut() {
            v.resize(self.slots, 0);
        }
        cid
    }

    /// Adds a candidate to a first-round scenario. Existing votes are kept and the new
    /// candidate starts with zero votes everywhere.
    pub fn add_candidate(&mut self, spec: &CandidateSpec) -> Result<CandidateId, ScenarioErrors> {
        if self.round == RoundMode::SecondRound {
            return Err(ScenarioErrors::SecondRoundNeedsTwoCandidates {
                got: self.candidates.len() + 1,
            });
        }
        if self.slots >= MAX_CANDIDATE_SLOTS {
            return Err(ScenarioErrors::OrdinalOutOfRange {
                ordinal: CandidateId(self.slots as u32),
                limit: MAX_CANDIDATE_SLOTS,
            });
        }
        let cid = self.push_candidate(spec, false);
        debug!("add_candidate: {:?} -> {}", spec.name, cid);
        self.touch();
        Ok(cid)
    }

    /// Removes a candidate from a first-round scenario. Its votes are dropped and the other
    /// candidates keep their ordinals.
    pub fn remove_candidate(&mut self, cid: CandidateId) -> Result<Candidate, ScenarioErrors> {
        if self.round == RoundMode::SecondRound {
            return Err(ScenarioErrors::SecondRoundNeedsTwoCandidates {
                got: self.candidates.len().saturating_sub(1),
            });
        }
        let pos = self
            .candidates
            .iter()
            .position(|c| c.ordinal == cid)
            .ok_or(ScenarioErrors::UnknownCandidate(cid))?;
        let removed = self.candidates.remove(pos);
        for (_, v) in self.votes.vectors_mut() {
            if let Some(slot) = v.get_mut(cid.index()) {
                *slot = 0;
            }
        }
        debug!("remove_candidate: {} ({})", cid, removed.name);
        self.touch();
        Ok(removed)
    }

    /// The vote vector of a region, indexed by ordinal.
    ///
    /// A region seen for the first time is created with zero votes for every candidate.
    pub fn region_votes_mut(&mut self, region: &RegionId) -> Result<&mut [u64], ScenarioErrors> {
        if self.candidates.is_empty() {
            return Err(ScenarioErrors::NoCandidates);
        }
        if self.votes.get(region).is_none() {
            debug!("region_votes_mut: initializing region {}", region);
            self.votes.insert(region.clone(), vec![0; self.slots]);
        }
        self.touch();
        match self.votes.get_mut(region) {
            Some(v) => Ok(v.as_mut_slice()),
            None => Err(ScenarioErrors::NoCandidates),
        }
    }

    /// The votes of a region, one entry per candidate in candidate order.
    pub fn region_votes(&self, region: &RegionId) -> Vec<u64> {
        let v = self.votes.get(region).unwrap_or(&[]);
        self.candidates
            .iter()
            .map(|c| v.get(c.ordinal.index()).cloned().unwrap_or(0))
            .collect()
    }

    /// Replaces the votes of a region. `votes` has one entry per candidate, in candidate
    /// order.
    pub fn set_region_votes(&mut self, region: &RegionId, votes: &[u64]) -> Result<(), ScenarioErrors> {
        if votes.len() != self.candidates.len() {
            return Err(ScenarioErrors::WrongVoteCount {
                expected: self.candidates.len(),
                got: votes.len(),
            });
        }
        check_counts(region, votes)?;
        let ordinals: Vec<usize> = self.candidates.iter().map(|c| c.ordinal.index()).collect();
        let slots = self.region_votes_mut(region)?;
        for (idx, count) in ordinals.into_iter().zip(votes.iter()) {
            slots[idx] = *count;
        }
        debug!("set_region_votes: {} -> {:?}", region, votes);
        Ok(())
    }

    /// Sets the votes of a region from a vote total and one percentage per candidate, as a
    /// set of sliders would.
    ///
    /// Each percentage is in `[0, 100]` and their sum may not exceed 100. Returns the votes
    /// in candidate order.
    pub fn set_region_percentages(
        &mut self,
        region: &RegionId,
        total: u64,
        percentages: &[f64],
    ) -> Result<Vec<u64>, ScenarioErrors> {
        if percentages.len() != self.candidates.len() {
            return Err(ScenarioErrors::WrongVoteCount {
                expected: self.candidates.len(),
                got: percentages.len(),
            });
        }
        for (index, p) in percentages.iter().enumerate() {
            if !p.is_finite() || *p < 0.0 || *p > 100.0 {
                return Err(ScenarioErrors::InvalidPercentage { index });
            }
        }
        let sum: f64 = percentages.iter().sum();
        if sum > 100.0 + PERCENT_TOLERANCE {
            return Err(ScenarioErrors::PercentagesOverflow {
                sum_tenths: (sum * 10.0).round() as u64,
            });
        }
        let votes: Vec<u64> = percentages
            .iter()
            .map(|p| ((p / 100.0) * total as f64).round() as u64)
            .collect();
        self.set_region_votes(region, &votes)?;
        Ok(votes)
    }

    /// The vote total used to seed the sliders of a region: its current total, else the
    /// default of the reference table, else [FALLBACK_REGION_TOTAL].
    pub fn default_region_total(&self, region: &RegionId, table: &RegionTable) -> u64 {
        let current = crate::sum_votes(self.region_votes(region).into_iter());
        if current > 0 {
            current
        } else {
            table
                .default_votes(region)
                .unwrap_or(FALLBACK_REGION_TOTAL)
        }
    }

    /// Forgets the votes of a region. Returns false if the region had no entry.
    pub fn clear_region(&mut self, region: &RegionId) -> bool {
        let removed = self.votes.remove(region).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Back to an empty first-round scenario.
    pub fn reset(&mut self) {
        info!("reset: clearing {} regions", self.votes.len());
        let revision = self.revision + 1;
        *self = ScenarioStore::default();
        self.revision = revision;
    }
}

fn check_counts(region: &RegionId, votes: &[u64]) -> Result<(), ScenarioErrors> {
    match votes.iter().find(|c| **c > MAX_VOTE_COUNT) {
        Some(count) => Err(ScenarioErrors::VoteCountTooLarge {
            region: region.clone(),
            count: *count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(names: &[&str]) -> Vec<CandidateSpec> {
        names.iter().map(|n| CandidateSpec::named(n)).collect()
    }

    #[test]
    fn first_round_appends_others() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::FirstRound, &specs(&["Anna", ""]))
            .unwrap();
        let names: Vec<&str> = s.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Candidate 2", "Others"]);
        assert_eq!(s.candidates()[1].party, "P2");
        assert!(s.candidates()[2].is_others);
        assert_eq!(s.candidates()[2].ordinal, CandidateId(2));
    }

    #[test]
    fn second_round_needs_two() {
        let mut s = ScenarioStore::new();
        assert_eq!(
            s.configure(RoundMode::SecondRound, &specs(&["Anna"])),
            Err(ScenarioErrors::SecondRoundNeedsTwoCandidates { got: 1 })
        );
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        assert_eq!(s.candidates().len(), 2);
        assert!(s.candidates().iter().all(|c| !c.is_others));
        assert!(s.add_candidate(&CandidateSpec::named("Clara")).is_err());
    }

    #[test]
    fn configure_clears_votes() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        s.set_region_votes(&RegionId::new("BR-SP"), &[10, 20]).unwrap();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        assert!(s.votes().is_empty());
    }

    #[test]
    fn new_region_is_zero_filled() {
        let mut s = ScenarioStore::new();
        assert_eq!(
            s.region_votes_mut(&RegionId::new("BR-SP")).err(),
            Some(ScenarioErrors::NoCandidates)
        );
        s.configure(RoundMode::FirstRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        let v = s.region_votes_mut(&RegionId::new("BR-SP")).unwrap();
        assert_eq!(v, &[0, 0, 0]);
        v[1] = 5;
        assert_eq!(s.region_votes(&RegionId::new("BR-SP")), vec![0, 5, 0]);
    }

    #[test]
    fn wrong_vote_count() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        assert_eq!(
            s.set_region_votes(&RegionId::new("BR-SP"), &[1, 2, 3]),
            Err(ScenarioErrors::WrongVoteCount {
                expected: 2,
                got: 3
            })
        );
        assert!(s.votes().is_empty());
    }

    #[test]
    fn removing_a_candidate_keeps_other_ordinals() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::FirstRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        let sp = RegionId::new("BR-SP");
        s.set_region_votes(&sp, &[500, 300, 200]).unwrap();
        s.remove_candidate(CandidateId(0)).unwrap();
        assert_eq!(s.region_votes(&sp), vec![300, 200]);
        assert_eq!(s.candidates()[0].ordinal, CandidateId(1));

        let clara = s.add_candidate(&CandidateSpec::named("Clara")).unwrap();
        assert_eq!(clara, CandidateId(3));
        assert_eq!(s.votes().get(&sp).unwrap(), &[0, 300, 200, 0]);
        assert_eq!(s.region_votes(&sp), vec![300, 200, 0]);
        assert_eq!(
            s.remove_candidate(CandidateId(0)).err(),
            Some(ScenarioErrors::UnknownCandidate(CandidateId(0)))
        );
    }

    #[test]
    fn percentages_follow_slider_rules() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::FirstRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        let sp = RegionId::new("BR-SP");
        let v = s
            .set_region_percentages(&sp, 1000, &[45.5, 40.0, 14.5])
            .unwrap();
        assert_eq!(v, vec![455, 400, 145]);
        assert_eq!(
            s.set_region_percentages(&sp, 1000, &[60.0, 40.0, 10.0]),
            Err(ScenarioErrors::PercentagesOverflow { sum_tenths: 1100 })
        );
        assert_eq!(
            s.set_region_percentages(&sp, 1000, &[-1.0, 40.0, 10.0]),
            Err(ScenarioErrors::InvalidPercentage { index: 0 })
        );
        // Rejected edits leave the region untouched.
        assert_eq!(s.region_votes(&sp), vec![455, 400, 145]);
    }

    #[test]
    fn default_total_fallbacks() {
        let table = RegionTable::brazil();
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        assert_eq!(s.default_region_total(&RegionId::new("BR-AC"), &table), 440823);
        assert_eq!(
            s.default_region_total(&RegionId::new("XX-ZZ"), &table),
            FALLBACK_REGION_TOTAL
        );
        s.set_region_votes(&RegionId::new("BR-AC"), &[10, 5]).unwrap();
        assert_eq!(s.default_region_total(&RegionId::new("BR-AC"), &table), 15);
    }

    #[test]
    fn from_parts_repairs_vectors() {
        let candidates = vec![
            Candidate {
                name: "Bob".to_string(),
                party: "B".to_string(),
                color: "#0000ff".to_string(),
                ordinal: CandidateId(1),
                is_others: false,
            },
            Candidate {
                name: "Anna".to_string(),
                party: "A".to_string(),
                color: "#ff0000".to_string(),
                ordinal: CandidateId(0),
                is_others: false,
            },
        ];
        let votes: VoteMatrix = vec![
            (RegionId::new("BR-SP"), vec![1, 2, 3]),
            (RegionId::new("BR-RJ"), vec![4]),
        ]
        .into_iter()
        .collect();
        let s = ScenarioStore::from_parts(RoundMode::SecondRound, candidates.clone(), votes)
            .unwrap();
        assert_eq!(s.candidates()[0].name, "Anna");
        assert_eq!(s.votes().get(&RegionId::new("BR-SP")).unwrap(), &[1, 2]);
        assert_eq!(s.votes().get(&RegionId::new("BR-RJ")).unwrap(), &[4, 0]);

        let mut dup = candidates;
        dup[0].ordinal = CandidateId(0);
        assert_eq!(
            ScenarioStore::from_parts(RoundMode::FirstRound, dup, VoteMatrix::new()).err(),
            Some(ScenarioErrors::DuplicateOrdinal(CandidateId(0)))
        );
    }

    #[test]
    fn from_parts_rejects_far_ordinals() {
        let far = Candidate {
            name: "Anna".to_string(),
            party: "A".to_string(),
            color: "#ff0000".to_string(),
            ordinal: CandidateId(4_000_000_000),
            is_others: false,
        };
        let votes: VoteMatrix = vec![(RegionId::new("BR-SP"), vec![1])]
            .into_iter()
            .collect();
        assert_eq!(
            ScenarioStore::from_parts(RoundMode::FirstRound, vec![far.clone()], votes).err(),
            Some(ScenarioErrors::OrdinalOutOfRange {
                ordinal: CandidateId(4_000_000_000),
                limit: MAX_CANDIDATE_SLOTS,
            })
        );

        let mut last = far;
        last.ordinal = CandidateId(MAX_CANDIDATE_SLOTS as u32 - 1);
        let mut s =
            ScenarioStore::from_parts(RoundMode::FirstRound, vec![last], VoteMatrix::new())
                .unwrap();
        assert_eq!(
            s.add_candidate(&CandidateSpec::named("Bob")).err(),
            Some(ScenarioErrors::OrdinalOutOfRange {
                ordinal: CandidateId(MAX_CANDIDATE_SLOTS as u32),
                limit: MAX_CANDIDATE_SLOTS,
            })
        );
    }

    #[test]
    fn huge_counts_are_rejected() {
        let votes: VoteMatrix = vec![(RegionId::new("BR-SP"), vec![u64::MAX, 1])]
            .into_iter()
            .collect();
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        let candidates = s.candidates().to_vec();
        assert_eq!(
            ScenarioStore::from_parts(RoundMode::SecondRound, candidates, votes).err(),
            Some(ScenarioErrors::VoteCountTooLarge {
                region: RegionId::new("BR-SP"),
                count: u64::MAX,
            })
        );

        let sp = RegionId::new("BR-SP");
        assert!(s.set_region_votes(&sp, &[MAX_VOTE_COUNT + 1, 0]).is_err());
        assert!(s
            .set_region_percentages(&sp, u64::MAX, &[50.0, 50.0])
            .is_err());
        assert!(s.votes().is_empty());
        s.set_region_votes(&sp, &[MAX_VOTE_COUNT, MAX_VOTE_COUNT])
            .unwrap();
    }

    #[test]
    fn mutations_bump_revision() {
        let mut s = ScenarioStore::new();
        s.configure(RoundMode::SecondRound, &specs(&["Anna", "Bob"]))
            .unwrap();
        let r = s.revision();
        s.set_region_votes(&RegionId::new("BR-SP"), &[1, 1]).unwrap();
        assert!(s.revision() > r);
        let r = s.revision();
        assert!(s.clear_region(&RegionId::new("BR-SP")));
        assert!(!s.clear_region(&RegionId::new("BR-SP")));
        assert_eq!(s.revision(), r + 1);
        s.reset();
        assert!(s.candidates().is_empty());
        assert_eq!(s.revision(), r + 2);
    }
}
