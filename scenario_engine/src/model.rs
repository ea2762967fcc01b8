// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The stable identity of a candidate.
///
/// The ordinal is assigned when the candidate is created and is the index of this
/// candidate in every vote vector of the [VoteMatrix]. It is never reused, even after the
/// candidate is removed from the scenario.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u32);

impl CandidateId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// First round: all the candidates plus an aggregate "Others" candidate.
/// Second round: exactly two candidates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RoundMode {
    #[serde(rename = "first", alias = "1o")]
    FirstRound,
    #[serde(rename = "second", alias = "2o")]
    SecondRound,
}

impl Default for RoundMode {
    fn default() -> Self {
        RoundMode::FirstRound
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "partido")]
    pub party: String,
    /// A `#rrggbb` color. Only used for display.
    #[serde(alias = "cor")]
    pub color: String,
    #[serde(alias = "id")]
    pub ordinal: CandidateId,
    #[serde(rename = "isOthers", alias = "isOutros", default)]
    pub is_others: bool,
}

/// What the user provides to create a candidate. Blank fields get default values.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    pub color: String,
}

impl CandidateSpec {
    pub fn named(name: &str) -> CandidateSpec {
        CandidateSpec {
            name: name.to_string(),
            ..CandidateSpec::default()
        }
    }
}

/// Identifier of a region, for example `BR-SP`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: &str) -> RegionId {
        RegionId(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        RegionId::new(s)
    }
}

impl Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The votes of each region, indexed by candidate ordinal.
///
/// Regions keep their insertion order. A region that is not present is treated as having
/// no votes at all.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoteMatrix {
    entries: Vec<(RegionId, Vec<u64>)>,
}

impl VoteMatrix {
    pub fn new() -> VoteMatrix {
        VoteMatrix::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, region: &RegionId) -> Option<&[u64]> {
        self.entries
            .iter()
            .find(|(rid, _)| rid == region)
            .map(|(_, v)| v.as_slice())
    }

    pub(crate) fn get_mut(&mut self, region: &RegionId) -> Option<&mut Vec<u64>> {
        self.entries
            .iter_mut()
            .find(|(rid, _)| rid == region)
            .map(|(_, v)| v)
    }

    /// Sets the votes of a region. An existing region keeps its position.
    pub fn insert(&mut self, region: RegionId, votes: Vec<u64>) -> Option<Vec<u64>> {
        if let Some(existing) = self.get_mut(&region) {
            Some(std::mem::replace(existing, votes))
        } else {
            self.entries.push((region, votes));
            None
        }
    }

    pub fn remove(&mut self, region: &RegionId) -> Option<Vec<u64>> {
        let pos = self.entries.iter().position(|(rid, _)| rid == region)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &[u64])> {
        self.entries.iter().map(|(rid, v)| (rid, v.as_slice()))
    }

    pub(crate) fn vectors_mut(&mut self) -> impl Iterator<Item = (&RegionId, &mut Vec<u64>)> {
        self.entries.iter_mut().map(|(rid, v)| (&*rid, v))
    }
}

impl FromIterator<(RegionId, Vec<u64>)> for VoteMatrix {
    fn from_iter<I: IntoIterator<Item = (RegionId, Vec<u64>)>>(iter: I) -> Self {
        let mut m = VoteMatrix::new();
        for (rid, votes) in iter {
            m.insert(rid, votes);
        }
        m
    }
}

impl Serialize for VoteMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (rid, votes) in self.entries.iter() {
            map.serialize_entry(rid, votes)?;
        }
        map.end()
    }
}

struct VoteMatrixVisitor;

impl<'de> Visitor<'de> for VoteMatrixVisitor {
    type Value = VoteMatrix;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of region identifiers to lists of vote counts")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VoteMatrix, A::Error> {
        // Document order is kept: it is the tie-break order of several rankings.
        let mut m = VoteMatrix::new();
        while let Some((rid, votes)) = access.next_entry::<RegionId, Vec<u64>>()? {
            m.insert(rid, votes);
        }
        Ok(m)
    }
}

impl<'de> Deserialize<'de> for VoteMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(VoteMatrixVisitor)
    }
}

// ******** Output data structures *********

/// Votes of each candidate summed over all the regions.
/// `totals` follows the order of the candidate list.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
pub struct NationalTotals {
    pub totals: Vec<u64>,
    #[serde(rename = "grandTotal")]
    pub grand_total: u64,
}

/// Votes of each candidate summed over the regions of one grouping.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct GroupTotals {
    pub group: String,
    pub totals: Vec<u64>,
    #[serde(rename = "groupTotal")]
    pub group_total: u64,
}

#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct RegionWinner {
    pub winner: CandidateId,
    #[serde(rename = "winnerPct")]
    pub winner_pct: f64,
    pub total: u64,
}

/// The result of one configured region.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RegionMargin {
    pub region: RegionId,
    pub winner: CandidateId,
    #[serde(rename = "winnerPct")]
    pub winner_pct: f64,
    /// Absent when the scenario has a single candidate.
    #[serde(rename = "runnerUp")]
    pub runner_up: Option<CandidateId>,
    #[serde(rename = "runnerUpPct")]
    pub runner_up_pct: f64,
    pub margin: f64,
    #[serde(rename = "totalVotes")]
    pub total_votes: u64,
    pub swing: bool,
    #[serde(rename = "absoluteMajority")]
    pub absolute_majority: bool,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RegionalStats {
    pub group: String,
    pub totals: Vec<u64>,
    #[serde(rename = "groupTotal")]
    pub group_total: u64,
    pub winner: Option<CandidateId>,
    #[serde(rename = "winnerPct")]
    pub winner_pct: f64,
    #[serde(rename = "configuredRegions")]
    pub configured_regions: usize,
    #[serde(rename = "totalRegions")]
    pub total_regions: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RegionVolume {
    pub region: RegionId,
    pub name: String,
    pub group: String,
    pub total: u64,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct CandidateWins {
    pub candidate: CandidateId,
    pub name: String,
    #[serde(rename = "regionsWon")]
    pub regions_won: usize,
    #[serde(rename = "absoluteMajorities")]
    pub absolute_majorities: usize,
    #[serde(rename = "votesInRegionsWon")]
    pub votes_in_regions_won: u64,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct GroupShare {
    pub group: String,
    pub votes: u64,
    pub pct: f64,
    #[serde(rename = "groupTotal")]
    pub group_total: u64,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct CandidateDistribution {
    pub candidate: CandidateId,
    pub name: String,
    pub groups: Vec<GroupShare>,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct CandidateShare {
    pub candidate: CandidateId,
    pub name: String,
    pub votes: u64,
    pub pct: f64,
}

/// The national leader, and whether the leader wins without a runoff.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct NationalOutcome {
    pub leader: CandidateId,
    pub name: String,
    pub votes: u64,
    pub pct: f64,
    #[serde(rename = "grandTotal")]
    pub grand_total: u64,
    #[serde(rename = "decidedInFirstRound")]
    pub decided_in_first_round: bool,
}

/// Sizes of the top-N views.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AnalysisLimits {
    pub top_regions: usize,
    pub top_margins: usize,
    pub balanced: usize,
    pub concentrated: usize,
}

impl AnalysisLimits {
    pub const DEFAULT_LIMITS: AnalysisLimits = AnalysisLimits {
        top_regions: 5,
        top_margins: 3,
        balanced: 5,
        concentrated: 5,
    };
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        AnalysisLimits::DEFAULT_LIMITS
    }
}

/// Every view computed from one snapshot of a scenario.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub national: NationalTotals,
    pub outcome: Option<NationalOutcome>,
    #[serde(rename = "groupTotals")]
    pub group_totals: Vec<GroupTotals>,
    pub margins: Vec<RegionMargin>,
    #[serde(rename = "swingRegions")]
    pub swing_regions: Vec<RegionMargin>,
    #[serde(rename = "regionalStats")]
    pub regional_stats: Vec<RegionalStats>,
    #[serde(rename = "topRegions")]
    pub top_regions: Vec<RegionVolume>,
    #[serde(rename = "topMargins")]
    pub top_margins: BTreeMap<CandidateId, Vec<RegionMargin>>,
    #[serde(rename = "regionsWon")]
    pub regions_won: Vec<CandidateWins>,
    pub distribution: Vec<CandidateDistribution>,
    #[serde(rename = "mostBalanced")]
    pub most_balanced: Vec<RegionMargin>,
    #[serde(rename = "mostConcentrated")]
    pub most_concentrated: Vec<RegionMargin>,
}

/// Errors raised when mutating a scenario. The analysis itself never fails.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ScenarioErrors {
    /// The scenario has no candidate yet.
    NoCandidates,
    SecondRoundNeedsTwoCandidates { got: usize },
    UnknownCandidate(CandidateId),
    DuplicateOrdinal(CandidateId),
    /// An ordinal at or above the slot limit of a scenario.
    OrdinalOutOfRange { ordinal: CandidateId, limit: usize },
    /// A vote list does not have one entry per candidate.
    WrongVoteCount { expected: usize, got: usize },
    InvalidPercentage { index: usize },
    PercentagesOverflow { sum_tenths: u64 },
    VoteCountTooLarge { region: RegionId, count: u64 },
}

impl Error for ScenarioErrors {}

impl Display for ScenarioErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioErrors::NoCandidates => write!(f, "the scenario has no candidates"),
            ScenarioErrors::SecondRoundNeedsTwoCandidates { got } => write!(
                f,
                "a second round needs exactly two candidates, got {}",
                got
            ),
            ScenarioErrors::UnknownCandidate(cid) => write!(f, "unknown candidate {}", cid),
            ScenarioErrors::DuplicateOrdinal(cid) => {
                write!(f, "candidate ordinal {} is used more than once", cid)
            }
            ScenarioErrors::OrdinalOutOfRange { ordinal, limit } => write!(
                f,
                "candidate ordinal {} is out of range, the limit is {}",
                ordinal, limit
            ),
            ScenarioErrors::WrongVoteCount { expected, got } => write!(
                f,
                "expected {} vote counts (one per candidate), got {}",
                expected, got
            ),
            ScenarioErrors::InvalidPercentage { index } => write!(
                f,
                "percentage at position {} is not between 0 and 100",
                index
            ),
            ScenarioErrors::PercentagesOverflow { sum_tenths } => write!(
                f,
                "percentages add up to {}.{}%, more than 100%",
                sum_tenths / 10,
                sum_tenths % 10
            ),
            ScenarioErrors::VoteCountTooLarge { region, count } => {
                write!(f, "{} votes in region {} is more than allowed", count, region)
            }
        }
    }
}
