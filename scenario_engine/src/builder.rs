pub use crate::model::*;
use crate::store::ScenarioStore;

/// A builder for assembling a scenario.
///
/// ```
/// pub use scenario_engine::builder::ScenarioBuilder;
/// pub use scenario_engine::RoundMode;
/// # use scenario_engine::ScenarioErrors;
///
/// let mut builder = ScenarioBuilder::new(RoundMode::FirstRound)
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// // Anna, Bob and the "Others" candidate of the first round.
/// builder.add_region("BR-SP", &[500, 400, 100])?;
/// builder.add_region_percentages("BR-RJ", 2000, &[40.0, 50.0, 10.0])?;
///
/// let store = builder.build();
/// assert_eq!(store.votes().len(), 2);
/// # Ok::<(), ScenarioErrors>(())
/// ```
pub struct ScenarioBuilder {
    pub(crate) _round: RoundMode,
    pub(crate) _store: ScenarioStore,
}

impl ScenarioBuilder {
    pub fn new(round: RoundMode) -> ScenarioBuilder {
        ScenarioBuilder {
            _round: round,
            _store: ScenarioStore::new(),
        }
    }

    /// Sets the candidates by name. Party and color get default values.
    pub fn candidates(self, names: &[String]) -> Result<ScenarioBuilder, ScenarioErrors> {
        let specs: Vec<CandidateSpec> = names.iter().map(|n| CandidateSpec::named(n)).collect();
        self.candidate_specs(&specs)
    }

    pub fn candidate_specs(
        mut self,
        specs: &[CandidateSpec],
    ) -> Result<ScenarioBuilder, ScenarioErrors> {
        self._store.configure(self._round, specs)?;
        Ok(self)
    }

    /// Adds the votes of a region, one count per candidate (including "Others" in the first
    /// round).
    pub fn add_region(&mut self, region: &str, votes: &[u64]) -> Result<(), ScenarioErrors> {
        self._store.set_region_votes(&RegionId::new(region), votes)
    }

    /// Adds a region from a vote total and one percentage per candidate.
    pub fn add_region_percentages(
        &mut self,
        region: &str,
        total: u64,
        percentages: &[f64],
    ) -> Result<(), ScenarioErrors> {
        self._store
            .set_region_percentages(&RegionId::new(region), total, percentages)
            .map(|_| ())
    }

    pub fn build(self) -> ScenarioStore {
        self._store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_before_candidates_fails_on_votes() {
        let mut b = ScenarioBuilder::new(RoundMode::FirstRound);
        assert_eq!(
            b.add_region("BR-SP", &[]),
            Err(ScenarioErrors::NoCandidates)
        );
        assert!(b.build().candidates().is_empty());
    }

    #[test]
    fn regions_keep_insertion_order() {
        let mut b = ScenarioBuilder::new(RoundMode::SecondRound)
            .candidates(&["Anna".to_string(), "Bob".to_string()])
            .unwrap();
        b.add_region("BR-SP", &[1, 2]).unwrap();
        b.add_region("BR-AC", &[3, 4]).unwrap();
        b.add_region("BR-SP", &[5, 6]).unwrap();
        let s = b.build();
        let order: Vec<&str> = s.votes().iter().map(|(rid, _)| rid.as_str()).collect();
        assert_eq!(order, vec!["BR-SP", "BR-AC"]);
        assert_eq!(s.votes().get(&RegionId::new("BR-SP")).unwrap(), &[5, 6]);
    }

    #[test]
    fn second_round_rejects_three_names() {
        let r = ScenarioBuilder::new(RoundMode::SecondRound).candidates(&[
            "A".to_string(),
            "B".to_string(),
            "C".to_string(),
        ]);
        assert!(r.is_err());
    }
}
