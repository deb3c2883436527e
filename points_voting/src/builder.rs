pub use crate::config::*;

/// A builder for setting up an election and adding ballots.
///
/// ```
/// pub use points_voting::builder::Builder;
/// pub use points_voting::TallyRules;
/// # use points_voting::TallyErrors;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?
///     .contestants(&["Anna".to_string(), "Bob".to_string(), "Clara".to_string()])?
///     .region("North", &["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_ballot_simple("North", &["Bob".to_string(), "Anna".to_string()])?;
/// builder.add_ballot_simple("North", &["Anna".to_string()])?;
/// // Clara is not running in the North: this ballot will not count.
/// builder.add_ballot_simple("North", &["Clara".to_string()])?;
///
/// let result = builder.tally()?;
/// assert_eq!(result.overall.winner, "Anna");
/// assert_eq!(result.overall.points, 5);
/// assert_eq!(result.rejected.len(), 1);
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _contestants: Option<Vec<Contestant>>,
    pub(crate) _regions: Vec<Region>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _contestants: None,
            _regions: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Registers the contestants.
    ///
    /// If never called, the contestants are taken from the rosters of the regions.
    pub fn contestants(self, names: &[String]) -> Result<Builder, TallyErrors> {
        let mut cs: Vec<Contestant> = Vec::new();
        for name in names.iter() {
            if cs.iter().any(|c| c.name == *name) {
                return Err(TallyErrors::DuplicateContestant(name.clone()));
            }
            cs.push(Contestant { name: name.clone() });
        }
        Ok(Builder {
            _contestants: Some(cs),
            ..self
        })
    }

    /// Adds a region with its roster.
    pub fn region(mut self, name: &str, roster: &[String]) -> Result<Builder, TallyErrors> {
        if self._regions.iter().any(|r| r.name == name) {
            return Err(TallyErrors::DuplicateRegion(name.to_string()));
        }
        self._regions.push(Region {
            name: name.to_string(),
            contestants: roster.to_vec(),
        });
        Ok(self)
    }

    /// Adds a ballot to the builder.
    ///
    /// It is the simplest use case for most cases. The voter gets a generated id.
    pub fn add_ballot_simple(
        &mut self,
        region: &str,
        preferences: &[String],
    ) -> Result<(), TallyErrors> {
        let voter_id = format!("ballot-{:08}", self._ballots.len() + 1);
        self.add_ballot(&Ballot {
            region: region.to_string(),
            voter_id,
            preferences: preferences.to_vec(),
        })
    }

    /// Adds a ballot.
    ///
    /// Ballots are only checked when the tally runs.
    pub fn add_ballot(&mut self, ballot: &Ballot) -> Result<(), TallyErrors> {
        self._ballots.push(ballot.clone());
        Ok(())
    }

    /// Runs the tally over all the ballots added so far.
    pub fn tally(&self) -> Result<TallyResult, TallyErrors> {
        crate::run_tally(
            &self._ballots,
            self._contestants.as_deref(),
            &self._regions,
            &self._rules,
        )
    }
}
