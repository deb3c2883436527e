/*!
Points-based ranked choice tabulation.

Every voter ranks up to three contestants of their region. The first preference
earns 3 points, the second 2 points and the third 1 point. The contestant with the
most points in a region is the head of that region, and the contestant with the most
points summed over all the regions is the overall winner.

The quickest way to run a tally is [`run_tally`]. The [`builder::Builder`] offers a
more incremental interface, and [`Election`] / [`Tally`] expose each step of the
pipeline.

See the [manual] for the rules applied to invalid ballots and ties.
*/

mod config;
pub mod builder;
pub mod manual;

use log::{debug, info, warn};

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    hash::Hash,
    ops::{Add, AddAssign},
};

pub use crate::config::*;

// **** Private structures ****

// Dense identifier, assigned in registration order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct ContestantId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct Points(u64);

impl Points {
    const ZERO: Points = Points(0);
}

impl std::iter::Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Points(iter.map(|p| p.0).sum())
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Points) {
        self.0 += rhs.0;
    }
}

impl Add for Points {
    type Output = Points;
    fn add(self: Points, rhs: Points) -> Points {
        Points(self.0 + rhs.0)
    }
}

/// All the contestants of the election. Built once, never modified afterwards.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Registry {
    // Indexed by the contestant id.
    names: Vec<String>,
    ids: HashMap<String, ContestantId>,
}

impl Registry {
    fn new(contestants: &[Contestant]) -> Result<Registry, TallyErrors> {
        let mut names: Vec<String> = Vec::new();
        let mut ids: HashMap<String, ContestantId> = HashMap::new();
        for c in contestants.iter() {
            if ids.contains_key(&c.name) {
                return Err(TallyErrors::DuplicateContestant(c.name.clone()));
            }
            ids.insert(c.name.clone(), ContestantId(names.len() as u32));
            names.push(c.name.clone());
        }
        Ok(Registry { names, ids })
    }

    fn id(&self, name: &str) -> Option<ContestantId> {
        self.ids.get(name).cloned()
    }

    // Ids are only handed out by the registry, so the lookup cannot fail.
    fn name(&self, cid: ContestantId) -> &str {
        self.names[cid.0 as usize].as_str()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RegionInternal {
    name: String,
    // Without duplicates, in the order of the roster.
    roster: Vec<ContestantId>,
    members: HashSet<ContestantId>,
}

/// Running point totals for one scope.
///
/// Every contestant of the scope is present from the start, with zero points.
#[derive(Eq, PartialEq, Debug, Clone)]
struct ScoreBoard {
    totals: BTreeMap<ContestantId, Points>,
}

impl ScoreBoard {
    fn zeroed(scope: &[ContestantId]) -> ScoreBoard {
        ScoreBoard {
            totals: scope.iter().map(|cid| (*cid, Points::ZERO)).collect(),
        }
    }

    fn accumulate(&mut self, grants: &[(ContestantId, Points)]) {
        for (cid, points) in grants.iter() {
            let e = self.totals.entry(*cid).or_insert(Points::ZERO);
            *e += *points;
        }
    }

    fn total(&self) -> Points {
        self.totals.values().cloned().sum()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
struct BallotCounts {
    accepted: u64,
    rejected: u64,
}

// ********* Validation **********

fn check_length(preferences: &[String]) -> Result<(), RejectionReason> {
    match preferences.len() {
        0 => Err(RejectionReason::NoPreferences),
        n if n > MAX_PREFERENCES => Err(RejectionReason::TooManyPreferences(n)),
        _ => Ok(()),
    }
}

// Index of the first element that already appeared before it.
fn first_duplicate<T: Eq + Hash>(items: &[T]) -> Option<usize> {
    let mut seen: HashSet<&T> = HashSet::new();
    items.iter().position(|x| !seen.insert(x))
}

fn check_region(ballot: &Ballot, region_name: Option<&str>) -> Result<(), RejectionReason> {
    match region_name {
        None => Err(RejectionReason::UnknownRegion(ballot.region.clone())),
        Some(name) if name != ballot.region => Err(RejectionReason::RegionMismatch {
            expected: name.to_string(),
            found: ballot.region.clone(),
        }),
        Some(_) => Ok(()),
    }
}

fn check_duplicates<T: Eq + Hash>(
    ranks: &[T],
    preferences: &[String],
    mode: DuplicatePreferenceMode,
) -> Result<(), RejectionReason> {
    if mode == DuplicatePreferenceMode::Reject {
        if let Some(idx) = first_duplicate(ranks) {
            return Err(RejectionReason::DuplicatePreference(
                preferences[idx].clone(),
            ));
        }
    }
    Ok(())
}

// The whole rule chain, in order. `resolve` maps a name to a member of the
// region's roster, or `None` if the contestant is not running there.
fn check_rules<T, F>(
    ballot: &Ballot,
    region_name: Option<&str>,
    resolve: F,
    mode: DuplicatePreferenceMode,
) -> Result<Vec<T>, RejectionReason>
where
    T: Eq + Hash,
    F: Fn(&str) -> Option<T>,
{
    check_region(ballot, region_name)?;
    check_length(&ballot.preferences)?;
    let ranks: Vec<T> = ballot
        .preferences
        .iter()
        .map(|name| {
            resolve(name.as_str()).ok_or_else(|| RejectionReason::NotInRoster(name.clone()))
        })
        .collect::<Result<_, _>>()?;
    check_duplicates(&ranks, &ballot.preferences, mode)?;
    Ok(ranks)
}

/// Checks a ballot against the region it claims to be cast in.
///
/// `region` is `None` when the region of the ballot is not part of the election.
/// This function does not require an [`Election`]: the roster of the region is
/// the only reference data needed.
pub fn validate(
    ballot: &Ballot,
    region: Option<&Region>,
    rules: &TallyRules,
) -> Result<(), RejectionReason> {
    let roster: HashSet<&str> = region
        .map(|r| r.contestants.iter().map(|s| s.as_str()).collect())
        .unwrap_or_default();
    check_rules(
        ballot,
        region.map(|r| r.name.as_str()),
        |name| roster.get(name).copied(),
        rules.duplicate_preference_mode,
    )
    .map(|_| ())
}

/// Shorthand for [`validate`] when the reason does not matter.
pub fn is_valid(ballot: &Ballot, region: Option<&Region>, rules: &TallyRules) -> bool {
    validate(ballot, region, rules).is_ok()
}

// Same rules as `validate`, resolving the preferences against the registry.
fn check_ballot(
    ballot: &Ballot,
    region: Option<&RegionInternal>,
    registry: &Registry,
    duplicate_mode: DuplicatePreferenceMode,
) -> Result<Vec<ContestantId>, RejectionReason> {
    check_rules(
        ballot,
        region.map(|r| r.name.as_str()),
        |name| {
            registry
                .id(name)
                .filter(|cid| region.map(|r| r.members.contains(cid)).unwrap_or(false))
        },
        duplicate_mode,
    )
}

// ********* Scoring **********

/// The points granted by a ballot, one entry per preference.
///
/// The ballot is expected to be valid: preferences past the third one are ignored.
pub fn score(ballot: &Ballot) -> Vec<(String, u64)> {
    ballot
        .preferences
        .iter()
        .zip(POINTS_BY_RANK.iter())
        .map(|(name, points)| (name.clone(), *points))
        .collect()
}

fn score_ranks(ranks: &[ContestantId]) -> Vec<(ContestantId, Points)> {
    ranks
        .iter()
        .zip(POINTS_BY_RANK.iter())
        .map(|(cid, points)| (*cid, Points(*points)))
        .collect()
}

// ********* Resolution **********

/// Ranks the contestants of a scope, best first.
///
/// Returns None if the scope is empty.
fn resolve_scope(
    board: &ScoreBoard,
    registry: &Registry,
    tiebreak: TieBreakMode,
) -> Option<ScopeResult> {
    let mut standings: Vec<(ContestantId, Points)> =
        board.totals.iter().map(|(cid, p)| (*cid, *p)).collect();
    match tiebreak {
        TieBreakMode::NameAscending => standings.sort_by(|(c1, p1), (c2, p2)| {
            p2.cmp(p1)
                .then_with(|| registry.name(*c1).cmp(registry.name(*c2)))
        }),
        TieBreakMode::UseContestantOrder => {
            standings.sort_by(|(c1, p1), (c2, p2)| p2.cmp(p1).then_with(|| c1.cmp(c2)))
        }
    }

    let (winner, points) = *standings.first()?;
    let tiebreak = matches!(standings.get(1), Some((_, p)) if *p == points);
    if tiebreak {
        debug!(
            "resolve_scope: tie at {:?} points, {:?} selected",
            points.0,
            registry.name(winner)
        );
    }
    Some(ScopeResult {
        winner: registry.name(winner).to_string(),
        points: points.0,
        tiebreak,
        standings: standings
            .iter()
            .map(|(cid, p)| (registry.name(*cid).to_string(), p.0))
            .collect(),
    })
}

// ********* Pipeline **********

/// The reference data of an election: contestants and regions.
///
/// This is the initialized state of the tally. Any number of tallies can be
/// started from the same election, each one from zero.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    registry: Registry,
    regions: Vec<RegionInternal>,
    region_index: HashMap<String, usize>,
    // The contestants on at least one roster, in registration order.
    running: Vec<ContestantId>,
}

impl Election {
    /// Builds the election.
    ///
    /// Arguments:
    /// * `contestants` the registered contestants. If not provided, they are
    /// inferred from the rosters, in order of first appearance.
    /// * `regions` the regions, with their rosters.
    pub fn new(
        contestants: Option<&[Contestant]>,
        regions: &[Region],
    ) -> Result<Election, TallyErrors> {
        let registry = match contestants {
            Some(cs) => Registry::new(cs)?,
            None => {
                let mut inferred: Vec<Contestant> = Vec::new();
                for r in regions.iter() {
                    for name in r.contestants.iter() {
                        if !inferred.iter().any(|c| c.name == *name) {
                            inferred.push(Contestant { name: name.clone() });
                        }
                    }
                }
                debug!("Election::new: inferred contestants {:?}", inferred);
                Registry::new(&inferred)?
            }
        };

        let mut internal_regions: Vec<RegionInternal> = Vec::new();
        let mut region_index: HashMap<String, usize> = HashMap::new();
        for r in regions.iter() {
            if region_index.contains_key(&r.name) {
                return Err(TallyErrors::DuplicateRegion(r.name.clone()));
            }
            let mut roster: Vec<ContestantId> = Vec::new();
            for name in r.contestants.iter() {
                let cid = registry
                    .id(name)
                    .ok_or_else(|| TallyErrors::UnknownContestant {
                        region: r.name.clone(),
                        name: name.clone(),
                    })?;
                if roster.contains(&cid) {
                    debug!(
                        "Election::new: {:?} listed twice in region {:?}",
                        name, r.name
                    );
                } else {
                    roster.push(cid);
                }
            }
            region_index.insert(r.name.clone(), internal_regions.len());
            internal_regions.push(RegionInternal {
                name: r.name.clone(),
                members: roster.iter().cloned().collect(),
                roster,
            });
        }

        let all_rostered: HashSet<ContestantId> = internal_regions
            .iter()
            .flat_map(|r| r.roster.iter().cloned())
            .collect();
        let mut running: Vec<ContestantId> = all_rostered.into_iter().collect();
        running.sort();

        for (idx, name) in registry.names.iter().enumerate() {
            let cid = ContestantId(idx as u32);
            if !running.contains(&cid) {
                debug!("Election::new: contestant {:?} is not running in any region", name);
            }
        }

        Ok(Election {
            registry,
            regions: internal_regions,
            region_index,
            running,
        })
    }

    /// Starts a tally with all the scores at zero.
    pub fn start_tally(&self, rules: &TallyRules) -> Tally<'_> {
        Tally {
            election: self,
            rules: rules.clone(),
            regional: self
                .regions
                .iter()
                .map(|r| ScoreBoard::zeroed(&r.roster))
                .collect(),
            regional_counts: vec![BallotCounts::default(); self.regions.len()],
            global: ScoreBoard::zeroed(&self.running),
            accepted: 0,
            rejected: Vec::new(),
        }
    }

    /// The names of the regions, in registration order.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.name.clone()).collect()
    }

    fn region_idx(&self, name: &str) -> Option<usize> {
        self.region_index.get(name).cloned()
    }
}

/// A tally in progress.
///
/// Ballots are added one at a time, in input order. Calling [`Tally::finish`]
/// consumes the tally: to count again, start a new one from the [`Election`].
#[derive(Debug, Clone)]
pub struct Tally<'e> {
    election: &'e Election,
    rules: TallyRules,
    // Indexed like the regions of the election.
    regional: Vec<ScoreBoard>,
    regional_counts: Vec<BallotCounts>,
    global: ScoreBoard,
    accepted: u64,
    rejected: Vec<RejectedBallot>,
}

impl<'e> Tally<'e> {
    /// Validates, scores and counts one ballot.
    ///
    /// An invalid ballot is recorded in the diagnostics and does not change any
    /// score. The reason is returned for information only: the tally can always go on.
    pub fn add_ballot(&mut self, ballot: &Ballot) -> Result<(), RejectionReason> {
        let region_idx = self.election.region_idx(&ballot.region);
        let checked = check_ballot(
            ballot,
            region_idx.map(|idx| &self.election.regions[idx]),
            &self.election.registry,
            self.rules.duplicate_preference_mode,
        );
        match checked {
            Ok(ranks) => {
                let grants = score_ranks(&ranks);
                debug!(
                    "add_ballot: voter {:?} in {:?}: grants {:?}",
                    ballot.voter_id, ballot.region, grants
                );
                // The region is known, otherwise the ballot would have been rejected.
                if let Some(idx) = region_idx {
                    self.regional[idx].accumulate(&grants);
                    self.regional_counts[idx].accepted += 1;
                }
                self.global.accumulate(&grants);
                self.accepted += 1;
                Ok(())
            }
            Err(reason) => {
                warn!(
                    "Invalid ballot: voter {} in {}: {}",
                    ballot.voter_id, ballot.region, reason
                );
                if let Some(idx) = region_idx {
                    self.regional_counts[idx].rejected += 1;
                }
                self.rejected.push(RejectedBallot {
                    region: ballot.region.clone(),
                    voter_id: ballot.voter_id.clone(),
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    /// Adds all the ballots and returns how many of them were accepted.
    pub fn add_ballots<'b, I>(&mut self, ballots: I) -> u64
    where
        I: IntoIterator<Item = &'b Ballot>,
    {
        ballots
            .into_iter()
            .filter(|b| self.add_ballot(b).is_ok())
            .count() as u64
    }

    /// Selects the winners.
    pub fn finish(self) -> Result<TallyResult, TallyErrors> {
        let election = self.election;
        let tiebreak = self.rules.tiebreak_mode;
        debug!(
            "finish: {} accepted, {} rejected, {:?} points granted",
            self.accepted,
            self.rejected.len(),
            self.global.total()
        );

        let mut regions: Vec<RegionResult> = Vec::new();
        for ((r, board), counts) in election
            .regions
            .iter()
            .zip(self.regional.iter())
            .zip(self.regional_counts.iter())
        {
            let result = resolve_scope(board, &election.registry, tiebreak)
                .ok_or_else(|| TallyErrors::EmptyRegion(r.name.clone()))?;
            info!(
                "Regional head for {}: {} ({} points)",
                r.name, result.winner, result.points
            );
            regions.push(RegionResult {
                region: r.name.clone(),
                result,
                accepted: counts.accepted,
                rejected: counts.rejected,
            });
        }

        let overall = resolve_scope(&self.global, &election.registry, tiebreak)
            .ok_or(TallyErrors::EmptyElection)?;
        info!(
            "Overall winner: {} ({} points)",
            overall.winner, overall.points
        );

        Ok(TallyResult {
            overall,
            regions,
            accepted: self.accepted,
            rejected: self.rejected,
        })
    }
}

/// Runs the whole tally with the given rules for the given ballots.
///
/// Arguments:
/// * `ballots` the ballots, in input order
/// * `contestants` the registered contestants. If not provided, the
/// contestants will be inferred from the rosters.
/// * `regions` the regions and their rosters
/// * `rules` the rules that govern this election
pub fn run_tally(
    ballots: &[Ballot],
    contestants: Option<&[Contestant]>,
    regions: &[Region],
    rules: &TallyRules,
) -> Result<TallyResult, TallyErrors> {
    info!(
        "Processing {:?} ballots in {:?} regions, rules: {:?}",
        ballots.len(),
        regions.len(),
        rules
    );
    let election = Election::new(contestants, regions)?;
    for (idx, name) in election.registry.names.iter().enumerate() {
        debug!("Contestant: {}: {}", idx + 1, name);
    }
    let mut tally = election.start_tally(rules);
    let accepted = tally.add_ballots(ballots);
    info!(
        "Accepted {} ballots, rejected {}",
        accepted,
        ballots.len() as u64 - accepted
    );
    tally.finish()
}
