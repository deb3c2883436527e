// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The maximum number of preferences a ballot may list.
pub const MAX_PREFERENCES: usize = 3;

/// Points granted for each rank, starting with the first preference.
pub const POINTS_BY_RANK: [u64; MAX_PREFERENCES] = [3, 2, 1];

/// A contestant registered for the election.
///
/// The name is the identity of the contestant and must be unique.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Contestant {
    pub name: String,
}

/// An electoral subdivision with its own roster.
///
/// The roster is treated as a set: the order of the names does not matter
/// for membership and repeated names count once.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Region {
    pub name: String,
    pub contestants: Vec<String>,
}

/// A ballot cast in a region.
///
/// The first preference is the most preferred contestant. The voter id is
/// only used for diagnostics.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub region: String,
    pub voter_id: String,
    pub preferences: Vec<String>,
}

// ******** Output data structures *********

/// The final ranking of one scope (a region or the whole election).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScopeResult {
    pub winner: String,
    pub points: u64,
    /// True if the winner shares its score with at least one other
    /// contestant and was picked by the tiebreak rule.
    pub tiebreak: bool,
    /// All the contestants of the scope, best first.
    pub standings: Vec<(String, u64)>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionResult {
    pub region: String,
    pub result: ScopeResult,
    pub accepted: u64,
    pub rejected: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RejectedBallot {
    pub region: String,
    pub voter_id: String,
    pub reason: RejectionReason,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyResult {
    pub overall: ScopeResult,
    /// One entry per region, in the order the regions were registered.
    pub regions: Vec<RegionResult>,
    pub accepted: u64,
    /// The rejected ballots, in the order they were submitted.
    pub rejected: Vec<RejectedBallot>,
}

/// Why a ballot did not count.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RejectionReason {
    UnknownRegion(String),
    RegionMismatch { expected: String, found: String },
    NoPreferences,
    TooManyPreferences(usize),
    NotInRoster(String),
    DuplicatePreference(String),
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::UnknownRegion(r) => write!(f, "unknown region {}", r),
            RejectionReason::RegionMismatch { expected, found } => {
                write!(f, "ballot cast in {} checked against {}", found, expected)
            }
            RejectionReason::NoPreferences => write!(f, "no preference listed"),
            RejectionReason::TooManyPreferences(n) => write!(
                f,
                "{} preferences listed, at most {} allowed",
                n, MAX_PREFERENCES
            ),
            RejectionReason::NotInRoster(name) => {
                write!(f, "contestant {} is not running in this region", name)
            }
            RejectionReason::DuplicatePreference(name) => {
                write!(f, "contestant {} is listed more than once", name)
            }
        }
    }
}

/// Errors that prevent the tally from completing successfully.
///
/// They all point to a problem in the setup of the election, never to a bad ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    /// No contestant is running anywhere.
    EmptyElection,
    /// The given region has an empty roster.
    EmptyRegion(String),
    DuplicateContestant(String),
    DuplicateRegion(String),
    /// A roster names a contestant that was not registered.
    UnknownContestant { region: String, name: String },
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::EmptyElection => write!(f, "no contestant is running in this election"),
            TallyErrors::EmptyRegion(r) => write!(f, "region {} has no contestant", r),
            TallyErrors::DuplicateContestant(c) => {
                write!(f, "contestant {} is registered twice", c)
            }
            TallyErrors::DuplicateRegion(r) => write!(f, "region {} is registered twice", r),
            TallyErrors::UnknownContestant { region, name } => write!(
                f,
                "region {} lists contestant {} who is not registered",
                region, name
            ),
        }
    }
}

// ********* Configuration **********

/// How to order contestants that have the same number of points.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Alphabetical order of the names.
    NameAscending,
    /// The order in which the contestants were registered.
    UseContestantOrder,
}

/// What to do with a ballot that lists the same contestant more than once.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicatePreferenceMode {
    /// The ballot is invalid.
    Reject,
    /// Every slot is scored, so the contestant gets points several times.
    Allow,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub tiebreak_mode: TieBreakMode,
    pub duplicate_preference_mode: DuplicatePreferenceMode,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        tiebreak_mode: TieBreakMode::NameAscending,
        duplicate_preference_mode: DuplicatePreferenceMode::Reject,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
