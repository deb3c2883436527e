use log::{debug, info, warn};

use points_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::rcv::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_dat;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("The Excel file has no worksheet"))]
    EmptyExcel {},
    #[snafu(display("Could not understand cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of CSV"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    LineTooShort { lineno: usize },
    #[snafu(display("{path}, line {lineno}: {message}"))]
    DatFormat {
        path: String,
        lineno: usize,
        message: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Could not read index {value:?}: expected a positive number or column letters"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing parent directory"))]
    MissingParentDir {},
    #[snafu(display("Tally error: {source}"))]
    Tally { source: TallyErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RcvResult<T> = Result<T, RcvError>;

/// A ballot, as parsed by the readers.
/// This is before checking it against the rosters.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub region: String,
    pub id: String,
    pub choices: Vec<String>,
}

impl ParsedBallot {
    fn into_ballot(self) -> Ballot {
        Ballot {
            region: self.region,
            voter_id: self.id,
            preferences: self.choices,
        }
    }
}

fn standings_to_json(standings: &[(String, u64)]) -> Vec<JSValue> {
    standings
        .iter()
        .map(|(name, points)| json!({"contestant": name, "points": points.to_string()}))
        .collect()
}

fn result_to_json(rs: &TallyResult) -> JSValue {
    let regions: Vec<JSValue> = rs
        .regions
        .iter()
        .map(|r| {
            json!({
                "region": r.region,
                "winner": r.result.winner,
                "points": r.result.points.to_string(),
                "tiebreak": r.result.tiebreak,
                "acceptedBallots": r.accepted.to_string(),
                "rejectedBallots": r.rejected.to_string(),
                "standings": standings_to_json(&r.result.standings),
            })
        })
        .collect();
    json!({
        "overall": {
            "winner": rs.overall.winner,
            "points": rs.overall.points.to_string(),
            "tiebreak": rs.overall.tiebreak,
            "standings": standings_to_json(&rs.overall.standings),
        },
        "regions": regions,
    })
}

fn diagnostics_to_json(rs: &TallyResult) -> JSValue {
    let rejected: Vec<JSValue> = rs
        .rejected
        .iter()
        .map(|rb| {
            json!({
                "region": rb.region,
                "voterId": rb.voter_id,
                "reason": rb.reason.to_string(),
            })
        })
        .collect();
    json!({
        "acceptedBallots": rs.accepted.to_string(),
        "rejectedBallots": rejected,
    })
}

fn build_summary_js(config: &ElectionConfig, rs: &TallyResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
    };
    json!({
        "config": c,
        "results": result_to_json(rs),
        "diagnostics": diagnostics_to_json(rs),
    })
}

fn read_ballot_data(path: String, cfs: &FileSource) -> RcvResult<Vec<Ballot>> {
    info!("Attempting to read ballot file {:?}", path);
    let parsed_ballots = match cfs.provider.as_str() {
        "dat" => io_dat::read_dat_file(path),
        "csv" => io_csv::read_csv_ballots(path, cfs),
        "xlsx" => io_xlsx::read_excel_file(path, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }?;
    debug!("read_ballot_data: {} ballots", parsed_ballots.len());
    Ok(parsed_ballots
        .into_iter()
        .map(ParsedBallot::into_ballot)
        .collect())
}

fn validate_rules(rules: &RulesConfig) -> RcvResult<TallyRules> {
    let res = TallyRules {
        tiebreak_mode: match rules.tiebreak_mode.as_deref() {
            None | Some("nameAscending") => TieBreakMode::NameAscending,
            Some("useContestantOrder") => TieBreakMode::UseContestantOrder,
            Some(x) => {
                whatever!("Cannot use tiebreak mode {:?}: not implemented", x)
            }
        },
        duplicate_preference_mode: match rules.reject_duplicate_preferences {
            Some(false) => DuplicatePreferenceMode::Allow,
            _ => DuplicatePreferenceMode::Reject,
        },
    };
    Ok(res)
}

fn election_setup(config: &ElectionConfig) -> (Option<Vec<Contestant>>, Vec<Region>) {
    let contestants: Option<Vec<Contestant>> = config.contestants.as_ref().map(|cs| {
        cs.iter()
            .map(|c| Contestant {
                name: c.name.clone(),
            })
            .collect()
    });
    let regions: Vec<Region> = config
        .regions
        .iter()
        .map(|r| Region {
            name: r.name.clone(),
            contestants: r.contestants.clone(),
        })
        .collect();
    (contestants, regions)
}

fn write_summary(out: &str, pretty_js: &str) -> RcvResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js);
        return Ok(());
    }
    if let Some(parent) = Path::new(out).parent() {
        fs::create_dir_all(parent).context(WritingSummarySnafu { path: out })?;
    }
    fs::write(out, pretty_js).context(WritingSummarySnafu { path: out })?;
    info!("Summary written to {}", out);
    Ok(())
}

/// Runs a complete election: reads the configuration and the ballots, tallies them and
/// reports the results.
///
/// Arguments:
/// * `config_path` the JSON description of the election
/// * `check_summary_path` a reference summary the results must match
/// * `out_path` where to write the summary ('stdout' for the standard output)
/// * `input_path`, `input_type`, `excel_worksheet_name` a ballot file replacing the
/// sources of the configuration
pub fn run_election(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
    input_path: Option<String>,
    input_type: Option<String>,
    excel_worksheet_name: Option<String>,
) -> RcvResult<()> {
    let config = read_config(&config_path)?;
    info!("config: {:?}", config);
    let root_p: PathBuf = Path::new(config_path.as_str())
        .parent()
        .context(MissingParentDirSnafu {})?
        .to_path_buf();

    // Validate the rules:
    let rules = validate_rules(&config.rules)?;
    let (contestants, regions) = election_setup(&config);

    let sources: Vec<(String, FileSource)> = if let Some(p) = input_path {
        let provider = input_type.unwrap_or_else(|| "dat".to_string());
        vec![(p, FileSource::from_input(provider, excel_worksheet_name))]
    } else {
        if config.ballot_file_sources.is_empty() {
            whatever!("No ballot file sources detected");
        }
        config
            .ballot_file_sources
            .iter()
            .map(|cfs| {
                let p: PathBuf = root_p.join(&cfs.file_path);
                (p.display().to_string(), cfs.clone())
            })
            .collect()
    };

    let mut data: Vec<Ballot> = Vec::new();
    for (path, cfs) in sources.iter() {
        let mut file_data = read_ballot_data(path.clone(), cfs)?;
        data.append(&mut file_data);
    }
    info!("Read {} ballots", data.len());

    let result =
        run_tally(&data, contestants.as_deref(), &regions, &rules).context(TallySnafu {})?;
    debug!("result: {:?}", result);

    // Assemble the final json
    let result_js = build_summary_js(&config, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out = out_path.or_else(|| {
        config.output_settings.output_directory.as_ref().map(|dir| {
            root_p
                .join(dir)
                .join(format!("{}_summary.json", config.output_settings.contest_name))
                .display()
                .to_string()
        })
    });
    match out {
        Some(out) => write_summary(&out, &pretty_js_stats)?,
        None => debug!("No output location given, the summary is not written"),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        debug!("summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("The summary matches the reference");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> &'static str {
        option_env!("RCV_TEST_DIR").unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests"))
    }

    fn test_file(test_name: &str, lpath: &str) -> String {
        format!("{}/{}/{}", test_dir(), test_name, lpath)
    }

    fn run_election_test(test_name: &str) -> RcvResult<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        info!("Running test {}", test_name);
        run_election(
            test_file(test_name, &format!("{}_config.json", test_name)),
            Some(test_file(
                test_name,
                &format!("{}_expected_summary.json", test_name),
            )),
            None,
            None,
            None,
            None,
        )
    }

    fn test_wrapper(test_name: &str) {
        let res = run_election_test(test_name);
        if let Err(e) = &res {
            eprintln!("An error occured {}", e);
        }
        assert!(res.is_ok());
    }

    #[test]
    fn khammam_dat() {
        test_wrapper("khammam_dat");
    }

    #[test]
    fn north_south_csv() {
        test_wrapper("north_south_csv");
    }

    #[test]
    fn north_south_xlsx() {
        test_wrapper("north_south_xlsx");
    }

    #[test]
    fn input_override() {
        let _ = env_logger::builder().is_test(true).try_init();
        // Same election, ballots given directly instead of through the configuration.
        let res = run_election(
            test_file("khammam_dat", "khammam_dat_config.json"),
            Some(test_file("khammam_dat", "khammam_dat_expected_summary.json")),
            None,
            Some(test_file("khammam_dat", "voting.dat")),
            Some("dat".to_string()),
            None,
        );
        assert!(res.is_ok());
    }

    #[test]
    fn reference_mismatch() {
        let _ = env_logger::builder().is_test(true).try_init();
        let res = run_election(
            test_file("khammam_dat", "khammam_dat_config.json"),
            Some(test_file(
                "north_south_csv",
                "north_south_csv_expected_summary.json",
            )),
            None,
            None,
            None,
            None,
        );
        assert!(matches!(res, Err(RcvError::Whatever { .. })));
    }

    #[test]
    fn unknown_provider() {
        let res = run_election(
            test_file("khammam_dat", "khammam_dat_config.json"),
            None,
            None,
            Some(test_file("khammam_dat", "voting.dat")),
            Some("cdf".to_string()),
            None,
        );
        assert!(matches!(res, Err(RcvError::Whatever { .. })));
    }

    #[test]
    fn rules_validation() {
        let rules: RulesConfig = serde_json::from_value(json!({
            "tiebreakMode": "useContestantOrder",
            "rejectDuplicatePreferences": false
        }))
        .unwrap();
        assert_eq!(
            validate_rules(&rules).unwrap(),
            TallyRules {
                tiebreak_mode: TieBreakMode::UseContestantOrder,
                duplicate_preference_mode: DuplicatePreferenceMode::Allow,
            }
        );
        assert_eq!(
            validate_rules(&RulesConfig::default()).unwrap(),
            TallyRules::DEFAULT_RULES
        );
        let bad: RulesConfig = serde_json::from_value(json!({"tiebreakMode": "random"})).unwrap();
        assert!(validate_rules(&bad).is_err());
    }

    #[test]
    fn summary_written_to_file() {
        let out_dir = std::env::temp_dir().join("pointstally_summary_test");
        let out = out_dir.join("summary.json").display().to_string();
        let res = run_election(
            test_file("khammam_dat", "khammam_dat_config.json"),
            None,
            Some(out.clone()),
            None,
            None,
            None,
        );
        assert!(res.is_ok());
        let written: JSValue =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["results"]["overall"]["winner"], json!("B"));
        assert_eq!(written["diagnostics"]["acceptedBallots"], json!("6"));
        let _ = fs::remove_dir_all(out_dir);
    }
}
