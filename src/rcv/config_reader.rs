use crate::rcv::*;

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// All the ballots of this source are cast in this region.
    pub region: Option<String>,
    #[serde(rename = "regionColumnIndex")]
    pub region_column_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteColumnIndex")]
    pub first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    pub first_vote_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

/// The layout of a tabular source, with 0-based indexes.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Columns {
    pub region: Option<usize>,
    pub id: Option<usize>,
    pub first_vote: usize,
    pub first_row: usize,
}

impl FileSource {
    /// A source given on the command line, which relies on the defaults for everything.
    pub fn from_input(provider: String, excel_worksheet_name: Option<String>) -> FileSource {
        FileSource {
            provider,
            file_path: "".to_string(),
            region: None,
            region_column_index: None,
            id_column_index: None,
            first_vote_column_index: None,
            first_vote_row_index: None,
            excel_worksheet_name,
        }
    }

    /// Resolves the columns of a tabular source.
    ///
    /// Without explicit indexes, the region comes first (unless the source sets a
    /// region for all its ballots), then the id, then the preferences.
    pub fn columns(&self) -> RcvResult<Columns> {
        let region = match (&self.region, &self.region_column_index) {
            (Some(r), Some(_)) => {
                whatever!(
                    "Source {:?} sets both a region ({}) and a region column",
                    self.file_path,
                    r
                )
            }
            (Some(_), None) => None,
            (None, x) => Some(read_js_int(x)?.unwrap_or(1) - 1),
        };
        let next_col = region.map(|r| r + 1).unwrap_or(0);
        let explicit_id = read_js_int(&self.id_column_index)?.map(|x| x - 1);
        let explicit_first_vote = read_js_int(&self.first_vote_column_index)?.map(|x| x - 1);

        let (id, first_vote) = match (explicit_id, explicit_first_vote) {
            (Some(id), Some(fv)) => (Some(id), fv),
            (Some(id), None) => (Some(id), id.max(next_col.saturating_sub(1)) + 1),
            // The column right after the region is the id, if there is room for it.
            (None, Some(fv)) if next_col < fv => (Some(next_col), fv),
            (None, Some(fv)) => (None, fv),
            (None, None) => (Some(next_col), next_col + 1),
        };
        let first_row = read_js_int(&self.first_vote_row_index)?.unwrap_or(1) - 1;
        Ok(Columns {
            region,
            id,
            first_vote,
            first_row,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ContestantConfig {
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub contestants: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulesConfig {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "rejectDuplicatePreferences")]
    pub reject_duplicate_preferences: Option<bool>,
    #[serde(rename = "rulesDescription")]
    pub rules_description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotFileSources", default)]
    pub ballot_file_sources: Vec<FileSource>,
    pub contestants: Option<Vec<ContestantConfig>>,
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub rules: RulesConfig,
}

pub fn read_config(path: &str) -> RcvResult<ElectionConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> RcvResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// Reads a 1-based index, given as a number or with Excel-style column letters.
fn read_js_int(x: &Option<JSValue>) -> RcvResult<Option<usize>> {
    let res = match x {
        None => return Ok(None),
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase().chars().try_fold(0usize, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add(c as usize - 'a' as usize + 1)
            })
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        Some(_) => None,
    };
    match res {
        Some(idx) if idx >= 1 => Ok(Some(idx)),
        _ => ParsingJsonNumberSnafu {
            value: format!("{:?}", x),
        }
        .fail(),
    }
}
