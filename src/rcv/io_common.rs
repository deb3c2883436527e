use std::path::Path;

use crate::rcv::config_reader::Columns;
use crate::rcv::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// The preferences of a row, in order.
///
/// Blank cells at the end of the row are not preferences. A blank cell followed by
/// a name is kept, so that the ballot gets rejected.
pub fn assemble_choices(cells: &[String]) -> Vec<String> {
    let mut choices: Vec<String> = cells.iter().map(|c| c.trim().to_string()).collect();
    while choices.last().map(|c| c.is_empty()).unwrap_or(false) {
        choices.pop();
    }
    choices
}

/// Reads a ballot out of the cells of a tabular source (CSV or Excel).
pub fn row_to_ballot<F>(
    cells: &[String],
    cols: &Columns,
    fixed_region: Option<&str>,
    lineno: usize,
    default_id: &F,
) -> RcvResult<ParsedBallot>
where
    F: Fn(usize) -> String,
{
    let region = match (fixed_region, cols.region) {
        (Some(r), _) => r.to_string(),
        (None, Some(idx)) => cells
            .get(idx)
            .context(LineTooShortSnafu { lineno })?
            .trim()
            .to_string(),
        (None, None) => whatever!("Line {}: no region for this ballot", lineno),
    };
    let id = match cols.id.and_then(|idx| cells.get(idx)) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => default_id(lineno),
    };
    let choices = assemble_choices(cells.get(cols.first_vote..).unwrap_or(&[]));
    Ok(ParsedBallot {
        region,
        id,
        choices,
    })
}
