// Primitives for reading CSV files.

use std::fs::File;

use log::debug;

use crate::rcv::{
    io_common::{make_default_id, row_to_ballot},
    *,
};

pub fn read_csv_ballots(path: String, cfs: &FileSource) -> RcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);
    let cols = cfs.columns()?;
    debug!("read_csv_ballots: columns: {:?}", cols);

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cols.first_row)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            debug!("read_csv_ballots: lineno: {:?}: empty line", lineno);
            continue;
        }
        let pb = row_to_ballot(&cells, &cols, cfs.region.as_deref(), lineno, &default_id)?;
        debug!("read_csv_ballots: lineno: {:?} ballot: {:?}", lineno, pb);
        res.push(pb);
    }
    Ok(res)
}

fn get_records(
    path: &String,
    first_row: usize,
) -> RcvResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn north_south_file() {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/north_south_csv/ballots.csv"
        );
        let cfs: FileSource = serde_json::from_value(json!({
            "provider": "csv",
            "filePath": "ballots.csv",
            "firstVoteRowIndex": 2
        }))
        .unwrap();
        let res = read_csv_ballots(path.to_string(), &cfs).unwrap();
        assert_eq!(res.len(), 8);
        assert_eq!(
            res[0],
            ParsedBallot {
                region: "North".to_string(),
                id: "n1".to_string(),
                choices: vec!["Alice".to_string(), "Bob".to_string()],
            }
        );
        assert!(res[3].choices.is_empty());
        assert_eq!(res[7].region, "East");
    }

    #[test]
    fn missing_file() {
        let cfs = FileSource::from_input("csv".to_string(), None);
        let res = read_csv_ballots("/nonexistent/ballots.csv".to_string(), &cfs);
        assert!(matches!(res, Err(RcvError::CsvOpen { .. })));
    }
}
