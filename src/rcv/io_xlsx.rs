use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;

use crate::rcv::{
    io_common::{make_default_id, row_to_ballot},
    *,
};

pub fn read_excel_file(path: String, cfs: &FileSource) -> RcvResult<Vec<ParsedBallot>> {
    let mut workbook: Xlsx<_> =
        open_workbook(&path).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                name: name.clone(),
                path: path.clone(),
            })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?,
    };

    let default_id = make_default_id(&path);
    let cols = cfs.columns()?;
    debug!("read_excel_file: columns: {:?}", cols);

    // The range skips the leading empty rows and columns of the sheet.
    let (row_offset, col_offset) = match wrange.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Ok(Vec::new()),
    };

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let row_idx = idx + row_offset;
        if row_idx < cols.first_row {
            continue;
        }
        let lineno = row_idx + 1;
        let mut cells: Vec<String> = vec![String::new(); col_offset];
        for cell in row.iter() {
            cells.push(read_cell(cell, lineno)?);
        }
        if cells.iter().all(|c| c.is_empty()) {
            debug!("read_excel_file: lineno: {:?}: empty row", lineno);
            continue;
        }
        let pb = row_to_ballot(&cells, &cols, cfs.region.as_deref(), lineno, &default_id)?;
        debug!("read_excel_file: lineno: {:?} ballot: {:?}", lineno, pb);
        res.push(pb);
    }
    Ok(res)
}

// Names are strings, ids may also be plain numbers.
fn read_cell(cell: &DataType, lineno: usize) -> RcvResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Empty => Ok(String::new()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        _ => ExcelWrongCellTypeSnafu {
            lineno: lineno as u64,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::String(" Anna ".to_string()), 1).unwrap(), "Anna");
        assert_eq!(read_cell(&DataType::Empty, 1).unwrap(), "");
        assert_eq!(read_cell(&DataType::Int(12), 1).unwrap(), "12");
        assert_eq!(read_cell(&DataType::Float(7.0), 1).unwrap(), "7");
        assert!(matches!(
            read_cell(&DataType::Float(7.5), 3),
            Err(RcvError::ExcelWrongCellType { lineno: 3, .. })
        ));
        assert!(read_cell(&DataType::Bool(true), 1).is_err());
    }

    fn workbook() -> String {
        concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/north_south_xlsx/ballots.xlsx"
        )
        .to_string()
    }

    fn pb(region: &str, id: &str, choices: &[&str]) -> ParsedBallot {
        ParsedBallot {
            region: region.to_string(),
            id: id.to_string(),
            choices: choices.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn named_sheet_with_offsets() {
        // The data starts at B2, with a header row and an empty row.
        let cfs: FileSource = serde_json::from_value(serde_json::json!({
            "provider": "xlsx",
            "filePath": "ballots.xlsx",
            "excelWorksheetName": "North",
            "regionColumnIndex": "B",
            "firstVoteRowIndex": 3
        }))
        .unwrap();
        let res = read_excel_file(workbook(), &cfs).unwrap();
        assert_eq!(
            res,
            vec![
                pb("North", "101", &["Alice", "Carol"]),
                pb("North", "102", &["Carol", "Alice", "Bob"]),
                pb("North", "ballots.xlsx-00000005", &["Bob"]),
                pb("North", "104", &["Carol"]),
            ]
        );
    }

    #[test]
    fn named_sheet_with_fixed_region() {
        let cfs: FileSource = serde_json::from_value(serde_json::json!({
            "provider": "xlsx",
            "filePath": "ballots.xlsx",
            "excelWorksheetName": "South",
            "region": "South"
        }))
        .unwrap();
        let res = read_excel_file(workbook(), &cfs).unwrap();
        assert_eq!(
            res,
            vec![
                pb("South", "s1", &["Bob", "Carol"]),
                pb("South", "s2", &["Alice"]),
                pb("South", "s3", &["Carol", "Carol"]),
                pb("South", "s4", &[]),
            ]
        );
    }

    #[test]
    fn first_sheet_by_default() {
        let cfs = FileSource::from_input("xlsx".to_string(), None);
        let res = read_excel_file(workbook(), &cfs).unwrap();
        // The notes sheet: one cell, read as a region without an id.
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].region, "Ballots are in the North and South sheets");
        assert!(res[0].choices.is_empty());
    }

    #[test]
    fn missing_worksheet() {
        let cfs = FileSource::from_input("xlsx".to_string(), Some("East".to_string()));
        let res = read_excel_file(workbook(), &cfs);
        assert!(matches!(
            res,
            Err(RcvError::MissingWorksheet { ref name, .. }) if name == "East"
        ));
    }

    #[test]
    fn missing_file() {
        let cfs = FileSource::from_input("xlsx".to_string(), None);
        let res = read_excel_file("/nonexistent/ballots.xlsx".to_string(), &cfs);
        assert!(matches!(res, Err(RcvError::OpeningExcel { .. })));
    }
}
