// Reader for the plain text ballot format.
//
// Khammam
// v1 A B F
// v2 B A
// //
// Visakhapatnam
// v5 B C G
// //
// &&

use std::fs;

use log::{debug, warn};

use crate::rcv::*;

const END_OF_REGION: &str = "//";
const END_OF_STREAM: &str = "&&";

pub fn read_dat_file(path: String) -> RcvResult<Vec<ParsedBallot>> {
    let contents = fs::read_to_string(&path).context(OpeningFileSnafu { path: path.clone() })?;
    parse_dat(&contents, &path)
}

pub fn parse_dat(contents: &str, path: &str) -> RcvResult<Vec<ParsedBallot>> {
    let mut res: Vec<ParsedBallot> = Vec::new();
    let mut current_region: Option<String> = None;
    let mut terminated = false;

    for (idx, raw_line) in contents.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line == END_OF_STREAM {
            if let Some(region) = current_region.take() {
                warn!(
                    "{}, line {}: region {} is not closed with {}",
                    path, lineno, region, END_OF_REGION
                );
            }
            terminated = true;
            break;
        }
        match current_region.take() {
            None if line == END_OF_REGION => {
                return DatFormatSnafu {
                    path,
                    lineno,
                    message: "end of region outside of a region",
                }
                .fail();
            }
            None => {
                debug!("parse_dat: line {}: start of region {:?}", lineno, line);
                current_region = Some(line.to_string());
            }
            Some(_) if line == END_OF_REGION => {}
            Some(region) => {
                let mut tokens = line.split_whitespace();
                // The line is not empty, so there is at least one token.
                let id = tokens.next().unwrap_or_default().to_string();
                let choices: Vec<String> = tokens.map(|s| s.to_string()).collect();
                debug!("parse_dat: line {}: {:?} {:?}", lineno, id, choices);
                res.push(ParsedBallot {
                    region: region.clone(),
                    id,
                    choices,
                });
                current_region = Some(region);
            }
        }
    }

    if !terminated {
        if let Some(region) = current_region {
            warn!("{}: region {} is not closed with {}", path, region, END_OF_REGION);
        }
        warn!("{}: missing end of input marker {}", path, END_OF_STREAM);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pb(region: &str, id: &str, choices: &[&str]) -> ParsedBallot {
        ParsedBallot {
            region: region.to_string(),
            id: id.to_string(),
            choices: choices.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn two_regions() {
        let contents = "Khammam\nv1 A B F\nv2  B\tA\n//\n\nVisakhapatnam\nv5 B C G\n//\n&&\n";
        let res = parse_dat(contents, "test.dat").unwrap();
        assert_eq!(
            res,
            vec![
                pb("Khammam", "v1", &["A", "B", "F"]),
                pb("Khammam", "v2", &["B", "A"]),
                pb("Visakhapatnam", "v5", &["B", "C", "G"]),
            ]
        );
    }

    #[test]
    fn voter_without_preferences() {
        let res = parse_dat("Khammam\nv9\n//\n&&", "test.dat").unwrap();
        assert_eq!(res, vec![pb("Khammam", "v9", &[])]);
    }

    #[test]
    fn content_after_end_is_ignored() {
        let res = parse_dat("Khammam\nv1 A\n//\n&&\nKhammam\nv2 B\n//\n", "test.dat").unwrap();
        assert_eq!(res, vec![pb("Khammam", "v1", &["A"])]);
    }

    #[test]
    fn missing_markers_are_tolerated() {
        let res = parse_dat("Khammam\nv1 A\n", "test.dat").unwrap();
        assert_eq!(res, vec![pb("Khammam", "v1", &["A"])]);
        let res = parse_dat("Khammam\nv1 A\n&&", "test.dat").unwrap();
        assert_eq!(res, vec![pb("Khammam", "v1", &["A"])]);
    }

    #[test]
    fn stray_end_of_region() {
        let res = parse_dat("//\nKhammam\nv1 A\n//\n&&", "test.dat");
        assert!(matches!(res, Err(RcvError::DatFormat { lineno: 1, .. })));
    }
}
