//! Feed parser for the RadioReference CSV downloads.
//! Every row is checked against a fixed schema; rows that fail are returned as [`RowError`]s
//! next to the records that parsed, never dropped silently. A bad frequency token is reported
//! the same way while the rest of its site is kept.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::plan::Hz;

/// First column of the sites feed that holds frequencies.
const SITE_FREQUENCY_COLUMN: usize = 9;
const SITE_MIN_COLUMNS: usize = 10;
const TALKGROUP_MIN_COLUMNS: usize = 4;
const CONTROL_SUFFIX: char = 'c';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("expected at least {expected} columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },

    #[error("talkgroup id {0:?} is not a decimal number")]
    InvalidTalkgroupId(String),

    #[error("site id is empty")]
    MissingSiteId,

    #[error("frequency {0:?} is not a decimal MHz value")]
    InvalidFrequency(String),
}

/// A rejected row, with its 1-based line number in the downloaded file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {error}")]
pub struct RowError {
    pub line: usize,
    pub error: FeedError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Talkgroup {
    pub decimal: u32,
    pub hex: String,
    pub alpha_tag: String,
    pub mode: String,
    pub description: String,
    pub tag: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub description: String,
    pub nac: String,
    /// Columns between the NAC and the first frequency (county, location, etc.).
    pub details: Vec<String>,
    /// Every frequency on the site, control channels included, in feed order.
    pub frequencies: Vec<Hz>,
    pub control_channels: Vec<Hz>,
}

impl Site {
    pub fn control_set(&self) -> BTreeSet<Hz> {
        self.control_channels.iter().copied().collect()
    }
}

/// Parses a decimal MHz string exactly into Hz (`"851.0125"` -> `851_012_500`).
pub fn parse_mhz(text: &str) -> Result<Hz, FeedError> {
    let invalid = || FeedError::InvalidFrequency(text.to_string());
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    // Sub-Hz digits are only accepted when they are zero
    let (hz_digits, rest) = frac.split_at(frac.len().min(6));
    if rest.bytes().any(|b| b != b'0') {
        return Err(invalid());
    }

    let whole: Hz = whole.parse().map_err(|_| invalid())?;
    let frac: Hz = format!("{:0<6}", hz_digits).parse().map_err(|_| invalid())?;
    whole
        .checked_mul(1_000_000)
        .and_then(|hz| hz.checked_add(frac))
        .filter(|&hz| hz > 0)
        .ok_or_else(invalid)
}

/// Splits one CSV line into fields. Handles quoted fields with embedded commas and `""` escapes.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Joins fields into one CSV line, quoting only where needed.
pub fn join_record(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Non-empty data rows after the header, with 1-based line numbers.
fn data_rows(text: &str) -> impl Iterator<Item = (usize, Vec<String>)> + '_ {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, split_record(line)))
}

/// Runs `parse` over every data row. Problems a row recovers from are pushed onto the
/// `issues` list it is handed and reported against its line alongside rejected rows.
fn parse_rows<T>(
    text: &str,
    parse: impl Fn(&[String], &mut Vec<FeedError>) -> Result<T, FeedError>,
) -> Parsed<T> {
    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut issues = Vec::new();
    for (line, row) in data_rows(text) {
        match parse(&row, &mut issues) {
            Ok(record) => records.push(record),
            Err(error) => rejected.push(RowError { line, error }),
        }
        rejected.extend(issues.drain(..).map(|error| RowError { line, error }));
    }
    Parsed { records, rejected }
}

fn column(row: &[String], index: usize) -> String {
    row.get(index).map(|c| c.trim().to_string()).unwrap_or_default()
}

pub fn parse_talkgroups(text: &str) -> Parsed<Talkgroup> {
    parse_rows(text, |row, _| {
        if row.len() < TALKGROUP_MIN_COLUMNS {
            return Err(FeedError::TooFewColumns {
                expected: TALKGROUP_MIN_COLUMNS,
                found: row.len(),
            });
        }
        let id = column(row, 0);
        let decimal = id
            .parse::<u32>()
            .ok()
            .filter(|_| id.bytes().all(|b| b.is_ascii_digit()))
            .ok_or(FeedError::InvalidTalkgroupId(id))?;
        Ok(Talkgroup {
            decimal,
            hex: column(row, 1),
            alpha_tag: column(row, 2),
            mode: column(row, 3),
            description: column(row, 4),
            tag: column(row, 5),
            category: column(row, 6),
        })
    })
}

pub fn parse_sites(text: &str) -> Parsed<Site> {
    parse_rows(text, |row, issues| {
        if row.len() < SITE_MIN_COLUMNS {
            return Err(FeedError::TooFewColumns {
                expected: SITE_MIN_COLUMNS,
                found: row.len(),
            });
        }
        let id = column(row, 1);
        if id.is_empty() {
            return Err(FeedError::MissingSiteId);
        }

        let mut frequencies = Vec::new();
        let mut control_channels = Vec::new();
        for token in row[SITE_FREQUENCY_COLUMN..].iter().map(|t| t.trim()) {
            if token.is_empty() {
                continue;
            }
            let (mhz, is_control) = match token.strip_suffix(CONTROL_SUFFIX) {
                Some(mhz) => (mhz, true),
                None => (token, false),
            };
            // A bad token is dropped; the rest of the site survives
            let Ok(hz) = parse_mhz(mhz) else {
                issues.push(FeedError::InvalidFrequency(token.to_string()));
                continue;
            };
            if is_control {
                control_channels.push(hz);
            }
            frequencies.push(hz);
        }

        let description = column(row, 2);
        Ok(Site {
            id,
            description: if description.is_empty() {
                "Unknown Site".to_string()
            } else {
                description
            },
            nac: column(row, 3),
            details: row[4..SITE_FREQUENCY_COLUMN]
                .iter()
                .map(|c| c.trim().to_string())
                .collect(),
            frequencies,
            control_channels,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITES: &str = "\
RFSS,Site Dec,Description,NAC,County,Lat,Lon,Range,Sub,Freqs
1,001,\"North, Tower\",1A3,Cook,41.8,-87.6,20,,851.0125c,851.5125,852.0125,853.9875c
1,002,South,1A3,Will,41.5,-88.0,20,,852.2500,852.7625
1,,Missing,1A3,Will,41.5,-88.0,20,,852.2500
1,004,Short,1A3
1,005,Bad,1A3,Will,41.5,-88.0,20,,852.25x
1,006,Partial,1A3,Will,41.5,-88.0,20,,852.2500c,85x.1c,852.7625
";

    #[test]
    fn test_parse_mhz_is_exact() {
        assert_eq!(parse_mhz("851.0125"), Ok(851_012_500));
        assert_eq!(parse_mhz("460.1"), Ok(460_100_000));
        assert_eq!(parse_mhz("853.987500"), Ok(853_987_500));
        assert_eq!(parse_mhz("853.98750000"), Ok(853_987_500));
        assert_eq!(parse_mhz("851"), Ok(851_000_000));
        for bad in ["", ".5", "851.0125.1", "85a.1", "851.00000001", "0.0", "-851.0"] {
            assert!(parse_mhz(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_sites_split_control_channels() {
        let parsed = parse_sites(SITES);
        assert_eq!(parsed.records.len(), 4);

        let north = &parsed.records[0];
        assert_eq!(north.id, "001");
        assert_eq!(north.description, "North, Tower");
        assert_eq!(north.nac, "1A3");
        assert_eq!(north.details, vec!["Cook", "41.8", "-87.6", "20", ""]);
        assert_eq!(
            north.frequencies,
            vec![851_012_500, 851_512_500, 852_012_500, 853_987_500]
        );
        assert_eq!(north.control_channels, vec![851_012_500, 853_987_500]);
        assert!(north.control_set().contains(&853_987_500));

        assert!(parsed.records[1].control_channels.is_empty());
    }

    #[test]
    fn test_bad_frequency_token_keeps_the_site() {
        let parsed = parse_sites(SITES);

        let bad = &parsed.records[2];
        assert_eq!(bad.id, "005");
        assert!(bad.frequencies.is_empty());

        let partial = &parsed.records[3];
        assert_eq!(partial.id, "006");
        assert_eq!(partial.frequencies, vec![852_250_000, 852_762_500]);
        assert_eq!(partial.control_channels, vec![852_250_000]);
    }

    #[test]
    fn test_sites_report_rejected_rows() {
        let parsed = parse_sites(SITES);
        assert_eq!(
            parsed.rejected,
            vec![
                RowError {
                    line: 4,
                    error: FeedError::MissingSiteId
                },
                RowError {
                    line: 5,
                    error: FeedError::TooFewColumns {
                        expected: 10,
                        found: 4
                    }
                },
                RowError {
                    line: 6,
                    error: FeedError::InvalidFrequency("852.25x".to_string())
                },
                RowError {
                    line: 7,
                    error: FeedError::InvalidFrequency("85x.1c".to_string())
                },
            ]
        );
        assert_eq!(
            parsed.rejected[2].to_string(),
            "line 6: frequency \"852.25x\" is not a decimal MHz value"
        );
    }

    #[test]
    fn test_talkgroups_require_decimal_id() {
        let text = "\
Decimal,Hex,Alpha Tag,Mode,Description,Tag,Category
101,065,FD Disp,D,\"Fire Dispatch, Main\",Fire Dispatch,Fire
abc,066,Bad,D,Bad row,Other,Fire
102,066

103,067,EMS,DE,EMS Ops,EMS-Tac,EMS
";
        let parsed = parse_talkgroups(text);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].decimal, 101);
        assert_eq!(parsed.records[0].description, "Fire Dispatch, Main");
        assert_eq!(parsed.records[1].category, "EMS");
        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(
            parsed.rejected[0].error,
            FeedError::InvalidTalkgroupId("abc".to_string())
        );
        assert_eq!(parsed.rejected[1].line, 4);
    }

    #[test]
    fn test_record_quoting() {
        let fields = split_record(r#"1,"say ""hi"", ok",x"#);
        assert_eq!(fields, vec!["1", r#"say "hi", ok"#, "x"]);
        assert_eq!(join_record(&fields), r#"1,"say ""hi"", ok",x"#);
        assert_eq!(join_record(&["a".to_string(), String::new()]), "a,");
    }
}
