use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::RosterImportError;

#[derive(Debug, Deserialize)]
pub(crate) struct EmployeeRow {
    #[serde(alias = "社員ID")]
    pub(crate) employee_id: u64,
    #[serde(default, alias = "社員番号")]
    pub(crate) employee_number: String,
    #[serde(alias = "氏名")]
    pub(crate) full_name: String,
    #[serde(default, alias = "単価", deserialize_with = "empty_string_as_none")]
    pub(crate) billing_rate: Option<String>,
    #[serde(default, alias = "時給", deserialize_with = "empty_string_as_none")]
    pub(crate) hourly_wage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FactoryLineRow {
    #[serde(alias = "工場ID")]
    pub(crate) factory_id: u64,
    #[serde(alias = "派遣先")]
    pub(crate) company_name: String,
    #[serde(alias = "工場名")]
    pub(crate) plant_name: String,
    #[serde(default, alias = "住所", deserialize_with = "empty_string_as_none")]
    pub(crate) address: Option<String>,
    #[serde(default, alias = "抵触日", deserialize_with = "empty_string_as_none")]
    pub(crate) conflict_date: Option<String>,
    #[serde(alias = "ラインID")]
    pub(crate) line_id: u64,
    #[serde(alias = "配属先")]
    pub(crate) line_name: String,
    #[serde(default, alias = "単価", deserialize_with = "empty_string_as_none")]
    pub(crate) hourly_rate: Option<String>,
    #[serde(default, alias = "指揮命令者", deserialize_with = "empty_string_as_none")]
    pub(crate) supervisor: Option<String>,
}

/// Deserialize every data row, pairing it with the file line the record starts on.
///
/// Quoted cells may span lines, so the line comes from the reader's record position.
pub(crate) fn parse_rows<T, R>(reader: R) -> Result<Vec<(usize, T)>, csv::Error>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut rows = Vec::new();

    while csv_reader.read_record(&mut record)? {
        let line = record
            .position()
            .map_or(0, |position| usize::try_from(position.line()).unwrap_or(usize::MAX));
        rows.push((line, record.deserialize::<T>(Some(&headers))?));
    }

    Ok(rows)
}

/// Accept `1500`, `1,500`, `¥1,500` and `1500円`.
pub(crate) fn parse_rate(
    line: usize,
    column: &'static str,
    raw: Option<&str>,
) -> Result<Option<u32>, RosterImportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, ',' | '¥' | '￥' | '円') && !ch.is_whitespace())
        .collect();
    cleaned
        .parse::<u32>()
        .map(Some)
        .map_err(|_| RosterImportError::InvalidField {
            line,
            column,
            value: raw.to_string(),
        })
}

/// Spreadsheet exports use either ISO dates or slash-separated Japanese style.
pub(crate) fn parse_date(
    line: usize,
    column: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, RosterImportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(Some)
        .ok_or_else(|| RosterImportError::InvalidField {
            line,
            column,
            value: raw.to_string(),
        })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_tolerate_currency_formatting() {
        assert_eq!(parse_rate(2, "billing_rate", Some("¥1,650")).ok(), Some(Some(1650)));
        assert_eq!(parse_rate(2, "billing_rate", Some(" 1500円 ")).ok(), Some(Some(1500)));
        assert_eq!(parse_rate(2, "billing_rate", None).ok(), Some(None));
        assert!(parse_rate(2, "billing_rate", Some("-1500")).is_err());
    }

    #[test]
    fn dates_accept_iso_and_slash_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(parse_date(4, "conflict_date", Some("2025-03-01")).ok(), Some(expected));
        assert_eq!(parse_date(4, "conflict_date", Some("2025/3/1")).ok(), Some(expected));
        match parse_date(4, "conflict_date", Some("令和7年3月1日")) {
            Err(RosterImportError::InvalidField { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected invalid field, got {other:?}"),
        }
    }
}
