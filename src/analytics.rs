use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::StreamExt;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Spreadsheet cells cap out at 50 000 characters, so rows carrying anything
/// longer are dropped at fetch time.
pub const MAX_CELL_LEN: usize = 50_000;

/// One exported day of sessions lives at `{base}/ga_sessions_{YYYYMMDD}.json`.
pub fn day_url(base: &str, date: NaiveDate) -> String {
    format!(
        "{}/ga_sessions_{}.json",
        base.trim_end_matches('/'),
        date.format("%Y%m%d")
    )
}

pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day = start;
    while day <= end {
        dates.push(day);
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// Fetches one day of session rows and drops the ones no sheet cell can hold.
pub async fn fetch_day(
    client: &reqwest::Client,
    base: &str,
    date: NaiveDate,
) -> Result<Vec<Value>> {
    let url = day_url(base, date);
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", url))?;
    let rows: Vec<Value> = response
        .json()
        .await
        .context("Failed to parse session rows")?;

    Ok(rows.into_iter().filter(row_fits_sheet).collect())
}

/// Fetches an inclusive date range with at most `workers` days in flight.
/// A day that fails is logged and skipped, the rest of the range goes on.
pub async fn fetch_range(
    client: &reqwest::Client,
    base: &str,
    start: NaiveDate,
    end: NaiveDate,
    workers: usize,
) -> Vec<Value> {
    let days: Vec<Vec<Value>> = futures::stream::iter(date_range(start, end).into_iter().map(
        |date| async move {
            match fetch_day(client, base, date).await {
                Ok(rows) => {
                    println!("Data for {} has been fetched.", date);
                    rows
                }
                Err(e) => {
                    tracing::warn!(%date, error = %format!("{:#}", e), "skipping day");
                    Vec::new()
                }
            }
        },
    ))
    .buffered(workers.max(1))
    .collect()
    .await;

    days.into_iter().flatten().collect()
}

fn row_fits_sheet(row: &Value) -> bool {
    match row.as_object() {
        Some(fields) => fields.values().all(|v| cell_text(v).chars().count() <= MAX_CELL_LEN),
        None => false,
    }
}

/// Buckets rows by their `channelGrouping` value, sorted by channel name.
pub fn split_by_channel(rows: Vec<Value>) -> BTreeMap<String, Vec<Value>> {
    let mut channels: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for row in rows {
        let channel = row["channelGrouping"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        channels.entry(channel).or_default().push(row);
    }
    channels
}

/// Engaged-session filter: more than 5 pageviews, more than 300 seconds on
/// site, and at least one custom dimension. Missing totals fail the filter.
pub fn session_passes_filter(row: &Value) -> bool {
    let totals = &row["totals"];
    let pageviews = int_field(&totals["pageviews"]);
    let time_on_site = int_field(&totals["timeOnSite"]);
    let has_dimensions = row["customDimensions"]
        .as_array()
        .map(|dims| !dims.is_empty())
        .unwrap_or(false);

    matches!(pageviews, Some(p) if p > 5)
        && matches!(time_on_site, Some(t) if t > 300)
        && has_dimensions
}

// The export carries counters both as numbers and as quoted strings.
fn int_field(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Writes one channel's rows as `ga_sessions_<channel>_filtered.csv` in
/// `dir`: one column per top-level key (sorted union across rows), nested
/// values serialized as JSON text.
pub fn export_channel(dir: &Path, channel: &str, rows: &[Value]) -> Result<PathBuf> {
    let columns: Vec<String> = rows
        .iter()
        .filter_map(|r| r.as_object())
        .flat_map(|fields| fields.keys().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();

    let name = format!(
        "ga_sessions_{}_filtered.csv",
        channel.replace([' ', '/'], "_")
    );
    let path = dir.join(name);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create sheet: {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell_text(&row[column.as_str()]))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!(
        "Filtered data has been exported to {} ({} rows)",
        path.display(),
        rows.len()
    );
    Ok(path)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn day_url_formats_the_date() {
        let date = NaiveDate::from_ymd_opt(2017, 7, 24).unwrap();
        assert_eq!(
            day_url("https://wh.example/ga/", date),
            "https://wh.example/ga/ga_sessions_20170724.json"
        );
    }

    #[test]
    fn date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2017, 7, 24).unwrap();
        let end = NaiveDate::from_ymd_opt(2017, 7, 26).unwrap();
        let range = date_range(start, end);
        assert_eq!(range.len(), 3);
        assert_eq!(range[0], start);
        assert_eq!(range[2], end);
    }

    #[test]
    fn filter_requires_engagement_and_dimensions() {
        let engaged = json!({
            "totals": {"pageviews": 6, "timeOnSite": 301},
            "customDimensions": [{"index": 4, "value": "EMEA"}]
        });
        assert!(session_passes_filter(&engaged));

        let few_views = json!({
            "totals": {"pageviews": 4, "timeOnSite": 400},
            "customDimensions": [{"index": 4, "value": "EMEA"}]
        });
        assert!(!session_passes_filter(&few_views));

        let missing_time = json!({
            "totals": {"pageviews": 9, "timeOnSite": null},
            "customDimensions": [{"index": 4, "value": "EMEA"}]
        });
        assert!(!session_passes_filter(&missing_time));

        let no_dimensions = json!({
            "totals": {"pageviews": 9, "timeOnSite": 400},
            "customDimensions": []
        });
        assert!(!session_passes_filter(&no_dimensions));
    }

    #[test]
    fn filter_accepts_stringly_counters() {
        let row = json!({
            "totals": {"pageviews": "12", "timeOnSite": "360"},
            "customDimensions": [{"index": 1, "value": "x"}]
        });
        assert!(session_passes_filter(&row));
    }

    #[test]
    fn splits_rows_by_channel() {
        let rows = vec![
            json!({"channelGrouping": "Organic Search", "visitId": 1}),
            json!({"channelGrouping": "Direct", "visitId": 2}),
            json!({"channelGrouping": "Organic Search", "visitId": 3}),
        ];

        let channels = split_by_channel(rows);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels["Organic Search"].len(), 2);
        assert_eq!(channels["Direct"].len(), 1);
    }

    #[test]
    fn oversized_cells_drop_the_row() {
        let ok = json!({"channelGrouping": "Direct", "hits": "x"});
        let oversized = json!({
            "channelGrouping": "Direct",
            "hits": "x".repeat(MAX_CELL_LEN + 1)
        });
        assert!(row_fits_sheet(&ok));
        assert!(!row_fits_sheet(&oversized));
    }

    #[test]
    fn export_writes_sorted_union_of_columns() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            json!({"channelGrouping": "Direct", "visitId": 10}),
            json!({"channelGrouping": "Direct", "totals": {"pageviews": 7}}),
        ];

        let path = export_channel(dir.path(), "Direct", &rows).unwrap();
        assert!(path.ends_with("ga_sessions_Direct_filtered.csv"));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect();

        assert_eq!(records[0], vec!["channelGrouping", "totals", "visitId"]);
        assert_eq!(records[1], vec!["Direct", "", "10"]);
        assert_eq!(records[2], vec!["Direct", r#"{"pageviews":7}"#, ""]);
    }
}
