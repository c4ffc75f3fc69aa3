use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use lotpick_db::rusqlite::Connection;

use lotpick_db::db::insert_draw;
use lotpick_db::models::{Draw, DrawRecord, SLOT_COUNT};

pub const DEFAULT_FEED_URL: &str = "https://lottery.merseyworld.com/cgi-bin/lottery?days=20&Machine=Z&Ballset=0&order=1&show=1&year=0&display=CSV";

const NUMBER_COLUMNS: [&str; SLOT_COUNT] = ["N1", "N2", "N3", "N4", "N5", "L1", "L2"];
const DATE_COLUMNS: [&str; 3] = ["DD", "MMM", "YYYY"];

/// Draws parsed from a CSV feed, plus how many data rows were dropped.
pub struct Feed {
    pub records: Vec<DrawRecord>,
    pub skipped: u32,
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Local path or http(s) URL.
pub fn read_source(source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_feed(source)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Cannot read {:?}", source))
    }
}

fn fetch_feed(url: &str) -> Result<String> {
    log::info!("Fetching {}", url);
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("lotpick/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Cannot build HTTP client")?;
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/csv, text/plain, */*")
        .send()
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let excerpt: String = body.chars().take(500).collect();
        bail!("Fetch failed {}\n{}", status, excerpt);
    }
    response.text().context("Cannot read response body")
}

fn is_footer(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .map(|first| first.starts_with("* * *") || first.starts_with("All lotteries"))
        .unwrap_or(false)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// `DD`, `MMM`, `YYYY` fields (e.g. `7`, `Feb`, `2025`) to `2025-02-07`.
fn parse_date(dd: &str, mmm: &str, yyyy: &str) -> Option<String> {
    NaiveDate::parse_from_str(&format!("{}-{}-{}", dd, mmm, yyyy), "%d-%b-%Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parses the lottery CSV feed: a preamble, a header row naming `N1`..`N5`, `L1`, `L2`
/// (and optionally `DD`, `MMM`, `YYYY`), data rows, then a footer.
pub fn parse_feed(text: &str) -> Result<Feed> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .filter_map(|r| r.ok())
        .collect();

    let header_pos = rows
        .iter()
        .position(|r| NUMBER_COLUMNS.iter().all(|c| column(r, c).is_some()));
    let Some(header_pos) = header_pos else {
        let preview: Vec<String> = rows
            .iter()
            .take(5)
            .map(|r| r.iter().collect::<Vec<_>>().join(","))
            .collect();
        bail!("Could not find lottery CSV header line. First lines: {}", preview.join(" | "));
    };

    let headers = &rows[header_pos];
    let number_idx: Vec<usize> = NUMBER_COLUMNS
        .iter()
        .filter_map(|c| column(headers, c))
        .collect();
    let date_idx: Option<Vec<usize>> = DATE_COLUMNS.iter().map(|c| column(headers, c)).collect();

    let mut feed = Feed {
        records: Vec::new(),
        skipped: 0,
    };

    for (line, row) in rows.iter().enumerate().skip(header_pos + 1) {
        if is_footer(row) {
            break;
        }
        if row.len() < headers.len() {
            feed.skipped += 1;
            continue;
        }
        let fields: Vec<&str> = number_idx.iter().map(|&i| &row[i]).collect();
        let draw = match Draw::parse_fields(&fields) {
            Ok(draw) => draw,
            Err(e) => {
                log::debug!("Skipping feed row {}: {}", line + 1, e);
                feed.skipped += 1;
                continue;
            }
        };
        let date = date_idx
            .as_ref()
            .and_then(|idx| parse_date(&row[idx[0]], &row[idx[1]], &row[idx[2]]));
        feed.records.push(DrawRecord { date, draw });
    }

    log::info!("Parsed {} draws ({} rows skipped)", feed.records.len(), feed.skipped);
    Ok(feed)
}

pub fn import_records(conn: &Connection, records: &[DrawRecord]) -> Result<ImportResult> {
    let tx = conn
        .unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record in records {
        result.total_records += 1;
        match insert_draw(&tx, record) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.skipped += 1,
            Err(e) => {
                log::warn!("Insert failed for draw {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotpick_db::db::{count_draws, migrate};

    const FEED: &str = "\
Lottery results,,,,,,,,,,,
No., Day,DD,MMM,YYYY, N1,N2,N3,N4,N5,L1,L2
1850, Tue, 4,Feb,2025, 03,17,22,38,45,04,09
1849, Fri,31,Jan,2025, 5,10,15,20,25,1,11
1848, Tue,28,Jan,2025, 7,xx,9,10,11,2,3
1847, Fri,24,Jan
1846, Tue,21,Jan,2025, 1,2,3,4,5,1,2
* * * Key: N1-N5 main numbers
1845, Fri,17,Jan,2025, 6,7,8,9,10,3,4
";

    #[test]
    fn test_parse_feed() {
        let feed = parse_feed(FEED).unwrap();
        assert_eq!(feed.records.len(), 3);
        assert_eq!(feed.skipped, 2);

        let first = &feed.records[0];
        assert_eq!(first.draw.key(), "03,17,22,38,45,04,09");
        assert_eq!(first.date.as_deref(), Some("2025-02-04"));
        assert_eq!(feed.records[1].draw.to_fields()[0], "05");
        assert_eq!(feed.records[1].date.as_deref(), Some("2025-01-31"));
        // footer ends the data
        assert_eq!(feed.records[2].draw.main, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_parse_feed_without_dates() {
        let text = "N1,N2,N3,N4,N5,L1,L2\n1,2,3,4,5,6,7\nAll lotteries listed\n";
        let feed = parse_feed(text).unwrap();
        assert_eq!(feed.records.len(), 1);
        assert_eq!(feed.records[0].date, None);
    }

    #[test]
    fn test_parse_feed_missing_header() {
        assert!(parse_feed("a,b,c\n1,2,3\n").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("4", "Feb", "2025").as_deref(), Some("2025-02-04"));
        assert_eq!(parse_date("31", "Dec", "1999").as_deref(), Some("1999-12-31"));
        assert_eq!(parse_date("31", "Foo", "1999"), None);
    }

    #[test]
    fn test_import_records_skips_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let feed = parse_feed(FEED).unwrap();

        let first = import_records(&conn, &feed.records).unwrap();
        assert_eq!(first.inserted, 3);
        let second = import_records(&conn, &feed.records).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(count_draws(&conn).unwrap(), 3);
    }

    #[test]
    fn test_read_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        std::fs::write(&path, FEED).unwrap();
        let text = read_source(path.to_str().unwrap()).unwrap();
        assert_eq!(parse_feed(&text).unwrap().records.len(), 3);
    }
}
