use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::models::{Draw, DrawRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    draw_date  TEXT NOT NULL DEFAULT '',
    main_1     INTEGER NOT NULL,
    main_2     INTEGER NOT NULL,
    main_3     INTEGER NOT NULL,
    main_4     INTEGER NOT NULL,
    main_5     INTEGER NOT NULL,
    lucky_1    INTEGER NOT NULL,
    lucky_2    INTEGER NOT NULL,
    UNIQUE (draw_date, main_1, main_2, main_3, main_4, main_5, lucky_1, lucky_2)
);
";

const COLUMNS: &str = "draw_date, main_1, main_2, main_3, main_4, main_5, lucky_1, lucky_2";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("lotpick.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

/// Returns `false` when the same draw (same date, same slots) is already stored.
pub fn insert_draw(conn: &Connection, record: &DrawRecord) -> Result<bool> {
    let s = record.draw.slots();
    let changed = conn.execute(
        &format!("INSERT OR IGNORE INTO draws ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        rusqlite::params![
            record.date.as_deref().unwrap_or(""),
            s[0],
            s[1],
            s[2],
            s[3],
            s[4],
            s[5],
            s[6],
        ],
    ).context("Insert failed")?;
    Ok(changed > 0)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawRecord> {
    let date: String = row.get(0)?;
    let mut slots = [0u8; 7];
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = row.get::<_, u8>(i + 1)?;
    }
    Ok(DrawRecord {
        date: if date.is_empty() { None } else { Some(date) },
        draw: Draw::from_slots(slots),
    })
}

/// Full history in chronological order (oldest first, insertion order within a date).
pub fn fetch_draws(conn: &Connection) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM draws ORDER BY draw_date ASC, id ASC"
    ))?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM draws ORDER BY draw_date DESC, id DESC LIMIT ?1"
    ))?;
    let records = stmt
        .query_map([limit], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn fetch_history(conn: &Connection) -> Result<Vec<Draw>> {
    Ok(fetch_draws(conn)?.into_iter().map(|r| r.draw).collect())
}

/// Date of the first stored draw with exactly these slots, in recorded order.
pub fn find_draw(conn: &Connection, draw: &Draw) -> Result<Option<String>> {
    let s = draw.slots();
    let date = conn
        .query_row(
            "SELECT draw_date FROM draws
             WHERE main_1 = ?1 AND main_2 = ?2 AND main_3 = ?3 AND main_4 = ?4 AND main_5 = ?5
               AND lucky_1 = ?6 AND lucky_2 = ?7
             ORDER BY draw_date ASC LIMIT 1",
            rusqlite::params![s[0], s[1], s[2], s[3], s[4], s[5], s[6]],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(date)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(date: &str, main: [u8; 5]) -> DrawRecord {
        DrawRecord {
            date: Some(date.to_string()),
            draw: Draw::new(main, [1, 2]),
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_record("2024-01-01", [1, 2, 3, 4, 5])).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();

        let record = test_record("2024-01-01", [1, 2, 3, 4, 5]);
        assert!(insert_draw(&conn, &record).unwrap());
        assert!(!insert_draw(&conn, &record).unwrap());
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_same_numbers_other_date_kept() {
        let conn = memory_db();
        insert_draw(&conn, &test_record("2024-01-01", [1, 2, 3, 4, 5])).unwrap();
        insert_draw(&conn, &test_record("2024-02-01", [1, 2, 3, 4, 5])).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 2);
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();

        insert_draw(&conn, &test_record("2024-01-01", [1, 2, 3, 4, 5])).unwrap();
        insert_draw(&conn, &test_record("2024-01-05", [6, 7, 8, 9, 10])).unwrap();
        insert_draw(&conn, &test_record("2024-01-03", [11, 12, 13, 14, 15])).unwrap();

        let last = fetch_last_draws(&conn, 10).unwrap();
        let dates: Vec<_> = last.iter().map(|r| r.date.clone().unwrap()).collect();
        assert_eq!(dates, ["2024-01-05", "2024-01-03", "2024-01-01"]);

        let all = fetch_draws(&conn).unwrap();
        assert_eq!(all[0].draw.main, [1, 2, 3, 4, 5]);
        assert_eq!(all[2].draw.main, [6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_undated_record_roundtrip() {
        let conn = memory_db();
        let record = DrawRecord {
            date: None,
            draw: Draw::new([45, 3, 22, 17, 38], [9, 4]),
        };
        insert_draw(&conn, &record).unwrap();
        let all = fetch_draws(&conn).unwrap();
        assert_eq!(all, vec![record]);
    }

    #[test]
    fn test_find_draw() {
        let conn = memory_db();
        insert_draw(&conn, &test_record("2024-01-01", [1, 2, 3, 4, 5])).unwrap();

        let found = find_draw(&conn, &Draw::new([1, 2, 3, 4, 5], [1, 2])).unwrap();
        assert_eq!(found.as_deref(), Some("2024-01-01"));
        let missing = find_draw(&conn, &Draw::new([1, 2, 3, 4, 5], [2, 1])).unwrap();
        assert!(missing.is_none());
    }
}
