//! CSV export of the collection
//!
//! Produces the text of a delimited file; writing it anywhere is left to the
//! caller. Columns are fixed: `Id, Name, Types, Height, Weight, Owned At, Note`.

use chrono::NaiveDate;

use crate::models::CollectionRow;

/// Header columns, in output order
pub const EXPORT_HEADERS: [&str; 7] = ["Id", "Name", "Types", "Height", "Weight", "Owned At", "Note"];

/// Build the CSV text for `rows`
///
/// The header is always written. With no rows the output is the header line
/// and a newline; otherwise lines are joined with `\n` and there is no
/// trailing newline.
pub fn build_export(rows: &[CollectionRow]) -> String {
    let header = EXPORT_HEADERS.join(",");
    if rows.is_empty() {
        return header + "\n";
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        lines.push(
            row_cells(row)
                .iter()
                .map(|cell| escape_field(cell))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

fn row_cells(row: &CollectionRow) -> [String; 7] {
    [
        row.id.to_string(),
        row.name.clone(),
        row.types.join(", "),
        row.height.map(|h| h.to_string()).unwrap_or_default(),
        row.weight.map(|w| w.to_string()).unwrap_or_default(),
        row.owned_at.as_deref().map(format_owned_at).unwrap_or_default(),
        row.note.clone().unwrap_or_default(),
    ]
}

/// Quote a field containing a comma, newline or double quote
///
/// Embedded double quotes are doubled.
pub fn escape_field(value: &str) -> String {
    let needs_quotes = value.contains(',') || value.contains('\n') || value.contains('"');
    if !needs_quotes {
        return value.to_string();
    }
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Reformat `2026-02-14T19:16:59.212Z` as `2026/02/14 19:16:59`
///
/// Fractional seconds and the `Z` marker are dropped. A date with no time
/// part gets `00:00:00`.
pub fn format_owned_at(iso: &str) -> String {
    if iso.is_empty() {
        return String::new();
    }
    let (date, time) = match iso.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (iso, None),
    };
    let date = date.replace('-', "/");
    let time = match time {
        Some(time) => strip_fraction(time).replacen('Z', "", 1),
        None => "00:00:00".to_string(),
    };
    format!("{} {}", date, time)
}

/// Drop a trailing `.ddd` or `.dddZ`
fn strip_fraction(time: &str) -> &str {
    let Some(dot) = time.rfind('.') else {
        return time;
    };
    let fraction = &time[dot + 1..];
    let digits = fraction
        .strip_suffix('Z')
        .or_else(|| fraction.strip_suffix('z'))
        .unwrap_or(fraction);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        &time[..dot]
    } else {
        time
    }
}

/// File name callers use when saving an export
pub fn export_filename(date: NaiveDate) -> String {
    format!("collection-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_catch() -> CollectionRow {
        CollectionRow {
            id: 1,
            name: "bulbasaur".to_string(),
            image_url: None,
            types: vec!["grass".to_string(), "poison".to_string()],
            height: Some(7),
            weight: Some(69),
            owned_at: Some("2025-02-01T12:00:00Z".to_string()),
            note: Some("First catch".to_string()),
        }
    }

    fn minimal(id: i64, name: &str) -> CollectionRow {
        CollectionRow {
            id,
            name: name.to_string(),
            image_url: None,
            types: Vec::new(),
            height: None,
            weight: None,
            owned_at: None,
            note: None,
        }
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(build_export(&[]), "Id,Name,Types,Height,Weight,Owned At,Note\n");
    }

    #[test]
    fn test_single_row() {
        let out = build_export(&[first_catch()]);
        let lines: Vec<_> = out.split('\n').collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Id,Name,Types,Height,Weight,Owned At,Note");
        assert_eq!(
            lines[1],
            "1,bulbasaur,\"grass, poison\",7,69,2025/02/01 12:00:00,First catch"
        );
    }

    #[test]
    fn test_multiple_rows() {
        let mut pikachu = minimal(25, "pikachu");
        pikachu.types = vec!["electric".to_string()];
        pikachu.owned_at = Some("2025-02-02T10:00:00Z".to_string());
        pikachu.note = Some("Favorite".to_string());

        let mut charizard = minimal(6, "charizard");
        charizard.height = Some(17);
        charizard.weight = Some(905);
        charizard.note = Some(String::new());

        let out = build_export(&[first_catch(), pikachu, charizard]);
        let lines: Vec<_> = out.split('\n').collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("bulbasaur"));
        assert_eq!(lines[2], "25,pikachu,electric,,,2025/02/02 10:00:00,Favorite");
        assert_eq!(lines[3], "6,charizard,,17,905,,");
    }

    #[test]
    fn test_quotes_in_note_are_doubled() {
        let mut row = first_catch();
        row.note = Some("He said \"hello\"".to_string());

        let out = build_export(&[row]);
        assert!(out.ends_with(",\"He said \"\"hello\"\"\""));
    }

    #[test]
    fn test_newline_in_note_is_quoted() {
        let mut row = first_catch();
        row.note = Some("Line one\nLine two".to_string());

        let out = build_export(&[row]);
        assert!(out.contains("\"Line one\nLine two\""));
    }

    #[test]
    fn test_optional_fields_empty() {
        let out = build_export(&[minimal(1, "minimal")]);
        assert_eq!(out.split('\n').nth(1), Some("1,minimal,,,,,"));
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_format_owned_at() {
        assert_eq!(format_owned_at("2026-02-14T19:16:59.212Z"), "2026/02/14 19:16:59");
        assert_eq!(format_owned_at("2025-02-01T12:00:00Z"), "2025/02/01 12:00:00");
        assert_eq!(format_owned_at("2025-02-01T12:00:00"), "2025/02/01 12:00:00");
        assert_eq!(format_owned_at("2025-02-01"), "2025/02/01 00:00:00");
        assert_eq!(format_owned_at(""), "");
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(export_filename(date), "collection-2025-03-09.csv");
    }
}
