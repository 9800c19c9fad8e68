//! CSV/TSV parsing and Markdown table rendering.

use serde_json::Value;

/// Parse delimited text into rows of cells.
///
/// Handles quoted cells, doubled quotes and CRLF line endings. Returns `None`
/// when the text is empty or a quoted cell is never closed.
pub fn parse_csv(text: &str, delimiter: char) -> Option<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    cell.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' if cell.is_empty() => in_quotes = true,
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            c if c == delimiter => row.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));

    if rows.is_empty() { None } else { Some(rows) }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}

fn table_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |\n", escaped.join(" | "))
}

/// Render rows as a Markdown table; the first row is the header.
///
/// Short rows are padded with empty cells to the header width.
pub fn csv_to_markdown(rows: &[Vec<String>]) -> String {
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    let width = header.len();
    let mut out = table_row(header);
    out.push_str(&table_row(&vec!["---".to_string(); width]));
    for row in body {
        let mut cells = row.clone();
        cells.resize(width.max(cells.len()), String::new());
        cells.truncate(width);
        out.push_str(&table_row(&cells));
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render JSON records as a Markdown table.
///
/// Columns are `headers` when given, otherwise the union of object keys in
/// order of first appearance. Array records are read positionally; without
/// headers, a leading array record is the header row.
pub fn records_to_markdown(records: &[Value], headers: Option<&[String]>) -> String {
    if headers.is_none()
        && let Some(Value::Array(_)) = records.first()
    {
        let rows: Vec<Vec<String>> = records.iter().map(positional_row).collect();
        return csv_to_markdown(&rows);
    }

    let columns: Vec<String> = match headers {
        Some(h) => h.to_vec(),
        None => {
            let mut keys: Vec<String> = Vec::new();
            for record in records {
                if let Value::Object(map) = record {
                    for key in map.keys() {
                        if !keys.contains(key) {
                            keys.push(key.clone());
                        }
                    }
                }
            }
            keys
        }
    };

    let mut rows = vec![columns.clone()];
    for record in records {
        let row = match record {
            Value::Object(map) => columns
                .iter()
                .map(|c| map.get(c).map(cell_text).unwrap_or_default())
                .collect(),
            other => positional_row(other),
        };
        rows.push(row);
    }
    csv_to_markdown(&rows)
}

fn positional_row(record: &Value) -> Vec<String> {
    match record {
        Value::Array(items) => items.iter().map(cell_text).collect(),
        other => vec![cell_text(other)],
    }
}
