// Tab-aligned columns for the container table and fixed cells for volume blocks.

const MIN_CELL_WIDTH: usize = 20;
const CELL_PADDING: usize = 3;

/// Align rows into columns. Every cell but the last of a row is padded to the
/// column width (widest cell + padding, at least `MIN_CELL_WIDTH`).
pub fn align(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![MIN_CELL_WIDTH; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
            widths[i] = widths[i].max(cell.chars().count() + CELL_PADDING);
        }
    }

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    line.push_str(&format!("{:<1$}", cell, widths[i]));
                } else {
                    line.push_str(cell);
                }
            }
            line
        })
        .collect()
}

/// Fixed-width cells: left-aligned in 14 columns, truncated to 13 characters.
pub fn fixed_cells<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| format!("{:<14.13}", c.as_ref()))
        .collect()
}

/// First `len` characters of `s`, or all of it when shorter.
pub fn truncate(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn align_pads_to_min_width_and_leaves_last_cell() {
        let lines = align(&[row(&["NAME", "PIDS"]), row(&["web", "3"])]);
        assert_eq!(lines[0], format!("{:<20}PIDS", "NAME"));
        assert_eq!(lines[1], format!("{:<20}3", "web"));
    }

    #[test]
    fn align_grows_column_for_wide_cells() {
        let wide = "a".repeat(25);
        let lines = align(&[row(&[&wide, "x"]), row(&["b", "y"])]);
        assert_eq!(lines[1].find('y'), Some(28));
    }

    #[test]
    fn fixed_cells_truncate_and_pad() {
        let line = fixed_cells(&["avgRdLat(ms)", "averylongstatisticname"]);
        assert_eq!(line, "avgRdLat(ms)  averylongstat ");
    }

    #[test]
    fn truncate_handles_short_and_long_names() {
        assert_eq!(truncate("0123456789abcdef", 12), "0123456789ab");
        assert_eq!(truncate("data", 12), "data");
    }
}
