use crate::report::layout::{self, CharMetrics};
use crate::report::table::ReportTable;

/// Fixed-width text rendering of a report table for the terminal
pub fn render_text_table(table: &ReportTable) -> String {
    let widths = layout::column_widths(
        &CharMetrics,
        &table.headers,
        &table.rows,
        f32::INFINITY,
        2.0,
        None,
    );
    let widths: Vec<usize> = widths.iter().map(|w| *w as usize).collect();

    let mut out = String::new();
    push_row(&mut out, &table.headers, &widths);
    let rule: usize = widths.iter().sum();
    out.push_str(&"-".repeat(rule));
    out.push('\n');
    for row in &table.rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: String = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.trim_end());
    out.push('\n');
}
