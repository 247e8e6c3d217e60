//! Table geometry shared by the PDF and console renderers
//!
//! Widths are in whatever unit the [`TextMeasure`] returns: millimetres for the
//! PDF, characters for the console.

use std::ops::Range;

pub trait TextMeasure {
    fn width(&self, text: &str) -> f32;
}

/// Helvetica advance widths at a given point size, in millimetres
#[derive(Debug, Clone, Copy)]
pub struct HelveticaMetrics {
    pub font_size_pt: f32,
}

const MM_PER_PT: f32 = 25.4 / 72.0;

impl HelveticaMetrics {
    pub fn new(font_size_pt: f32) -> Self {
        Self { font_size_pt }
    }
}

impl TextMeasure for HelveticaMetrics {
    fn width(&self, text: &str) -> f32 {
        let units: u32 = text.chars().map(helvetica_units).sum();
        units as f32 / 1000.0 * self.font_size_pt * MM_PER_PT
    }
}

// Standard Helvetica AFM widths (1/1000 em)
fn helvetica_units(c: char) -> u32 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | 'I' | '[' | '\\' | ']' | 'f' | 't' => 278,
        'i' | 'j' | 'l' => 222,
        '\'' => 191,
        '"' => 355,
        '|' => 260,
        '(' | ')' | '-' | '`' | 'r' => 333,
        '{' | '}' => 334,
        '*' => 389,
        '^' => 469,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        '+' | '<' | '=' | '>' | '~' => 584,
        'F' | 'T' | 'Z' => 611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' => 667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'w' => 722,
        'G' | 'O' | 'Q' => 778,
        'M' | 'm' => 833,
        '%' => 889,
        'W' => 944,
        '@' => 1015,
        _ => 556,
    }
}

/// One unit per character, for fixed-width output
#[derive(Debug, Clone, Copy, Default)]
pub struct CharMetrics;

impl TextMeasure for CharMetrics {
    fn width(&self, text: &str) -> f32 {
        text.chars().count() as f32
    }
}

/// Column widths from the widest header or cell, scaled to fit `usable_width`
///
/// With `fixed_last` set, the last column gets exactly that width and the
/// remaining columns share what is left.
pub fn column_widths<M: TextMeasure>(
    measure: &M,
    headers: &[String],
    rows: &[Vec<String>],
    usable_width: f32,
    padding: f32,
    fixed_last: Option<f32>,
) -> Vec<f32> {
    let measured = match fixed_last {
        Some(_) => headers.len().saturating_sub(1),
        None => headers.len(),
    };

    let mut widths: Vec<f32> = (0..measured)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| measure.width(cell) + padding)
                .fold(measure.width(&headers[col]) + padding, f32::max)
        })
        .collect();

    let available = (usable_width - fixed_last.unwrap_or(0.0)).max(0.0);
    let total: f32 = widths.iter().sum();
    if total > available && total > 0.0 {
        let scale = available / total;
        for width in &mut widths {
            *width *= scale;
        }
    }

    if let Some(last) = fixed_last {
        if !headers.is_empty() {
            widths.push(last);
        }
    }
    widths
}

/// Vertical page geometry, measured downward from the top edge
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    /// Where the header row sits on continuation pages
    pub top: f32,
    pub row_height: f32,
    /// A new page starts once the cursor passes this line
    pub break_at: f32,
}

/// Split `row_count` rows into pages; each page starts with a header row
///
/// `first_y` is where the header of the first page is drawn.
pub fn paginate(row_count: usize, first_y: f32, geometry: &PageGeometry) -> Vec<Range<usize>> {
    let mut pages = Vec::new();
    let mut page_start = 0;
    let mut y = first_y + geometry.row_height;

    for row in 0..row_count {
        if y > geometry.break_at {
            pages.push(page_start..row);
            page_start = row;
            y = geometry.top + geometry.row_height;
        }
        y += geometry.row_height;
    }
    pages.push(page_start..row_count);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_helvetica_digit_width() {
        let metrics = HelveticaMetrics::new(10.0);
        // 556/1000 em at 10pt
        let expected = 0.556 * 10.0 * 25.4 / 72.0;
        assert!((metrics.width("0") - expected).abs() < 1e-4);
        assert!(metrics.width("WWW") > metrics.width("iii"));
    }

    #[test]
    fn test_widths_use_widest_value() {
        let headers = strings(&["Name", "UOM"]);
        let rows = vec![strings(&["Walk-in Freezer", "C"]), strings(&["Fridge", "C"])];

        let widths = column_widths(&CharMetrics, &headers, &rows, 100.0, 2.0, None);
        assert_eq!(widths, vec![17.0, 5.0]);
    }

    #[test]
    fn test_widths_scale_down_to_usable_width() {
        let headers = strings(&["aaaaaaaaaa", "bbbbbbbbbbbbbbbbbbbb"]);
        let widths = column_widths(&CharMetrics, &headers, &[], 15.0, 0.0, None);

        let total: f32 = widths.iter().sum();
        assert!((total - 15.0).abs() < 1e-4);
        assert!((widths[1] / widths[0] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_last_column() {
        let headers = strings(&["Name", "Hours", "Remarks"]);
        let rows = vec![strings(&["Freezer", "12.0", ""])];

        let widths = column_widths(&CharMetrics, &headers, &rows, 20.0, 0.0, Some(10.0));
        assert_eq!(widths.len(), 3);
        assert_eq!(widths[2], 10.0);
        let others: f32 = widths[..2].iter().sum();
        assert!(others <= 10.0 + 1e-4);
    }

    #[test]
    fn test_paginate_single_page() {
        let geometry = PageGeometry {
            top: 10.0,
            row_height: 10.0,
            break_at: 180.0,
        };
        assert_eq!(paginate(3, 30.0, &geometry), vec![0..3]);
        assert_eq!(paginate(0, 30.0, &geometry), vec![0..0]);
    }

    #[test]
    fn test_paginate_breaks_and_repeats_header() {
        let geometry = PageGeometry {
            top: 10.0,
            row_height: 10.0,
            break_at: 180.0,
        };
        // First page: header at 30, rows at 40..=180 -> 15 rows
        // Later pages: header at 10, rows at 20..=180 -> 17 rows
        let pages = paginate(40, 30.0, &geometry);
        assert_eq!(pages, vec![0..15, 15..32, 32..40]);
    }
}
