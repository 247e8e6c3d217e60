use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use tracing::{debug, info, instrument};

use crate::report::layout::{self, HelveticaMetrics, PageGeometry, TextMeasure};
use crate::report::table::{self, ReportTable};
use crate::report::ReportError;
use crate::store::ComplianceSummary;

// A4 landscape, millimetres
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 10.0;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 10.0;
const CELL_PADDING: f32 = 2.0;
const REMARKS_WIDTH: f32 = 80.0;

const GEOMETRY: PageGeometry = PageGeometry {
    top: MARGIN,
    row_height: ROW_HEIGHT,
    break_at: 180.0,
};

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Builds the monthly compliance PDF page by page, tracking the current layer
struct PdfReport {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    pages: usize,
}

impl PdfReport {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| ReportError::Pdf(format!("{e:?}")))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| ReportError::Pdf(format!("{e:?}")))?,
        };
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            fonts,
            pages: 1,
        })
    }

    fn add_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
    }

    /// Draw text with its baseline placed for a cell whose top edge is `y_top`
    fn text(&self, text: &str, size: f32, x: f32, y_top: f32, bold: bool) {
        let font = if bold {
            &self.fonts.bold
        } else {
            &self.fonts.regular
        };
        let baseline = y_top + ROW_HEIGHT / 2.0 + size * 0.35 / 2.0;
        self.layer
            .use_text(text, size, Mm(x), Mm(PAGE_HEIGHT - baseline), font);
    }

    fn cell_border(&self, x: f32, y_top: f32, width: f32) {
        let top = PAGE_HEIGHT - y_top;
        let bottom = top - ROW_HEIGHT;
        let outline = Line {
            points: vec![
                (Point::new(Mm(x), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(bottom)), false),
                (Point::new(Mm(x), Mm(bottom)), false),
            ],
            is_closed: true,
        };
        self.layer.add_line(outline);
    }

    fn title(&self, text: &str, y_top: f32) {
        let width = HelveticaMetrics::new(TITLE_SIZE).width(text);
        let x = MARGIN + (USABLE_WIDTH - width).max(0.0) / 2.0;
        self.text(text, TITLE_SIZE, x, y_top, true);
    }

    fn row(&self, cells: &[String], widths: &[f32], y_top: f32, header: bool) {
        let metrics = HelveticaMetrics::new(BODY_SIZE);
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            self.cell_border(x, y_top, *width);
            let text_x = if header {
                x + (width - metrics.width(cell)).max(0.0) / 2.0
            } else {
                x + CELL_PADDING / 2.0
            };
            if !cell.is_empty() {
                self.text(cell, BODY_SIZE, text_x, y_top, header);
            }
            x += width;
        }
    }

    /// Draw a table starting at `y_top`, breaking pages and repeating the header
    fn table(&mut self, table: &ReportTable, widths: &[f32], y_top: f32) {
        let pages = layout::paginate(table.rows.len(), y_top, &GEOMETRY);
        for (index, range) in pages.into_iter().enumerate() {
            let mut y = if index == 0 {
                y_top
            } else {
                self.add_page();
                GEOMETRY.top
            };
            self.row(&table.headers, widths, y, true);
            y += ROW_HEIGHT;
            for row in &table.rows[range] {
                self.row(row, widths, y, false);
                y += ROW_HEIGHT;
            }
        }
    }

    fn save(self, path: &Path) -> Result<usize, ReportError> {
        let pages = self.pages;
        let file = File::create(path)?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;
        Ok(pages)
    }
}

/// Render the monthly report: all sensors, then non-compliant sensors on a new page
#[instrument(skip(path, summaries), fields(path = %path.display(), sensors = summaries.len()))]
pub fn write_pdf_report(
    path: &Path,
    period_label: &str,
    summaries: &[ComplianceSummary],
) -> Result<(), ReportError> {
    let metrics = HelveticaMetrics::new(BODY_SIZE);
    let title = format!("Sensor Report: {period_label}");
    let mut report = PdfReport::new(&title)?;

    // Title row, then a blank row before the table
    report.title(&title, MARGIN);
    let table_top = MARGIN + 2.0 * ROW_HEIGHT;

    let full = table::full_table(summaries);
    let widths = layout::column_widths(
        &metrics,
        &full.headers,
        &full.rows,
        USABLE_WIDTH,
        CELL_PADDING,
        None,
    );
    report.table(&full, &widths, table_top);

    let non_compliant = table::non_compliant_table(summaries);
    if !non_compliant.is_empty() {
        report.add_page();
        report.title("Non-Compliant Sensors Report", MARGIN);
        let widths = layout::column_widths(
            &metrics,
            &non_compliant.headers,
            &non_compliant.rows,
            USABLE_WIDTH,
            CELL_PADDING,
            Some(REMARKS_WIDTH),
        );
        report.table(&non_compliant, &widths, table_top);
    } else {
        debug!("All sensors compliant, skipping non-compliant table");
    }

    let pages = report.save(path)?;
    info!("PDF saved successfully: {} ({} pages)", path.display(), pages);
    Ok(())
}
