use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::services::crosstab::{CrosstabTable, Statistic, TableSet};

pub const EXPORT_FILENAME: &str = "tabelas.xlsx";
const SHEET_NAME: &str = "Tabelas";
const HIGHLIGHT: u32 = 0xFDE68A;
const MIN_WIDTH: f64 = 12.0;
const MAX_WIDTH: f64 = 45.0;

/// Which edges of a cell lie on the outline of its block.
#[derive(Debug, Clone, Copy, Default)]
struct Edges {
    top: bool,
    bottom: bool,
    left: bool,
    right: bool,
}

impl Edges {
    fn all() -> Self {
        Edges { top: true, bottom: true, left: true, right: true }
    }
}

fn bordered(base: &Format, edges: Edges) -> Format {
    let side = |outline: bool| if outline { FormatBorder::Medium } else { FormatBorder::Thin };
    base.clone()
        .set_border_top(side(edges.top))
        .set_border_bottom(side(edges.bottom))
        .set_border_left(side(edges.left))
        .set_border_right(side(edges.right))
        .set_border_color(Color::Black)
}

struct Styles {
    title: Format,
    header: Format,
    row_label: Format,
    cell: Format,
    flagged: Format,
}

impl Styles {
    fn new() -> Self {
        let cell = Format::new()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::Top)
            .set_text_wrap();
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            row_label: Format::new()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            flagged: cell.clone().set_background_color(Color::RGB(HIGHLIGHT)),
            cell,
        }
    }

    /// Only the adjusted residual line of a flagged cell is highlighted.
    fn for_line(&self, text: &str, flagged: bool) -> &Format {
        let adjusted = text
            .strip_prefix(Statistic::AdjStdResid.display_name())
            .map_or(false, |rest| rest.starts_with(':'));
        if flagged && adjusted {
            &self.flagged
        } else {
            &self.cell
        }
    }
}

/// Renders every table, one below the other, into a single worksheet and
/// returns the `.xlsx` bytes.
pub fn export_tables(tables: &TableSet) -> Result<Vec<u8>, AppError> {
    if tables.is_empty() {
        return Err(AppError::Export("No tables generated yet".to_string()));
    }
    let start = std::time::Instant::now();

    let mut workbook = Workbook::new();
    let styles = Styles::new();
    let mut widths: Vec<usize> = Vec::new();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        let mut row_cursor: u32 = 0;
        for (_, table) in tables.iter() {
            row_cursor = write_table(worksheet, &styles, table, row_cursor, &mut widths)?;
            row_cursor += 1;
        }

        for (col, max_len) in widths.iter().enumerate() {
            let width = (*max_len as f64 * 0.95).floor().clamp(MIN_WIDTH, MAX_WIDTH);
            worksheet.set_column_width(col as u16, width)?;
        }
    }

    let buffer = workbook.save_to_buffer()?;
    tracing::info!(
        "Exported {} table(s), {}KB, in {:?}",
        tables.len(),
        buffer.len() / 1024,
        start.elapsed()
    );
    Ok(buffer)
}

/// Writes one table starting at `first_row` and returns the row after it.
fn write_table(
    worksheet: &mut Worksheet,
    styles: &Styles,
    table: &CrosstabTable,
    first_row: u32,
    widths: &mut Vec<usize>,
) -> Result<u32, XlsxError> {
    let ncols = table.column_labels.len() as u16;
    let last_col = ncols;
    if widths.len() < usize::from(last_col) + 1 {
        widths.resize(usize::from(last_col) + 1, 0);
    }
    let mut track = |col: u16, text: &str| {
        let len = text.chars().count();
        let slot = &mut widths[usize::from(col)];
        *slot = (*slot).max(len);
    };

    // Title, merged across the label column and every data column.
    worksheet.merge_range(
        first_row,
        0,
        first_row,
        last_col,
        &table.title,
        &bordered(&styles.title, Edges::all()),
    )?;

    let header_row = first_row + 1;
    for col in 0..=last_col {
        let edges = Edges { top: true, bottom: true, left: col == 0, right: col == last_col };
        let format = bordered(&styles.header, edges);
        if col == 0 {
            worksheet.write_blank(header_row, col, &format)?;
        } else {
            let label = &table.column_labels[usize::from(col - 1)];
            worksheet.write_string_with_format(header_row, col, label, &format)?;
            track(col, label);
        }
    }

    let mut row_cursor = header_row + 1;
    for (i, label) in table.row_labels.iter().enumerate() {
        let cells = &table.data[i];
        let height = cells.iter().map(Vec::len).max().unwrap_or(1).max(1) as u32;
        let block_start = row_cursor;
        let block_end = row_cursor + height - 1;

        let label_edges = Edges { top: true, bottom: true, left: true, right: last_col == 0 };
        let label_format = bordered(&styles.row_label, label_edges);
        if height > 1 {
            worksheet.merge_range(block_start, 0, block_end, 0, label, &label_format)?;
        } else {
            worksheet.write_string_with_format(block_start, 0, label, &label_format)?;
        }
        track(0, label);

        for (j, lines) in cells.iter().enumerate() {
            let col = j as u16 + 1;
            let flagged = table.flags[i][j];
            for k in 0..height {
                let text = lines.get(k as usize).map(String::as_str).unwrap_or("");
                let edges = Edges {
                    top: k == 0,
                    bottom: k == height - 1,
                    left: false,
                    right: col == last_col,
                };
                let format = bordered(styles.for_line(text, flagged), edges);
                if text.is_empty() {
                    worksheet.write_blank(block_start + k, col, &format)?;
                } else {
                    worksheet.write_string_with_format(block_start + k, col, text, &format)?;
                    track(col, text);
                }
            }
        }

        row_cursor = block_end + 1;
    }

    Ok(row_cursor)
}
