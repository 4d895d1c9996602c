use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::pole::mapper::error::{Result, ToolError};
use crate::pole::mapper::model::{CellValue, QcConnection, RawRow, normalize_label};
use crate::pole::mapper::scid::normalize_scid;

/// Header labels and data rows of one survey sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyTable {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Reads a survey sheet. `sheet` defaults to the first sheet of the workbook;
/// `header_row` is the 1-based row holding the column labels, every later
/// row with at least one populated cell becomes a [`RawRow`].
pub fn read_survey(path: &Path, sheet: Option<&str>, header_row: usize) -> Result<SurveyTable> {
    if header_row == 0 {
        return Err(ToolError::InvalidWorkbook(
            "header row numbers start at 1".into(),
        ));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ToolError::InvalidWorkbook("workbook has no sheets".into()))?,
    };
    let range = read_required_sheet(&mut workbook, &sheet_name)?;
    let table = survey_from_range(&range, sheet_name, header_row)?;
    debug!(
        sheet = %table.sheet_name,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "survey sheet read"
    );
    Ok(table)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn survey_from_range(
    range: &Range<DataType>,
    sheet_name: String,
    header_row: usize,
) -> Result<SurveyTable> {
    // Ranges start at the first used cell, not at A1.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let header_idx = (header_row - 1)
        .checked_sub(first_row)
        .ok_or_else(|| missing_header(&sheet_name, header_row))?;

    let mut rows = range.rows().enumerate().skip(header_idx);
    let (_, header_cells) = rows
        .next()
        .ok_or_else(|| missing_header(&sheet_name, header_row))?;
    let headers: Vec<String> = header_cells
        .iter()
        .map(|cell| cell_to_string(Some(cell)).trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(missing_header(&sheet_name, header_row));
    }

    let mut survey_rows = Vec::new();
    for (idx, cells) in rows {
        let mut row = RawRow::new(first_row + idx + 1);
        for (header, cell) in headers.iter().zip(cells) {
            row.push(header.clone(), cell_value(cell));
        }
        if !row.is_blank() {
            survey_rows.push(row);
        }
    }

    Ok(SurveyTable {
        sheet_name,
        headers,
        rows: survey_rows,
    })
}

const QC_FROM: &str = "pole";
const QC_TO: &str = "to pole";
/// 0-based rows checked for QC headers before the rest of the sheet.
const QC_HEADER_ROWS: [usize; 3] = [2, 0, 1];

/// Reads the pole-to-pole connections of a QC workbook.
///
/// Every sheet whose header row holds both a `Pole` and a `To Pole` column
/// contributes its rows in sheet order. Rows missing either id are skipped.
pub fn read_qc_connections(path: &Path) -> Result<Vec<QcConnection>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let mut connections = Vec::new();
    let mut matched = false;

    for sheet_name in workbook.sheet_names().to_vec() {
        let range = read_required_sheet(&mut workbook, &sheet_name)?;
        if let Some(found) = qc_from_range(&range, &sheet_name) {
            debug!(sheet = %sheet_name, connections = found.len(), "QC sheet read");
            matched = true;
            connections.extend(found);
        }
    }

    if !matched {
        return Err(ToolError::InvalidWorkbook(format!(
            "no sheet in {} has 'Pole' and 'To Pole' columns",
            path.display()
        )));
    }
    Ok(connections)
}

/// Connections of one sheet, or `None` when it has no QC header row.
fn qc_from_range(range: &Range<DataType>, sheet_name: &str) -> Option<Vec<QcConnection>> {
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let rows: Vec<&[DataType]> = range.rows().collect();

    let columns = |idx: usize| -> Option<(usize, usize)> {
        let labels: Vec<String> = rows
            .get(idx)?
            .iter()
            .map(|cell| normalize_label(&cell_to_string(Some(cell))))
            .collect();
        let from = labels.iter().position(|label| label == QC_FROM)?;
        let to = labels.iter().position(|label| label == QC_TO)?;
        Some((from, to))
    };

    let candidates = QC_HEADER_ROWS
        .iter()
        .filter_map(|row| row.checked_sub(first_row))
        .chain(0..rows.len());
    let (header_idx, (from_col, to_col)) = candidates
        .filter_map(|idx| columns(idx).map(|cols| (idx, cols)))
        .next()?;

    let connections = rows
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .filter_map(|(idx, cells)| {
            let from = normalize_scid(&cell_to_string(cells.get(from_col)));
            let to = normalize_scid(&cell_to_string(cells.get(to_col)));
            (!from.is_empty() && !to.is_empty()).then(|| QcConnection {
                from,
                to,
                sheet: sheet_name.to_string(),
                row: first_row + idx + 1,
            })
        })
        .collect();
    Some(connections)
}

fn missing_header(sheet: &str, header_row: usize) -> ToolError {
    ToolError::InvalidWorkbook(format!("sheet '{sheet}' has no header labels on row {header_row}"))
}

fn cell_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
