use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::pole::mapper::error::{Result, ToolError};
use crate::pole::mapper::projection::WorkbookData;

/// Writes the provided workbook data to the given path. Each table's labels
/// go to its header row and the data to the rows from `data_start_row` on.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in &workbook.tables {
        if table.header_row == 0 || table.data_start_row <= table.header_row {
            return Err(ToolError::InvalidWorkbook(format!(
                "sheet '{}' places data (row {}) before its header (row {})",
                table.sheet_name, table.data_start_row, table.header_row
            )));
        }
        let header_row = (table.header_row - 1) as u32;
        let data_row = (table.data_start_row - 1) as u32;

        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, col_idx as u16, header, &header_format)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                worksheet.write_string(data_row + row_idx as u32, col_idx as u16, cell)?;
            }
        }
    }

    workbook_writer.save(path)?;
    Ok(())
}
