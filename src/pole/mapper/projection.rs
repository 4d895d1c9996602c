use std::collections::HashSet;

use crate::pole::mapper::config::{ColumnMapping, Configuration};
use crate::pole::mapper::measure::{format_measurement, format_span_length};
use crate::pole::mapper::model::{Category, CellValue, NormalizedModel, PoleRecord, field};
use crate::pole::mapper::report::Report;

/// Sheet name storing the issues of a run.
pub const REPORT_SHEET: &str = "Report";

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based row the column labels are written to.
    pub header_row: usize,
    /// 1-based row of the first data line.
    pub data_start_row: usize,
}

/// Represents all tables required to materialise the output workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Projects the model and its report into the output workbook: the consumer
/// sheet first, the issue list second.
pub fn build_workbook(
    model: &NormalizedModel,
    config: &Configuration,
    report: &Report,
) -> WorkbookData {
    let mut sheet_names = SheetNameRegistry::default();
    let mut consumers = project(model, config);
    consumers.sheet_name = sheet_names.assign(&consumers.sheet_name);
    let mut issues = report_table(report);
    issues.sheet_name = sheet_names.assign(&issues.sheet_name);

    WorkbookData {
        tables: vec![consumers, issues],
    }
}

/// Maps every output record back onto the template columns named by the
/// configured column mappings. Columns follow mapping order; a label used by
/// several mappings becomes one column filled by the first mapping with a
/// value.
pub fn project(model: &NormalizedModel, config: &Configuration) -> SheetTable {
    let mut columns: Vec<(String, Vec<&ColumnMapping>)> = Vec::new();
    for mapping in &config.column_mappings {
        match columns
            .iter_mut()
            .find(|(label, _)| *label == mapping.label)
        {
            Some((_, mappings)) => mappings.push(mapping),
            None => columns.push((mapping.label.clone(), vec![mapping])),
        }
    }

    let rows = model
        .records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|(_, mappings)| {
                    mappings
                        .iter()
                        .map(|mapping| cell(record, mapping, config))
                        .find(|value| !value.is_empty())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    SheetTable {
        sheet_name: config.output_settings.worksheet_name.clone(),
        columns: columns.into_iter().map(|(label, _)| label).collect(),
        rows,
        header_row: config.output_settings.header_row,
        data_start_row: config.output_settings.data_start_row,
    }
}

/// One row per issue.
pub fn report_table(report: &Report) -> SheetTable {
    let rows = report
        .issues
        .iter()
        .map(|issue| {
            vec![
                issue.severity.to_string(),
                format!("{:?}", issue.kind),
                issue.row.map(|row| row.to_string()).unwrap_or_default(),
                issue.pole.clone().unwrap_or_default(),
                issue.message.clone(),
            ]
        })
        .collect();

    SheetTable {
        sheet_name: REPORT_SHEET.to_string(),
        columns: ["Severity", "Kind", "Row", "Pole", "Message"]
            .into_iter()
            .map(String::from)
            .collect(),
        rows,
        header_row: 1,
        data_start_row: 2,
    }
}

fn cell(record: &PoleRecord, mapping: &ColumnMapping, config: &Configuration) -> String {
    let pole = &record.pole;
    let name = mapping.field.as_str();
    let text = |value: Option<&String>| value.cloned().unwrap_or_default();

    match mapping.category.as_str() {
        Category::SYSTEM if name == field::LINE_NUMBER => record.line_number.to_string(),
        Category::SYSTEM => pole
            .system
            .get(name)
            .map(|value| value.as_text())
            .unwrap_or_default(),
        Category::POLE => match name {
            field::NUMBER => pole.id.clone(),
            field::TAG => text(pole.tag.as_ref()),
            field::LATITUDE => pole.latitude.map(|value| value.to_string()).unwrap_or_default(),
            field::LONGITUDE => pole.longitude.map(|value| value.to_string()).unwrap_or_default(),
            field::ADDRESS => text(pole.address.as_ref()),
            field::HEIGHT_CLASS => text(pole.height_class.as_ref()),
            field::MR_NOTES => text(pole.mr_notes.as_ref()),
            field::ALL_COMM_HEIGHTS => text(pole.comm_heights.as_ref()),
            field::TOTAL_COMM_COUNT if pole.comm_count > 0 => pole.comm_count.to_string(),
            field::TOTAL_COMM_COUNT => String::new(),
            field::EXISTING_RISERS => pole.existing_risers.to_string(),
            field::TO_POLE => record
                .span
                .as_ref()
                .map(|span| span.to.clone())
                .unwrap_or_default(),
            _ => pole
                .properties
                .get(name)
                .map(|value| value.as_text())
                .unwrap_or_default(),
        },
        Category::SPAN => {
            let span = record.span.as_ref();
            match name {
                field::LENGTH => span
                    .and_then(|span| span.length)
                    .map(format_span_length)
                    .unwrap_or_default(),
                field::REFERENCE_LENGTH => span
                    .and_then(|span| span.reference_length)
                    .map(format_span_length)
                    .unwrap_or_default(),
                _ => pole
                    .properties
                    .get(&format!("Span {name}"))
                    .map(|value| value.as_text())
                    .unwrap_or_default(),
            }
        }
        Category::NEW_GUY => match pole.attachment(Category::NEW_GUY, name) {
            Some(value) if !value.is_empty() => value.as_text(),
            _ => guy_from_notes(record, name),
        },
        category => pole
            .attachment(category, name)
            .map(|value| measurement(value, name, config))
            .unwrap_or_default(),
    }
}

/// Guy data parsed from the make-ready notes.
fn guy_from_notes(record: &PoleRecord, name: &str) -> String {
    let Some(guy) = record.pole.guys.first() else {
        return String::new();
    };
    match name {
        "Lead" => guy.lead.clone(),
        "Direction" => guy.direction.clone(),
        "Size" => guy.size.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Formats height fields as `F' I"` or decimal feet; other values and text
/// that is not a height pass through.
fn measurement(value: &CellValue, name: &str, config: &Configuration) -> String {
    if !is_height_field(name) {
        return value.as_text();
    }
    format_measurement(value, config.decimal_measurements).unwrap_or_else(|| value.as_text())
}

fn is_height_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("height") || lower.contains("midspan") || lower == "ht" || lower.ends_with(" ht")
}

#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let max_len = 31 - suffix.len();
            let prefix: String = base.chars().take(max_len).collect();
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replaces characters Excel rejects in sheet names and caps the length at
/// 31 characters.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "Sheet".to_string();
    }
    sanitized.chars().take(31).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pole::mapper::model::{GuyAttachment, Pole, RouteSource, Span};
    use crate::pole::mapper::report::IssueKind;

    fn model() -> NormalizedModel {
        let mut first = Pole::new("1");
        first.address = Some("12 Main St".into());
        first.insert_attachment(
            Category::from("Power"),
            "Lowest Height".into(),
            CellValue::text("28'-6\""),
        );
        first.insert_attachment(
            Category::from("Comcast"),
            "Attachment Ht".into(),
            CellValue::text("to be removed"),
        );
        first.guys.push(GuyAttachment {
            lead: "10'".into(),
            direction: "W".into(),
            size: None,
        });
        let second = Pole::new("2");

        NormalizedModel {
            records: vec![
                PoleRecord {
                    line_number: 1,
                    pole: first,
                    span: Some(Span {
                        from: "1".into(),
                        to: "2".into(),
                        length: Some(52.4),
                        reference_length: None,
                        within_tolerance: true,
                    }),
                },
                PoleRecord {
                    line_number: 2,
                    pole: second,
                    span: None,
                },
            ],
            route_source: RouteSource::Positional,
        }
    }

    fn column<'t>(table: &'t SheetTable, label: &str) -> Vec<&'t str> {
        let idx = table
            .columns
            .iter()
            .position(|column| column == label)
            .expect("column present");
        table.rows.iter().map(|row| row[idx].as_str()).collect()
    }

    #[test]
    fn columns_follow_mapping_labels() {
        let config = Configuration::default();
        let table = project(&model(), &config);

        assert_eq!(table.sheet_name, "Consumers pg1");
        assert_eq!(table.columns[0], "Line No.");
        assert_eq!(table.columns.len(), config.column_mappings.len());
        assert_eq!(table.header_row, 3);
        assert_eq!(table.data_start_row, 4);
        assert_eq!(column(&table, "Line No."), vec!["1", "2"]);
        assert_eq!(column(&table, "Pole"), vec!["1", "2"]);
        assert_eq!(column(&table, "To Pole"), vec!["2", ""]);
        assert_eq!(
            column(&table, "Pole to Pole Span Length (from starting point)"),
            vec!["52'", ""]
        );
    }

    #[test]
    fn heights_are_formatted() {
        let mut config = Configuration::default();
        let label = "Secondary or Neutral Power Height (Height of Lowest Power Conductor or Equipment, excluding streetlights)";

        let table = project(&model(), &config);
        assert_eq!(column(&table, label)[0], "28' 6\"");
        assert_eq!(column(&table, "Comcast")[0], "to be removed");

        config.decimal_measurements = true;
        let table = project(&model(), &config);
        assert_eq!(column(&table, label)[0], "28.50");
    }

    #[test]
    fn numeric_heights_are_inches() {
        let mut config = Configuration::default();
        let label = "Secondary or Neutral Power Height (Height of Lowest Power Conductor or Equipment, excluding streetlights)";
        let mut model = model();
        model.records[0].pole.insert_attachment(
            Category::from("Power"),
            "Lowest Height".into(),
            CellValue::Number(342.0),
        );

        let table = project(&model, &config);
        assert_eq!(column(&table, label)[0], "28' 6\"");

        config.decimal_measurements = true;
        let table = project(&model, &config);
        assert_eq!(column(&table, label)[0], "28.50");
    }

    #[test]
    fn pole_summaries_fill_their_columns() {
        let mut config = Configuration::default();
        config.column_mappings = vec![
            ColumnMapping::new("Pole", "All Comm Heights", "Comm Heights"),
            ColumnMapping::new("Pole", "Total Comm Count", "Comm Count"),
            ColumnMapping::new("Pole", "Number of Existing Risers", "Risers"),
        ];
        let mut model = model();
        let pole = &mut model.records[0].pole;
        pole.comm_heights = Some("21' 3\" (Comcast); 20' 0\" (comm)".into());
        pole.comm_count = 2;
        pole.existing_risers = 1;

        let table = project(&model, &config);
        assert_eq!(
            column(&table, "Comm Heights"),
            vec!["21' 3\" (Comcast); 20' 0\" (comm)", ""]
        );
        assert_eq!(column(&table, "Comm Count"), vec!["2", ""]);
        assert_eq!(column(&table, "Risers"), vec!["1", "0"]);
    }

    #[test]
    fn guy_columns_fall_back_to_notes() {
        let table = project(&model(), &Configuration::default());
        assert_eq!(column(&table, "Guy Lead"), vec!["10'", ""]);
        assert_eq!(column(&table, "Guy Direction"), vec!["W", ""]);
    }

    #[test]
    fn shared_labels_become_one_column() {
        let mut config = Configuration::default();
        config.column_mappings = vec![
            ColumnMapping::new("Pole", "Tag", "Pole"),
            ColumnMapping::new("Pole", "Number", "Pole"),
        ];
        let table = project(&model(), &config);
        assert_eq!(table.columns, vec!["Pole"]);
        assert_eq!(column(&table, "Pole"), vec!["1", "2"]);
    }

    #[test]
    fn workbook_has_unique_sheet_names() {
        let mut config = Configuration::default();
        config.output_settings.worksheet_name = "Report".into();
        let mut report = Report::new();
        report.pole(IssueKind::UnresolvedLink, "1", "To Pole 9 is not a surveyed pole");

        let workbook = build_workbook(&model(), &config, &report);
        let names: Vec<&str> = workbook
            .tables
            .iter()
            .map(|table| table.sheet_name.as_str())
            .collect();
        assert_eq!(names, vec!["Report", "Report_1"]);
        assert_eq!(workbook.tables[1].rows[0][1], "UnresolvedLink");
        assert_eq!(workbook.tables[1].rows[0][3], "1");
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sanitize_sheet_name("Poles: A/B"), "Poles_ A_B");
        assert_eq!(sanitize_sheet_name("  "), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
    }
}
