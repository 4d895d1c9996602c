use regex::Regex;
use tracing::debug;

use crate::pole::mapper::config::{Configuration, KeywordClass};
use crate::pole::mapper::model::{Category, ClassifiedField, RawRow, field, normalize_label};
use crate::pole::mapper::report::{IssueKind, Report};

/// `Pole` fields that identify a pole, in fallback order.
pub const IDENTIFIER_FIELDS: [&str; 2] = [field::NUMBER, field::TAG];

/// Field assigned when a keyword matches the column header: the cell then
/// holds the attachment height of the owner named by the header.
pub const HEADER_MATCH_FIELD: &str = field::ATTACHMENT_HT;

const STREET_KEYWORD: &str = "street";

/// Classifies every populated cell of `row`.
pub fn classify(row: &RawRow, config: &Configuration, report: &mut Report) -> Vec<ClassifiedField> {
    Classifier::new(config).classify(row, report)
}

/// Classifies a batch of rows, building the keyword tables once.
pub fn classify_rows(
    rows: &[RawRow],
    config: &Configuration,
    report: &mut Report,
) -> Vec<ClassifiedField> {
    let classifier = Classifier::new(config);
    rows.iter()
        .flat_map(|row| classifier.classify(row, report))
        .collect()
}

/// Keyword tables of one configuration, lower-cased for matching.
pub struct Classifier<'a> {
    config: &'a Configuration,
    order: Vec<KeywordClass>,
    providers: Vec<(&'a str, Vec<String>)>,
    power: Vec<String>,
    comm: Vec<String>,
    /// Whole-word match of the configured power company.
    power_company: Option<Regex>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        let providers = config
            .provider_keywords()
            .map(|(provider, keywords)| (provider, lowercase(keywords)))
            .collect();
        let company = config.power_company.trim();
        let power_company = if company.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(company))).ok()
        };

        Self {
            config,
            order: config.keyword_order(),
            providers,
            power: lowercase(config.power_keywords.iter().map(String::as_str)),
            comm: lowercase(config.comm_keywords.iter().map(String::as_str)),
            power_company,
        }
    }

    pub fn classify(&self, row: &RawRow, report: &mut Report) -> Vec<ClassifiedField> {
        let labels: Vec<String> = row
            .cells
            .iter()
            .map(|cell| normalize_label(&cell.label))
            .collect();
        let mut resolved = vec![false; row.cells.len()];
        let mut fields: Vec<ClassifiedField> = Vec::new();

        for mapping in &self.config.column_mappings {
            let hit = row.cells.iter().enumerate().find(|(idx, cell)| {
                labels[*idx] == mapping.normalized_label() && !cell.value.is_empty()
            });
            if let Some((idx, cell)) = hit {
                resolved[idx] = true;
                fields.push(ClassifiedField {
                    category: mapping.category.clone(),
                    field: mapping.field.clone(),
                    value: cell.value.clone(),
                    label: clean_label(&cell.label),
                    row: row.row,
                });
            }
        }

        let power_owned = self.power_company.as_ref().is_some_and(|company| {
            row.cells
                .iter()
                .any(|cell| company.is_match(&cell.value.as_text()))
        });

        for (idx, cell) in row.cells.iter().enumerate() {
            if resolved[idx] || cell.value.is_empty() {
                continue;
            }
            let value_text = cell.value.as_text().to_lowercase();
            let Some((category, header_hit)) = self.infer(&labels[idx], &value_text, power_owned)
            else {
                continue;
            };

            let field = if header_hit {
                header_field(&labels[idx]).to_string()
            } else {
                clean_label(&cell.label)
            };
            fields.push(ClassifiedField {
                category,
                field,
                value: cell.value.clone(),
                label: clean_label(&cell.label),
                row: row.row,
            });
        }

        let identified = fields.iter().any(|field| {
            field.category.is(Category::POLE) && IDENTIFIER_FIELDS.contains(&field.field.as_str())
        });
        if !identified {
            report.row(
                IssueKind::UnmappedRow,
                row.row,
                "row has no recognizable pole identifier; skipped",
            );
        }

        debug!(row = row.row, fields = fields.len(), "row classified");
        fields
    }

    /// Finds the category of an unmapped cell and whether the header (rather
    /// than the value) matched. Street lights of the power company come
    /// first, then keyword classes in configured order; header matches win
    /// over value matches inside a class. Generic comm cells get the pending
    /// [`Category::COMM`] and receive their slot once the pole is complete.
    fn infer(&self, label: &str, value: &str, power_owned: bool) -> Option<(Category, bool)> {
        if power_owned && (label.contains(STREET_KEYWORD) || value.contains(STREET_KEYWORD)) {
            let header_hit = label.contains(STREET_KEYWORD);
            return Some((Category::from(Category::STREET_LIGHT), header_hit));
        }

        for class in &self.order {
            match class {
                KeywordClass::Telecom => {
                    for header_hit in [true, false] {
                        let text = if header_hit { label } else { value };
                        if let Some((provider, _)) = self
                            .providers
                            .iter()
                            .find(|(_, keywords)| contains_any(text, keywords))
                        {
                            return Some((Category::from(*provider), header_hit));
                        }
                    }
                }
                KeywordClass::Power => {
                    if let Some(header_hit) = match_side(label, value, &self.power) {
                        return Some((Category::from(Category::POWER), header_hit));
                    }
                }
                KeywordClass::Comm => {
                    if let Some(header_hit) = match_side(label, value, &self.comm) {
                        return Some((Category::from(Category::COMM), header_hit));
                    }
                }
            }
        }
        None
    }
}

/// Field of a header match: midspan columns hold the clearance at midspan,
/// everything else the height on the pole.
fn header_field(label: &str) -> &'static str {
    if is_midspan_label(label) {
        field::MIDSPAN_HT
    } else {
        HEADER_MATCH_FIELD
    }
}

/// Whether a label names a midspan measurement.
pub fn is_midspan_label(label: &str) -> bool {
    let label = label.to_lowercase();
    label.contains("midspan") || label.contains("mid span") || label.contains("mid-span")
}

fn lowercase<'k>(keywords: impl IntoIterator<Item = &'k str>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn match_side(label: &str, value: &str, keywords: &[String]) -> Option<bool> {
    if contains_any(label, keywords) {
        Some(true)
    } else if contains_any(value, keywords) {
        Some(false)
    } else {
        None
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}

fn clean_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::pole::mapper::config::ColumnMapping;

    fn config() -> Configuration {
        let mut telecom_keywords = BTreeMap::new();
        telecom_keywords.insert(
            "Proposed MetroNet".to_string(),
            vec!["MNT".to_string(), "MetroNet".to_string()],
        );
        telecom_keywords.insert("Comcast".to_string(), vec!["comcast".to_string()]);
        Configuration {
            telecom_providers: vec!["Proposed MetroNet".into(), "Comcast".into()],
            telecom_keywords,
            power_keywords: vec!["Primary".into(), "Riser".into()],
            comm_keywords: vec!["comm".into(), "catv".into()],
            column_mappings: vec![
                ColumnMapping::new("Pole", "Number", "Pole"),
                ColumnMapping::new("Pole", "Tag", "Pole Tag"),
                ColumnMapping::new("Span", "Length", "Span Length (ft)"),
            ],
            ..Configuration::default()
        }
    }

    fn find<'f>(fields: &'f [ClassifiedField], category: &str) -> Vec<&'f ClassifiedField> {
        fields
            .iter()
            .filter(|field| field.category.is(category))
            .collect()
    }

    #[test]
    fn mapped_headers_tolerate_whitespace_variants() {
        let row = RawRow::new(2)
            .with(" Pole ", "P1")
            .with("Span\nLength   (ft)", 52.0);
        let mut report = Report::new();
        let fields = classify(&row, &config(), &mut report);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].category.as_str(), "Pole");
        assert_eq!(fields[0].field, "Number");
        assert_eq!(fields[1].category.as_str(), "Span");
        assert_eq!(fields[1].row, 2);
        assert!(report.is_empty());
    }

    #[test]
    fn empty_mapped_cells_are_skipped() {
        let row = RawRow::new(2).with("Pole", "P1").with("Span Length (ft)", "  ");
        let fields = classify(&row, &config(), &mut Report::new());
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn provider_keyword_beats_generic_comm() {
        let row = RawRow::new(3)
            .with("Pole", "P1")
            .with("Comm Attachment", "Proposed MNT install");
        let fields = classify(&row, &config(), &mut Report::new());

        assert_eq!(find(&fields, "Proposed MetroNet").len(), 1);
        assert!(find(&fields, "comm").is_empty());
        assert_eq!(find(&fields, "Proposed MetroNet")[0].field, "Comm Attachment");
    }

    #[test]
    fn first_configured_provider_wins_ties() {
        let row = RawRow::new(3)
            .with("Pole", "P1")
            .with("Owner", "Comcast lashed to MetroNet");
        let fields = classify(&row, &config(), &mut Report::new());
        assert_eq!(find(&fields, "Proposed MetroNet").len(), 1);
        assert!(find(&fields, "Comcast").is_empty());
    }

    #[test]
    fn header_match_uses_attachment_height_field() {
        let row = RawRow::new(3).with("Pole", "P1").with("Comcast", "18' 4\"");
        let fields = classify(&row, &config(), &mut Report::new());
        let comcast = find(&fields, "Comcast");
        assert_eq!(comcast[0].field, HEADER_MATCH_FIELD);
    }

    #[test]
    fn generic_comm_cells_wait_for_a_slot() {
        let row = RawRow::new(4)
            .with("Pole", "P1")
            .with("CATV height", "20'")
            .with("Other comm", "19' 6\"")
            .with("Comm  Midspan", "16'");
        let mut report = Report::new();
        let fields = classify(&row, &config(), &mut report);

        let comm = find(&fields, "comm");
        assert_eq!(comm.len(), 3);
        assert_eq!(comm[0].field, "Attachment Ht");
        assert_eq!(comm[0].label, "CATV height");
        assert_eq!(comm[2].field, "Midspan Ht");
        assert!(report.is_empty());
    }

    #[test]
    fn street_lights_belong_to_the_power_company() {
        let mut config = config();
        config.power_company = "Consumers Energy".into();
        let owned = RawRow::new(5)
            .with("Pole", "P1")
            .with("Company", "CONSUMERS ENERGY")
            .with("Measured", "Street Light");
        let fields = classify(&owned, &config, &mut Report::new());
        assert_eq!(find(&fields, "Street Light").len(), 1);
        assert_eq!(find(&fields, "Street Light")[0].field, "Measured");

        let foreign = RawRow::new(6)
            .with("Pole", "P1")
            .with("Company", "Consumers Energyco")
            .with("Measured", "Street Light");
        let fields = classify(&foreign, &config, &mut Report::new());
        assert!(find(&fields, "Street Light").is_empty());
    }

    #[test]
    fn keyword_priority_is_configurable() {
        let row = RawRow::new(5).with("Pole", "P1").with("Owner", "comcast riser");
        let mut config = config();
        let fields = classify(&row, &config, &mut Report::new());
        assert_eq!(find(&fields, "Comcast").len(), 1);

        config.keyword_priority = vec![KeywordClass::Power];
        let fields = classify(&row, &config, &mut Report::new());
        assert_eq!(find(&fields, "Power").len(), 1);
        assert!(find(&fields, "Comcast").is_empty());
    }

    #[test]
    fn unmatched_cells_are_ignored() {
        let row = RawRow::new(6).with("Pole", "P1").with("Latitude", 42.25);
        let fields = classify(&row, &config(), &mut Report::new());
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn tag_identifies_a_row() {
        let row = RawRow::new(7).with("Pole Tag", "T-77");
        let mut report = Report::new();
        classify(&row, &config(), &mut report);
        assert_eq!(report.count(IssueKind::UnmappedRow), 0);
    }

    #[test]
    fn row_without_identifier_is_reported() {
        let row = RawRow::new(8).with("Primary", "30'");
        let mut report = Report::new();
        let fields = classify(&row, &config(), &mut report);
        assert_eq!(find(&fields, "Power").len(), 1);
        assert_eq!(report.count(IssueKind::UnmappedRow), 1);
        assert_eq!(report.issues[0].row, Some(8));
    }
}
