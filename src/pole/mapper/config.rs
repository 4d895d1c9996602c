use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pole::mapper::error::{Result, ToolError};
use crate::pole::mapper::model::{Category, QcConnection, normalize_label};

/// Settings for one utility company. A configuration is immutable for the
/// duration of a run and is passed explicitly to every stage, so datasets of
/// different companies can be processed side by side.
///
/// Keys missing from a configuration file fall back to [`Configuration::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Owner of the poles; street lights are only taken from its rows.
    pub power_company: String,
    /// Provider categories, in tie-break order.
    pub telecom_providers: Vec<String>,
    pub power_keywords: Vec<String>,
    pub comm_keywords: Vec<String>,
    pub ignore_scid_keywords: Vec<String>,
    /// Provider → keyword aliases.
    pub telecom_keywords: BTreeMap<String, Vec<String>>,
    /// Order in which keyword classes are tried on unmapped cells.
    pub keyword_priority: Vec<KeywordClass>,
    pub output_settings: OutputSettings,
    pub processing_options: ProcessingOptions,
    pub manual_routes_options: ManualRoutesOptions,
    pub column_mappings: Vec<ColumnMapping>,
    /// Render heights as decimal feet instead of `F' I"`.
    pub decimal_measurements: bool,
    /// Connections loaded from a QC workbook for this run.
    #[serde(skip)]
    pub qc_connections: Vec<QcConnection>,
}

/// Keyword class used by the row classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordClass {
    Telecom,
    Power,
    Comm,
}

/// Placement of the data inside the output template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// 1-based row holding the template headers.
    pub header_row: usize,
    /// 1-based row of the first data line.
    pub data_start_row: usize,
    pub worksheet_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            header_row: 3,
            data_start_row: 4,
            worksheet_name: "Consumers pg1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub use_geocoding: bool,
    /// Allowed difference, in feet, between recorded and reference span lengths.
    pub span_length_tolerance: f64,
    /// Order poles by numeric SCID instead of first appearance.
    pub sort_by_scid: bool,
    /// Number of generic `comm<k>` slots per pole.
    pub comm_slot_count: usize,
    /// Restrict and order the output by the loaded QC connections.
    pub use_qc_routing: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            use_geocoding: true,
            span_length_tolerance: 3.0,
            sort_by_scid: false,
            comm_slot_count: 4,
            use_qc_routing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualRoutesOptions {
    pub use_manual_routes: bool,
    /// Discard "To Pole" data for poles the manual routes do not cover.
    pub clear_existing_routes: bool,
    /// Route text: one route per line or `;`-separated, pole ids `,`-separated.
    pub routes: String,
}

/// Binds a source column label to a `(category, field)` pair. Serialized as a
/// `[category, field, label]` array; the same triple maps the field back onto
/// the output template column of that label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct ColumnMapping {
    pub category: Category,
    pub field: String,
    pub label: String,
    normalized_label: String,
}

impl ColumnMapping {
    pub fn new(category: &str, field: &str, label: &str) -> Self {
        Self {
            category: Category::from(category),
            field: field.to_string(),
            label: label.to_string(),
            normalized_label: normalize_label(label),
        }
    }

    /// Label normalized with [`normalize_label`].
    pub fn normalized_label(&self) -> &str {
        &self.normalized_label
    }
}

impl From<(String, String, String)> for ColumnMapping {
    fn from((category, field, label): (String, String, String)) -> Self {
        Self::new(&category, &field, &label)
    }
}

impl From<ColumnMapping> for (String, String, String) {
    fn from(mapping: ColumnMapping) -> Self {
        (mapping.category.as_str().to_string(), mapping.field, mapping.label)
    }
}

impl Configuration {
    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Configuration = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let tolerance = self.processing_options.span_length_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ToolError::InvalidConfig(format!(
                "span_length_tolerance must be a non-negative number, got {tolerance}"
            )));
        }

        if self.processing_options.comm_slot_count == 0 {
            return Err(ToolError::InvalidConfig(
                "comm_slot_count must be at least 1".into(),
            ));
        }

        let output = &self.output_settings;
        if output.header_row == 0 || output.data_start_row <= output.header_row {
            return Err(ToolError::InvalidConfig(format!(
                "data_start_row ({}) must follow header_row ({})",
                output.data_start_row, output.header_row
            )));
        }

        for mapping in &self.column_mappings {
            if mapping.category.as_str().trim().is_empty()
                || mapping.field.trim().is_empty()
                || mapping.normalized_label.is_empty()
            {
                return Err(ToolError::InvalidConfig(format!(
                    "incomplete column mapping [{:?}, {:?}, {:?}]",
                    mapping.category.as_str(),
                    mapping.field,
                    mapping.label
                )));
            }
        }

        for provider in self.telecom_keywords.keys() {
            if !self.telecom_providers.contains(provider) {
                warn!(%provider, "telecom keywords configured for an unlisted provider");
            }
        }

        Ok(())
    }

    pub fn span_length_tolerance(&self) -> f64 {
        self.processing_options.span_length_tolerance
    }

    /// Providers with their keyword aliases, in configured tie-break order.
    /// Providers without aliases are matched on their own name.
    pub fn provider_keywords(&self) -> impl Iterator<Item = (&str, Vec<&str>)> {
        self.telecom_providers.iter().map(|provider| {
            let keywords = match self.telecom_keywords.get(provider) {
                Some(aliases) if !aliases.is_empty() => {
                    aliases.iter().map(String::as_str).collect()
                }
                _ => vec![provider.as_str()],
            };
            (provider.as_str(), keywords)
        })
    }

    /// Keyword classes in classification order. Classes left out of
    /// `keyword_priority` are still tried, after the listed ones.
    pub fn keyword_order(&self) -> Vec<KeywordClass> {
        let mut order: Vec<KeywordClass> = Vec::new();
        let defaults = [KeywordClass::Telecom, KeywordClass::Power, KeywordClass::Comm];
        for class in self.keyword_priority.iter().chain(defaults.iter()) {
            if !order.contains(class) {
                order.push(*class);
            }
        }
        order
    }

    /// Whether a pole id is excluded by the SCID ignore list
    /// (case-insensitive substring match).
    pub fn is_ignored_scid(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        self.ignore_scid_keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .any(|keyword| !keyword.is_empty() && id.contains(&keyword))
    }

    /// First mapping for the given category and field.
    pub fn mapping_for(&self, category: &str, field: &str) -> Option<&ColumnMapping> {
        self.column_mappings
            .iter()
            .find(|mapping| mapping.category.is(category) && mapping.field == field)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|item| item.to_string()).collect()
        }

        let telecom_keywords = [
            ("Proposed MetroNet", &["MetroNet", "MNT", "Proposed MNT"][..]),
            ("AT&T", &["AT&T", "ATT"][..]),
            ("Verizon", &["verizon", "Verizon"][..]),
            ("Comcast", &["comcast", "Comcast"][..]),
            ("Lightower", &["lightower", "Lightower"][..]),
            ("Zayo", &["zayo", "Zayo"][..]),
            ("Jackson ISD", &["JACKSON ISD"][..]),
        ]
        .into_iter()
        .map(|(provider, keywords)| (provider.to_string(), strings(keywords)))
        .collect();

        let column_mappings = [
            ("System", "Line Number", "Line No."),
            ("Pole", "Number", "Pole"),
            ("Pole", "Address", "Pole Address (if available)"),
            ("Pole", "Height & Class", "Pole Height & Class"),
            (
                "Power",
                "Lowest Height",
                "Secondary or Neutral Power Height (Height of Lowest Power Conductor or Equipment, excluding streetlights)",
            ),
            ("Street Light", "Lowest Height", "Streetlight"),
            ("Pole", "To Pole", "To Pole"),
            ("Span", "Length", "Pole to Pole Span Length (from starting point)"),
            ("New Guy", "Lead", "Guy Lead"),
            ("New Guy", "Direction", "Guy Direction"),
            ("New Guy", "Size", "Guy Size"),
            (
                "Pole",
                "MR Notes",
                "Notes (Items that need to be performed by Consumers Energy or other Companies)",
            ),
            ("Proposed MetroNet", "Attachment Ht", "Proposed height of new attachment point"),
            (
                "Proposed MetroNet",
                "Midspan Ht",
                "Final Mid Span Ground Clearance of Proposed Attachment",
            ),
            ("Verizon", "Attachment Ht", "Verizon"),
            ("Zayo", "Midspan Ht", "Zayo"),
            ("AT&T", "Attachment Ht", "AT&T"),
            ("Jackson ISD", "Attachment Ht", "Jackson ISD"),
            ("Comcast", "Attachment Ht", "Comcast"),
            ("Proposed MetroNet", "Tension", "Heavy Loaded Tension (NESC Rule 251)"),
        ]
        .into_iter()
        .map(|(category, field, label)| ColumnMapping::new(category, field, label))
        .collect();

        Self {
            power_company: "CONSUMERS ENERGY".to_string(),
            telecom_providers: strings(&[
                "Proposed MetroNet",
                "Lightower",
                "Comcast",
                "Verizon",
                "AT&T",
                "Zayo",
                "Jackson ISD",
            ]),
            power_keywords: strings(&[
                "Primary",
                "Secondary",
                "Neutral",
                "Secondary Drip Loop",
                "Riser",
                "Transformer",
            ]),
            comm_keywords: strings(&[
                "catv com",
                "telco com",
                "fiber optic com",
                "insulator",
                "power guy",
                "catv",
                "telco",
                "fiber",
                "communication",
                "comm",
            ]),
            ignore_scid_keywords: strings(&["AT&T", "Unknown", "POLE", "FOREIGN"]),
            telecom_keywords,
            keyword_priority: vec![KeywordClass::Telecom, KeywordClass::Power, KeywordClass::Comm],
            output_settings: OutputSettings::default(),
            processing_options: ProcessingOptions::default(),
            manual_routes_options: ManualRoutesOptions::default(),
            column_mappings,
            decimal_measurements: false,
            qc_connections: Vec::new(),
        }
    }
}
