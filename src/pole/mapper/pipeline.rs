use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::pole::mapper::aggregate::aggregate;
use crate::pole::mapper::classify::classify_rows;
use crate::pole::mapper::config::Configuration;
use crate::pole::mapper::error::{Result, ToolError};
use crate::pole::mapper::io::excel_read;
use crate::pole::mapper::io::excel_write;
use crate::pole::mapper::io::geocode::{CsvCacheGeocoder, Geocoder, geocode_poles};
use crate::pole::mapper::model::{NormalizedModel, Pole, RawRow, Route};
use crate::pole::mapper::output::build;
use crate::pole::mapper::projection::build_workbook;
use crate::pole::mapper::report::{Issue, Report, Severity};
use crate::pole::mapper::route::reconcile;

/// Everything one processing run produces.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub poles: Vec<Pole>,
    pub route: Route,
    pub model: NormalizedModel,
    pub report: Report,
}

/// Runs classification, aggregation, route reconciliation and record
/// building over survey rows. Addresses are looked up through `geocoder`
/// when geocoding is enabled.
#[instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub fn process(rows: &[RawRow], config: &Configuration, geocoder: Option<&dyn Geocoder>) -> Outcome {
    let mut report = Report::new();

    let fields = classify_rows(rows, config, &mut report);
    debug!(fields = fields.len(), "rows classified");
    let poles = aggregate(&fields, config, &mut report);
    let route = reconcile(&poles, config, &mut report);

    let addresses = match geocoder {
        Some(geocoder) if config.processing_options.use_geocoding => {
            geocode_poles(&poles, geocoder)
        }
        _ => HashMap::new(),
    };
    let model = build(&route, &poles, &addresses);

    info!(
        poles = poles.len(),
        records = model.records.len(),
        route = %route.source,
        warnings = report.count_at_least(Severity::Warning),
        "survey processed"
    );
    Outcome {
        poles,
        route,
        model,
        report,
    }
}

/// File-level options of [`survey_to_workbook`].
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Survey sheet; the first sheet when absent.
    pub sheet: Option<String>,
    /// 1-based row of the survey column labels.
    pub header_row: usize,
    /// `latitude,longitude,address` CSV of cached lookups.
    pub geocode_cache: Option<PathBuf>,
    /// Also write the model and report as JSON to this path.
    pub json_output: Option<PathBuf>,
    /// QC workbook whose connections order and restrict the output.
    pub qc_file: Option<PathBuf>,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            header_row: 1,
            geocode_cache: None,
            json_output: None,
            qc_file: None,
        }
    }
}

/// Reads a survey workbook and writes the consumer workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display())
)]
pub fn survey_to_workbook(
    input: &Path,
    output: &Path,
    config: &Configuration,
    options: &FileOptions,
) -> Result<Outcome> {
    if !input.exists() {
        return Err(ToolError::MissingInput(input.to_path_buf()));
    }

    let survey = excel_read::read_survey(input, options.sheet.as_deref(), options.header_row)?;
    info!(sheet = %survey.sheet_name, rows = survey.rows.len(), "read survey rows");

    let mut config = config.clone();
    if let Some(path) = &options.qc_file {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.clone()));
        }
        config.qc_connections = excel_read::read_qc_connections(path)?;
        config.processing_options.use_qc_routing = true;
        info!(connections = config.qc_connections.len(), "read QC connections");
    }

    let geocoder = match &options.geocode_cache {
        Some(path) => Some(CsvCacheGeocoder::from_path(path)?),
        None => None,
    };
    let outcome = process(
        &survey.rows,
        &config,
        geocoder.as_ref().map(|cache| cache as &dyn Geocoder),
    );

    let workbook = build_workbook(&outcome.model, &config, &outcome.report);
    debug!(sheet_count = workbook.tables.len(), "workbook constructed");
    excel_write::write_workbook(output, &workbook)?;

    if let Some(path) = &options.json_output {
        write_json(path, &outcome)?;
    }
    Ok(outcome)
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(flatten)]
    model: &'a NormalizedModel,
    issues: &'a [Issue],
}

/// Writes the normalized model and its issues as pretty-printed JSON.
pub fn write_json(path: &Path, outcome: &Outcome) -> Result<()> {
    let document = JsonDocument {
        model: &outcome.model,
        issues: &outcome.report.issues,
    };
    let json_string = serde_json::to_string_pretty(&document)?;
    fs::write(path, json_string)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pole::mapper::config::ColumnMapping;
    use crate::pole::mapper::model::RouteSource;

    struct FixedGeocoder;

    impl Geocoder for FixedGeocoder {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            Some("1 Geocoded Way".into())
        }
    }

    fn config() -> Configuration {
        let mut config = Configuration::default();
        config.column_mappings.extend([
            ColumnMapping::new("Pole", "Latitude", "Latitude"),
            ColumnMapping::new("Pole", "Longitude", "Longitude"),
        ]);
        config
    }

    #[test]
    fn rows_flow_through_every_stage() {
        let rows = vec![
            RawRow::new(2)
                .with("Pole", "001")
                .with("Latitude", 42.25)
                .with("Longitude", -85.5)
                .with("Pole to Pole Span Length (from starting point)", "120'"),
            RawRow::new(3).with("Pole", "002").with("CATV", "18' 2\""),
        ];
        let outcome = process(&rows, &config(), Some(&FixedGeocoder));

        assert_eq!(outcome.model.pole_ids(), vec!["1", "2"]);
        assert_eq!(outcome.route.source, RouteSource::Positional);
        assert_eq!(outcome.route.spans[0].length, Some(120.0));
        assert_eq!(
            outcome.model.records[0].pole.address.as_deref(),
            Some("1 Geocoded Way")
        );
        assert!(outcome.poles[1].attachment("comm1", "Attachment Ht").is_some());
    }

    #[test]
    fn geocoding_can_be_disabled() {
        let rows = vec![
            RawRow::new(2)
                .with("Pole", "1")
                .with("Latitude", 42.25)
                .with("Longitude", -85.5),
        ];
        let mut config = config();
        config.processing_options.use_geocoding = false;
        let outcome = process(&rows, &config, Some(&FixedGeocoder));
        assert_eq!(outcome.model.records[0].pole.address, None);
    }

    #[test]
    fn missing_input_is_reported() {
        let result = survey_to_workbook(
            Path::new("/nonexistent/survey.xlsx"),
            Path::new("/nonexistent/out.xlsx"),
            &Configuration::default(),
            &FileOptions::default(),
        );
        assert!(matches!(result, Err(ToolError::MissingInput(_))));
    }
}
