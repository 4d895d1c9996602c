use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::pole::mapper::attachments::{Observations, summarize};
use crate::pole::mapper::classify::IDENTIFIER_FIELDS;
use crate::pole::mapper::config::Configuration;
use crate::pole::mapper::measure::parse_feet;
use crate::pole::mapper::model::{Category, ClassifiedField, GuyAttachment, Pole, SpanRecord, field};
use crate::pole::mapper::notes::extract_guys;
use crate::pole::mapper::report::{IssueKind, Report};
use crate::pole::mapper::scid::{ScidSortKey, normalize_scid};

/// Merges classified fields into one [`Pole`] per identifier.
///
/// Rows sharing an id are unioned; later rows overwrite earlier values of
/// the same `(category, field)`. Generic comm attachments collected from all
/// rows of a pole receive their `comm<k>` slots once the pole is complete.
/// Rows without an identifier are skipped, as are poles matched by the SCID
/// ignore list.
pub fn aggregate(
    fields: &[ClassifiedField],
    config: &Configuration,
    report: &mut Report,
) -> Vec<Pole> {
    let mut poles: Vec<Pole> = Vec::new();
    let mut observed: Vec<Observations> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut ignored: HashSet<String> = HashSet::new();

    for (row, row_fields) in group_by_row(fields) {
        let Some(raw_id) = identifier(&row_fields) else {
            debug!(row, "row without identifier skipped");
            continue;
        };
        let id = normalize_scid(&raw_id);
        if id.is_empty() {
            report.row(
                IssueKind::UnmappedRow,
                row,
                format!("pole identifier '{raw_id}' is blank after normalization; skipped"),
            );
            continue;
        }
        if config.is_ignored_scid(&id) {
            if ignored.insert(id.clone()) {
                report.pole(IssueKind::IgnoredPole, &id, "pole matches the SCID ignore list");
            }
            continue;
        }

        let slot = *index.entry(id.clone()).or_insert_with(|| {
            poles.push(Pole::new(id.clone()));
            observed.push(Observations::default());
            poles.len() - 1
        });
        let pole = &mut poles[slot];
        let observations = &mut observed[slot];
        pole.rows.push(row);

        let mut span = SpanRecord {
            row,
            ..SpanRecord::default()
        };
        for classified in row_fields {
            apply(pole, &mut span, observations, classified, config, report);
        }
        merge_span(pole, span);
    }

    for (pole, observations) in poles.iter_mut().zip(observed) {
        summarize(pole, observations, config, report);
    }

    if config.processing_options.sort_by_scid {
        poles.sort_by_key(|pole| ScidSortKey::new(&pole.id));
    }

    debug!(poles = poles.len(), ignored = ignored.len(), "poles aggregated");
    poles
}

/// Groups fields by source row, rows in order of first appearance.
fn group_by_row(fields: &[ClassifiedField]) -> Vec<(usize, Vec<&ClassifiedField>)> {
    let mut groups: Vec<(usize, Vec<&ClassifiedField>)> = Vec::new();
    let mut index: HashMap<usize, usize> = HashMap::new();
    for classified in fields {
        let slot = *index.entry(classified.row).or_insert_with(|| {
            groups.push((classified.row, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(classified);
    }
    groups
}

fn identifier(row_fields: &[&ClassifiedField]) -> Option<String> {
    IDENTIFIER_FIELDS.iter().find_map(|name| {
        row_fields
            .iter()
            .find(|classified| {
                classified.category.is(Category::POLE)
                    && classified.field == *name
                    && !classified.value.is_empty()
            })
            .map(|classified| classified.value.as_text())
    })
}

fn apply(
    pole: &mut Pole,
    span: &mut SpanRecord,
    observations: &mut Observations,
    classified: &ClassifiedField,
    config: &Configuration,
    report: &mut Report,
) {
    let value = &classified.value;
    let name = classified.field.as_str();

    match classified.category.as_str() {
        Category::POLE => match name {
            field::NUMBER => {}
            field::TAG => pole.tag = Some(value.as_text()),
            field::LATITUDE => {
                if let Some(latitude) = coordinate(classified, report) {
                    pole.latitude = Some(latitude);
                }
            }
            field::LONGITUDE => {
                if let Some(longitude) = coordinate(classified, report) {
                    pole.longitude = Some(longitude);
                }
            }
            field::ADDRESS => pole.address = Some(value.as_text()),
            field::HEIGHT_CLASS => pole.height_class = Some(value.as_text()),
            field::MR_NOTES => {
                let notes = value.as_text();
                for guy in extract_guys(&notes) {
                    push_guy(&mut pole.guys, guy);
                }
                pole.mr_notes = Some(notes);
            }
            field::TO_POLE => {
                let target = normalize_scid(&value.as_text());
                if !target.is_empty() {
                    span.to_pole = Some(target);
                }
            }
            _ => {
                pole.properties.insert(classified.field.clone(), value.clone());
            }
        },
        Category::SPAN => match name {
            field::LENGTH => span.length = feet(classified, report),
            field::REFERENCE_LENGTH => span.reference_length = feet(classified, report),
            _ => {
                pole.properties
                    .insert(format!("Span {}", classified.field), value.clone());
            }
        },
        Category::SYSTEM => {
            pole.system.insert(classified.field.clone(), value.clone());
        }
        _ => {
            if observations.record(classified, config) {
                pole.insert_attachment(
                    classified.category.clone(),
                    classified.field.clone(),
                    value.clone(),
                );
            }
        }
    }
}

fn coordinate(classified: &ClassifiedField, report: &mut Report) -> Option<f64> {
    let parsed = classified.value.as_f64().filter(|number| number.is_finite());
    if parsed.is_none() {
        report.row(
            IssueKind::InvalidNumber,
            classified.row,
            format!("{} '{}' is not a number", classified.field, classified.value),
        );
    }
    parsed
}

fn feet(classified: &ClassifiedField, report: &mut Report) -> Option<f64> {
    let parsed = parse_feet(&classified.value);
    if parsed.is_none() {
        report.row(
            IssueKind::InvalidNumber,
            classified.row,
            format!("span {} '{}' is not a length", classified.field, classified.value),
        );
    }
    parsed
}

/// Stores a row's span data. One record is kept per target pole and one for
/// rows without a target; later rows overwrite the values they carry.
fn merge_span(pole: &mut Pole, span: SpanRecord) {
    if span.to_pole.is_none() && span.length.is_none() && span.reference_length.is_none() {
        return;
    }
    match pole
        .spans
        .iter_mut()
        .find(|existing| existing.to_pole == span.to_pole)
    {
        Some(existing) => {
            existing.row = span.row;
            if span.length.is_some() {
                existing.length = span.length;
            }
            if span.reference_length.is_some() {
                existing.reference_length = span.reference_length;
            }
        }
        None => pole.spans.push(span),
    }
}

fn push_guy(guys: &mut Vec<GuyAttachment>, guy: GuyAttachment) {
    if !guys
        .iter()
        .any(|known| known.lead == guy.lead && known.direction == guy.direction)
    {
        guys.push(guy);
    }
}
