//! Pole-level attachment summaries.
//!
//! Heights seen on the rows of one pole are collected while the pole is
//! aggregated and resolved once it is complete: generic comm attachments
//! take `comm<k>` slots highest first, the lowest power attachment above
//! the communication space and the lowest street light are picked, and the
//! communication heights and existing risers are totalled.

use tracing::debug;

use crate::pole::mapper::classify::is_midspan_label;
use crate::pole::mapper::config::Configuration;
use crate::pole::mapper::measure::{format_measurement, height_feet};
use crate::pole::mapper::model::{Category, CellValue, ClassifiedField, Pole, field};
use crate::pole::mapper::report::{IssueKind, Report};

const RISER_KEYWORD: &str = "riser";
const PROPOSED_PREFIX: &str = "proposed";

/// One attachment height seen on a pole.
#[derive(Debug, Clone, PartialEq)]
struct Observation {
    /// Owner shown in the communication summary.
    owner: String,
    value: CellValue,
    feet: Option<f64>,
}

impl Observation {
    fn new(owner: impl Into<String>, value: &CellValue) -> Self {
        Self {
            owner: owner.into(),
            value: value.clone(),
            feet: height_feet(value),
        }
    }
}

/// Attachment heights collected over the rows of one pole.
#[derive(Debug, Default)]
pub struct Observations {
    comm: Vec<Observation>,
    comm_midspan: Vec<Observation>,
    providers: Vec<Observation>,
    power: Vec<Observation>,
    power_midspan: Vec<Observation>,
    street_lights: Vec<Observation>,
    risers: usize,
}

impl Observations {
    /// Records an attachment field. Returns `false` for pending generic comm
    /// fields, which are only stored once a slot is assigned.
    pub fn record(&mut self, classified: &ClassifiedField, config: &Configuration) -> bool {
        let category = classified.category.as_str();
        let midspan = is_midspan_label(&classified.field);

        if is_existing_riser(classified) {
            self.risers += 1;
        }

        match category {
            Category::COMM => {
                let list = if midspan {
                    &mut self.comm_midspan
                } else {
                    &mut self.comm
                };
                let observation = Observation::new(&classified.label, &classified.value);
                if !list.contains(&observation) {
                    list.push(observation);
                }
                return false;
            }
            Category::POWER if midspan => self
                .power_midspan
                .push(Observation::new(category, &classified.value)),
            Category::POWER => self.power.push(Observation::new(category, &classified.value)),
            Category::STREET_LIGHT => self
                .street_lights
                .push(Observation::new(category, &classified.value)),
            provider if !midspan && config.telecom_providers.iter().any(|known| known == provider) => {
                self.providers.push(Observation::new(provider, &classified.value))
            }
            _ => {}
        }
        true
    }
}

/// Resolves the collected heights onto the pole.
pub fn summarize(
    pole: &mut Pole,
    observations: Observations,
    config: &Configuration,
    report: &mut Report,
) {
    let Observations {
        mut comm,
        mut comm_midspan,
        providers,
        power,
        power_midspan,
        street_lights,
        risers,
    } = observations;
    let slots = config.processing_options.comm_slot_count;

    highest_first(&mut comm);
    highest_first(&mut comm_midspan);
    assign_slots(pole, &comm, field::ATTACHMENT_HT, slots, report);
    assign_slots(pole, &comm_midspan, field::MIDSPAN_HT, slots, report);

    let mut all_comm: Vec<&Observation> = comm.iter().chain(providers.iter()).collect();
    all_comm.sort_by(|a, b| height(b).total_cmp(&height(a)));
    if !all_comm.is_empty() {
        let summary: Vec<String> = all_comm
            .iter()
            .map(|observation| {
                let formatted = format_measurement(&observation.value, config.decimal_measurements)
                    .unwrap_or_else(|| observation.value.as_text());
                format!("{formatted} ({})", observation.owner)
            })
            .collect();
        pole.comm_heights = Some(summary.join("; "));
    }
    pole.comm_count = all_comm.len();

    let comm_top = all_comm
        .iter()
        .filter_map(|observation| observation.feet)
        .fold(0.0_f64, f64::max);
    if let Some(lowest) = lowest_above(&power, comm_top) {
        pole.insert_attachment(
            Category::from(Category::POWER),
            field::LOWEST_HEIGHT.to_string(),
            lowest.value.clone(),
        );
    }
    if let Some(lowest) = lowest_above(&power_midspan, 0.0) {
        pole.insert_attachment(
            Category::from(Category::POWER),
            field::LOWEST_MIDSPAN.to_string(),
            lowest.value.clone(),
        );
    }
    if let Some(lowest) = lowest_above(&street_lights, 0.0) {
        pole.insert_attachment(
            Category::from(Category::STREET_LIGHT),
            field::LOWEST_HEIGHT.to_string(),
            lowest.value.clone(),
        );
    }
    pole.existing_risers = risers;

    debug!(
        pole = %pole.id,
        comm = pole.comm_count,
        risers,
        "attachments summarized"
    );
}

/// Unparsed heights count as zero and keep their order.
fn height(observation: &Observation) -> f64 {
    observation.feet.unwrap_or(0.0)
}

fn highest_first(observations: &mut [Observation]) {
    observations.sort_by(|a, b| height(b).total_cmp(&height(a)));
}

fn assign_slots(
    pole: &mut Pole,
    observations: &[Observation],
    name: &str,
    slots: usize,
    report: &mut Report,
) {
    for (idx, observation) in observations.iter().enumerate() {
        if idx < slots {
            pole.insert_attachment(Category::comm(idx + 1), name.to_string(), observation.value.clone());
        } else {
            report.pole(
                IssueKind::CommSlotOverflow,
                &pole.id,
                format!(
                    "no free comm slot for {} {} '{}'; not assigned to a comm column",
                    observation.owner, name, observation.value
                ),
            );
        }
    }
}

/// Lowest parsed height at or above `floor`; the lowest overall when none
/// reaches it.
fn lowest_above(observations: &[Observation], floor: f64) -> Option<&Observation> {
    let lowest = |floor: f64| {
        observations
            .iter()
            .filter(|observation| observation.feet.is_some_and(|feet| feet >= floor))
            .min_by(|a, b| height(a).total_cmp(&height(b)))
    };
    lowest(floor).or_else(|| lowest(f64::NEG_INFINITY))
}

/// Risers of attachers already on the pole; proposed attachments are not
/// counted.
fn is_existing_riser(classified: &ClassifiedField) -> bool {
    if classified
        .category
        .as_str()
        .to_lowercase()
        .starts_with(PROPOSED_PREFIX)
    {
        return false;
    }
    [
        classified.field.as_str(),
        classified.label.as_str(),
        &classified.value.as_text(),
    ]
    .iter()
    .any(|text| text.to_lowercase().contains(RISER_KEYWORD))
}
