//! Route reconciliation.
//!
//! A route is resolved by the first strategy that produces one: manual route
//! text, QC workbook connections, explicit "To Pole" links, then the order
//! the poles were surveyed in.
//! Every resulting span is checked against the configured length tolerance.

mod linked;
pub mod manual;
mod qc;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::pole::mapper::config::Configuration;
use crate::pole::mapper::model::{Pole, PoleId, Route, RouteSource, Span, SpanRecord};
use crate::pole::mapper::report::{IssueKind, Report};

pub use manual::{ManualRoute, parse_manual_routes};

/// Ordered links proposed by a strategy.
#[derive(Debug, Default)]
struct Plan {
    links: Vec<(PoleId, PoleId)>,
    restricted: bool,
}

impl Plan {
    fn push(&mut self, from: &str, to: &str) {
        if !self.links.iter().any(|(a, b)| a == from && b == to) {
            self.links.push((from.to_string(), to.to_string()));
        }
    }
}

type Strategy = fn(&Context<'_>, &mut Report) -> Option<Plan>;

const STRATEGIES: [(RouteSource, Strategy); 4] = [
    (RouteSource::Manual, manual::plan),
    (RouteSource::Qc, qc::plan),
    (RouteSource::Linked, linked::plan),
    (RouteSource::Positional, positional),
];

/// Determines the ordered spans connecting `poles`.
pub fn reconcile(poles: &[Pole], config: &Configuration, report: &mut Report) -> Route {
    let context = Context::new(poles, config);

    for (source, strategy) in STRATEGIES {
        let Some(plan) = strategy(&context, report) else {
            debug!(%source, "strategy produced no route");
            continue;
        };
        let spans: Vec<Span> = plan
            .links
            .iter()
            .map(|(from, to)| context.span(from, to, report))
            .collect();
        info!(%source, spans = spans.len(), "route reconciled");
        return Route {
            spans,
            source,
            restricted: plan.restricted,
        };
    }

    Route::empty()
}

/// Consecutive poles in aggregation order.
fn positional(context: &Context<'_>, _report: &mut Report) -> Option<Plan> {
    if context.poles.len() < 2 {
        return None;
    }
    let mut plan = Plan::default();
    for pair in context.poles.windows(2) {
        plan.push(&pair[0].id, &pair[1].id);
    }
    Some(plan)
}

/// Poles and configuration shared by the strategies.
struct Context<'a> {
    poles: &'a [Pole],
    config: &'a Configuration,
    index: HashMap<&'a str, usize>,
}

impl<'a> Context<'a> {
    fn new(poles: &'a [Pole], config: &'a Configuration) -> Self {
        let index = poles
            .iter()
            .enumerate()
            .map(|(idx, pole)| (pole.id.as_str(), idx))
            .collect();
        Self {
            poles,
            config,
            index,
        }
    }

    fn pole(&self, id: &str) -> Option<&'a Pole> {
        self.index.get(id).map(|idx| &self.poles[*idx])
    }

    fn knows(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// "To Pole" links in aggregation order, skipping poles for which
    /// `skip` holds. Links to poles outside the dataset and links of a pole
    /// to itself are reported and dropped.
    fn explicit_links(
        &self,
        skip: impl Fn(&str) -> bool,
        report: &mut Report,
    ) -> Vec<(&'a str, &'a str)> {
        let mut links: Vec<(&'a str, &'a str)> = Vec::new();
        for pole in self.poles.iter().filter(|pole| !skip(pole.id.as_str())) {
            for target in pole.linked_poles() {
                if target == pole.id {
                    report.pole(
                        IssueKind::RouteCycleDetected,
                        &pole.id,
                        format!("pole {target} links to itself; link dropped"),
                    );
                } else if !self.knows(target) {
                    report.pole(
                        IssueKind::UnresolvedLink,
                        &pole.id,
                        format!("To Pole {target} is not a surveyed pole; link dropped"),
                    );
                } else if !links.contains(&(pole.id.as_str(), target)) {
                    links.push((pole.id.as_str(), target));
                }
            }
        }
        links
    }

    /// Builds the span between two poles and checks its length.
    fn span(&self, from: &str, to: &str, report: &mut Report) -> Span {
        let (length, reference_length) = self.recorded_lengths(from, to);
        let tolerance = self.config.span_length_tolerance();

        let within_tolerance = match (length, reference_length) {
            (Some(length), Some(reference)) => {
                let within = (length - reference).abs() <= tolerance;
                if !within {
                    report.pole(
                        IssueKind::ToleranceExceeded,
                        from,
                        format!(
                            "span {from} -> {to} is {length} ft, reference {reference} ft \
                             (tolerance {tolerance} ft)"
                        ),
                    );
                }
                within
            }
            _ => {
                report.pole(
                    IssueKind::ToleranceCheckSkipped,
                    from,
                    format!("span {from} -> {to} lacks a recorded or reference length"),
                );
                true
            }
        };

        Span {
            from: from.to_string(),
            to: to.to_string(),
            length,
            reference_length,
            within_tolerance,
        }
    }

    /// Length and reference length of the span, taken from the row linking
    /// the two poles in either direction, else from the from-pole's row
    /// without a link.
    fn recorded_lengths(&self, from: &str, to: &str) -> (Option<f64>, Option<f64>) {
        let record = |owner: &str, target: Option<&str>| -> Option<&'a SpanRecord> {
            self.pole(owner)?
                .spans
                .iter()
                .find(|candidate| candidate.to_pole.as_deref() == target)
        };
        let candidates = [
            record(from, Some(to)),
            record(to, Some(from)),
            record(from, None),
        ];

        let length = candidates.iter().flatten().find_map(|record| record.length);
        let reference = candidates
            .iter()
            .flatten()
            .find_map(|record| record.reference_length);
        (length, reference)
    }
}
