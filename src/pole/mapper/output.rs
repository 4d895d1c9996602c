use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::pole::mapper::model::{NormalizedModel, Pole, PoleId, PoleRecord, Route};

/// Orders poles along `route` and emits one record per outgoing span.
///
/// Poles the route does not reach follow in aggregation order, unless the
/// route restricts the output to its own poles. Geocoded `addresses` are
/// only merged into poles without an address of their own.
pub fn build(route: &Route, poles: &[Pole], addresses: &HashMap<PoleId, String>) -> NormalizedModel {
    let by_id: HashMap<&str, &Pole> = poles.iter().map(|pole| (pole.id.as_str(), pole)).collect();

    let mut order: Vec<&str> = route
        .pole_order()
        .into_iter()
        .filter(|id| by_id.contains_key(id))
        .collect();
    if !route.restricted {
        let placed: HashSet<&str> = order.iter().copied().collect();
        order.extend(
            poles
                .iter()
                .map(|pole| pole.id.as_str())
                .filter(|id| !placed.contains(id)),
        );
    }

    let mut records: Vec<PoleRecord> = Vec::new();
    for id in order {
        let Some(source) = by_id.get(id) else {
            continue;
        };
        let pole = with_address(source, addresses);

        let mut spans = route.outgoing(id).peekable();
        if spans.peek().is_none() {
            records.push(PoleRecord {
                line_number: records.len() + 1,
                pole,
                span: None,
            });
            continue;
        }
        for span in spans {
            records.push(PoleRecord {
                line_number: records.len() + 1,
                pole: pole.clone(),
                span: Some(span.clone()),
            });
        }
    }

    debug!(records = records.len(), source = %route.source, "output records built");
    NormalizedModel {
        records,
        route_source: route.source,
    }
}

fn with_address(pole: &Pole, addresses: &HashMap<PoleId, String>) -> Pole {
    let mut pole = pole.clone();
    let missing = pole
        .address
        .as_deref()
        .is_none_or(|address| address.trim().is_empty());
    if missing {
        if let Some(address) = addresses.get(&pole.id) {
            pole.address = Some(address.clone());
        }
    }
    pole
}
