use crate::pole::mapper::report::{IssueKind, Report};

use super::{Context, Plan};

/// Links listed in a QC workbook, in the order the workbook lists them.
///
/// The output is restricted to the poles the QC connections name. Pairs
/// naming a pole outside the dataset are reported and skipped.
pub(super) fn plan(context: &Context<'_>, report: &mut Report) -> Option<Plan> {
    let config = context.config;
    if !config.processing_options.use_qc_routing || config.qc_connections.is_empty() {
        return None;
    }

    let mut plan = Plan {
        restricted: true,
        ..Plan::default()
    };
    for connection in &config.qc_connections {
        let (from, to) = (connection.from.as_str(), connection.to.as_str());
        if from == to {
            continue;
        }
        match [from, to].into_iter().find(|id| !context.knows(id)) {
            Some(unknown) => report.pole(
                IssueKind::UnknownQcReference,
                unknown,
                format!(
                    "QC sheet '{}' row {} names unknown pole {unknown}; link {from} -> {to} skipped",
                    connection.sheet, connection.row
                ),
            ),
            None => plan.push(from, to),
        }
    }

    if plan.links.is_empty() {
        return None;
    }
    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pole::mapper::config::Configuration;
    use crate::pole::mapper::model::{QcConnection, RouteSource};
    use crate::pole::mapper::output::build;
    use crate::pole::mapper::route::reconcile;
    use crate::pole::mapper::route::tests::pole;
    use std::collections::HashMap;

    fn qc(pairs: &[(&str, &str)]) -> Configuration {
        let mut config = Configuration::default();
        config.processing_options.use_qc_routing = true;
        config.qc_connections = pairs
            .iter()
            .enumerate()
            .map(|(idx, (from, to))| QcConnection {
                from: from.to_string(),
                to: to.to_string(),
                sheet: "QC".into(),
                row: idx + 4,
            })
            .collect();
        config
    }

    #[test]
    fn qc_connections_order_and_restrict_the_output() {
        let poles = vec![
            pole("1", &["2"]),
            pole("2", &[]),
            pole("3", &[]),
            pole("4", &[]),
        ];
        let config = qc(&[("3", "1"), ("1", "2"), ("1", "2")]);
        let route = reconcile(&poles, &config, &mut Report::new());

        assert_eq!(route.source, RouteSource::Qc);
        assert!(route.restricted);

        let model = build(&route, &poles, &HashMap::new());
        let ids: Vec<&str> = model.records.iter().map(|r| r.pole.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert!(model.records[2].span.is_none());
    }

    #[test]
    fn unknown_qc_poles_are_reported() {
        let poles = vec![pole("1", &[]), pole("2", &[])];
        let mut report = Report::new();
        let route = reconcile(&poles, &qc(&[("1", "7"), ("1", "2")]), &mut report);

        assert_eq!(route.spans.len(), 1);
        assert_eq!(report.count(IssueKind::UnknownQcReference), 1);
    }

    #[test]
    fn qc_routing_needs_to_be_enabled() {
        let poles = vec![pole("1", &[]), pole("2", &[])];
        let mut config = qc(&[("2", "1")]);
        config.processing_options.use_qc_routing = false;
        let route = reconcile(&poles, &config, &mut Report::new());

        assert_eq!(route.source, RouteSource::Positional);
    }

    #[test]
    fn manual_routes_take_precedence() {
        let poles = vec![pole("1", &[]), pole("2", &[])];
        let mut config = qc(&[("2", "1")]);
        config.manual_routes_options.use_manual_routes = true;
        config.manual_routes_options.routes = "1,2".into();
        let route = reconcile(&poles, &config, &mut Report::new());

        assert_eq!(route.source, RouteSource::Manual);
    }
}
