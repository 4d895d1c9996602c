use std::collections::HashSet;

use serde::Serialize;

use crate::pole::mapper::model::PoleId;
use crate::pole::mapper::report::{IssueKind, Report};
use crate::pole::mapper::scid::normalize_scid;

use super::{Context, Plan};

/// One manually entered route: pole ids in travel order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualRoute {
    /// 1-based line of the route text the route was read from.
    pub line: usize,
    pub poles: Vec<PoleId>,
}

/// Parses route text. Each line holds one or more routes separated by `;`,
/// each route lists pole ids separated by `,`. Routes naming fewer than two
/// poles are reported and skipped.
pub fn parse_manual_routes(text: &str, report: &mut Report) -> Vec<ManualRoute> {
    let mut routes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        for segment in line.split(';') {
            if segment.trim().is_empty() {
                continue;
            }
            let poles: Vec<PoleId> = segment
                .split(',')
                .map(normalize_scid)
                .filter(|id| !id.is_empty())
                .collect();
            if poles.len() < 2 {
                report.note(
                    IssueKind::ManualRouteTooShort,
                    format!(
                        "manual route '{}' on line {} needs at least two poles; skipped",
                        segment.trim(),
                        idx + 1
                    ),
                );
                continue;
            }
            routes.push(ManualRoute {
                line: idx + 1,
                poles,
            });
        }
    }
    routes
}

/// Links from the configured manual routes, restricted to the poles they
/// name. Unless existing routes are cleared, an explicit link is kept when
/// both of its poles are on a manual route and its source neither starts a
/// manual link nor ends a route.
pub(super) fn plan(context: &Context<'_>, report: &mut Report) -> Option<Plan> {
    let options = &context.config.manual_routes_options;
    if !options.use_manual_routes || options.routes.trim().is_empty() {
        return None;
    }

    let routes = parse_manual_routes(&options.routes, report);
    let mut plan = Plan {
        restricted: true,
        ..Plan::default()
    };
    for route in &routes {
        for pair in route.poles.windows(2) {
            let (from, to) = (pair[0].as_str(), pair[1].as_str());
            if from == to {
                continue;
            }
            match [from, to].into_iter().find(|id| !context.knows(id)) {
                Some(unknown) => report.pole(
                    IssueKind::UnknownManualRouteReference,
                    unknown,
                    format!(
                        "manual route on line {} names unknown pole {unknown}; \
                         link {from} -> {to} skipped",
                        route.line
                    ),
                ),
                None => plan.push(from, to),
            }
        }
    }

    if plan.links.is_empty() {
        return None;
    }

    if !options.clear_existing_routes {
        let on_route: HashSet<&str> = routes
            .iter()
            .flat_map(|route| route.poles.iter().map(String::as_str))
            .filter(|id| context.knows(id))
            .collect();
        let ends: HashSet<&str> = routes
            .iter()
            .filter_map(|route| route.poles.last().map(String::as_str))
            .collect();
        let manual_sources: HashSet<PoleId> =
            plan.links.iter().map(|(from, _)| from.clone()).collect();

        let kept = context.explicit_links(
            |id| !on_route.contains(id) || ends.contains(id) || manual_sources.contains(id),
            report,
        );
        for (from, to) in kept {
            if on_route.contains(to) {
                plan.push(from, to);
            }
        }
    }

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pole::mapper::config::Configuration;
    use crate::pole::mapper::model::{Route, RouteSource};
    use crate::pole::mapper::route::reconcile;
    use crate::pole::mapper::route::tests::pole;

    fn manual(routes: &str, clear_existing_routes: bool) -> Configuration {
        let mut config = Configuration::default();
        config.manual_routes_options.use_manual_routes = true;
        config.manual_routes_options.clear_existing_routes = clear_existing_routes;
        config.manual_routes_options.routes = routes.to_string();
        config
    }

    fn pairs(route: &Route) -> Vec<(&str, &str)> {
        route
            .spans
            .iter()
            .map(|span| (span.from.as_str(), span.to.as_str()))
            .collect()
    }

    #[test]
    fn route_text_is_split_into_routes() {
        let mut report = Report::new();
        let routes = parse_manual_routes("001, 2, 3; 7,8\n\n 4 ,5", &mut report);

        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].poles, vec!["1", "2", "3"]);
        assert_eq!(routes[1].poles, vec!["7", "8"]);
        assert_eq!(routes[2].line, 3);
        assert!(report.is_empty());
    }

    #[test]
    fn short_routes_are_reported() {
        let mut report = Report::new();
        let routes = parse_manual_routes("1;2,3\n4,", &mut report);

        assert_eq!(routes.len(), 1);
        assert_eq!(report.count(IssueKind::ManualRouteTooShort), 2);
    }

    #[test]
    fn manual_route_overrides_links() {
        let poles = vec![pole("1", &["3"]), pole("2", &[]), pole("3", &["2"])];
        let config = manual("1,2,3", true);
        let route = reconcile(&poles, &config, &mut Report::new());

        assert_eq!(route.source, RouteSource::Manual);
        assert!(route.restricted);
        assert_eq!(pairs(&route), vec![("1", "2"), ("2", "3")]);
    }

    #[test]
    fn only_links_between_route_poles_are_kept() {
        let poles = vec![
            pole("1", &["3"]),
            pole("2", &[]),
            pole("3", &["1"]),
            pole("4", &["3"]),
        ];
        let mut report = Report::new();
        let route = reconcile(&poles, &manual("1,9,2,3", false), &mut report);
        assert_eq!(pairs(&route), vec![("2", "3"), ("1", "3")]);
        assert_eq!(report.count(IssueKind::UnknownManualRouteReference), 2);

        let route = reconcile(&poles, &manual("1,9,2,3", true), &mut Report::new());
        assert_eq!(pairs(&route), vec![("2", "3")]);
    }

    #[test]
    fn links_leaving_the_route_or_its_last_pole_are_dropped() {
        let poles = vec![
            pole("1", &[]),
            pole("2", &["1"]),
            pole("3", &["4"]),
            pole("4", &[]),
        ];
        let route = reconcile(&poles, &manual("1,2", false), &mut Report::new());

        assert_eq!(pairs(&route), vec![("1", "2")]);
        assert!(route.restricted);
    }

    #[test]
    fn unknown_poles_are_skipped() {
        let poles = vec![pole("1", &[]), pole("2", &[]), pole("3", &[])];
        let mut report = Report::new();
        let route = reconcile(&poles, &manual("1,9,2,3", true), &mut report);

        assert_eq!(pairs(&route), vec![("2", "3")]);
        assert_eq!(report.count(IssueKind::UnknownManualRouteReference), 2);
    }

    #[test]
    fn no_valid_pair_falls_through() {
        let poles = vec![pole("1", &[]), pole("2", &[])];
        let mut report = Report::new();
        let route = reconcile(&poles, &manual("8,9", true), &mut report);

        assert_eq!(route.source, RouteSource::Positional);
        assert!(!route.restricted);
    }
}
