use pole_mapper::config::{ColumnMapping, Configuration};
use pole_mapper::model::{RawRow, RouteSource};
use pole_mapper::pipeline::process;
use pole_mapper::report::IssueKind;

fn pairs(outcome: &pole_mapper::pipeline::Outcome) -> Vec<(String, String)> {
    outcome
        .route
        .spans
        .iter()
        .map(|span| (span.from.clone(), span.to.clone()))
        .collect()
}

fn pair(from: &str, to: &str) -> (String, String) {
    (from.to_string(), to.to_string())
}

#[test]
fn duplicate_rows_merge_into_one_pole() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1").with("CATV", "20'"),
        RawRow::new(3).with("Pole", "P1").with("Comcast", "18' 4\""),
        RawRow::new(4).with("Pole", "P1").with("Comcast", "19' 0\""),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    assert_eq!(outcome.poles.len(), 1);
    let pole = &outcome.poles[0];
    assert_eq!(pole.rows, vec![2, 3, 4]);
    assert!(pole.attachment("comm1", "Attachment Ht").is_some());
    assert_eq!(
        pole.attachment("Comcast", "Attachment Ht").map(|value| value.as_text()),
        Some("19' 0\"".to_string())
    );
}

#[test]
fn ignored_poles_leave_no_trace() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1"),
        RawRow::new(3).with("Pole", "Unknown-3"),
        RawRow::new(4).with("Pole", "P2"),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    assert_eq!(outcome.model.pole_ids(), vec!["P1", "P2"]);
    assert_eq!(pairs(&outcome), vec![pair("P1", "P2")]);
    assert_eq!(outcome.report.count(IssueKind::IgnoredPole), 1);
}

#[test]
fn manual_routes_override_to_pole_columns() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1").with("To Pole", "P3"),
        RawRow::new(3).with("Pole", "P2"),
        RawRow::new(4).with("Pole", "P3").with("To Pole", "P2"),
    ];
    let mut config = Configuration::default();
    config.manual_routes_options.use_manual_routes = true;
    config.manual_routes_options.clear_existing_routes = true;
    config.manual_routes_options.routes = "P1, P2, P3".into();

    let outcome = process(&rows, &config, None);
    assert_eq!(outcome.route.source, RouteSource::Manual);
    assert_eq!(pairs(&outcome), vec![pair("P1", "P2"), pair("P2", "P3")]);
    assert_eq!(outcome.model.pole_ids(), vec!["P1", "P2", "P3"]);
}

#[test]
fn to_pole_cycles_complete_and_are_reported() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1").with("To Pole", "P2"),
        RawRow::new(3).with("Pole", "P2").with("To Pole", "P3"),
        RawRow::new(4).with("Pole", "P3").with("To Pole", "P1"),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    assert_eq!(outcome.route.source, RouteSource::Linked);
    assert_eq!(pairs(&outcome), vec![pair("P1", "P2"), pair("P2", "P3")]);
    assert_eq!(outcome.report.count(IssueKind::RouteCycleDetected), 1);
    assert_eq!(outcome.model.pole_ids(), vec!["P1", "P2", "P3"]);
}

#[test]
fn one_power_and_one_comm_cell_give_two_categories() {
    let rows = vec![
        RawRow::new(2)
            .with("Pole", "P1")
            .with("Primary", "30' 0\"")
            .with("CATV", "20' 0\""),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    let categories: Vec<&str> = outcome.poles[0]
        .attachments
        .keys()
        .map(|category| category.as_str())
        .collect();
    assert_eq!(categories, vec!["Power", "comm1"]);
}

#[test]
fn span_lengths_are_checked_against_the_reference() {
    let mut config = Configuration::default();
    config
        .column_mappings
        .push(ColumnMapping::new("Span", "Reference Length", "Reference Length"));
    let length = "Pole to Pole Span Length (from starting point)";
    let rows = vec![
        RawRow::new(2)
            .with("Pole", "P1")
            .with(length, 52.0)
            .with("Reference Length", 50.0),
        RawRow::new(3)
            .with("Pole", "P2")
            .with(length, 55.0)
            .with("Reference Length", 50.0),
        RawRow::new(4).with("Pole", "P3"),
    ];
    let outcome = process(&rows, &config, None);

    let within: Vec<bool> = outcome
        .route
        .spans
        .iter()
        .map(|span| span.within_tolerance)
        .collect();
    assert_eq!(within, vec![true, false]);
    assert_eq!(outcome.report.count(IssueKind::ToleranceExceeded), 1);
}

#[test]
fn provider_alias_in_a_value_names_the_provider() {
    let rows = vec![
        RawRow::new(2)
            .with("Pole", "P1")
            .with("Proposed Work", "Proposed MNT install"),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    let pole = &outcome.poles[0];
    assert_eq!(
        pole.attachment("Proposed MetroNet", "Proposed Work")
            .map(|value| value.as_text()),
        Some("Proposed MNT install".to_string())
    );
}

#[test]
fn rows_without_identifier_are_reported_not_fatal() {
    let rows = vec![
        RawRow::new(2).with("Primary", "30'"),
        RawRow::new(3).with("Pole", "P1"),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    assert_eq!(outcome.model.pole_ids(), vec!["P1"]);
    let unmapped: Vec<_> = outcome.report.of_kind(IssueKind::UnmappedRow).collect();
    assert_eq!(unmapped.len(), 1);
    assert_eq!(unmapped[0].row, Some(2));
}

#[test]
fn comm_slots_follow_height_across_rows() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1").with("Telco comm", "18'"),
        RawRow::new(3).with("Pole", "P1").with("CATV", "20'"),
        RawRow::new(4).with("Pole", "P2").with("Fiber", "19'"),
    ];
    let outcome = process(&rows, &Configuration::default(), None);

    let slot = |pole: usize, category: &str| {
        outcome.poles[pole]
            .attachment(category, "Attachment Ht")
            .map(|value| value.as_text())
    };
    assert_eq!(slot(0, "comm1").as_deref(), Some("20'"));
    assert_eq!(slot(0, "comm2").as_deref(), Some("18'"));
    assert_eq!(slot(1, "comm1").as_deref(), Some("19'"));
    assert_eq!(slot(1, "comm2"), None);
    assert_eq!(outcome.poles[0].comm_count, 2);
    assert_eq!(outcome.report.count(IssueKind::CommSlotOverflow), 0);
}

#[test]
fn manual_routes_keep_only_links_between_their_poles() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1"),
        RawRow::new(3).with("Pole", "P2").with("To Pole", "P1"),
        RawRow::new(4).with("Pole", "P3").with("To Pole", "P4"),
        RawRow::new(5).with("Pole", "P4"),
    ];
    let mut config = Configuration::default();
    config.manual_routes_options.use_manual_routes = true;
    config.manual_routes_options.routes = "P1, P2".into();

    let outcome = process(&rows, &config, None);
    assert_eq!(outcome.route.source, RouteSource::Manual);
    assert_eq!(pairs(&outcome), vec![pair("P1", "P2")]);
    assert_eq!(outcome.model.pole_ids(), vec!["P1", "P2"]);
}

#[test]
fn ignored_poles_never_become_span_endpoints() {
    let rows = vec![
        RawRow::new(2).with("Pole", "P1").with("To Pole", "Unknown-3"),
        RawRow::new(3).with("Pole", "Unknown-3").with("To Pole", "P2"),
        RawRow::new(4).with("Pole", "P2"),
    ];
    let mut config = Configuration::default();
    config.manual_routes_options.use_manual_routes = true;
    config.manual_routes_options.routes = "P1, Unknown-3, P2".into();

    let outcome = process(&rows, &config, None);
    assert!(
        outcome
            .route
            .spans
            .iter()
            .all(|span| !config.is_ignored_scid(&span.from) && !config.is_ignored_scid(&span.to))
    );
    assert!(
        outcome
            .model
            .records
            .iter()
            .all(|record| !config.is_ignored_scid(&record.pole.id))
    );
    assert_eq!(outcome.report.count(IssueKind::UnknownManualRouteReference), 2);
    assert_eq!(outcome.report.count(IssueKind::UnresolvedLink), 1);
    assert_eq!(outcome.model.pole_ids(), vec!["P1", "P2"]);
}
