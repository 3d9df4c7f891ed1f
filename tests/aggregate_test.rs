//! Machine aggregation and viewport-driven pagination.
//!
//! Run with: cargo test --test aggregate_test

mod common;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Duration;

use common::{page, readings, Harness, ScriptedGateway, PAGE_SIZE};
use sensor_dashboard::services::aggregate::{self, MachineSelection};
use sensor_dashboard::sync::viewport::{self, ViewportTrigger};

#[test]
fn machines_are_distinct() {
    let rows = readings(&["M2", "M1", "M2", "M3"], 0, 12);
    assert_eq!(
        aggregate::machines(&rows),
        BTreeSet::from(["M1".to_string(), "M2".to_string(), "M3".to_string()])
    );
    assert!(aggregate::machines(&[]).is_empty());
}

#[test]
fn all_selection_borrows_the_reading_set() {
    let rows = readings(&["A", "B"], 0, 6);
    let filtered = aggregate::filter(&rows, &MachineSelection::All);
    assert!(matches!(filtered, Cow::Borrowed(_)));
    assert_eq!(filtered.len(), 6);
}

#[test]
fn machine_selection_keeps_only_matching_rows_in_order() {
    let rows = readings(&["A", "B", "C"], 0, 9);
    let filtered = aggregate::filter(&rows, &MachineSelection::Machine("B".to_string()));

    let expected: Vec<_> = rows.iter().filter(|r| r.machine_id == "B").cloned().collect();
    assert_eq!(filtered.into_owned(), expected);

    let none = aggregate::filter(&rows, &MachineSelection::Machine("Z".to_string()));
    assert!(none.is_empty());
}

#[test]
fn selection_parses_all_keyword() {
    assert_eq!("all".parse::<MachineSelection>().unwrap(), MachineSelection::All);
    assert_eq!("".parse::<MachineSelection>().unwrap(), MachineSelection::All);
    assert_eq!(
        "press-7".parse::<MachineSelection>().unwrap(),
        MachineSelection::Machine("press-7".to_string())
    );
    assert_eq!(MachineSelection::Machine("7".to_string()).to_string(), "7");
    assert_eq!(MachineSelection::All.to_string(), "all");
}

#[test]
fn trigger_reports_only_transitions_into_view() {
    let trigger = ViewportTrigger::new();
    assert!(!trigger.is_visible());

    assert!(trigger.set_visible(true));
    assert!(!trigger.set_visible(true));
    assert!(!trigger.set_visible(false));
    assert!(trigger.set_visible(true));
    assert!(trigger.is_visible());
}

async fn wait_for_calls(gateway: &ScriptedGateway, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while gateway.call_count() < expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("gateway calls");
}

#[tokio::test]
async fn entering_view_requests_the_next_page() {
    let gateway = ScriptedGateway::new();
    gateway.push_page(page(&["A"], 0, PAGE_SIZE));
    gateway.push_page(page(&["A"], 1000, 5));
    let harness = Harness::new(gateway);
    harness.controller.request_refresh().await;

    let trigger = ViewportTrigger::new();
    let listener = tokio::spawn(viewport::run_pagination(
        harness.controller.clone(),
        trigger.subscribe(),
    ));

    trigger.set_visible(true);
    wait_for_calls(&harness.gateway, 2).await;
    // Let the appended page settle
    tokio::task::yield_now().await;

    assert_eq!(harness.gateway.calls()[1], (PAGE_SIZE, PAGE_SIZE));

    // Leaving and re-entering view with no more data makes no request
    trigger.set_visible(false);
    trigger.set_visible(true);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(harness.gateway.call_count(), 2);
    assert_eq!(harness.controller.readings().len(), PAGE_SIZE + 5);

    listener.abort();
}
