use std::time::Instant;

use crate::catalog::DestinationCatalog;
use crate::discovery::FixedSource;
use crate::dispatch::{route, Decision};
use crate::model::{MatchType, RoutingState, Rule};
use crate::profiles::ProfileLocator;

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

#[test]
fn thousand_rule_dispatch_p95_under_15ms() {
    let mut rules: Vec<Rule> = (0..1_000)
        .map(|i| {
            let match_type = if i % 2 == 0 {
                MatchType::Domain
            } else {
                MatchType::Contains
            };
            let mut rule = Rule::new(&format!("host-{i:04}.test"), match_type, "firefox.desktop");
            rule.priority = i;
            rule
        })
        .collect();
    let mut last = Rule::new("github.com", MatchType::Domain, "google-chrome.desktop");
    last.priority = 1_000;
    rules.push(last);

    let state = RoutingState {
        rules,
        ..RoutingState::default()
    };
    let home = std::env::temp_dir().join("linkroute-perf-no-home");
    let mut catalog = DestinationCatalog::new(
        Box::new(FixedSource::deterministic_fixture()),
        ProfileLocator::new(home),
        "linkroute.desktop",
    );
    catalog.refresh().unwrap();

    let url = "https://github.com/rust-lang/rust";
    assert!(matches!(route(url, &state, &catalog), Decision::Matched { .. }));

    for _ in 0..30 {
        let _ = route(url, &state, &catalog);
    }

    let mut batch_p95 = Vec::with_capacity(5);
    for _ in 0..5 {
        let mut samples = Vec::with_capacity(80);
        for _ in 0..80 {
            let start = Instant::now();
            let _ = route(url, &state, &catalog);
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 15.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 15.0ms); batches={batch_p95:?}",
    );
}
