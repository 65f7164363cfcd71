pub mod catalog;
pub mod config;
pub mod contract;
pub mod discovery;
pub mod dispatch;
pub mod ini;
pub mod launcher;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod notifier;
pub mod preferences;
pub mod profiles;
pub mod router_service;
pub mod rule_store;
pub mod runtime;
pub mod transport;

#[cfg(test)]
mod tests {
    mod dispatch_latency_test {
        include!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../tests/perf/dispatch_latency_test.rs"
        ));
    }
}
