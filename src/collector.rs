// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

mod http;
mod ports;

use crate::{metric, prometheus::Exporter};
use async_trait::async_trait;
use log::{debug, error};
use std::{collections::HashMap, time};
use thiserror::Error;
use tokio::{sync::mpsc, task};

/// Metric-name prefix shared by every stat collector.
pub const NAMESPACE: &str = "ports";

/// Connection parameters for one scrape, resolved from the `target` query
/// parameter and the selected module profile.
#[derive(Debug, Clone)]
pub struct ScrapeParams {
    pub target: String,
    pub proto: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: time::Duration,
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("could not decode stats payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("object count {count} exceeds the {returned} objects returned")]
    ObjectCount { count: usize, returned: usize },

    #[error("invalid value {value:?} for {field} in port stats: {source}")]
    Value {
        field: String,
        value: String,
        source: std::num::ParseFloatError,
    },

    #[error("collector {0:?} not available")]
    UnknownCollector(String),
}

/// Sink that collectors emit samples into. Cloned per collector task; the
/// orchestrator drains it once all tasks have finished.
pub type SampleSink = mpsc::UnboundedSender<metric::Sample>;

/// One stat domain. Given connection parameters, fetch the domain's stats from
/// the remote switch and emit gauge samples into the sink. Any error aborts
/// this collector only; siblings in the same scrape are unaffected.
#[async_trait]
pub trait Collector: Send {
    async fn update(&mut self, params: &ScrapeParams, sink: &SampleSink)
    -> Result<(), CollectorError>;
}

type Factory = fn() -> Box<dyn Collector>;

/// Static table of collector factories. Collectors are instantiated fresh for
/// every scrape request.
pub struct Registry {
    factories: HashMap<&'static str, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Registry {
            factories: HashMap::new(),
        };
        registry.register("ports", || Box::new(ports::PortsCollector::new()));

        registry
    }

    fn register(&mut self, name: &'static str, factory: Factory) {
        self.factories.insert(name, factory);
    }

    /// Instantiates every collector named in the comma-separated list. Any
    /// unknown name fails the whole request.
    pub fn instantiate(
        &self,
        list: &str,
    ) -> Result<Vec<(String, Box<dyn Collector>)>, CollectorError> {
        let mut collectors = Vec::new();
        for name in list.split(',') {
            let factory = self
                .factories
                .get(name)
                .ok_or_else(|| CollectorError::UnknownCollector(name.to_string()))?;
            collectors.push((name.to_string(), factory()));
        }

        Ok(collectors)
    }
}

/// Runs all enabled collectors in parallel for one scrape request and merges
/// their samples into a single exposition body. Each collector's duration and
/// outcome are observed on the exporter's scrape-duration histogram; a failing
/// collector contributes nothing but that observation.
pub async fn run_scrape(
    collectors: Vec<(String, Box<dyn Collector>)>,
    params: ScrapeParams,
    exporter: &Exporter,
) -> String {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut tasks = task::JoinSet::new();
    for (name, mut collector) in collectors {
        let tx = tx.clone();
        let params = params.clone();
        let durations = exporter.scrape_durations.clone();

        tasks.spawn(async move {
            let begin = time::Instant::now();
            let result = collector.update(&params, &tx).await;
            let elapsed = begin.elapsed().as_secs_f64();

            let outcome = match result {
                Ok(()) => {
                    debug!("OK: {name} collector succeeded after {elapsed:.6}s.");
                    "success"
                }
                Err(err) => {
                    error!("{name} collector failed after {elapsed:.6}s: {err}");
                    "error"
                }
            };
            durations
                .with_label_values(&[name.as_str(), outcome])
                .observe(elapsed);
        });
    }
    drop(tx);

    // Completion barrier; no collector is cancelled by a failing sibling.
    while tasks.join_next().await.is_some() {}

    let mut samples = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        samples.push(sample);
    }

    let mut body = metric::encode(&samples);
    body.push_str(&exporter.encode_scrape_durations());

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticCollector {
        field: &'static str,
        device: &'static str,
        value: f64,
    }

    #[async_trait]
    impl Collector for StaticCollector {
        async fn update(
            &mut self,
            _params: &ScrapeParams,
            sink: &SampleSink,
        ) -> Result<(), CollectorError> {
            let desc = Arc::new(metric::Desc::new(NAMESPACE, self.field));
            let _ = sink.send(metric::Sample {
                desc,
                device: self.device.to_string(),
                value: self.value,
            });
            Ok(())
        }
    }

    struct FailingCollector;

    #[async_trait]
    impl Collector for FailingCollector {
        async fn update(
            &mut self,
            _params: &ScrapeParams,
            _sink: &SampleSink,
        ) -> Result<(), CollectorError> {
            Err(CollectorError::ObjectCount {
                count: 2,
                returned: 1,
            })
        }
    }

    fn params() -> ScrapeParams {
        ScrapeParams {
            target: "switch1".to_string(),
            proto: "http".to_string(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            timeout: time::Duration::from_secs(1),
        }
    }

    #[test]
    fn registry_instantiates_known_collectors() {
        let registry = Registry::new();
        let collectors = registry.instantiate("ports").unwrap();

        assert_eq!(collectors.len(), 1);
        assert_eq!(collectors[0].0, "ports");
    }

    #[test]
    fn registry_rejects_unknown_collector() {
        let registry = Registry::new();
        let err = registry.instantiate("ports,bgp").err().unwrap();

        assert!(matches!(err, CollectorError::UnknownCollector(ref name) if name == "bgp"));
        assert!(err.to_string().contains("bgp"));
    }

    #[tokio::test]
    async fn scrape_isolates_collector_failures() {
        let exporter = Exporter::new().unwrap();
        let collectors: Vec<(String, Box<dyn Collector>)> = vec![
            (
                "good".to_string(),
                Box::new(StaticCollector {
                    field: "receive_bytes",
                    device: "eth0",
                    value: 12345.0,
                }),
            ),
            ("bad".to_string(), Box::new(FailingCollector)),
        ];

        let body = run_scrape(collectors, params(), &exporter).await;

        assert!(body.contains("ports_receive_bytes{device=\"eth0\"} 12345"));
        assert_eq!(
            exporter
                .scrape_durations
                .with_label_values(&["good", "success"])
                .get_sample_count(),
            1
        );
        assert_eq!(
            exporter
                .scrape_durations
                .with_label_values(&["bad", "error"])
                .get_sample_count(),
            1
        );
    }

    #[tokio::test]
    async fn scrape_response_includes_duration_family() {
        let exporter = Exporter::new().unwrap();
        let collectors: Vec<(String, Box<dyn Collector>)> = vec![(
            "good".to_string(),
            Box::new(StaticCollector {
                field: "transmit_bytes",
                device: "eth1",
                value: 1.0,
            }),
        )];

        let body = run_scrape(collectors, params(), &exporter).await;

        assert!(body.contains("ports_exporter_scrape_duration_seconds"));
        assert!(body.contains("collector=\"good\""));
    }
}
