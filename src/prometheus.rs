// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use crate::collector;
use anyhow::Result;
use prometheus::{
    Encoder, HistogramVec, IntCounter, Opts, Registry, TextEncoder, core::Collector,
    histogram_opts, register_histogram_vec_with_registry, register_int_counter_with_registry,
};

/// Exporter self-metrics, registered once at startup and served on `/metrics`.
pub struct Exporter {
    registry: Registry,
    encoder: TextEncoder,

    pub scrape_durations: HistogramVec,
    pub request_errors: IntCounter,
}

impl Exporter {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let encoder = TextEncoder::new();

        let scrape_durations = register_histogram_vec_with_registry!(
            histogram_opts!(
                "scrape_duration_seconds",
                "flexswitch-exporter: Duration of a scrape job."
            )
            .namespace(collector::NAMESPACE)
            .subsystem("exporter"),
            &["collector", "result"],
            registry,
        )?;

        let request_errors = register_int_counter_with_registry!(
            Opts::new(
                "flexswitch_request_errors_total",
                "Errors in requests to the FlexSwitch exporter",
            ),
            registry,
        )?;

        Ok(Exporter {
            registry,
            encoder,
            scrape_durations,
            request_errors,
        })
    }

    pub fn format_type(&self) -> &str {
        self.encoder.format_type()
    }

    pub fn encode(&self) -> Vec<u8> {
        let metrics = self.registry.gather();

        let mut buf = Vec::new();
        self.encoder.encode(&metrics, &mut buf).unwrap();

        buf
    }

    /// Encodes only the scrape-duration family, appended to every scrape
    /// response alongside the collected samples.
    pub fn encode_scrape_durations(&self) -> String {
        let metrics = self.scrape_durations.collect();

        let mut buf = Vec::new();
        self.encoder.encode(&metrics, &mut buf).unwrap();

        String::from_utf8(buf).unwrap_or_default()
    }
}
