// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use std::{collections::BTreeMap, fmt::Write, sync};

/// Metric metadata for one stat field. Built at most once per field name and
/// shared by every sample of that field (first-seen metadata wins).
#[derive(Debug)]
pub struct Desc {
    pub name: String,
    pub help: String,
}

impl Desc {
    pub fn new(namespace: &str, field: &str) -> Self {
        Desc {
            name: format!("{namespace}_{field}"),
            help: format!("flexswitch network device statistic {field}."),
        }
    }
}

/// One gauge reading for one device, produced by a collector during a scrape
/// and consumed by the response encoder.
#[derive(Debug)]
pub struct Sample {
    pub desc: sync::Arc<Desc>,
    pub device: String,
    pub value: f64,
}

fn escape_label(val: &str) -> String {
    val.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Encodes samples in the Prometheus text exposition format, grouped into
/// families so that each metric name carries a single HELP/TYPE header.
pub fn encode(samples: &[Sample]) -> String {
    let mut families: BTreeMap<&str, (&Desc, Vec<&Sample>)> = BTreeMap::new();
    for sample in samples {
        families
            .entry(&sample.desc.name)
            .or_insert_with(|| (&sample.desc, Vec::new()))
            .1
            .push(sample);
    }

    let mut buf = String::with_capacity(4096);
    for (name, (desc, samples)) in families {
        let _ = writeln!(buf, "# HELP {} {}", name, desc.help);
        let _ = writeln!(buf, "# TYPE {name} gauge");
        for sample in samples {
            let _ = writeln!(
                buf,
                "{}{{device=\"{}\"}} {}",
                name,
                escape_label(&sample.device),
                sample.value
            );
        }
    }

    buf
}
