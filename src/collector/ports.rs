// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use crate::{
    collector::{Collector, CollectorError, NAMESPACE, SampleSink, ScrapeParams, http},
    metric,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, sync};

const PORTS_PATH: &str = "/public/v1/state/ports";

/// Per-port detail record as served by the management API. Decoding is
/// deliberately lenient: any missing field defaults to its zero value, and
/// unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
#[allow(dead_code)]
struct PortDetail {
    intf_ref: String,
    if_index: f64,
    name: String,
    oper_state: String,
    num_up_events: f64,
    last_up_event_time: String,
    num_down_events: f64,
    // Truncated field name as served by the device.
    last_down_event_tim: String,
    pvid: f64,
    if_in_octets: f64,
    if_in_ucast_pkts: f64,
    if_in_discards: f64,
    if_in_errors: f64,
    if_in_unknown_protos: f64,
    if_out_octets: f64,
    if_out_ucast_pkts: f64,
    if_out_discards: f64,
    if_out_errors: f64,
    if_ether_under_size_pkt_cnt: f64,
    if_ether_over_size_pkt_cnt: f64,
    if_ether_fragments: f64,
    #[serde(rename = "IfEtherCRCAlignError")]
    if_ether_crc_align_error: f64,
    if_ether_jabber: f64,
    if_ether_pkts: f64,
    #[serde(rename = "IfEtherMCPkts")]
    if_ether_mc_pkts: f64,
    if_ether_bcast_pkts: f64,
    if_ether_pkts64_or_less_octets: f64,
    if_ether_pkts65_to127_octets: f64,
    if_ether_pkts128_to255_octets: f64,
    if_ether_pkts256_to511_octets: f64,
    if_ether_pkts512_to1023_octets: f64,
    if_ether_pkts1024_to1518_octets: f64,
    err_disable_reason: String,
    #[serde(rename = "PresentInHW")]
    present_in_hw: String,
    config_mode: String,
    #[serde(rename = "PRBSRxErrCnt")]
    prbs_rx_err_cnt: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct PortEntry {
    #[allow(dead_code)]
    object_id: String,
    object: PortDetail,
}

/// Paged object-listing envelope. `ObjCount` is authoritative for how many
/// entries to consume; the pagination markers are decoded but not followed.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
#[allow(dead_code)]
struct PortIndex {
    more_exist: bool,
    obj_count: f64,
    current_marker: f64,
    next_marker: f64,
    objects: Vec<PortEntry>,
}

/// Formats a float the way Go's `strconv.FormatFloat(v, 'E', -1, 64)` does:
/// shortest round-trip mantissa with an explicit exponent sign and a
/// two-digit minimum exponent, e.g. `12345.0` -> `1.2345E+04`.
fn format_float(value: f64) -> String {
    let formatted = format!("{value:E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{}E{}{:02}", mantissa, sign, exponent.abs())
            }
            Err(_) => formatted,
        },
        // NaN and infinities carry no exponent.
        None => formatted,
    }
}

/// Decodes the ports envelope into a per-port stat map keyed by port name.
/// Counter fields are kept both under `/proc/net/dev`-style aliases and under
/// their vendor names; consumers may want either vocabulary.
fn translate(body: &[u8]) -> Result<HashMap<String, HashMap<String, String>>, CollectorError> {
    let index: PortIndex = serde_json::from_slice(body)?;

    let count = index.obj_count as usize;
    if count > index.objects.len() {
        return Err(CollectorError::ObjectCount {
            count,
            returned: index.objects.len(),
        });
    }

    let mut net_dev = HashMap::new();
    for entry in &index.objects[..count] {
        let port = &entry.object;

        let mut stats = HashMap::new();
        let mut insert = |field: &str, value: f64| {
            stats.insert(field.to_string(), format_float(value));
        };

        insert("receive_bytes", port.if_in_octets);
        insert("transmit_bytes", port.if_out_octets);
        insert("IfInOctets", port.if_in_octets);
        insert("IfOutOctets", port.if_out_octets);

        insert("receive_packets", port.if_in_ucast_pkts);
        insert("transmit_packets", port.if_out_ucast_pkts);
        insert("IfInUcastPkts", port.if_in_ucast_pkts);
        insert("IfOutUcastPkts", port.if_out_ucast_pkts);

        insert("receive_errs", port.if_in_errors);
        insert("transmit_errs", port.if_out_errors);
        insert("IfInErrors", port.if_in_errors);
        insert("IfOutErrors", port.if_out_errors);

        insert("receive_drop", port.if_in_discards);
        insert("transmit_drop", port.if_out_discards);
        insert("IfInDiscards", port.if_in_discards);
        insert("IfOutDiscards", port.if_out_discards);

        insert("receive_multicast", port.if_ether_mc_pkts);
        insert("IfEtherMCPkts", port.if_ether_mc_pkts);

        insert("NumUpEvents", port.num_up_events);
        insert("NumDownEvents", port.num_down_events);
        insert("IfInUnknownProtos", port.if_in_unknown_protos);
        insert("IfEtherUnderSizePktCnt", port.if_ether_under_size_pkt_cnt);
        insert("IfEtherOverSizePktCnt", port.if_ether_over_size_pkt_cnt);
        insert("IfEtherFragments", port.if_ether_fragments);
        insert("IfEtherCRCAlignError", port.if_ether_crc_align_error);
        insert("IfEtherJabber", port.if_ether_jabber);
        insert("IfEtherPkts", port.if_ether_pkts);
        insert("IfEtherBcastPkts", port.if_ether_bcast_pkts);
        insert("IfEtherPkts64OrLessOctets", port.if_ether_pkts64_or_less_octets);
        insert("IfEtherPkts65To127Octets", port.if_ether_pkts65_to127_octets);
        insert("IfEtherPkts128To255Octets", port.if_ether_pkts128_to255_octets);
        insert("IfEtherPkts256To511Octets", port.if_ether_pkts256_to511_octets);
        insert("IfEtherPkts512To1023Octets", port.if_ether_pkts512_to1023_octets);
        insert(
            "IfEtherPkts1024To1518Octets",
            port.if_ether_pkts1024_to1518_octets,
        );

        // Duplicate port names are last-write-wins.
        net_dev.insert(port.name.clone(), stats);
    }

    Ok(net_dev)
}

/// Collector for the `ports` stat domain.
pub struct PortsCollector {
    descs: HashMap<String, sync::Arc<metric::Desc>>,
}

impl PortsCollector {
    pub fn new() -> Self {
        PortsCollector {
            descs: HashMap::new(),
        }
    }
}

impl PortsCollector {
    /// Parses every translated value back to a number and buffers the
    /// resulting samples; a single unparseable value aborts the whole batch so
    /// that nothing reaches the sink.
    fn collect_samples(
        &mut self,
        net_dev: &HashMap<String, HashMap<String, String>>,
    ) -> Result<Vec<metric::Sample>, CollectorError> {
        let mut samples = Vec::new();
        for (device, stats) in net_dev {
            for (field, text) in stats {
                let value: f64 = text.parse().map_err(|source| CollectorError::Value {
                    field: field.clone(),
                    value: text.clone(),
                    source,
                })?;

                let desc = self
                    .descs
                    .entry(field.clone())
                    .or_insert_with(|| sync::Arc::new(metric::Desc::new(NAMESPACE, field)))
                    .clone();

                samples.push(metric::Sample {
                    desc,
                    device: device.clone(),
                    value,
                });
            }
        }

        Ok(samples)
    }
}

#[async_trait]
impl Collector for PortsCollector {
    async fn update(
        &mut self,
        params: &ScrapeParams,
        sink: &SampleSink,
    ) -> Result<(), CollectorError> {
        let url = format!(
            "{}://{}:{}{}",
            params.proto, params.target, params.port, PORTS_PATH
        );
        let body = http::get(&url, params).await?;
        let net_dev = translate(&body)?;

        let samples = self.collect_samples(&net_dev)?;
        for sample in samples {
            let _ = sink.send(sample);
        }

        Ok(())
    }
}
