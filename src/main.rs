// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

#![warn(missing_docs)]

//! FlexSwitch Exporter is a Prometheus exporter for the FlexSwitch switch
//! management REST API. The target switch is selected per scrape request via
//! `?target=` and `?module=` query parameters, in the style of `snmp_exporter`.

mod collector;
mod config;
mod hyper;
mod metric;
mod prometheus;

use log::{error, info};

fn init_logger() {
    let module = env!("CARGO_CRATE_NAME");
    let module_filter = if config::get().debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_module(module, module_filter)
        .init();
}

#[tokio::main]
async fn main() {
    config::get();
    init_logger();

    info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    // Validate the module config up front; a broken file is fatal at startup
    // even though scrape requests reload it on every hit.
    if let Err(err) = config::load_modules(&config::get().config_file) {
        error!("error parsing config file: {err:#}");
        return;
    }

    let exporter = match prometheus::Exporter::new() {
        Ok(exporter) => exporter,
        Err(err) => {
            error!("failed to set up exporter metrics: {err:?}");
            return;
        }
    };

    let state = hyper::State {
        collectors: collector::Registry::new(),
        exporter,
    };

    if let Err(err) = hyper::run(state).await {
        error!("failed to start web server: {err:?}");
    }
}
