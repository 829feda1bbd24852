// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use serde::Deserialize;
use std::{collections::HashMap, fs, path, sync};

pub struct Config {
    pub debug: bool,
    pub hyper_addr: String,
    pub config_file: path::PathBuf,
    pub enabled_collectors: String,
    pub scrape_timeout: u64,
}

fn parse_args() -> Config {
    let matches = Command::new("flexswitch-exporter")
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("addr")
                .long("web.listen-address")
                .default_value("0.0.0.0:9117"),
        )
        .arg(
            Arg::new("config_file")
                .long("config.file")
                .default_value("flexswitch.yml"),
        )
        .arg(
            Arg::new("collectors")
                .long("collectors.enabled")
                .default_value("ports"),
        )
        .arg(
            Arg::new("scrape_timeout")
                .long("scrape.timeout")
                .value_parser(clap::value_parser!(u64))
                .default_value("10"),
        )
        .get_matches();

    let debug = matches.get_flag("debug");
    let hyper_addr = matches.get_one::<String>("addr").unwrap().clone();
    let config_file = path::PathBuf::from(matches.get_one::<String>("config_file").unwrap());
    let enabled_collectors = matches.get_one::<String>("collectors").unwrap().clone();
    let scrape_timeout = *matches.get_one::<u64>("scrape_timeout").unwrap();

    Config {
        debug,
        hyper_addr,
        config_file,
        enabled_collectors,
        scrape_timeout,
    }
}

pub fn get() -> &'static Config {
    static CONFIG: sync::LazyLock<Config> = sync::LazyLock::new(parse_args);
    &CONFIG
}

/// Named connection profiles, keyed by the `module` query parameter.
pub type Modules = HashMap<String, Module>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Module {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_proto")]
    pub proto: String,
    #[serde(default)]
    pub auth: Auth,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Auth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    8080
}

fn default_proto() -> String {
    "http".to_string()
}

pub fn load_modules(path: impl AsRef<path::Path>) -> Result<Modules> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    let modules: Modules =
        serde_yml::from_str(&content).with_context(|| format!("failed to parse {path:?}"))?;

    Ok(modules)
}
