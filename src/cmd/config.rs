// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! `config` and `config-files`: show what the engine will run with.

use crate::config::Config;

/// Prints every effective `section.key = value`.
pub fn run_config_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Prints the configuration layers in precedence order.
pub fn run_config_files_command(layers: &[String]) {
    if layers.is_empty() {
        println!("defaults only");
        return;
    }
    for layer in layers {
        println!("{layer}");
    }
}
