// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |          change / patch / preview
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |           files           |
//!              |  FileEngine: validate,    |
//!              |  protect, commit, respond |
//!              '--+-----------+--------+---'
//!                 |           |        |
//!                 v           v        v
//!               git          lfs     config
//!         backend/diff/   pointer,   TOML, env,
//!         fast_import     store,meta  --set
//!
//!   +-----------------------------------------+
//!   |  core   process runner, env             |
//!   +-----------------------------------------+
//!   |  foundation   error, logging, utility   |
//!   +-----------------------------------------+
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod core;
pub mod error;
pub mod files;
pub mod git;
pub mod lfs;
pub mod logging;
pub mod utility;
