// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Utility modules.
//!
//! ```text
//! charset
//!   detect()  BOM / UTF-8 / legacy fallback of an existing file
//!   encode()  new UTF-8 content back into that charset
//! ```

pub mod charset;
