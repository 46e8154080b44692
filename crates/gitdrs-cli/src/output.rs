// git-drs - Large files for Git, backed by data repositories
// Copyright (C) 2025 git-drs Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Shared output formatting for CLI commands.
//!
//! Human-facing lines go to stdout, errors to stderr. Commands that speak a
//! protocol on stdout (`transfer`) must not use this module.
//!
//! ```rust,ignore
//! output::success("Registered 3 objects");
//! output::detail("Remote", "origin");
//! ```

use console::style;

/// Print a success message with a green check mark.
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message to stderr with a red cross.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print an informational message.
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").cyan(), msg);
}

/// Print a warning to stderr.
///
/// Warnings stay off stdout so hooks can pipe our output safely.
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow(), msg);
}

/// Print an indented key-value line, value highlighted.
///
/// ```rust,ignore
/// output::detail("Scope", "/programs/prog/projects/proj");
/// // Output:   Scope: /programs/prog/projects/proj
/// ```
pub fn detail(key: &str, value: &str) {
    println!("  {}: {}", key, style(value).cyan());
}

/// Print one failed object line to stderr.
pub fn object_failure(oid: &str, msg: &str) {
    eprintln!("  {} {} {}", style("✗").red(), style(short_oid(oid)).yellow(), msg);
}

/// First 12 characters of an object id
pub fn short_oid(oid: &str) -> &str {
    oid.get(..12).unwrap_or(oid)
}
