// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This crate contains various utilities for working with static resources:
//! media-type lookup and content codings, amongst other small tools.

pub mod compression;
pub mod media_type;

pub use compression::*;
pub use media_type::*;

/// Returns a human-friendly string approximating the given data size, e.g.
/// `316`, `1.8K`, `324M`.
#[must_use]
pub fn approximate_size(size: u64) -> String {
    const UNITS: [char; 7] = [' ', 'K', 'M', 'G', 'T', 'P', 'E'];
    let mut unit = 0;
    let mut scaled = size as f64;
    while scaled >= 1000.0 {
        unit += 1;
        scaled /= 1024.0;
    }
    if scaled < 10.0 && unit > 0 {
        format!("{:.1}{}", scaled, UNITS[unit])
    } else {
        format!("{:.0}{}", scaled, UNITS[unit])
    }
}
