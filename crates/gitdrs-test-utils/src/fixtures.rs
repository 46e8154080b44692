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

//! Test fixture management.
//!
//! Deterministic content for large-object tests.

/// Test fixture helpers.
pub struct TestFixtures;

impl TestFixtures {
    /// Exactly ten bytes of content.
    pub fn ten_bytes() -> Vec<u8> {
        b"0123456789".to_vec()
    }

    /// Create a sample binary file with predictable but varied content.
    pub fn binary_file(size: usize) -> Vec<u8> {
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    /// Content that differs per `seed` but has the same `size`.
    pub fn seeded(seed: u8, size: usize) -> Vec<u8> {
        (0..size)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    /// A blob shaped like a pointer but missing its `oid` line.
    pub fn pointer_without_oid(size: u64) -> Vec<u8> {
        format!("version https://git-lfs.github.com/spec/v1\nsize {}\n", size).into_bytes()
    }
}
