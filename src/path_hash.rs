/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::hash::Hasher;

use twox_hash::XxHash64;

/// 64-bit deterministic, non-cryptographic hash over a replica-relative
/// path's raw bytes. No normalization: equal byte sequences hash equal.
///
/// Seed is fixed at 0 so the state database and the detector always
/// agree, per spec.md §4.1 ("swap in lockstep").
pub fn hash_path(path: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(path.as_bytes());
    hasher.finish()
}
