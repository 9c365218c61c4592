// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Arweave address derivation: `base64url(sha256(owner_public_key))`,
//! mirroring `arweave.PublicKeyToAddress` in the original implementation.

use base64::Engine;
use sha2::{Digest, Sha256};

pub fn derive_arweave_address(owner_b64url: &str) -> String {
    let owner_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(owner_b64url)
        .unwrap_or_default();
    let digest = Sha256::digest(&owner_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}
