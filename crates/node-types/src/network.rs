// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The networks this node knows how to index.
///
/// The original implementation carried two overlapping enums (one on the
/// filter package, one on the protocol package); this is the single
/// authoritative closed set referenced everywhere in this workspace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Network {
    Ethereum,
    Optimism,
    Polygon,
    Arbitrum,
    ArweaveMainnet,
    Farcaster,
    ActivityPub,
    Rss,
}

/// Which Source Client Pool protocol family serves a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NetworkSource {
    Evm,
    Arweave,
    Farcaster,
    ActivityPub,
    Rss,
}

impl Network {
    /// Maps the network to the protocol family of its Source Client Pool,
    /// mirroring `filter.Network.Source()` in the original implementation.
    pub fn source(self) -> NetworkSource {
        match self {
            Network::Ethereum | Network::Optimism | Network::Polygon | Network::Arbitrum => {
                NetworkSource::Evm
            }
            Network::ArweaveMainnet => NetworkSource::Arweave,
            Network::Farcaster => NetworkSource::Farcaster,
            Network::ActivityPub => NetworkSource::ActivityPub,
            Network::Rss => NetworkSource::Rss,
        }
    }

    /// Approximate time between blocks/messages for the source's "caught
    /// up, sleep and poll again" cadence (spec.md §4.2 step 4).
    pub fn poll_interval(self) -> std::time::Duration {
        match self {
            Network::ArweaveMainnet => std::time::Duration::from_secs(120),
            Network::Ethereum | Network::Optimism | Network::Polygon | Network::Arbitrum => {
                std::time::Duration::from_secs(5)
            }
            Network::Farcaster | Network::ActivityPub | Network::Rss => {
                std::time::Duration::from_secs(15)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_mapping_is_total_and_stable() {
        assert_eq!(Network::Ethereum.source(), NetworkSource::Evm);
        assert_eq!(Network::Optimism.source(), NetworkSource::Evm);
        assert_eq!(Network::ArweaveMainnet.source(), NetworkSource::Arweave);
        assert_eq!(Network::Farcaster.source(), NetworkSource::Farcaster);
        assert_eq!(Network::ActivityPub.source(), NetworkSource::ActivityPub);
        assert_eq!(Network::Rss.source(), NetworkSource::Rss);
    }

    #[test]
    fn round_trips_through_serde() {
        let json = serde_json::to_string(&Network::Optimism).unwrap();
        assert_eq!(json, "\"optimism\"");
        assert_eq!(serde_json::from_str::<Network>(&json).unwrap(), Network::Optimism);
    }
}
