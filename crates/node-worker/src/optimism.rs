// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Optimism Standard Bridge deposit worker (spec.md §8 S1, S2): matches
//! calls into the L1 bridge contract and emits a `transaction_bridge`
//! Activity for each one.

use node_types::{
    Action, ActionMetadata, Activity, BridgeAction, Fee, Filter, Network, Platform, Tag, Task,
    TaskPayload, TokenAmount, Type,
};

use crate::token::{StaticTokenMetadataLookup, TokenMetadataLookup};
use crate::{Worker, WorkerError};

/// `depositTransaction`/ETH deposit selector on the L1 Standard Bridge.
const SELECTOR_ETH_DEPOSIT: &str = "0xb1a1a882";
/// `depositERC20(address,address,uint256,uint32,bytes)` selector.
const SELECTOR_ERC20_DEPOSIT: &str = "0x58a997f6";

pub struct OptimismBridgeWorker {
    bridge_addresses: Vec<String>,
    tokens: Box<dyn TokenMetadataLookup>,
}

impl OptimismBridgeWorker {
    pub fn new() -> Self {
        Self::with_tokens(Box::new(StaticTokenMetadataLookup::new().with_well_known_tokens()))
    }

    pub fn with_tokens(tokens: Box<dyn TokenMetadataLookup>) -> Self {
        Self {
            bridge_addresses: Vec::new(),
            tokens,
        }
    }

    pub fn with_bridge_addresses(mut self, addresses: impl IntoIterator<Item = String>) -> Self {
        self.bridge_addresses = addresses.into_iter().collect();
        self
    }
}

impl Default for OptimismBridgeWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for OptimismBridgeWorker {
    fn name(&self) -> &'static str {
        "optimism-bridge"
    }

    fn platform(&self) -> Platform {
        Platform::Optimism
    }

    fn networks(&self) -> &[Network] {
        &[Network::Ethereum]
    }

    fn tags(&self) -> &[Tag] {
        &[Tag::Transaction]
    }

    fn types(&self) -> &[Type] {
        &[Type::TransactionBridge]
    }

    fn filter(&self) -> Filter {
        Filter::new(self.networks().to_vec()).with_addresses(self.bridge_addresses.clone())
    }

    fn matches(&self, task: &Task) -> bool {
        let TaskPayload::Evm { tx, .. } = &task.payload else {
            return false;
        };
        let Some(selector) = selector(&tx.input) else {
            return false;
        };
        if !self.bridge_addresses.is_empty() {
            let Some(to) = tx.to.as_deref() else {
                return false;
            };
            if !self.bridge_addresses.iter().any(|a| a.eq_ignore_ascii_case(to)) {
                return false;
            }
        }
        selector == SELECTOR_ETH_DEPOSIT || selector == SELECTOR_ERC20_DEPOSIT
    }

    fn transform(&self, task: &Task) -> Result<Activity, WorkerError> {
        let TaskPayload::Evm { tx, receipt, .. } = &task.payload else {
            panic!("optimism-bridge received a non-EVM task: {}", task.id);
        };

        let selector = selector(&tx.input).ok_or_else(|| WorkerError::NoMatchingEvent {
            worker: self.name(),
            task_id: task.id.clone(),
        })?;

        let fee_amount = parse_amount(&tx.gas_price)
            .unwrap_or(0)
            .saturating_mul(tx.gas_used as u128);

        let to = tx.to.clone().unwrap_or_default();

        let token = match selector {
            SELECTOR_ETH_DEPOSIT => TokenAmount {
                name: "Ethereum".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
                value: parse_amount(&tx.value).unwrap_or(0).to_string(),
                address: None,
                standard: None,
            },
            SELECTOR_ERC20_DEPOSIT => decode_erc20_deposit(&tx.input, &self.tokens)
                .ok_or_else(|| WorkerError::NoMatchingEvent {
                    worker: self.name(),
                    task_id: task.id.clone(),
                })?,
            _ => {
                return Err(WorkerError::NoMatchingEvent {
                    worker: self.name(),
                    task_id: task.id.clone(),
                })
            }
        };

        Ok(Activity {
            id: task.id.clone(),
            network: task.network,
            from: tx.from.clone(),
            to: to.clone(),
            ty: Type::TransactionBridge,
            tag: Tag::Transaction,
            platform: Platform::Optimism,
            timestamp: task.timestamp,
            status: receipt.status,
            fee: Fee {
                amount: fee_amount.to_string(),
                decimal: 18,
                address: None,
            },
            actions: vec![Action {
                ty: Type::TransactionBridge,
                platform: Platform::Optimism,
                from: tx.from.clone(),
                to,
                metadata: ActionMetadata::Bridge {
                    action: BridgeAction::Deposit,
                    source: Network::Ethereum,
                    target: Network::Optimism,
                    token,
                },
            }],
        })
    }
}

fn selector(input: &str) -> Option<&str> {
    input.get(0..10)
}

/// Parses a decimal or `0x`-prefixed hex-encoded amount into its smallest
/// unit. Values are taken to fit in 128 bits, which covers every ERC20
/// total supply observed on Ethereum mainnet by a wide margin.
fn parse_amount(s: &str) -> Option<u128> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u128::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Decodes `depositERC20(address l1Token, address l2Token, uint256 amount, uint32 minGasLimit, bytes extraData)`
/// calldata, per the OP Stack Standard Bridge ABI.
fn decode_erc20_deposit(input: &str, tokens: &dyn TokenMetadataLookup) -> Option<TokenAmount> {
    let hex = input.strip_prefix("0x")?;
    if hex.len() < 8 + 64 * 3 {
        return None;
    }
    let l1_token_word = &hex[8..72];
    let amount_word = &hex[8 + 128..8 + 192];

    let l1_token = format!("0x{}", &l1_token_word[24..]);
    let amount = u128::from_str_radix(&amount_word[amount_word.len() - 32..], 16).ok()?;

    let metadata = tokens
        .lookup(Network::Ethereum, &l1_token)
        .unwrap_or(crate::token::TokenMetadata {
            name: l1_token.clone(),
            symbol: "UNKNOWN".to_string(),
            decimals: 18,
            standard: Some("erc20".to_string()),
        });

    Some(TokenAmount {
        name: metadata.name,
        symbol: metadata.symbol,
        decimals: metadata.decimals,
        value: amount.to_string(),
        address: Some(l1_token),
        standard: metadata.standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use node_types::{EvmBlockRef, EvmReceipt, EvmTransaction};

    fn evm_task(id: &str, input: &str, value: &str, to: &str) -> Task {
        Task {
            network: Network::Ethereum,
            id: id.to_string(),
            timestamp: Utc::now(),
            payload: TaskPayload::Evm {
                block: EvmBlockRef {
                    height: 17459684,
                    index_in_block: 0,
                },
                tx: EvmTransaction {
                    hash: id.to_string(),
                    from: "0xalice".to_string(),
                    to: Some(to.to_string()),
                    value: value.to_string(),
                    input: input.to_string(),
                    gas_price: "21000134931764".to_string(),
                    gas_used: 100,
                },
                receipt: EvmReceipt {
                    status: true,
                    logs: vec![],
                },
            },
        }
    }

    #[test]
    fn s1_eth_deposit_matches_and_transforms() {
        let worker = OptimismBridgeWorker::new();
        let task = evm_task(
            "0x3da5...4bc1",
            SELECTOR_ETH_DEPOSIT,
            "100857001000000000000",
            "0xbridge",
        );

        assert!(worker.matches(&task));
        let activity = worker.transform(&task).unwrap();

        assert_eq!(activity.ty, Type::TransactionBridge);
        assert_eq!(activity.platform, Platform::Optimism);
        assert_eq!(activity.fee.decimal, 18);
        assert_eq!(activity.fee.amount, "2100013493176400");
        assert_eq!(activity.actions.len(), 1);
        match &activity.actions[0].metadata {
            ActionMetadata::Bridge { action, source, target, token } => {
                assert!(matches!(action, BridgeAction::Deposit));
                assert_eq!(*source, Network::Ethereum);
                assert_eq!(*target, Network::Optimism);
                assert_eq!(token.symbol, "ETH");
                assert_eq!(token.decimals, 18);
                assert_eq!(token.value, "100857001000000000000");
            }
            other => panic!("expected Bridge metadata, got {other:?}"),
        }
    }

    #[test]
    fn s2_erc20_deposit_decodes_calldata_amount() {
        let worker = OptimismBridgeWorker::new();
        // l1Token = USDC, l2Token = zero, amount = 11590000000
        let l1_token = "000000000000000000000000a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        let l2_token = "0".repeat(64);
        let amount = format!("{:064x}", 11590000000u128);
        let input = format!("0x{SELECTOR_ERC20_DEPOSIT_HEX}{l1_token}{l2_token}{amount}", SELECTOR_ERC20_DEPOSIT_HEX = "58a997f6");

        let task = evm_task("0x2392...3751", &input, "0", "0xbridge");
        assert!(worker.matches(&task));
        let activity = worker.transform(&task).unwrap();

        match &activity.actions[0].metadata {
            ActionMetadata::Bridge { token, .. } => {
                assert_eq!(token.symbol, "USDC");
                assert_eq!(token.decimals, 6);
                assert_eq!(token.value, "11590000000");
                assert_eq!(token.standard.as_deref(), Some("erc20"));
            }
            other => panic!("expected Bridge metadata, got {other:?}"),
        }
    }

    #[test]
    fn non_bridge_selector_does_not_match() {
        let worker = OptimismBridgeWorker::new();
        let task = evm_task("0xdead", "0xdeadbeef", "0", "0xbridge");
        assert!(!worker.matches(&task));
    }

    #[test]
    fn matches_implies_filter_admits() {
        let worker = OptimismBridgeWorker::new().with_bridge_addresses(["0xbridge".to_string()]);
        let task = evm_task("0x1", SELECTOR_ETH_DEPOSIT, "1", "0xbridge");
        assert!(worker.matches(&task));
        assert!(worker.filter().admits(&task));
    }
}
