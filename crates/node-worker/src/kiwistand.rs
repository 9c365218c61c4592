// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! KiwiStand mint worker (Optimism). Matches the ERC-721 `Transfer` event
//! on the KIWI contract and reports it as a `SocialMint` Activity,
//! mirroring the original `kiwistand` worker's `matchTransfer`/
//! `transformKiwiMint` path.

use node_types::{
    Action, ActionMetadata, Activity, Fee, Filter, Network, Platform, Tag, Task, TaskPayload, Type,
};

use crate::{Worker, WorkerError};

/// `keccak256("Transfer(address,address,uint256)")`.
const TRANSFER_EVENT_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub struct KiwistandWorker {
    contract_address: String,
}

impl KiwistandWorker {
    pub fn new(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
        }
    }
}

impl Worker for KiwistandWorker {
    fn name(&self) -> &'static str {
        "kiwistand"
    }

    fn platform(&self) -> Platform {
        Platform::Kiwistand
    }

    fn networks(&self) -> &[Network] {
        &[Network::Optimism]
    }

    fn tags(&self) -> &[Tag] {
        &[Tag::Collectible, Tag::Social]
    }

    fn types(&self) -> &[Type] {
        &[Type::SocialMint]
    }

    fn filter(&self) -> Filter {
        Filter::new(self.networks().to_vec())
            .with_addresses([self.contract_address.clone()])
            .with_topics([TRANSFER_EVENT_TOPIC.to_string()])
    }

    fn matches(&self, task: &Task) -> bool {
        let TaskPayload::Evm { receipt, .. } = &task.payload else {
            return false;
        };
        receipt.logs.iter().any(|log| self.matches_transfer_log(log))
    }

    fn transform(&self, task: &Task) -> Result<Activity, WorkerError> {
        let TaskPayload::Evm { tx, receipt, .. } = &task.payload else {
            panic!("kiwistand received a non-EVM task: {}", task.id);
        };

        let mut actions = Vec::new();
        for log in &receipt.logs {
            if !self.matches_transfer_log(log) {
                continue;
            }
            let Some(action) = self.transform_transfer_log(log) else {
                tracing::warn!(task_id = %task.id, "skipping malformed KiwiStand Transfer log");
                continue;
            };
            actions.push(action);
        }

        if actions.is_empty() {
            return Err(WorkerError::NoMatchingEvent {
                worker: self.name(),
                task_id: task.id.clone(),
            });
        }

        Ok(Activity {
            id: task.id.clone(),
            network: task.network,
            from: tx.from.clone(),
            to: tx.to.clone().unwrap_or_default(),
            ty: Type::SocialMint,
            tag: Tag::Social,
            platform: Platform::Kiwistand,
            timestamp: task.timestamp,
            status: receipt.status,
            fee: Fee {
                amount: "0".to_string(),
                decimal: 18,
                address: None,
            },
            actions,
        })
    }
}

impl KiwistandWorker {
    fn matches_transfer_log(&self, log: &node_types::EvmLog) -> bool {
        log.address.eq_ignore_ascii_case(&self.contract_address)
            && log
                .topics
                .first()
                .map(|t| t.eq_ignore_ascii_case(TRANSFER_EVENT_TOPIC))
                .unwrap_or(false)
    }

    fn transform_transfer_log(&self, log: &node_types::EvmLog) -> Option<Action> {
        let from = address_from_topic(log.topics.get(1)?)?;
        let to_raw = address_from_topic(log.topics.get(2)?)?;
        let token_id = log.data.trim_start_matches("0x").to_string();

        // The original implementation has been observed to leave `to`
        // empty rather than echoing the zero address on a burn; preserved
        // here rather than "corrected" to `0x000...0`.
        let to = if to_raw.eq_ignore_ascii_case(ZERO_ADDRESS) {
            String::new()
        } else {
            to_raw
        };

        Some(Action {
            ty: Type::SocialMint,
            platform: Platform::Kiwistand,
            from,
            to,
            metadata: ActionMetadata::Mint {
                collection: self.contract_address.clone(),
                token_id: Some(token_id),
            },
        })
    }
}

/// EVM log topics encode an indexed `address` as a 32-byte word; the
/// address is the low 20 bytes.
fn address_from_topic(topic: &str) -> Option<String> {
    let hex = topic.strip_prefix("0x")?;
    if hex.len() < 40 {
        return None;
    }
    Some(format!("0x{}", &hex[hex.len() - 40..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use node_types::{EvmBlockRef, EvmLog, EvmReceipt, EvmTransaction};

    const CONTRACT: &str = "0xkiwi";

    fn transfer_log(from: &str, to: &str, token_id: &str) -> EvmLog {
        EvmLog {
            address: CONTRACT.to_string(),
            topics: vec![
                TRANSFER_EVENT_TOPIC.to_string(),
                format!("0x{:0>64}", from.trim_start_matches("0x")),
                format!("0x{:0>64}", to.trim_start_matches("0x")),
            ],
            data: format!("0x{token_id:0>64}"),
        }
    }

    fn mint_task(log: EvmLog) -> Task {
        Task {
            network: Network::Optimism,
            id: "mint-1".to_string(),
            timestamp: Utc::now(),
            payload: TaskPayload::Evm {
                block: EvmBlockRef { height: 1, index_in_block: 0 },
                tx: EvmTransaction {
                    hash: "mint-1".to_string(),
                    from: "0xminter".to_string(),
                    to: Some(CONTRACT.to_string()),
                    value: "0".to_string(),
                    input: "0x".to_string(),
                    gas_price: "0".to_string(),
                    gas_used: 0,
                },
                receipt: EvmReceipt { status: true, logs: vec![log] },
            },
        }
    }

    #[test]
    fn matches_and_transforms_a_mint() {
        let worker = KiwistandWorker::new(CONTRACT);
        let task = mint_task(transfer_log("0x0", "0xrecipient", "7"));

        assert!(worker.matches(&task));
        let activity = worker.transform(&task).unwrap();
        assert_eq!(activity.ty, Type::SocialMint);
        match &activity.actions[0].metadata {
            ActionMetadata::Mint { token_id, .. } => {
                assert_eq!(token_id.as_deref(), Some("7"));
            }
            other => panic!("expected Mint metadata, got {other:?}"),
        }
    }

    #[test]
    fn burn_to_zero_address_leaves_to_empty() {
        let worker = KiwistandWorker::new(CONTRACT);
        let task = mint_task(transfer_log("0xholder", "0x0", "7"));

        let activity = worker.transform(&task).unwrap();
        assert_eq!(activity.actions[0].to, "");
    }

    #[test]
    fn unrelated_log_does_not_match() {
        let worker = KiwistandWorker::new(CONTRACT);
        let mut log = transfer_log("0x0", "0xrecipient", "7");
        log.address = "0xother".to_string();
        let task = mint_task(log);
        assert!(!worker.matches(&task));
    }
}
