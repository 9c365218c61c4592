// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A gauge-tracked `mpsc` channel, grounded on `mysten-metrics`'s
//! `metered_channel` (see its `metered_channel_tests.rs` in the retrieval
//! pack). Used for the capacity-1 producer→transformer channel and the
//! small-bounded transformer→sink channel (spec.md §4.4, §9
//! "Backpressure").

use prometheus::IntGauge;
use tokio::sync::mpsc;

pub struct MeteredSender<T> {
    inner: mpsc::Sender<T>,
    gauge: IntGauge,
}

pub struct MeteredReceiver<T> {
    inner: mpsc::Receiver<T>,
    gauge: IntGauge,
}

/// Constructs a bounded channel of the given capacity whose current
/// occupancy is published on `gauge`.
pub fn channel<T>(capacity: usize, gauge: IntGauge) -> (MeteredSender<T>, MeteredReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        MeteredSender {
            inner: tx,
            gauge: gauge.clone(),
        },
        MeteredReceiver { inner: rx, gauge },
    )
}

impl<T> MeteredSender<T> {
    pub async fn send(&self, value: T) -> Result<(), mpsc::error::SendError<T>> {
        self.inner.send(value).await?;
        self.gauge.inc();
        Ok(())
    }
}

impl<T> Clone for MeteredSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gauge: self.gauge.clone(),
        }
    }
}

impl<T> MeteredReceiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        let value = self.inner.recv().await;
        if value.is_some() {
            self.gauge.dec();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gauge_tracks_occupancy() {
        let gauge = IntGauge::new("test_gauge", "test").unwrap();
        let (tx, mut rx) = channel(8, gauge.clone());

        assert_eq!(gauge.get(), 0);
        tx.send(1).await.unwrap();
        assert_eq!(gauge.get(), 1);
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(gauge.get(), 0);
    }
}
