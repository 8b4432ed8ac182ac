//! Order book snapshot records: the unit of data flowing from producers to
//! storage.
//!
//! # Timestamp convention
//!
//! All timestamps are in **microseconds since Unix epoch** (us). The storage
//! encoder narrows them to the backend's native precision at write time.

use serde::{Deserialize, Serialize};

use crate::error::DvError;
use crate::time_util::now_us;

// ---------------------------------------------------------------------------
// PriceLevel
// ---------------------------------------------------------------------------

/// One price level of an order book side.
///
/// The pipeline never interprets these values; they are carried through to
/// the stored document as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub amount: f64,
}

impl PriceLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }
}

// ---------------------------------------------------------------------------
// SnapshotRecord
// ---------------------------------------------------------------------------

/// One observed order book state for one exchange/pair at one instant.
///
/// Immutable once built: fields are private and only exposed through
/// accessors. There is no identity beyond content, so submitting two equal
/// records yields two stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct SnapshotRecord {
    exchange_name: String,
    pair: String,
    observed_at_us: u64,
    asks: Vec<PriceLevel>,
    bids: Vec<PriceLevel>,
}

impl SnapshotRecord {
    /// Build a record, rejecting empty exchange or pair identifiers.
    pub fn new(
        exchange_name: impl Into<String>,
        pair: impl Into<String>,
        observed_at_us: u64,
        asks: Vec<PriceLevel>,
        bids: Vec<PriceLevel>,
    ) -> Result<Self, DvError> {
        let exchange_name = exchange_name.into();
        let pair = pair.into();
        if exchange_name.is_empty() {
            return Err(DvError::InvalidRecord("empty exchange name".into()));
        }
        if pair.is_empty() {
            return Err(DvError::InvalidRecord(format!("empty pair for exchange {exchange_name}")));
        }
        Ok(Self { exchange_name, pair, observed_at_us, asks, bids })
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    /// Capture time in microseconds since Unix epoch.
    pub fn observed_at_us(&self) -> u64 {
        self.observed_at_us
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }
}

impl std::fmt::Display for SnapshotRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Snapshot({} {} asks={} bids={} t={})",
            self.exchange_name,
            self.pair,
            self.asks.len(),
            self.bids.len(),
            self.observed_at_us
        )
    }
}

/// Wire shape used for deserialization so that decoded records go through
/// the same validation as [`SnapshotRecord::new`]. A record without
/// `observed_at_us` is stamped with the time it was decoded.
#[derive(Deserialize)]
struct RawSnapshot {
    exchange_name: String,
    pair: String,
    observed_at_us: Option<u64>,
    #[serde(default)]
    asks: Vec<PriceLevel>,
    #[serde(default)]
    bids: Vec<PriceLevel>,
}

impl TryFrom<RawSnapshot> for SnapshotRecord {
    type Error = DvError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let observed_at_us = raw.observed_at_us.unwrap_or_else(now_us);
        Self::new(raw.exchange_name, raw.pair, observed_at_us, raw.asks, raw.bids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<PriceLevel> {
        vec![PriceLevel::new(30000.5, 0.25), PriceLevel::new(30001.0, 1.0)]
    }

    #[test]
    fn new_keeps_fields_in_order() {
        let rec = SnapshotRecord::new("binance", "BTCUSDT", 1_672_515_782_136_000, levels(), vec![]).unwrap();
        assert_eq!(rec.exchange_name(), "binance");
        assert_eq!(rec.pair(), "BTCUSDT");
        assert_eq!(rec.observed_at_us(), 1_672_515_782_136_000);
        assert_eq!(rec.asks()[1].price, 30001.0);
        assert!(rec.bids().is_empty());
    }

    #[test]
    fn empty_identifiers_rejected() {
        assert!(matches!(
            SnapshotRecord::new("", "BTCUSDT", 0, vec![], vec![]),
            Err(DvError::InvalidRecord(_))
        ));
        assert!(matches!(
            SnapshotRecord::new("okx", "", 0, vec![], vec![]),
            Err(DvError::InvalidRecord(_))
        ));
    }

    #[test]
    fn deserialize_validates() {
        let json = r#"{"exchange_name":"okx","pair":"BTC-USDT","observed_at_us":5,
                       "asks":[{"price":1.5,"amount":2.0}]}"#;
        let rec: SnapshotRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.pair(), "BTC-USDT");
        assert_eq!(rec.asks().len(), 1);
        assert!(rec.bids().is_empty());

        let bad = r#"{"exchange_name":"","pair":"BTC-USDT","observed_at_us":5}"#;
        assert!(serde_json::from_str::<SnapshotRecord>(bad).is_err());
    }

    #[test]
    fn missing_timestamp_is_stamped_on_decode() {
        let before = now_us();
        let rec: SnapshotRecord = serde_json::from_str(r#"{"exchange_name":"okx","pair":"BTC-USDT"}"#).unwrap();
        assert!(rec.observed_at_us() >= before);
        assert!(rec.observed_at_us() <= now_us());
    }

    #[test]
    fn display_is_compact() {
        let rec = SnapshotRecord::new("bybit", "ETHUSDT", 7, levels(), levels()).unwrap();
        assert_eq!(rec.to_string(), "Snapshot(bybit ETHUSDT asks=2 bids=2 t=7)");
    }
}
