//! Snapshot record → BSON document encoder.
//!
//! Stored document shape:
//!
//! ```text
//! {
//!   exchangeName: string,
//!   ticker:       string,
//!   timestamp:    datetime (ms precision),
//!   asks:         [{ price: double, amount: double }, ...],
//!   bids:         [{ price: double, amount: double }, ...]
//! }
//! ```

use dv_core::time_util::us_to_ms;
use dv_core::{PriceLevel, SnapshotRecord};
use mongodb::bson::{DateTime, Document, doc};

/// Encode one snapshot as the document persisted by the MongoDB backend.
pub fn encode_snapshot(record: &SnapshotRecord) -> Document {
    doc! {
        "exchangeName": record.exchange_name(),
        "ticker": record.pair(),
        "timestamp": DateTime::from_millis(us_to_ms(record.observed_at_us())),
        "asks": encode_levels(record.asks()),
        "bids": encode_levels(record.bids()),
    }
}

fn encode_levels(levels: &[PriceLevel]) -> Vec<Document> {
    levels
        .iter()
        .map(|l| doc! { "price": l.price, "amount": l.amount })
        .collect()
}
