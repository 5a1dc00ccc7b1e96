//! Canonical fill ordering.
//!
//! Applying fills in canonical order is a mandatory invariant: the same set
//! of fills must always produce the same ledger state regardless of the
//! order they arrived in within one snapshot. Per the runner's ordering
//! guarantee, all fills produced for snapshot `sₖ` are applied before any
//! fill for `sₖ₊₁` — this module only orders *within* one such batch.
//!
//! Canonical sort key: `(seq_no, symbol, side_ord, qty)` ascending.
//! `side_ord`: `Buy = 0`, `Sell = 1` — buys precede sells on a tied
//! `(seq_no, symbol)` so a position is opened before it is closed.

use mqk_schemas::{Fill, Side};

use crate::{Ledger, LedgerError};

/// A fill tagged with its canonical sequence number, assigned by the caller
/// when fills are produced so both live processing and replay from the
/// audit log sort identically.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedFill {
    pub seq_no: u64,
    pub fill: Fill,
}

/// Sort `fills` into canonical order in place. Pure and deterministic:
/// identical inputs always produce identical outputs.
pub fn sort_fills_canonical(fills: &mut [TaggedFill]) {
    fills.sort_by(|a, b| {
        let seq = a.seq_no.cmp(&b.seq_no);
        if seq != std::cmp::Ordering::Equal {
            return seq;
        }
        let sym = a.fill.symbol.cmp(&b.fill.symbol);
        if sym != std::cmp::Ordering::Equal {
            return sym;
        }
        let side_ord = |s: Side| -> u8 {
            match s {
                Side::Buy => 0,
                Side::Sell => 1,
            }
        };
        let side = side_ord(a.fill.side).cmp(&side_ord(b.fill.side));
        if side != std::cmp::Ordering::Equal {
            return side;
        }
        a.fill.quantity.cmp(&b.fill.quantity)
    });
}

/// Sort `fills` into canonical order then apply them to `ledger`.
pub fn apply_fills_canonical(ledger: &mut Ledger, mut fills: Vec<TaggedFill>) -> Result<(), LedgerError> {
    sort_fills_canonical(&mut fills);
    for tf in fills {
        ledger.append_fill_seq(tf.fill, tf.seq_no)?;
    }
    Ok(())
}
