use mqk_portfolio::{apply_fills_canonical, Ledger, Micros, TaggedFill};
use mqk_schemas::Side;

fn fill(symbol: &str, side: Side, qty: f64, price: f64, ts: i64) -> mqk_schemas::Fill {
    mqk_schemas::Fill {
        fill_id: format!("f-{ts}-{symbol}-{qty}"),
        order_id: "o1".into(),
        symbol: symbol.into(),
        side,
        quantity: Micros::from_decimal(qty),
        price: Micros::from_decimal(price),
        timestamp_ms: ts,
        fee: Micros::ZERO,
        fee_asset: "USDT".into(),
        is_maker: false,
        metadata: Default::default(),
    }
}

#[test]
fn same_snapshot_fills_produce_identical_ledger_state_regardless_of_arrival_order() {
    let batch_forward = vec![
        TaggedFill { seq_no: 1, fill: fill("AAPL", Side::Buy, 2.0, 100.0, 1) },
        TaggedFill { seq_no: 2, fill: fill("MSFT", Side::Buy, 1.0, 200.0, 1) },
        TaggedFill { seq_no: 3, fill: fill("AAPL", Side::Sell, 1.0, 110.0, 1) },
    ];
    let batch_reversed: Vec<TaggedFill> = batch_forward.iter().rev().cloned().collect();

    let mut ledger_a = Ledger::new("s1", Micros::from_decimal(100_000.0));
    apply_fills_canonical(&mut ledger_a, batch_forward).unwrap();

    let mut ledger_b = Ledger::new("s1", Micros::from_decimal(100_000.0));
    apply_fills_canonical(&mut ledger_b, batch_reversed).unwrap();

    assert_eq!(ledger_a.cash_balance(), ledger_b.cash_balance());
    assert_eq!(ledger_a.snapshot().positions, ledger_b.snapshot().positions);
}
