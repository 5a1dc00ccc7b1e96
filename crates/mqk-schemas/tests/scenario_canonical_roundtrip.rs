use mqk_schemas::{Candle, Fill, Micros, Order, Side, Signal};
use mqk_schemas::types::{OrderType, TimeInForce};

fn candle() -> Candle {
    Candle {
        timestamp_ms: 1_700_000_000_000,
        symbol: "BTCUSDT".into(),
        interval: "1m".into(),
        open: Micros::from_decimal(100.0),
        high: Micros::from_decimal(105.0),
        low: Micros::from_decimal(95.0),
        close: Micros::from_decimal(102.0),
        volume: Micros::from_decimal(10.0),
        quote_volume: Some(Micros::from_decimal(1020.0)),
        trade_count: Some(42),
        taker_buy_volume: None,
        taker_buy_quote_volume: None,
    }
}

fn signal() -> Signal {
    Signal {
        symbol: "BTCUSDT".into(),
        side: Side::Buy,
        quantity: Micros::from_decimal(1.0),
        timestamp_ms: 1_700_000_000_000,
        strategy_id: "sma_crossover".into(),
        order_type: OrderType::Market,
        limit_price: None,
        stop_price: None,
        time_in_force: TimeInForce::Gtc,
        metadata: Default::default(),
    }
}

fn fill() -> Fill {
    Fill {
        fill_id: "fill-1".into(),
        order_id: "order-1".into(),
        symbol: "BTCUSDT".into(),
        side: Side::Buy,
        quantity: Micros::from_decimal(1.0),
        price: Micros::from_decimal(101.0),
        timestamp_ms: 1_700_000_000_100,
        fee: Micros::from_decimal(0.101),
        fee_asset: "USDT".into(),
        is_maker: false,
        metadata: Default::default(),
    }
}

#[test]
fn candle_roundtrips_through_json() {
    let c = candle();
    let json = serde_json::to_string(&c).unwrap();
    let back: Candle = serde_json::from_str(&json).unwrap();
    assert_eq!(c, back);
}

#[test]
fn signal_roundtrips_through_json() {
    let s = signal();
    let json = serde_json::to_string(&s).unwrap();
    let back: Signal = serde_json::from_str(&json).unwrap();
    assert_eq!(s, back);
}

#[test]
fn fill_roundtrips_through_json() {
    let f = fill();
    let json = serde_json::to_string(&f).unwrap();
    let back: Fill = serde_json::from_str(&json).unwrap();
    assert_eq!(f, back);
}

#[test]
fn order_roundtrips_through_json() {
    let mut o = Order::new("order-1".into(), signal(), 1_700_000_000_000);
    o.add_fill(fill(), 1_700_000_000_100);
    let json = serde_json::to_string(&o).unwrap();
    let back: Order = serde_json::from_str(&json).unwrap();
    assert_eq!(o, back);
}
