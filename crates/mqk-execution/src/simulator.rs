//! Fill simulator: turns a pending `Order` plus the `MarketSnapshot` it is
//! being evaluated against into the `Fill`s a real exchange would have
//! produced, under a configurable slippage/partial-fill/fee model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mqk_schemas::{Candle, MarketSnapshot, Micros, Order, OrderType, Side, TimeInForce};

use crate::simulator_config::SimulatorConfig;

/// Each engine instance owns its own seeded RNG (§5) so concurrent runners
/// never correlate their random draws.
pub struct FillSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    next_fill_seq: u64,
}

impl FillSimulator {
    pub fn new(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            next_fill_seq: 0,
        }
    }

    /// Process `order` against `snapshot`, returning every fill produced.
    /// Mutates `order.signal.order_type` in place when a stop order
    /// triggers (§4.3) but does not otherwise update `order`'s lifecycle
    /// fields — that is the execution engine's responsibility.
    pub fn process(&mut self, order: &mut Order, snapshot: &MarketSnapshot) -> Vec<mqk_schemas::Fill> {
        match order.signal.order_type {
            OrderType::Market => self.process_market(order, snapshot),
            OrderType::Limit => self.process_limit(order, snapshot),
            OrderType::StopMarket => self.process_stop(order, snapshot, OrderType::Market),
            OrderType::StopLimit => self.process_stop(order, snapshot, OrderType::Limit),
        }
    }

    fn process_stop(
        &mut self,
        order: &mut Order,
        snapshot: &MarketSnapshot,
        trigger_into: OrderType,
    ) -> Vec<mqk_schemas::Fill> {
        let stop_price = match order.signal.stop_price {
            Some(p) => p,
            None => return Vec::new(),
        };
        let close = snapshot.candle.close;
        let triggered = match order.signal.side {
            Side::Buy => close >= stop_price,
            Side::Sell => close <= stop_price,
        };
        if !triggered {
            return Vec::new();
        }
        order.signal.order_type = trigger_into;
        self.process(order, snapshot)
    }

    fn process_market(&mut self, order: &mut Order, snapshot: &MarketSnapshot) -> Vec<mqk_schemas::Fill> {
        let slippage = self.draw_slippage_fraction();
        let price = match order.signal.side {
            Side::Buy => snapshot.ask.mul_fraction(1.0 + slippage),
            Side::Sell => snapshot.bid.mul_fraction(1.0 - slippage),
        };

        let remaining = order.remaining_quantity;
        let is_fok = order.signal.time_in_force == TimeInForce::Fok;
        let qty = if !is_fok && self.rng.gen_bool(self.config.market_partial_fill_probability) {
            let ratio = self.rng.gen_range(0.5..=0.9);
            remaining.mul_fraction(ratio)
        } else {
            remaining
        };

        vec![self.make_fill(order, snapshot, qty, price, self.config.taker_fee_rate, false)]
    }

    fn process_limit(&mut self, order: &mut Order, snapshot: &MarketSnapshot) -> Vec<mqk_schemas::Fill> {
        let limit_price = match order.signal.limit_price {
            Some(p) => p,
            None => return Vec::new(),
        };

        let fillable = match order.signal.side {
            Side::Buy => snapshot.ask <= limit_price,
            Side::Sell => snapshot.bid >= limit_price,
        };
        if !fillable {
            return Vec::new();
        }

        let price = match order.signal.side {
            Side::Buy => limit_price.min(snapshot.ask),
            Side::Sell => limit_price.max(snapshot.bid),
        };

        let remaining = order.remaining_quantity;
        let qty = if self.rng.gen_bool(self.config.limit_partial_fill_probability) {
            let ratio = self.rng.gen_range(0.6..=0.95);
            remaining.mul_fraction(ratio)
        } else {
            remaining
        };

        vec![self.make_fill(order, snapshot, qty, price, self.config.maker_fee_rate, true)]
    }

    fn make_fill(
        &mut self,
        order: &Order,
        snapshot: &MarketSnapshot,
        qty: Micros,
        price: Micros,
        fee_rate: f64,
        is_maker: bool,
    ) -> mqk_schemas::Fill {
        self.next_fill_seq += 1;
        let notional = qty.mul_qty(price);
        let fee = notional.mul_fraction(fee_rate);
        mqk_schemas::Fill {
            fill_id: format!("{}-fill-{}", order.order_id, self.next_fill_seq),
            order_id: order.order_id.clone(),
            symbol: order.signal.symbol.clone(),
            side: order.signal.side,
            quantity: qty,
            price,
            timestamp_ms: snapshot.timestamp_ms() + self.config.execution_latency_ms,
            fee,
            fee_asset: "USDT".into(),
            is_maker,
            metadata: Default::default(),
        }
    }

    fn draw_slippage_fraction(&mut self) -> f64 {
        let mean_bps = self.config.market_slippage_bps;
        let bps = self.rng.gen_range((mean_bps * 0.75)..=(mean_bps * 1.25));
        bps / 10_000.0
    }
}
