//! Execution engine: the submission pipeline and market-event processing
//! loop that turn strategy `Signal`s into `Order`s and `Fill`s, wired
//! through the risk engine's pre/post-trade checks and the fill simulator.

use std::collections::BTreeMap;

use mqk_portfolio::Ledger;
use mqk_risk::{RiskEngine, RiskViolation};
use mqk_schemas::{Fill, MarketSnapshot, Micros, Order, OrderStatus, OrderType, Side, Signal, TimeInForce};

use crate::order_id::OrderIdGenerator;
use crate::simulator::FillSimulator;

/// Minimum notional (price × quantity) a submitted order must clear to be
/// accepted — guards against dust orders that would otherwise round to
/// zero through the fill simulator.
const DEFAULT_MIN_NOTIONAL: f64 = 1.0;

/// Recorded the moment a critical post-trade violation trips the
/// kill-switch (§7); surfaced via [`ExecutionEngine::take_kill_switch_event`]
/// so a caller with an audit-log writer (the runner) can append it.
#[derive(Clone, Debug)]
pub struct KillSwitchEvent {
    pub timestamp_ms: i64,
    pub violations: Vec<RiskViolation>,
    pub positions_flattened: Vec<String>,
}

pub struct ExecutionEngine {
    portfolio: Ledger,
    risk: RiskEngine,
    simulator: FillSimulator,
    id_gen: OrderIdGenerator,
    orders: BTreeMap<String, Order>,
    pending_order_ids: Vec<String>,
    fills: Vec<Fill>,
    last_snapshot: BTreeMap<String, MarketSnapshot>,
    accepting_new_signals: bool,
    min_notional: Micros,
    kill_switch_event: Option<KillSwitchEvent>,
    last_post_trade_violations: Vec<RiskViolation>,
}

impl ExecutionEngine {
    pub fn new(portfolio: Ledger, risk: RiskEngine, simulator: FillSimulator) -> Self {
        Self {
            portfolio,
            risk,
            simulator,
            id_gen: OrderIdGenerator::new(),
            orders: BTreeMap::new(),
            pending_order_ids: Vec::new(),
            fills: Vec::new(),
            last_snapshot: BTreeMap::new(),
            accepting_new_signals: true,
            min_notional: Micros::from_decimal(DEFAULT_MIN_NOTIONAL),
            kill_switch_event: None,
            last_post_trade_violations: Vec::new(),
        }
    }

    /// Takes the kill-switch event recorded by the most recent critical
    /// post-trade violation, if any. Returns `None` once taken, and on
    /// every call before the kill-switch has ever tripped.
    pub fn take_kill_switch_event(&mut self) -> Option<KillSwitchEvent> {
        self.kill_switch_event.take()
    }

    /// The violations from the most recent post-trade risk check (empty
    /// before the first fill), for a control surface's `/risk` view.
    pub fn last_post_trade_violations(&self) -> &[RiskViolation] {
        &self.last_post_trade_violations
    }

    pub fn portfolio(&self) -> &Ledger {
        &self.portfolio
    }

    pub fn orders(&self) -> &BTreeMap<String, Order> {
        &self.orders
    }

    pub fn active_orders(&self) -> Vec<&Order> {
        self.orders.values().filter(|o| o.is_active()).collect()
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn is_halted(&self) -> bool {
        !self.accepting_new_signals
    }

    /// Resumes signal acceptance after a kill-switch halt. Orders and
    /// fills already recorded are kept; the portfolio and risk engine are
    /// untouched.
    pub fn restart(&mut self) {
        self.accepting_new_signals = true;
    }

    pub fn reset(&mut self) {
        self.portfolio.reset();
        self.orders.clear();
        self.pending_order_ids.clear();
        self.fills.clear();
        self.last_snapshot.clear();
        self.accepting_new_signals = true;
        self.kill_switch_event = None;
        self.last_post_trade_violations.clear();
    }

    /// Submission pipeline (§4.4): validate, price/risk pre-trade check,
    /// create the order, and for MARKET orders process it immediately.
    ///
    /// The second element is `true` only when the order was rejected
    /// because pre-trade risk flagged a critical (drawdown-style)
    /// violation — the runner breaks its signal loop on this (§4.7).
    pub fn submit(&mut self, signal: Signal) -> (Order, bool) {
        if !self.accepting_new_signals {
            return (self.new_rejected_order(signal, "execution engine halted by kill-switch"), false);
        }
        self.submit_inner(signal, false)
    }

    fn submit_inner(&mut self, signal: Signal, bypass_pre_trade: bool) -> (Order, bool) {
        if let Err(e) = signal.validate() {
            return (self.new_rejected_order(signal, &e.to_string()), false);
        }

        let best_price = match self.best_available_price(&signal) {
            Some(p) => p,
            None => return (self.new_rejected_order(signal, "no market data available for symbol"), false),
        };

        if signal.quantity.mul_qty(best_price) < self.min_notional {
            return (self.new_rejected_order(signal, "order notional below minimum"), false);
        }

        if !bypass_pre_trade {
            let proposed = proposed_fill(&signal, best_price);
            let (ok, violations) = self.risk.pre_trade(&self.portfolio.snapshot(), &proposed);
            if !ok {
                let critical = violations.iter().any(|v| v.critical);
                let reasons = violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                let order = self.new_rejected_order(signal, &format!("pre-trade risk violation: {reasons}"));
                return (order, critical);
            }
        }

        let order_id = self.id_gen.next();
        let now_ms = signal.timestamp_ms;
        let mut order = Order::new(order_id.clone(), signal, now_ms);
        order.status = OrderStatus::Pending;
        order.updated_at = now_ms;

        let is_market = order.signal.order_type == OrderType::Market;
        self.orders.insert(order_id.clone(), order);
        self.pending_order_ids.push(order_id.clone());

        if is_market {
            if let Some(snapshot) = self.last_snapshot.get(&self.orders[&order_id].signal.symbol).cloned() {
                self.process_order(&order_id, &snapshot);
            }
        }

        (self.orders[&order_id].clone(), false)
    }

    fn new_rejected_order(&mut self, signal: Signal, reason: &str) -> Order {
        let order_id = self.id_gen.next();
        let now_ms = signal.timestamp_ms;
        let mut order = Order::new(order_id.clone(), signal, now_ms);
        order.reject(reason.to_string(), now_ms);
        self.orders.insert(order_id.clone(), order.clone());
        order
    }

    fn best_available_price(&self, signal: &Signal) -> Option<Micros> {
        match signal.order_type {
            OrderType::Market => self.last_snapshot.get(&signal.symbol).map(|s| s.close()),
            OrderType::Limit | OrderType::StopLimit => signal.limit_price,
            OrderType::StopMarket => self
                .last_snapshot
                .get(&signal.symbol)
                .map(|s| s.close())
                .or(signal.stop_price),
        }
    }

    pub fn cancel(&mut self, order_id: &str, reason: &str) -> bool {
        let Some(order) = self.orders.get_mut(order_id) else { return false };
        if !order.is_active() {
            return false;
        }
        let now = order.updated_at;
        order.cancel(now);
        order.rejection_reason = Some(reason.to_string());
        self.pending_order_ids.retain(|id| id != order_id);
        true
    }

    /// Processes every active, symbol-matching pending order against
    /// `snapshot`, applies resulting fills to the portfolio, then runs the
    /// post-trade risk check and triggers the kill-switch on a critical
    /// violation.
    pub fn on_market_event(&mut self, snapshot: &MarketSnapshot) -> Vec<Fill> {
        self.last_snapshot.insert(snapshot.symbol().to_string(), snapshot.clone());
        self.portfolio.update_mark_price(snapshot.symbol(), snapshot.close());

        let candidates: Vec<String> = self
            .pending_order_ids
            .iter()
            .filter(|id| {
                self.orders
                    .get(*id)
                    .map(|o| o.is_active() && o.signal.symbol == snapshot.symbol())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let mut new_fills = Vec::new();
        for order_id in candidates {
            new_fills.extend(self.process_order(&order_id, snapshot));
        }

        self.pending_order_ids.retain(|id| {
            self.orders.get(id).map(|o| o.is_active()).unwrap_or(false)
        });

        if !new_fills.is_empty() {
            let (critical, violations) = self.risk.post_trade(&self.portfolio.snapshot());
            self.last_post_trade_violations = violations.clone();
            if critical {
                let positions_flattened = self.flatten_all("post-trade risk violation", snapshot);
                self.kill_switch_event = Some(KillSwitchEvent {
                    timestamp_ms: snapshot.timestamp_ms(),
                    violations,
                    positions_flattened,
                });
            }
        }

        new_fills
    }

    fn process_order(&mut self, order_id: &str, snapshot: &MarketSnapshot) -> Vec<Fill> {
        let Some(order) = self.orders.get_mut(order_id) else { return Vec::new() };
        let produced = self.simulator.process(order, snapshot);
        if produced.is_empty() {
            return Vec::new();
        }

        let tif = order.signal.time_in_force;
        for fill in &produced {
            order.add_fill(fill.clone(), fill.timestamp_ms);
        }

        // FOK: if the order did not fully fill in this call, every fill is
        // undone — the order reverts to CANCELLED and nothing reaches the
        // portfolio (§4.3).
        if tif == TimeInForce::Fok && order.status != OrderStatus::Filled {
            let undo_ts = produced.last().map(|f| f.timestamp_ms).unwrap_or(order.updated_at);
            order.undo_fills(&produced, undo_ts);
            return Vec::new();
        }

        for fill in &produced {
            self.portfolio.apply_fill(fill.clone()).ok();
        }

        // IOC: any unfilled remainder is cancelled immediately rather than
        // left resting.
        if tif == TimeInForce::Ioc && order.status != OrderStatus::Filled {
            order.remaining_quantity = Micros::ZERO;
            order.updated_at = produced.last().map(|f| f.timestamp_ms).unwrap_or(order.updated_at);
        }

        self.fills.extend(produced.clone());
        produced
    }

    /// Kill-switch response: issue a closing MARKET signal, bypassing the
    /// pre-trade check, for every non-flat position, then stop accepting
    /// new signals until [`ExecutionEngine::restart`] is called. Returns
    /// the symbols flattened, for the kill-switch audit entry (§7).
    pub fn flatten_all(&mut self, reason: &str, snapshot: &MarketSnapshot) -> Vec<String> {
        self.accepting_new_signals = false;
        let positions: Vec<(String, Micros)> = self
            .portfolio
            .snapshot()
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| (p.symbol.clone(), p.quantity))
            .collect();

        let mut flattened = Vec::with_capacity(positions.len());
        for (symbol, qty) in positions {
            let side = if qty.is_positive() { Side::Sell } else { Side::Buy };
            let signal = Signal {
                symbol: symbol.clone(),
                side,
                quantity: qty.abs(),
                timestamp_ms: snapshot.timestamp_ms(),
                strategy_id: "kill-switch".to_string(),
                order_type: OrderType::Market,
                limit_price: None,
                stop_price: None,
                time_in_force: TimeInForce::Ioc,
                metadata: std::collections::BTreeMap::from([("reason".to_string(), reason.to_string())]),
            };
            let _ = self.submit_inner(signal, true);
            flattened.push(symbol);
        }
        flattened
    }
}

fn proposed_fill(signal: &Signal, price: Micros) -> Fill {
    Fill {
        fill_id: "proposed".to_string(),
        order_id: "proposed".to_string(),
        symbol: signal.symbol.clone(),
        side: signal.side,
        quantity: signal.quantity,
        price,
        timestamp_ms: signal.timestamp_ms,
        fee: Micros::ZERO,
        fee_asset: "USDT".to_string(),
        is_maker: false,
        metadata: Default::default(),
    }
}
