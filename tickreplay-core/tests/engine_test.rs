//! End-to-end tests of the tick loop over small in-memory price tables.

use tickreplay_core::data::{PriceTable, Quote};
use tickreplay_core::domain::{OrderKind, TradeCommand};
use tickreplay_core::engine::{Diagnostics, HaltReason, Journal, SimConfig, SimError, Simulator};
use tickreplay_core::strategy::StrategyView;

const DAY: i64 = 86_400;

fn far_future() -> i64 {
    i64::MAX
}

/// Six trading days at DAY..=6*DAY with identical quotes.
fn flat_table(volume: u64) -> PriceTable {
    let mut table = PriceTable::new();
    for day in 1..=6 {
        table.insert(day * DAY, "SPY", Quote::ohlcv(50.0, 55.0, 45.0, 52.0, volume));
    }
    table
}

fn config(cash: f64) -> SimConfig {
    SimConfig::new(cash, 0, 10 * DAY, DAY)
}

/// Emit `commands` on the first tick, nothing afterwards.
fn once(commands: Vec<TradeCommand>) -> impl FnMut(&StrategyView<'_>) -> Vec<TradeCommand> {
    let mut pending = Some(commands);
    move |_view: &StrategyView<'_>| pending.take().unwrap_or_default()
}

#[test]
fn buy_fills_on_first_day_after_submission() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let outcome = sim.run(&mut once(vec![TradeCommand::buy("SPY", 10)])).unwrap();

    assert_eq!(outcome.portfolio.cash(), 9_500.0);
    assert_eq!(outcome.portfolio.shares("SPY"), 10);
    assert_eq!(outcome.positions.net_quantity("SPY"), 10);

    let order = &outcome.orders[0];
    assert_eq!(order.submitted_at, DAY);
    let fill = order.fill.as_ref().unwrap();
    assert_eq!(fill.quantity, 10);
    // Not due at DAY itself; executes at the next tick's data timestamp.
    assert_eq!(fill.timestamp, 2 * DAY);
    assert!(fill.timestamp >= order.submitted_at);
}

#[test]
fn volume_cap_shrinks_the_stored_order() {
    let data = flat_table(5);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let outcome = sim.run(&mut once(vec![TradeCommand::buy("SPY", 10)])).unwrap();

    let order = &outcome.orders[0];
    assert_eq!(order.shares, 5);
    assert_eq!(order.original_shares, 10);
    assert_eq!(order.fill.as_ref().unwrap().quantity, 5);
    assert_eq!(outcome.portfolio.cash(), 9_750.0);
    assert_eq!(outcome.report.stats.capped_orders, 1);
}

#[test]
fn sell_without_holdings_never_fills() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let sell = TradeCommand::sell("SPY", 10).with_duration(DAY);
    let outcome = sim.run(&mut once(vec![sell])).unwrap();

    assert!(outcome.orders[0].fill.is_none());
    assert_eq!(outcome.portfolio.cash(), 10_000.0);
    assert_eq!(outcome.portfolio.shares("SPY"), 0);
    assert_eq!(outcome.report.stats.skips["insufficient_shares"], 1);
    assert_eq!(outcome.report.stats.expired_unfilled, 1);
}

#[test]
fn limit_waits_for_a_day_in_range() {
    let mut data = flat_table(1_000);
    data.insert(3 * DAY, "SPY", Quote::ohlcv(57.0, 60.0, 56.0, 59.0, 1_000));
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let limit = TradeCommand::buy("SPY", 10)
        .with_kind(OrderKind::Limit { limit_price: 58.0 })
        .with_duration(5 * DAY);
    let outcome = sim.run(&mut once(vec![limit])).unwrap();

    let fill = outcome.orders[0].fill.as_ref().unwrap();
    assert_eq!(fill.timestamp, 3 * DAY);
    assert_eq!(fill.price, 58.0);
    assert_eq!(outcome.report.stats.skips["limit_out_of_range"], 1);
}

#[test]
fn expired_order_never_fills() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    // Zero duration: expires the moment it could first become due.
    let buy = TradeCommand::buy("SPY", 10).with_duration(0);
    let outcome = sim.run(&mut once(vec![buy])).unwrap();

    assert!(outcome.orders[0].fill.is_none());
    assert_eq!(outcome.report.stats.fills, 0);
    assert_eq!(outcome.report.stats.expired_unfilled, 1);
    assert_eq!(outcome.portfolio.cash(), 10_000.0);
}

#[test]
fn later_orders_see_earlier_fills_in_the_same_tick() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(600.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let outcome = sim
        .run(&mut once(vec![
            TradeCommand::buy("SPY", 10).with_duration(DAY),
            TradeCommand::buy("SPY", 10).with_duration(DAY),
        ]))
        .unwrap();

    assert!(outcome.orders[0].fill.is_some());
    assert!(outcome.orders[1].fill.is_none());
    assert_eq!(outcome.portfolio.cash(), 100.0);
}

#[test]
fn short_then_cover_through_the_loop() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(1_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let mut tick = 0;
    let mut strategy = move |view: &StrategyView<'_>| {
        tick += 1;
        match tick {
            1 => vec![TradeCommand::short("SPY", 10)],
            3 if view.portfolio.is_short("SPY") => {
                vec![TradeCommand::cover("SPY", 10).with_kind(OrderKind::MarketClose)]
            }
            _ => Vec::new(),
        }
    };
    let outcome = sim.run(&mut strategy).unwrap();

    assert_eq!(outcome.report.stats.fills, 2);
    assert_eq!(outcome.portfolio.shares("SPY"), 0);
    // +500 on the short at the open, -520 on the cover at the close.
    assert_eq!(outcome.portfolio.cash(), 980.0);
    assert!(outcome.positions.is_flat());
}

#[test]
fn halts_at_end_time() {
    let data = flat_table(1_000);
    let sim = Simulator::new(SimConfig::new(1_000.0, 0, 2 * DAY, DAY), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let outcome = sim.run(&mut once(Vec::new())).unwrap();
    assert_eq!(outcome.report.halt_reason, HaltReason::ReachedEnd);
    assert_eq!(outcome.report.final_timestamp, 2 * DAY);
    assert_eq!(outcome.report.stats.ticks, 2);
}

#[test]
fn halts_when_caught_up_to_now() {
    fn yesterday() -> i64 {
        DAY
    }
    let data = flat_table(1_000);
    let sim = Simulator::new(config(1_000.0), &data)
        .unwrap()
        .with_wall_clock(yesterday);
    let outcome = sim.run(&mut once(Vec::new())).unwrap();
    assert_eq!(outcome.report.halt_reason, HaltReason::CaughtUpToNow);
    assert_eq!(outcome.report.final_timestamp, DAY);
}

#[test]
fn halts_when_data_is_exhausted() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(1_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let outcome = sim.run(&mut once(Vec::new())).unwrap();
    assert_eq!(outcome.report.halt_reason, HaltReason::DataExhausted);
    assert_eq!(outcome.report.final_timestamp, 6 * DAY);
}

#[test]
fn mark_to_market_builds_equity_curve() {
    let data = flat_table(1_000);
    let cfg = config(10_000.0).with_diagnostics(Diagnostics {
        mtm: true,
        ..Diagnostics::default()
    });
    let sim = Simulator::new(cfg, &data).unwrap().with_wall_clock(far_future);
    let outcome = sim.run(&mut once(vec![TradeCommand::buy("SPY", 10)])).unwrap();

    let curve = &outcome.report.equity_curve;
    assert_eq!(curve.len() as u64, outcome.report.stats.ticks);
    // Before the fill: all cash. After: 9500 cash + 10 * 52 close.
    assert_eq!(curve[0].value, 10_000.0);
    assert_eq!(curve.last().unwrap().value, 9_500.0 + 520.0);
}

#[test]
fn unsupported_order_terminates_the_run() {
    let data = flat_table(1_000);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future);
    let bad = TradeCommand::buy("SPY", 1).with_kind(OrderKind::Limit {
        limit_price: f64::NAN,
    });
    let err = sim.run(&mut once(vec![bad])).unwrap_err();
    assert!(matches!(err, SimError::UnsupportedOrder(_)));
}

#[test]
fn journal_is_released_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.jsonl");
    let data = flat_table(1_000);
    let sim = Simulator::new(config(10_000.0), &data)
        .unwrap()
        .with_wall_clock(far_future)
        .with_journal(Journal::open(&path).unwrap());

    let mut tick = 0;
    let mut strategy = move |_view: &StrategyView<'_>| {
        tick += 1;
        match tick {
            1 => vec![TradeCommand::buy("SPY", 1)],
            2 => vec![TradeCommand::buy("SPY", 1).with_duration(-1)],
            _ => Vec::new(),
        }
    };
    assert!(sim.run(&mut strategy).is_err());

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"placed\""));
}

#[test]
fn rejects_empty_data_and_bad_config() {
    let empty = PriceTable::new();
    assert!(matches!(
        Simulator::new(config(1.0), &empty),
        Err(SimError::NoData)
    ));
    let data = flat_table(1);
    assert!(matches!(
        Simulator::new(SimConfig::new(1.0, 0, 10, 0), &data),
        Err(SimError::InvalidConfig(_))
    ));
}
