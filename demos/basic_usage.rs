// ============================================================================
// Basic Usage Example
// ============================================================================
//
// Run with `cargo run --example basic_usage --features logging` to see the
// engine's own log lines alongside the printed output.

use tick_matching_engine::prelude::*;

fn main() {
    #[cfg(feature = "logging")]
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Matching Engine Example ===\n");

    let config = EngineConfig::new("BTC-USD").with_tick_size(5);
    let (engine, bus) = match with_event_bus(&config) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return;
        }
    };
    let mut market_data = bus.subscribe();

    println!("Created matching engine for {}\n", engine.instrument());

    let (mut orders, runner) = match spawn(engine, &config) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("could not start matching thread: {err}");
            return;
        }
    };

    // Add sell orders at different prices
    println!("Adding sell orders...");
    let sells = (0..5u64).map(|i| Order::limit(i + 1, Side::Sell, 50_000 + i as i64 * 100, 1));
    orders.submit_batch(sells);

    // Add buy orders
    println!("Adding buy orders...");
    let buys = (0..5u64).map(|i| Order::limit(i + 11, Side::Buy, 49_900 - i as i64 * 100, 1));
    orders.submit_batch(buys);

    // A protective sell stop below the bids
    let stop = Order::limit(30, Side::Sell, 49_800, 2).with_type(OrderType::StopLoss);
    orders.submit_batch([stop]);

    // Crosses the first three ask levels, remainder cancelled
    println!("\n=== Submitting IOC Order ===");
    let ioc = Order::limit(20, Side::Buy, 50_203, 4).with_type(OrderType::ImmediateOrCancel);
    orders.submit_batch([ioc]);

    // Sell into the bids; the trade at 49_900 fires the stop
    let market_sell = Order::market(21, Side::Sell, 1);
    orders.submit_batch([market_sell]);

    let _ = orders.request_snapshot();

    let engine = match runner.shutdown() {
        Ok(engine) => engine,
        Err(_) => {
            eprintln!("matching thread panicked");
            return;
        }
    };

    println!("\nEvents published:");
    while let Some(event) = market_data.poll() {
        match event {
            MarketEvent::Trade(trade) => println!(
                "  Trade: taker {} maker {} @ {} (qty: {})",
                trade.taker_order_id, trade.maker_order_id, trade.price, trade.quantity
            ),
            MarketEvent::Rejected(notice) => println!("  Rejected: {notice}"),
            MarketEvent::Snapshot(text) => {
                println!("  Snapshot:");
                for line in text.lines() {
                    println!("    {line}");
                }
            }
        }
    }

    println!("\n=== Final Order Book ===");
    println!("Best bid: {:?}", engine.best_bid().map(|o| o.price));
    println!("Best ask: {:?}", engine.best_ask().map(|o| o.price));
    println!("Last trade: {:?}", engine.last_trade_price());
    println!("Stats: {:?}", engine.stats());
}
