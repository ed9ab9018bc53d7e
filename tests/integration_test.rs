//! End-to-end ingestion and matching over a real SQLite database.

use ledgerloop::db::init_db;
use ledgerloop::engine::{MatchConfig, MatchPlanner};
use ledgerloop::orchestration::TradeHook;
use ledgerloop::{
    CachedPriceFeed, CompletedTrade, Decimal, Ingestor, MockPriceSource, NetworkKey, RawLegEvent,
    Repository,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct RecordingHook {
    trades: std::sync::Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl TradeHook for RecordingHook {
    async fn on_trade_completed(&self, trade: &CompletedTrade) {
        self.trades.lock().unwrap().push(trade.trade_id.clone());
    }
}

struct TestRig {
    ingestor: Ingestor,
    repo: Arc<Repository>,
    hook: Arc<RecordingHook>,
    _temp: TempDir,
}

async fn setup() -> TestRig {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let source = MockPriceSource::new()
        .with_price(NetworkKey::Avalanche, Decimal::from_str("25").unwrap())
        .with_price(NetworkKey::Arbitrum, Decimal::from_str("2500").unwrap());
    let feed = Arc::new(CachedPriceFeed::new(
        Arc::new(source),
        Duration::from_secs(60),
        CachedPriceFeed::default_fallbacks(),
    ));

    let hook = Arc::new(RecordingHook::default());
    let ingestor = Ingestor::new(
        repo.clone(),
        feed,
        MatchPlanner::new(MatchConfig::default()),
        NetworkKey::Avalanche,
        hook.clone(),
    );

    TestRig {
        ingestor,
        repo,
        hook,
        _temp: temp_dir,
    }
}

fn event(id: &str, action: &str, amount: &str, signal: i64) -> RawLegEvent {
    RawLegEvent {
        event_id: Some(id.to_string()),
        action: action.to_string(),
        product: "WAVAX/USDC".to_string(),
        network: Some("avalanche".to_string()),
        amount_usdc: Decimal::from_str(amount).unwrap(),
        signal_timestamp: signal,
        execution_timestamp: Some(signal + 30),
        status: Some("completed".to_string()),
        gas_used: Some(210_000),
        gas_price_wei: Some(25_000_000_000),
        expected_out_usdc: None,
        token_address: None,
        router: None,
        pool: None,
        tx_hash: None,
    }
}

#[tokio::test]
async fn test_round_trip_settles_and_clears_active_set() {
    let rig = setup().await;

    let entry = rig
        .ingestor
        .ingest_leg(event("e-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    assert!(!entry.duplicate);
    assert!(entry.completed_trade_ids.is_empty());
    assert_eq!(rig.repo.query_active_legs(None).await.unwrap().len(), 1);

    let exit = rig
        .ingestor
        .ingest_leg(event("e-2", "sell", "105", 1_700_000_060))
        .await
        .unwrap();
    assert_eq!(exit.completed_trade_ids.len(), 1);

    // Both legs consumed.
    assert!(rig.repo.query_active_legs(None).await.unwrap().is_empty());

    let trades = rig.repo.query_completed_trades(None).await.unwrap();
    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.gross_profit_usdc, Decimal::from_str("5").unwrap());
    // Gas per leg: 210000 * 25 gwei = 0.00525 AVAX at 25 USDC = 0.13125.
    assert_eq!(
        trade.gas_cost_usdc.to_canonical_string(),
        "0.2625"
    );
    assert_eq!(
        trade.net_profit_usdc.to_canonical_string(),
        "4.7375"
    );
    assert!(!trade.cross_network);

    // Hook fired exactly once, after commit.
    assert_eq!(*rig.hook.trades.lock().unwrap(), exit.completed_trade_ids);
}

#[tokio::test]
async fn test_duplicate_event_is_idempotent() {
    let rig = setup().await;

    let first = rig
        .ingestor
        .ingest_leg(event("dup-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    let second = rig
        .ingestor
        .ingest_leg(event("dup-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert_eq!(second.leg_id, first.leg_id);
    assert_eq!(rig.repo.query_active_legs(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_replayed_event_after_settle_is_duplicate() {
    let rig = setup().await;

    let entry = rig
        .ingestor
        .ingest_leg(event("s-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    let exit = rig
        .ingestor
        .ingest_leg(event("s-2", "sell", "105", 1_700_000_060))
        .await
        .unwrap();
    assert_eq!(exit.completed_trade_ids.len(), 1);

    // Producer retry of the already-settled entry leg.
    let replay = rig
        .ingestor
        .ingest_leg(event("s-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    assert!(replay.duplicate);
    assert_eq!(replay.leg_id, entry.leg_id);
    assert!(replay.completed_trade_ids.is_empty());

    // The retry did not re-enter the active set or disturb the trade.
    assert!(rig.repo.query_active_legs(None).await.unwrap().is_empty());
    assert_eq!(rig.repo.query_completed_trades(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_out_of_tolerance_amount_stays_active() {
    let rig = setup().await;

    rig.ingestor
        .ingest_leg(event("t-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    let exit = rig
        .ingestor
        .ingest_leg(event("t-2", "sell", "200", 1_700_000_060))
        .await
        .unwrap();

    assert!(exit.completed_trade_ids.is_empty());
    assert_eq!(rig.repo.query_active_legs(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cross_network_legs_never_match() {
    let rig = setup().await;

    rig.ingestor
        .ingest_leg(event("n-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    let mut arb_exit = event("n-2", "sell", "100", 1_700_000_060);
    arb_exit.network = Some("arbitrum".to_string());
    let outcome = rig.ingestor.ingest_leg(arb_exit).await.unwrap();

    assert!(outcome.completed_trade_ids.is_empty());
    assert_eq!(rig.repo.query_active_legs(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_leg_is_stored_but_never_matched() {
    let rig = setup().await;

    rig.ingestor
        .ingest_leg(event("f-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    let mut failed_exit = event("f-2", "sell", "100", 1_700_000_060);
    failed_exit.status = Some("failed".to_string());
    let outcome = rig.ingestor.ingest_leg(failed_exit).await.unwrap();

    assert!(outcome.completed_trade_ids.is_empty());
    let active = rig.repo.query_active_legs(None).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active
        .iter()
        .any(|leg| leg.status == ledgerloop::LegStatus::Failed));
}

#[tokio::test]
async fn test_exit_never_consumed_twice() {
    let rig = setup().await;

    rig.ingestor
        .ingest_leg(event("c-1", "buy", "100", 1_700_000_000))
        .await
        .unwrap();
    rig.ingestor
        .ingest_leg(event("c-2", "buy", "100", 1_700_000_010))
        .await
        .unwrap();
    let outcome = rig
        .ingestor
        .ingest_leg(event("c-3", "sell", "100", 1_700_000_060))
        .await
        .unwrap();

    // Only the oldest entry paired; the other stays active.
    assert_eq!(outcome.completed_trade_ids.len(), 1);
    assert_eq!(rig.repo.query_active_legs(None).await.unwrap().len(), 1);
    assert_eq!(rig.repo.query_completed_trades(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_late_exit_matches_on_its_own_pass() {
    let rig = setup().await;

    // Two entries arrive first; nothing matches.
    rig.ingestor
        .ingest_leg(event("l-1", "buy", "50", 1_700_000_000))
        .await
        .unwrap();
    rig.ingestor
        .ingest_leg(event("l-2", "buy", "100", 1_700_000_010))
        .await
        .unwrap();

    // Exit closest to 100 arrives: it must pair with the older eligible
    // entry whose amount is within tolerance, which is only the 100 one.
    let outcome = rig
        .ingestor
        .ingest_leg(event("l-3", "sell", "95", 1_700_000_060))
        .await
        .unwrap();
    assert_eq!(outcome.completed_trade_ids.len(), 1);

    let trades = rig.repo.query_completed_trades(None).await.unwrap();
    assert_eq!(
        trades[0].entry_leg.amount_usdc,
        Decimal::from_str("100").unwrap()
    );
}

#[tokio::test]
async fn test_invalid_event_rejected_and_nothing_stored() {
    let rig = setup().await;

    let mut bad = event("b-1", "hodl", "100", 1_700_000_000);
    bad.action = "hodl".to_string();
    assert!(rig.ingestor.ingest_leg(bad).await.is_err());

    let mut bad_product = event("b-2", "buy", "100", 1_700_000_000);
    bad_product.product = "WAVAX".to_string();
    assert!(rig.ingestor.ingest_leg(bad_product).await.is_err());

    assert!(rig.repo.query_active_legs(None).await.unwrap().is_empty());
}
