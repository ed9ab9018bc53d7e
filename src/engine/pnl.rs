//! Realized P&L derivation for a matched (entry, exit) pair.

use crate::domain::{CompletedTrade, Decimal, TimeS, TradeCategory, TradeLeg};
use tracing::warn;

/// Build the immutable CompletedTrade record for a matched pair.
///
/// Pure except for a diagnostic on unrecognized expected-profit shapes.
pub fn build_completed_trade(entry: TradeLeg, exit: TradeLeg, completed_ts: TimeS) -> CompletedTrade {
    let gross_profit_usdc = exit.amount_usdc - entry.amount_usdc;
    let gas_cost_usdc = entry.gas_cost_usdc + exit.gas_cost_usdc;
    let gas_cost_native = entry.gas_cost_native + exit.gas_cost_native;
    let net_profit_usdc = gross_profit_usdc - gas_cost_usdc;

    let profit_pct = if entry.amount_usdc.is_positive() {
        net_profit_usdc / entry.amount_usdc * Decimal::hundred()
    } else {
        Decimal::zero()
    };

    let (expected_gross_profit_usdc, slippage_usdc) = expected_outcome(&entry, &exit);
    let actual_vs_expected_usdc = gross_profit_usdc - expected_gross_profit_usdc;
    let actual_vs_expected_pct = if expected_gross_profit_usdc.is_zero() {
        Decimal::zero()
    } else {
        actual_vs_expected_usdc / expected_gross_profit_usdc.abs() * Decimal::hundred()
    };
    let execution_efficiency_pct = if expected_gross_profit_usdc.is_zero() {
        Decimal::hundred()
    } else {
        gross_profit_usdc / expected_gross_profit_usdc * Decimal::hundred()
    };

    // Durations run between the chronologically first and second legs by
    // signal time, independent of which is the entry.
    let (first, second) = if exit.signal_ts < entry.signal_ts {
        (&exit, &entry)
    } else {
        (&entry, &exit)
    };
    let signal_duration_ms = second.signal_ts.secs_since(first.signal_ts) * 1000;
    let execution_duration_ms = second.execution_ts.secs_since(first.execution_ts) * 1000;

    let avg_native_price_usdc =
        (entry.native_price_usdc + exit.native_price_usdc) / Decimal::two();
    let efficiency_score = network_efficiency_score(&entry, &exit);

    let category = TradeCategory::classify(net_profit_usdc);

    let mut networks = vec![entry.network, exit.network];
    networks.sort();
    networks.dedup();
    let cross_network = networks.len() > 1;

    let trade_id = CompletedTrade::derive_trade_id(&entry.leg_id, &exit.leg_id);

    CompletedTrade {
        trade_id,
        entry_leg: entry,
        exit_leg: exit,
        gross_profit_usdc,
        gas_cost_usdc,
        gas_cost_native,
        net_profit_usdc,
        profit_pct,
        expected_gross_profit_usdc,
        actual_vs_expected_usdc,
        actual_vs_expected_pct,
        slippage_usdc,
        execution_efficiency_pct,
        signal_duration_ms,
        execution_duration_ms,
        avg_native_price_usdc,
        efficiency_score,
        category,
        networks,
        cross_network,
        completed_ts,
    }
}

/// Expected gross profit and slippage from the exit leg's router quote.
///
/// Only the "token into quote currency" exit shape carries a usable
/// expectation; every other shape yields zero (break-even assumption).
/// That fallback is a documented placeholder, hence the diagnostic.
fn expected_outcome(entry: &TradeLeg, exit: &TradeLeg) -> (Decimal, Decimal) {
    match exit.meta.expected_out_usdc {
        Some(expected_out) if exit.token_pair.quotes_in_usdc() => (
            expected_out - entry.amount_usdc,
            expected_out - exit.amount_usdc,
        ),
        Some(_) => {
            warn!(
                trade_pair = %exit.token_pair,
                exit_leg = %exit.leg_id,
                "Exit quote is not in the stable currency; expected profit recorded as zero"
            );
            (Decimal::zero(), Decimal::zero())
        }
        None => (Decimal::zero(), Decimal::zero()),
    }
}

/// Blend of execution-speed and gas-efficiency scores, each in [0, 100].
///
/// Speed: `100 - avg_delay_seconds`, floored at 0.
/// Gas: `100 - avg_gas_ratio * 1000` where the ratio is gas cost over leg
/// size, floored at 0.
fn network_efficiency_score(entry: &TradeLeg, exit: &TradeLeg) -> Decimal {
    let avg_delay = Decimal::from_u64(entry.execution_delay_secs().unsigned_abs())
        + Decimal::from_u64(exit.execution_delay_secs().unsigned_abs());
    let avg_delay = avg_delay / Decimal::two();
    let speed_score = (Decimal::hundred() - avg_delay).max(Decimal::zero());

    let ratio = |leg: &TradeLeg| {
        if leg.amount_usdc.is_positive() {
            leg.gas_cost_usdc / leg.amount_usdc
        } else {
            Decimal::zero()
        }
    };
    let avg_gas_ratio = (ratio(entry) + ratio(exit)) / Decimal::two();
    let thousand = Decimal::from_u64(1000);
    let gas_score = (Decimal::hundred() - avg_gas_ratio * thousand).max(Decimal::zero());

    (speed_score + gas_score) / Decimal::two()
}
