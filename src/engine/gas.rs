//! Gas cost normalization: raw gas units and wei-denominated gas price into
//! native-currency and quote-currency costs.

use crate::domain::{Decimal, NetworkKey};
use tracing::warn;

/// Normalized gas cost for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCost {
    /// Cost in whole native-currency units.
    pub native: Decimal,
    /// Cost in the quote currency.
    pub usdc: Decimal,
    /// Spot price used for the conversion.
    pub native_price_usdc: Decimal,
}

impl GasCost {
    /// Zero-cost record carrying the price that was in effect.
    pub fn zero(native_price_usdc: Decimal) -> Self {
        GasCost {
            native: Decimal::zero(),
            usdc: Decimal::zero(),
            native_price_usdc,
        }
    }
}

/// Normalize raw gas figures into native and quote-currency costs.
///
/// Missing or zero inputs yield a zero cost rather than an error: a leg with
/// unreported gas is financially optimistic but must still be storable. The
/// result is never negative and never NaN (all math is decimal-exact).
pub fn normalize_gas(
    network: NetworkKey,
    gas_used: Option<u64>,
    gas_price_wei: Option<u64>,
    native_price_usdc: Decimal,
) -> GasCost {
    let price = if native_price_usdc.is_positive() {
        native_price_usdc
    } else {
        warn!(network = %network, price = %native_price_usdc, "Non-positive native price, gas cost recorded as zero");
        return GasCost::zero(Decimal::zero());
    };

    let (Some(gas_used), Some(gas_price_wei)) = (gas_used, gas_price_wei) else {
        return GasCost::zero(price);
    };
    if gas_used == 0 || gas_price_wei == 0 {
        return GasCost::zero(price);
    }

    let wei = u128::from(gas_used) * u128::from(gas_price_wei);
    let Some(native) = Decimal::from_wei(wei) else {
        warn!(network = %network, gas_used, gas_price_wei, "Gas cost overflows decimal range, recorded as zero");
        return GasCost::zero(price);
    };

    GasCost {
        native,
        usdc: native * price,
        native_price_usdc: price,
    }
}
