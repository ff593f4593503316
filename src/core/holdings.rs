use crate::domain::model::{Holding, HoldingsSummary};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Portfolio totals across `holdings`, rounded to two decimals.
pub fn summarize(holdings: &[Holding]) -> HoldingsSummary {
    let (investment, current) = holdings.iter().fold((0.0, 0.0), |(inv, cur), h| {
        let quantity = h.quantity as f64;
        (inv + h.average_price * quantity, cur + h.last_price * quantity)
    });
    let pnl = current - investment;
    let pnl_percentage = if investment > 0.0 {
        pnl / investment * 100.0
    } else {
        0.0
    };

    HoldingsSummary {
        total_investment: round2(investment),
        current_value: round2(current),
        total_pnl: round2(pnl),
        pnl_percentage: round2(pnl_percentage),
        holdings_count: holdings.len(),
    }
}

pub fn find_holding<'a>(holdings: &'a [Holding], symbol: &str) -> Option<&'a Holding> {
    holdings
        .iter()
        .find(|h| h.tradingsymbol.eq_ignore_ascii_case(symbol))
}

/// Quantity held for `symbol`, including T1 shares awaiting settlement.
pub fn held_quantity(holdings: &[Holding], symbol: &str) -> i64 {
    find_holding(holdings, symbol)
        .map(|h| h.quantity + h.t1_quantity)
        .unwrap_or(0)
}
