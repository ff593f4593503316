//! Validation and price-ordering rules for single and two-leg (OCO) triggers.

use crate::domain::model::{
    CustomOrder, Gtt, GttCondition, GttDraft, GttLeg, GttRequest, NewCustomOrder, TransactionType,
    TriggerType,
};
use crate::utils::error::{GttError, Result};
use serde::{Deserialize, Deserializer};

const ORDER_TYPE: &str = "LIMIT";
const PRODUCT: &str = "CNC";

/// Parses `"100.5; 120"` or `"100.5,120"` into trigger values.
pub fn parse_trigger_values(raw: &str) -> Result<Vec<f64>> {
    let values = raw
        .split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| GttError::validation(format!("Invalid trigger value '{}'", part)))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.is_empty() {
        return Err(GttError::validation("Trigger values cannot be empty"));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        return Err(GttError::validation(format!(
            "Trigger value must be positive, got {}",
            bad
        )));
    }
    Ok(values)
}

/// Serde helper that also accepts trigger values written as `"1400,1650"`.
pub fn deserialize_trigger_values<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValues {
        List(Vec<f64>),
        One(f64),
        Text(String),
    }

    match RawValues::deserialize(deserializer)? {
        RawValues::List(values) => Ok(values),
        RawValues::One(value) => Ok(vec![value]),
        RawValues::Text(raw) => parse_trigger_values(&raw).map_err(serde::de::Error::custom),
    }
}

/// BUY must trigger below the last price, SELL above it.
pub fn validate_single(tx: TransactionType, trigger: f64, last_price: f64) -> Result<()> {
    match tx {
        TransactionType::Buy if trigger >= last_price => Err(GttError::validation(format!(
            "BUY trigger {} must be below the last price {}",
            trigger, last_price
        ))),
        TransactionType::Sell if trigger <= last_price => Err(GttError::validation(format!(
            "SELL trigger {} must be above the last price {}",
            trigger, last_price
        ))),
        _ => Ok(()),
    }
}

/// OCO is SELL-only and needs `stop_loss < last_price < target`.
pub fn validate_two_leg(
    tx: TransactionType,
    stop_loss: f64,
    target: f64,
    last_price: f64,
) -> Result<()> {
    if tx != TransactionType::Sell {
        return Err(GttError::validation(
            "Two-leg (OCO) triggers are only supported for SELL",
        ));
    }
    if !(stop_loss < last_price && last_price < target) {
        return Err(GttError::validation(format!(
            "Two-leg trigger needs stop loss {} < last price {} < target {}",
            stop_loss, last_price, target
        )));
    }
    Ok(())
}

fn ensure_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GttError::validation(format!(
            "{} must be greater than 0",
            field
        )));
    }
    Ok(())
}

fn leg(
    exchange: &str,
    symbol: &str,
    tx: TransactionType,
    quantity: i64,
    price: f64,
    order_type: &str,
    product: &str,
) -> GttLeg {
    GttLeg {
        exchange: exchange.to_string(),
        tradingsymbol: symbol.to_string(),
        transaction_type: tx,
        quantity,
        price,
        order_type: order_type.to_string(),
        product: product.to_string(),
        result: None,
    }
}

/// Sorts two trigger values into `[stop_loss, target]`.
fn ordered_pair(values: &[f64]) -> Result<(f64, f64)> {
    match values {
        [a, b] => Ok((a.min(*b), a.max(*b))),
        _ => Err(GttError::validation(format!(
            "Two-leg trigger needs exactly 2 trigger values, got {}",
            values.len()
        ))),
    }
}

/// Validates a draft and turns it into the broker request, legs priced at their triggers.
pub fn build_gtt(draft: &GttDraft) -> Result<GttRequest> {
    let symbol = draft.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(GttError::validation("Symbol is required"));
    }
    if draft.quantity <= 0 {
        return Err(GttError::validation("Quantity must be greater than 0"));
    }
    let last_price = draft
        .last_price
        .ok_or_else(|| GttError::validation("Last price is required"))?;
    ensure_positive("Last price", last_price)?;
    for value in &draft.trigger_values {
        ensure_positive("Trigger value", *value)?;
    }
    let exchange = draft.exchange.trim().to_ascii_uppercase();

    match draft.trigger_type {
        TriggerType::Single => {
            let trigger = match draft.trigger_values.as_slice() {
                [value] => *value,
                values => {
                    return Err(GttError::validation(format!(
                        "Single trigger needs exactly 1 trigger value, got {}",
                        values.len()
                    )))
                }
            };
            validate_single(draft.transaction_type, trigger, last_price)?;
            let price = draft.price.unwrap_or(trigger);
            ensure_positive("Price", price)?;

            Ok(GttRequest {
                trigger_type: TriggerType::Single,
                condition: GttCondition {
                    exchange: exchange.clone(),
                    tradingsymbol: symbol.clone(),
                    trigger_values: vec![trigger],
                    last_price,
                    instrument_token: None,
                },
                orders: vec![leg(
                    &exchange,
                    &symbol,
                    draft.transaction_type,
                    draft.quantity,
                    price,
                    ORDER_TYPE,
                    PRODUCT,
                )],
            })
        }
        TriggerType::TwoLeg => {
            let (stop_loss, target) = ordered_pair(&draft.trigger_values)?;
            validate_two_leg(draft.transaction_type, stop_loss, target, last_price)?;

            Ok(GttRequest {
                trigger_type: TriggerType::TwoLeg,
                condition: GttCondition {
                    exchange: exchange.clone(),
                    tradingsymbol: symbol.clone(),
                    trigger_values: vec![stop_loss, target],
                    last_price,
                    instrument_token: None,
                },
                orders: [stop_loss, target]
                    .iter()
                    .map(|price| {
                        leg(
                            &exchange,
                            &symbol,
                            TransactionType::Sell,
                            draft.quantity,
                            *price,
                            ORDER_TYPE,
                            PRODUCT,
                        )
                    })
                    .collect(),
            })
        }
    }
}

/// Checks a shadow order before it is stored. Market-relative rules run at placement.
pub fn validate_new_order(order: &NewCustomOrder) -> Result<()> {
    if order.symbol.trim().is_empty() {
        return Err(GttError::validation("Symbol is required"));
    }
    if order.quantity <= 0 {
        return Err(GttError::validation("Quantity must be greater than 0"));
    }
    for (field, value) in [
        ("Trigger price", order.trigger_price),
        ("Last price", order.last_price),
        ("Target price", order.target_price),
        ("Stop loss", order.stop_loss),
    ] {
        if let Some(value) = value {
            ensure_positive(field, value)?;
        }
    }

    match order.trigger_type {
        TriggerType::Single if order.trigger_price.is_none() => Err(GttError::validation(
            "Trigger price is required for single orders",
        )),
        TriggerType::Single => Ok(()),
        TriggerType::TwoLeg => {
            if order.order_type != TransactionType::Sell {
                return Err(GttError::validation(
                    "Two-leg (OCO) triggers are only supported for SELL",
                ));
            }
            match (order.stop_loss, order.target_price) {
                (Some(stop_loss), Some(target)) if stop_loss < target => Ok(()),
                (Some(_), Some(_)) => Err(GttError::validation(
                    "Stop loss must be below the target price",
                )),
                _ => Err(GttError::validation(
                    "Stop loss and target price are required for two-leg orders",
                )),
            }
        }
    }
}

/// Draft for placing a shadow order at `last_price`.
pub fn draft_from_custom(order: &CustomOrder, last_price: f64) -> Result<GttDraft> {
    let trigger_values = match order.trigger_type {
        TriggerType::Single => vec![order.trigger_price.ok_or_else(|| {
            GttError::validation(format!("Order {} has no trigger price", order.id))
        })?],
        TriggerType::TwoLeg => {
            let stop_loss = order.stop_loss.ok_or_else(|| {
                GttError::validation(format!("Order {} has no stop loss", order.id))
            })?;
            let target = order.target_price.ok_or_else(|| {
                GttError::validation(format!("Order {} has no target price", order.id))
            })?;
            vec![stop_loss, target]
        }
    };

    Ok(GttDraft {
        symbol: order.symbol.clone(),
        exchange: order.exchange.clone(),
        trigger_type: order.trigger_type,
        trigger_values,
        last_price: Some(last_price),
        transaction_type: order.order_type,
        quantity: order.quantity,
        price: None,
    })
}

/// Request that modifies `existing` while keeping its type, side and leg settings.
pub fn rebuild_gtt(
    existing: &Gtt,
    trigger_values: &[f64],
    quantity: i64,
    price: Option<f64>,
    last_price: f64,
) -> Result<GttRequest> {
    if quantity <= 0 {
        return Err(GttError::validation("Quantity must be greater than 0"));
    }
    ensure_positive("Last price", last_price)?;
    for value in trigger_values {
        ensure_positive("Trigger value", *value)?;
    }
    let first = existing.orders.first().ok_or_else(|| {
        GttError::validation(format!("GTT {} has no order legs", existing.id))
    })?;
    let tx = first.transaction_type;
    let exchange = existing.condition.exchange.as_str();
    let symbol = existing.condition.tradingsymbol.as_str();

    let (values, orders) = match existing.trigger_type {
        TriggerType::Single => {
            let trigger = match trigger_values {
                [value] => *value,
                values => {
                    return Err(GttError::validation(format!(
                        "Single trigger needs exactly 1 trigger value, got {}",
                        values.len()
                    )))
                }
            };
            validate_single(tx, trigger, last_price)?;
            let price = price.unwrap_or(trigger);
            ensure_positive("Price", price)?;
            (
                vec![trigger],
                vec![leg(
                    exchange,
                    symbol,
                    tx,
                    quantity,
                    price,
                    &first.order_type,
                    &first.product,
                )],
            )
        }
        TriggerType::TwoLeg => {
            let (stop_loss, target) = ordered_pair(trigger_values)?;
            validate_two_leg(tx, stop_loss, target, last_price)?;
            let orders = [stop_loss, target]
                .iter()
                .enumerate()
                .map(|(idx, price)| {
                    let template = existing.orders.get(idx).unwrap_or(first);
                    leg(
                        exchange,
                        symbol,
                        tx,
                        quantity,
                        *price,
                        &template.order_type,
                        &template.product,
                    )
                })
                .collect();
            (vec![stop_loss, target], orders)
        }
    };

    Ok(GttRequest {
        trigger_type: existing.trigger_type,
        condition: GttCondition {
            exchange: exchange.to_string(),
            tradingsymbol: symbol.to_string(),
            trigger_values: values,
            last_price,
            instrument_token: existing.condition.instrument_token,
        },
        orders,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestedLevels {
    pub trigger_type: TriggerType,
    pub trigger_price: Option<f64>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Default trigger levels around a reference close price.
pub fn suggested_levels(
    tx: TransactionType,
    trigger_type: TriggerType,
    close: f64,
) -> SuggestedLevels {
    match (tx, trigger_type) {
        (TransactionType::Buy, _) => SuggestedLevels {
            trigger_type: TriggerType::Single,
            trigger_price: Some(round2(close * 0.9)),
            target_price: Some(round2(close * 1.3)),
            stop_loss: None,
        },
        (TransactionType::Sell, TriggerType::Single) => SuggestedLevels {
            trigger_type: TriggerType::Single,
            trigger_price: Some(round2(close * 1.1)),
            target_price: None,
            stop_loss: None,
        },
        (TransactionType::Sell, TriggerType::TwoLeg) => SuggestedLevels {
            trigger_type: TriggerType::TwoLeg,
            trigger_price: None,
            target_price: Some(round2(close * 1.15)),
            stop_loss: Some(round2(close * 0.95)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(tx: TransactionType, trigger_type: TriggerType, values: Vec<f64>) -> GttDraft {
        GttDraft {
            symbol: "infy".to_string(),
            exchange: "nse".to_string(),
            trigger_type,
            trigger_values: values,
            last_price: Some(1500.0),
            transaction_type: tx,
            quantity: 10,
            price: None,
        }
    }

    #[test]
    fn parses_mixed_separators() {
        assert_eq!(parse_trigger_values("1400; 1650").unwrap(), vec![1400.0, 1650.0]);
        assert_eq!(parse_trigger_values(" 99.5 ").unwrap(), vec![99.5]);
        assert!(parse_trigger_values("").is_err());
        assert!(parse_trigger_values("abc").is_err());
        assert!(parse_trigger_values("-5").is_err());
    }

    #[test]
    fn buy_single_must_trigger_below_market() {
        assert!(validate_single(TransactionType::Buy, 1400.0, 1500.0).is_ok());
        assert!(validate_single(TransactionType::Buy, 1600.0, 1500.0).is_err());
        assert!(validate_single(TransactionType::Buy, 1500.0, 1500.0).is_err());
    }

    #[test]
    fn sell_single_must_trigger_above_market() {
        assert!(validate_single(TransactionType::Sell, 1600.0, 1500.0).is_ok());
        assert!(validate_single(TransactionType::Sell, 1400.0, 1500.0).is_err());
    }

    #[test]
    fn single_leg_defaults_price_to_trigger() {
        let request =
            build_gtt(&draft(TransactionType::Buy, TriggerType::Single, vec![1400.0])).unwrap();
        assert_eq!(request.condition.tradingsymbol, "INFY");
        assert_eq!(request.condition.exchange, "NSE");
        assert_eq!(request.orders.len(), 1);
        assert_eq!(request.orders[0].price, 1400.0);
        assert_eq!(request.orders[0].order_type, "LIMIT");
        assert_eq!(request.orders[0].product, "CNC");

        let mut with_price = draft(TransactionType::Buy, TriggerType::Single, vec![1400.0]);
        with_price.price = Some(1395.0);
        let request = build_gtt(&with_price).unwrap();
        assert_eq!(request.orders[0].price, 1395.0);
    }

    #[test]
    fn two_leg_orders_values_ascending() {
        let request = build_gtt(&draft(
            TransactionType::Sell,
            TriggerType::TwoLeg,
            vec![1700.0, 1350.0],
        ))
        .unwrap();
        assert_eq!(request.condition.trigger_values, vec![1350.0, 1700.0]);
        assert_eq!(request.orders.len(), 2);
        assert_eq!(request.orders[0].price, 1350.0);
        assert_eq!(request.orders[1].price, 1700.0);
        assert!(request
            .orders
            .iter()
            .all(|leg| leg.transaction_type == TransactionType::Sell));
    }

    #[test]
    fn two_leg_needs_market_between_levels() {
        let err = build_gtt(&draft(
            TransactionType::Sell,
            TriggerType::TwoLeg,
            vec![1550.0, 1700.0],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("stop loss"));
    }

    #[test]
    fn two_leg_buy_is_rejected() {
        let err = build_gtt(&draft(TransactionType::Buy, TriggerType::TwoLeg, vec![1400.0, 1600.0]))
            .unwrap_err();
        assert!(matches!(err, GttError::ValidationError { .. }));
    }

    #[test]
    fn rejects_bad_quantity_and_value_count() {
        let mut zero = draft(TransactionType::Buy, TriggerType::Single, vec![1400.0]);
        zero.quantity = 0;
        assert!(build_gtt(&zero).is_err());

        let two_values = draft(TransactionType::Buy, TriggerType::Single, vec![1400.0, 1300.0]);
        assert!(build_gtt(&two_values).is_err());
        let one_value = draft(TransactionType::Sell, TriggerType::TwoLeg, vec![1600.0]);
        assert!(build_gtt(&one_value).is_err());
    }

    #[test]
    fn new_orders_need_side_specific_prices() {
        let mut order = NewCustomOrder {
            symbol: "TCS".to_string(),
            company_name: None,
            nifty_rank: None,
            exchange: "NSE".to_string(),
            order_type: TransactionType::Sell,
            trigger_type: TriggerType::TwoLeg,
            trigger_price: None,
            last_price: None,
            quantity: 2,
            target_price: Some(4200.0),
            stop_loss: Some(3600.0),
            notes: None,
            tags: None,
        };
        assert!(validate_new_order(&order).is_ok());

        order.stop_loss = Some(4300.0);
        assert!(validate_new_order(&order).is_err());

        order.order_type = TransactionType::Buy;
        order.stop_loss = Some(3600.0);
        assert!(validate_new_order(&order).is_err());

        order.trigger_type = TriggerType::Single;
        assert!(validate_new_order(&order).is_err());
        order.trigger_price = Some(3500.0);
        assert!(validate_new_order(&order).is_ok());
    }

    #[test]
    fn rebuild_keeps_leg_settings() {
        let existing = Gtt {
            id: 42,
            trigger_type: TriggerType::Single,
            status: "active".to_string(),
            condition: GttCondition {
                exchange: "NSE".to_string(),
                tradingsymbol: "INFY".to_string(),
                trigger_values: vec![1400.0],
                last_price: 1500.0,
                instrument_token: Some(408065),
            },
            orders: vec![leg("NSE", "INFY", TransactionType::Buy, 5, 1400.0, "LIMIT", "MIS")],
            created_at: None,
            updated_at: None,
            expires_at: None,
            user_id: None,
        };

        let request = rebuild_gtt(&existing, &[1380.0], 8, None, 1500.0).unwrap();
        assert_eq!(request.trigger_type, TriggerType::Single);
        assert_eq!(request.orders[0].product, "MIS");
        assert_eq!(request.orders[0].quantity, 8);
        assert_eq!(request.orders[0].price, 1380.0);
        assert_eq!(request.condition.instrument_token, Some(408065));

        assert!(rebuild_gtt(&existing, &[1600.0], 8, None, 1500.0).is_err());
    }

    #[test]
    fn drafts_accept_string_or_list_trigger_values() {
        let draft: GttDraft = serde_json::from_str(
            r#"{"symbol":"INFY","trigger_type":"two-leg","trigger_values":"1400,1650",
                "last_price":1500,"transaction_type":"SELL","quantity":3}"#,
        )
        .unwrap();
        assert_eq!(draft.trigger_values, vec![1400.0, 1650.0]);

        let draft: GttDraft = serde_json::from_str(
            r#"{"symbol":"INFY","trigger_values":[1400.5],"transaction_type":"BUY","quantity":1}"#,
        )
        .unwrap();
        assert_eq!(draft.trigger_values, vec![1400.5]);

        let edit: crate::domain::model::GttEdit =
            serde_json::from_str(r#"{"trigger_values":1380,"quantity":2}"#).unwrap();
        assert_eq!(edit.trigger_values, vec![1380.0]);

        assert!(serde_json::from_str::<GttDraft>(
            r#"{"symbol":"INFY","trigger_values":"abc","transaction_type":"BUY","quantity":1}"#
        )
        .is_err());
    }

    #[test]
    fn suggested_levels_round_to_paise() {
        let buy = suggested_levels(TransactionType::Buy, TriggerType::TwoLeg, 1234.56);
        assert_eq!(buy.trigger_type, TriggerType::Single);
        assert_eq!(buy.trigger_price, Some(1111.1));
        assert_eq!(buy.target_price, Some(1604.93));

        let oco = suggested_levels(TransactionType::Sell, TriggerType::TwoLeg, 200.0);
        assert_eq!(oco.stop_loss, Some(190.0));
        assert_eq!(oco.target_price, Some(230.0));
    }
}
