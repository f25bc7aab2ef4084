use std::fmt;

use serde_json::Value;

use crate::error::{CoreError, CoreErrorCode};
use crate::predicate::WhereClause;

pub const PRICE_KEYS: [&str; 2] = ["price", "price_postapoc"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepriceOptions {
    pub factor: f64,
}

impl RepriceOptions {
    pub fn new(factor: f64) -> Result<Self, CoreError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(CoreError::usage(format!(
                "price factor must be a finite non-negative number, got {factor}"
            )));
        }
        Ok(Self { factor })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUnit {
    Cent,
    Cents,
    Usd,
    KiloUsd,
}

impl PriceUnit {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "cent" => Some(Self::Cent),
            "cents" => Some(Self::Cents),
            "USD" => Some(Self::Usd),
            "kUSD" => Some(Self::KiloUsd),
            _ => None,
        }
    }

    fn cents_per_unit(self) -> f64 {
        match self {
            Self::Cent | Self::Cents => 1.0,
            Self::Usd => 100.0,
            Self::KiloUsd => 100_000.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cent => "cent",
            Self::Cents => "cents",
            Self::Usd => "USD",
            Self::KiloUsd => "kUSD",
        }
    }
}

/// A price as written in the data: bare integer cents, or an amount with a
/// unit suffix such as `"12.5 USD"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Price {
    Cents(i64),
    Amount { amount: f64, unit: PriceUnit },
}

impl Price {
    pub fn parse(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Cents)
                .ok_or_else(|| price_error(format!("price {n} is not a whole number of cents"))),
            Value::String(text) => {
                let mut parts = text.split_whitespace();
                let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(price_error(format!(
                        "price '{text}' is not of the form '<amount> <unit>'"
                    )));
                };
                let amount: f64 = amount
                    .parse()
                    .map_err(|_| price_error(format!("price '{text}' has a non-numeric amount")))?;
                let unit = PriceUnit::parse(unit)
                    .ok_or_else(|| price_error(format!("price '{text}' has an unknown unit")))?;
                Ok(Self::Amount { amount, unit })
            }
            other => Err(price_error(format!("price {other} is neither a number nor a string"))),
        }
    }

    pub fn cents(&self) -> f64 {
        match *self {
            Self::Cents(c) => c as f64,
            Self::Amount { amount, unit } => amount * unit.cents_per_unit(),
        }
    }

    /// Multiplies by `factor`, rounding to whole cents and keeping the unit.
    pub fn scaled(&self, factor: f64) -> Self {
        let cents = (self.cents() * factor).round();
        match *self {
            Self::Cents(_) => Self::Cents(cents as i64),
            Self::Amount { unit, .. } => Self::Amount {
                amount: cents / unit.cents_per_unit(),
                unit,
            },
        }
    }

    pub fn to_value(&self) -> Value {
        match *self {
            Self::Cents(c) => Value::from(c),
            Self::Amount { .. } => Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Cents(c) => write!(f, "{c}"),
            Self::Amount { amount, unit } => {
                let mut text = format!("{amount:.5}");
                while text.ends_with('0') {
                    text.pop();
                }
                if text.ends_with('.') {
                    text.pop();
                }
                write!(f, "{text} {}", unit.as_str())
            }
        }
    }
}

fn price_error(message: String) -> CoreError {
    CoreError::new(CoreErrorCode::Parse, message)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Repriced {
    pub records: Vec<Value>,
    pub skipped: Vec<CoreError>,
}

/// Returns rewritten copies of matching records that carry a price. The
/// inputs are left as they are.
pub fn reprice<'a, I>(records: I, filter: &WhereClause, options: &RepriceOptions) -> Repriced
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = Repriced::default();
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        let Value::Object(map) = record else {
            continue;
        };

        let mut copy = map.clone();
        let mut changed = false;
        for key in PRICE_KEYS {
            let Some(raw) = map.get(key) else {
                continue;
            };
            match Price::parse(raw) {
                Ok(price) => {
                    copy.insert(key.to_string(), price.scaled(options.factor).to_value());
                    changed = true;
                }
                Err(e) => out.skipped.push(CoreError::new(
                    e.code,
                    format!("{}: {key}: {}", record_label(record), e.message),
                )),
            }
        }
        if changed {
            out.records.push(Value::Object(copy));
        }
    }
    out
}

fn record_label(record: &Value) -> String {
    let kind = record.get("type").and_then(Value::as_str).unwrap_or("?");
    let id = record
        .get("id")
        .or_else(|| record.get("abstract"))
        .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
        .unwrap_or_else(|| "?".to_string());
    format!("{kind} {id}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Price, RepriceOptions, reprice};
    use crate::predicate::WhereClause;

    #[test]
    fn parses_both_representations() {
        assert_eq!(Price::parse(&json!(250)).expect("cents"), Price::Cents(250));
        let usd = Price::parse(&json!("12.5 USD")).expect("usd");
        assert_eq!(usd.cents(), 1250.0);
        assert!(Price::parse(&json!("12 dollars")).is_err());
        assert!(Price::parse(&json!("twelve USD")).is_err());
        assert!(Price::parse(&json!(1.5)).is_err());
        assert!(Price::parse(&json!([1])).is_err());
    }

    #[test]
    fn scaling_keeps_units_and_rounds_to_cents() {
        assert_eq!(Price::Cents(5).scaled(0.5), Price::Cents(3));
        let usd = Price::parse(&json!("10 USD")).expect("usd").scaled(1.255);
        assert_eq!(usd.to_value(), json!("12.55 USD"));
        let kusd = Price::parse(&json!("2 kUSD")).expect("kusd").scaled(2.0);
        assert_eq!(kusd.to_value(), json!("4 kUSD"));
        let cent = Price::parse(&json!("80 cent")).expect("cent").scaled(1.5);
        assert_eq!(cent.to_value(), json!("120 cent"));
    }

    #[test]
    fn reprice_copies_matching_records_only() {
        let records = vec![
            json!({"type": "GENERIC", "id": "rock", "price": 100, "price_postapoc": "1 USD"}),
            json!({"type": "GENERIC", "id": "stick"}),
            json!({"type": "AMMO", "id": "bullet", "price": 10}),
            json!({"type": "GENERIC", "id": "gem", "price": "lots"}),
        ];
        let filter = WhereClause::parse(["type=GENERIC"]).expect("filter");
        let options = RepriceOptions::new(2.0).expect("factor");
        let out = reprice(&records, &filter, &options);

        assert_eq!(
            out.records,
            vec![json!({"type": "GENERIC", "id": "rock", "price": 200, "price_postapoc": "2 USD"})]
        );
        assert_eq!(out.skipped.len(), 1);
        assert!(out.skipped[0].message.starts_with("GENERIC gem: price:"));
        assert_eq!(records[0]["price"], json!(100));
    }

    #[test]
    fn rejects_negative_or_nan_factors() {
        assert!(RepriceOptions::new(-1.0).is_err());
        assert!(RepriceOptions::new(f64::NAN).is_err());
        assert!(RepriceOptions::new(0.0).is_ok());
    }
}
