//! Read access to loosely-typed persisted rows.
//!
//! Every field is looked up through an ordered list of candidate keys (the
//! first present, non-null key wins), so the two schema eras are resolved here
//! and nowhere else. Accessors never fail: missing or malformed values come
//! back as `None` or zero.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::{MoneyCents, dates::parse_date, labels};

/// Borrowed view over one persisted row.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawRow<'a> {
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> RawRow<'a> {
    /// Non-object values behave like an empty row.
    pub(crate) fn new(value: &'a Value) -> Self {
        Self {
            fields: value.as_object(),
        }
    }

    /// First candidate key holding a non-null value.
    fn lookup(&self, keys: &[&str]) -> Option<&'a Value> {
        let fields = self.fields?;
        keys.iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| !value.is_null())
    }

    /// `true` when any candidate key carries a non-null value.
    pub(crate) fn has(&self, keys: &[&str]) -> bool {
        self.lookup(keys).is_some()
    }

    /// Trimmed text, with inner whitespace collapsed. Numbers and booleans are
    /// rendered as text; blank strings are `None`.
    pub(crate) fn text(&self, keys: &[&str]) -> Option<String> {
        match self.lookup(keys)? {
            Value::String(raw) => labels::normalize_display(raw),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Text or an empty string.
    pub(crate) fn text_or_empty(&self, keys: &[&str]) -> String {
        self.text(keys).unwrap_or_default()
    }

    /// Numeric value; non-numeric or missing input is `0.0`.
    pub(crate) fn number(&self, keys: &[&str]) -> f64 {
        let parsed = match self.lookup(keys) {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => parse_decimal(raw),
            _ => None,
        };
        parsed.filter(|value| value.is_finite()).unwrap_or(0.0)
    }

    /// Monetary value in cents; non-numeric or missing input is zero.
    pub(crate) fn money(&self, keys: &[&str]) -> MoneyCents {
        MoneyCents::from_units(self.number(keys))
    }

    /// Monetary value only when the row actually carries a numeric field.
    pub(crate) fn money_opt(&self, keys: &[&str]) -> Option<MoneyCents> {
        match self.lookup(keys)? {
            Value::Number(number) => number.as_f64().map(MoneyCents::from_units),
            Value::String(raw) => parse_decimal(raw).map(MoneyCents::from_units),
            _ => None,
        }
    }

    /// Integer value, truncating decimals; anything else is `0`.
    pub(crate) fn integer(&self, keys: &[&str]) -> i64 {
        match self.lookup(keys) {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value.trunc() as i64))
                .unwrap_or(0),
            Some(Value::String(raw)) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| parse_decimal(raw).map(|value| value.trunc() as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Calendar date when present and parseable.
    pub(crate) fn date(&self, keys: &[&str]) -> Option<NaiveDate> {
        match self.lookup(keys)? {
            Value::String(raw) => parse_date(raw),
            _ => None,
        }
    }

    /// Normalised status/kind token.
    pub(crate) fn token(&self, keys: &[&str]) -> Option<String> {
        match self.lookup(keys)? {
            Value::String(raw) => labels::status_token(raw),
            _ => None,
        }
    }

    /// Nested array of rows; anything else is empty.
    pub(crate) fn rows(&self, keys: &[&str]) -> &'a [Value] {
        match self.lookup(keys) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }
}

/// Parses `1234.5`, `1234,5` and `1.234,50` style decimals.
fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = match (trimmed.rfind('.'), trimmed.rfind(',')) {
        // `1.234,50`: dots group thousands, comma separates decimals.
        (Some(dot), Some(comma)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        // `1,234.50`
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (None, Some(_)) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };
    canonical.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn first_present_candidate_wins() {
        let value = json!({"nome": "Legado", "name": "Atual"});
        let row = RawRow::new(&value);
        assert_eq!(row.text(&["name", "nome"]), Some("Atual".to_string()));
        assert_eq!(row.text(&["nome", "name"]), Some("Legado".to_string()));
    }

    #[test]
    fn null_falls_through_to_next_candidate() {
        let value = json!({"name": null, "nome": "Legado"});
        let row = RawRow::new(&value);
        assert_eq!(row.text(&["name", "nome"]), Some("Legado".to_string()));
        assert!(row.has(&["name", "nome"]));
        assert!(!row.has(&["status"]));
    }

    #[test]
    fn numbers_coerce_to_zero() {
        let value = json!({"a": "abc", "b": "1.234,50", "c": 12.5, "d": [1], "e": "7"});
        let row = RawRow::new(&value);
        assert_eq!(row.number(&["a"]), 0.0);
        assert_eq!(row.number(&["b"]), 1234.5);
        assert_eq!(row.number(&["c"]), 12.5);
        assert_eq!(row.number(&["d"]), 0.0);
        assert_eq!(row.number(&["missing"]), 0.0);
        assert_eq!(row.money(&["b"]).cents(), 123_450);
        assert_eq!(row.integer(&["e"]), 7);
        assert_eq!(row.integer(&["c"]), 12);
        assert_eq!(row.money_opt(&["missing"]), None);
    }

    #[test]
    fn non_object_rows_are_empty() {
        let value = json!(["not", "a", "row"]);
        let row = RawRow::new(&value);
        assert_eq!(row.text(&["name"]), None);
        assert!(row.rows(&["attachments"]).is_empty());
    }

    #[test]
    fn decimal_formats() {
        assert_eq!(parse_decimal("1,234.50"), Some(1234.5));
        assert_eq!(parse_decimal("10,5"), Some(10.5));
        assert_eq!(parse_decimal(" "), None);
    }
}
