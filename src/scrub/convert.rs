use crate::records::Value;
use crate::scrub::date_parser;

/// Numeric coercion: integers stay integral, other numbers become reals,
/// anything unparseable (or non-finite) becomes `Null`.
pub fn to_numeric(v: &Value) -> Value {
    match v {
        Value::Integer(_) | Value::Null => v.clone(),
        Value::Real(f) if f.is_finite() => v.clone(),
        Value::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Value::Integer(i);
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Real(f),
                _ => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

/// Date coercion to a calendar date, `Null` on failure.
pub fn to_date(v: &Value) -> Value {
    match v {
        Value::Date(_) | Value::Null => v.clone(),
        Value::Text(s) => date_parser::parse_date(s).map_or(Value::Null, Value::Date),
        _ => Value::Null,
    }
}

/// Coerce the cells at `idx` in every row; returns how many non-empty cells
/// were turned into `Null`.
pub fn coerce_column(rows: &mut [Vec<Value>], idx: usize, f: fn(&Value) -> Value) -> usize {
    let mut nulled = 0;
    for row in rows.iter_mut() {
        let cell = &mut row[idx];
        let coerced = f(cell);
        if coerced == Value::Null && *cell != Value::Null {
            nulled += 1;
        }
        *cell = coerced;
    }
    nulled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn numeric_coercion() {
        assert_eq!(to_numeric(&Value::Text("42".into())), Value::Integer(42));
        assert_eq!(to_numeric(&Value::Text("9.99".into())), Value::Real(9.99));
        assert_eq!(to_numeric(&Value::Text(" 3e2 ".into())), Value::Real(300.0));
        assert_eq!(to_numeric(&Value::Text("abc".into())), Value::Null);
        assert_eq!(to_numeric(&Value::Text("NaN".into())), Value::Null);
        assert_eq!(to_numeric(&Value::Real(f64::INFINITY)), Value::Null);
        assert_eq!(to_numeric(&Value::Integer(7)), Value::Integer(7));
    }

    #[test]
    fn date_coercion() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(to_date(&Value::Text("2024-05-02".into())), Value::Date(d));
        assert_eq!(to_date(&Value::Date(d)), Value::Date(d));
        assert_eq!(to_date(&Value::Text("2024-13-40".into())), Value::Null);
        assert_eq!(to_date(&Value::Integer(20240502)), Value::Null);
    }

    #[test]
    fn counts_only_values_lost() {
        let mut rows = vec![
            vec![Value::Text("1".into())],
            vec![Value::Text("x".into())],
            vec![Value::Null],
        ];
        let nulled = coerce_column(&mut rows, 0, to_numeric);
        assert_eq!(nulled, 1);
        assert_eq!(rows[0][0], Value::Integer(1));
        assert_eq!(rows[1][0], Value::Null);
    }
}
