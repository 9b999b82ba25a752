use crate::records::Value;

/// Trim every string cell in place; cells that trim to nothing become `Null`.
pub fn apply_trimming(rows: &mut [Vec<Value>]) {
    for cell in rows.iter_mut().flat_map(|row| row.iter_mut()) {
        if let Value::Text(s) = cell {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                *cell = Value::Null;
            } else if trimmed.len() != s.len() {
                *cell = Value::Text(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_text_and_nulls_blanks() {
        let mut rows = vec![vec![
            Value::Text(" Ann ".into()),
            Value::Text("   ".into()),
            Value::Integer(3),
            Value::Text("ok".into()),
        ]];
        apply_trimming(&mut rows);
        assert_eq!(
            rows[0],
            vec![
                Value::Text("Ann".into()),
                Value::Null,
                Value::Integer(3),
                Value::Text("ok".into()),
            ]
        );
    }
}
