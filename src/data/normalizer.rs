//! Code normalization: digits only, capped length.

use crate::error::Result;
use polars::prelude::*;

/// Length of a dialable code after normalization.
pub const CODE_LENGTH: usize = 7;

/// Strip everything that is not an ASCII digit and keep the first
/// `max_len` digits. Null maps to the empty string.
pub fn normalize_code(value: Option<&str>, max_len: usize) -> String {
    value
        .map(|v| {
            v.chars()
                .filter(|c| c.is_ascii_digit())
                .take(max_len)
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize every value of a column, whatever its dtype.
///
/// Numbers are rendered as text first, so a float code such as `5551234.0`
/// keeps its leading digits.
pub fn normalize_column(column: &Column, max_len: usize) -> Result<Vec<String>> {
    let as_text = column.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| normalize_code(v, max_len))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_digits_and_truncates() {
        assert_eq!(normalize_code(Some("+1 (555) 123-4567"), CODE_LENGTH), "1555123");
        assert_eq!(normalize_code(Some(" 555-1234 "), CODE_LENGTH), "5551234");
        assert_eq!(normalize_code(Some("12345"), CODE_LENGTH), "12345");
        assert_eq!(normalize_code(Some("abc"), CODE_LENGTH), "");
        assert_eq!(normalize_code(None, CODE_LENGTH), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["+44 20 7946 0958", "", "5551234", "x9y8z7", "٣٤٥1234567"] {
            let once = normalize_code(Some(raw), CODE_LENGTH);
            assert_eq!(normalize_code(Some(&once), CODE_LENGTH), once);
        }
    }

    #[test]
    fn non_ascii_digits_are_stripped() {
        assert_eq!(normalize_code(Some("٣٤٥"), CODE_LENGTH), "");
    }

    #[test]
    fn normalizes_numeric_columns() {
        let ints = Column::new("Code".into(), [Some(5551234i64), None]);
        assert_eq!(
            normalize_column(&ints, CODE_LENGTH).unwrap(),
            vec!["5551234".to_string(), String::new()]
        );

        let floats = Column::new("Code".into(), [5551234.0f64]);
        assert_eq!(normalize_column(&floats, CODE_LENGTH).unwrap(), vec!["5551234"]);
    }
}
