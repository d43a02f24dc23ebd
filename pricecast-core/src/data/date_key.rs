//! Integer date keys.
//!
//! The warehouse stores dates as integers laid out as `year * 10000 + month * 100 + day`.
//! Decomposition is pure arithmetic and never fails; calendar validity is
//! checked later, where a real date is needed.

use serde::{Deserialize, Serialize};

use crate::domain::CalendarDate;

/// Split a date key into its year, month and day fields.
///
/// `year * 10000 + month * 100 + day == key` holds for every `key`.
pub fn decompose(key: i64) -> CalendarDate {
    CalendarDate::new(key / 10000, (key / 100) % 100, key % 100)
}

/// How the year field of a decomposed key is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateEncoding {
    /// Two-digit years: a year field in `0..100` means `2000 + yy`.
    #[default]
    Yymmdd,
    /// The arithmetic year is used as-is.
    Literal,
}

impl DateEncoding {
    /// Decompose `key` and apply this encoding's year rule.
    pub fn decode(self, key: i64) -> CalendarDate {
        let raw = decompose(key);
        match self {
            DateEncoding::Yymmdd if (0..100).contains(&raw.year) => {
                CalendarDate::new(2000 + raw.year, raw.month, raw.day)
            }
            _ => raw,
        }
    }

    /// Inverse of [`DateEncoding::decode`] for dates it can produce.
    pub fn encode(self, date: CalendarDate) -> i64 {
        let year = match self {
            DateEncoding::Yymmdd if (2000..2100).contains(&date.year) => date.year - 2000,
            _ => date.year,
        };
        year * 10000 + date.month * 100 + date.day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_yymmdd_key() {
        let d = decompose(240230);
        assert_eq!((d.year, d.month, d.day), (24, 2, 30));
    }

    #[test]
    fn decomposes_yyyymmdd_key() {
        let d = decompose(20240115);
        assert_eq!((d.year, d.month, d.day), (2024, 1, 15));
    }

    #[test]
    fn yymmdd_maps_two_digit_years_into_2000s() {
        let d = DateEncoding::Yymmdd.decode(240230);
        assert_eq!((d.year, d.month, d.day), (2024, 2, 30));
        assert!(!d.is_valid());

        let full = DateEncoding::Yymmdd.decode(20240115);
        assert_eq!(full.year, 2024);
    }

    #[test]
    fn literal_keeps_arithmetic_year() {
        assert_eq!(DateEncoding::Literal.decode(240230).year, 24);
    }

    #[test]
    fn encode_inverts_decode() {
        for key in [240102, 991231, 10101] {
            let d = DateEncoding::Yymmdd.decode(key);
            assert_eq!(DateEncoding::Yymmdd.encode(d), key);
        }
        assert_eq!(
            DateEncoding::Literal.encode(DateEncoding::Literal.decode(20231129)),
            20231129
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&DateEncoding::Yymmdd).unwrap(),
            "\"yymmdd\""
        );
        let lit: DateEncoding = serde_json::from_str("\"literal\"").unwrap();
        assert_eq!(lit, DateEncoding::Literal);
    }
}
