//! Medical record number allocation
//!
//! Numbers have the form `File N`. A new number is one past the largest
//! number already in use; when the existing numbers cannot be read a
//! time-derived number is used instead. Concurrent allocations can collide,
//! which surfaces as a `Conflict` on create.

use chrono::Utc;
use rand::Rng;

/// Formats a file number
pub fn file_number(n: u64) -> String {
    format!("File {n}")
}

/// First run of digits in a record number (`"File 12"` and `"12"` both give 12)
pub fn number_of(value: &str) -> Option<u64> {
    value
        .split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse().ok())
}

/// Next number after the largest in `existing`; `File 1` when none has digits
pub fn next_file_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let max = existing.into_iter().filter_map(number_of).max().unwrap_or(0);
    file_number(max.saturating_add(1))
}

/// Time-derived number used when the table could not be scanned
pub fn fallback_file_number() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let jitter = rand::thread_rng().gen_range(0..1000);
    file_number(millis % 10_000 + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("File 12" => Some(12))]
    #[test_case("12" => Some(12))]
    #[test_case("File 007" => Some(7))]
    #[test_case("MRN-44-B" => Some(44))]
    #[test_case("File" => None)]
    #[test_case("" => None)]
    fn test_number_of(value: &str) -> Option<u64> {
        number_of(value)
    }

    #[test]
    fn test_next_after_max() {
        assert_eq!(next_file_number(["File 3", "File 7", "File 12"]), "File 13");
    }

    #[test]
    fn test_next_ignores_non_numeric() {
        assert_eq!(next_file_number(["", "walk-in", "File 2"]), "File 3");
        assert_eq!(next_file_number(Vec::<&str>::new()), "File 1");
    }

    #[test]
    fn test_fallback_shape() {
        let value = fallback_file_number();
        let n = number_of(&value).unwrap();
        assert!(value.starts_with("File "));
        assert!(n < 11_000);
    }
}
