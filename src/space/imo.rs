//! IMO number helpers
//!
//! An IMO ship identification number is seven digits; the last digit is a
//! check digit computed from the first six.

/// Returns true if `imo` is a seven-digit number with a valid check digit
///
/// The check digit is `sum(d[i] * (7 - i)) % 10` over the first six digits,
/// i.e. the leading digit is weighted 7 and the sixth digit is weighted 2.
pub fn imo_checksum_ok(imo: u64) -> bool {
    if !(1_000_000..=9_999_999).contains(&imo) {
        return false;
    }

    let digits: Vec<u64> = (0..7).rev().map(|i| (imo / 10u64.pow(i)) % 10).collect();

    let sum: u64 = digits[..6]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (7 - i as u64))
        .sum();

    sum % 10 == digits[6]
}

/// Extracts the IMO number from a vessel page URL
///
/// Accepts lines of the form `https://host/vessel/imo/9538428`, with or
/// without surrounding whitespace or a trailing slash. Returns None for
/// anything that doesn't end in a numeric IMO segment.
pub fn imo_from_vessel_url(line: &str) -> Option<u64> {
    let trimmed = line.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let (prefix, last) = trimmed.rsplit_once('/')?;
    if !prefix.ends_with("/vessel/imo") {
        return None;
    }

    last.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_imo_numbers() {
        // Published IMO numbers with correct check digits
        assert!(imo_checksum_ok(9074729));
        assert!(imo_checksum_ok(9176187));
        assert!(imo_checksum_ok(9538426));
    }

    #[test]
    fn test_invalid_check_digit() {
        assert!(!imo_checksum_ok(9074720));
        assert!(!imo_checksum_ok(9538428));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(!imo_checksum_ok(0));
        assert!(!imo_checksum_ok(999_999));
        assert!(!imo_checksum_ok(10_000_000));
    }

    #[test]
    fn test_check_digit_density() {
        // Exactly one in ten consecutive numbers has a valid check digit
        let valid = (9_200_000..9_200_100)
            .filter(|&n| imo_checksum_ok(n))
            .count();
        assert_eq!(valid, 10);
    }

    #[test]
    fn test_imo_from_vessel_url() {
        assert_eq!(
            imo_from_vessel_url("https://www.balticshipping.com/vessel/imo/9538428"),
            Some(9538428)
        );
        assert_eq!(
            imo_from_vessel_url("  https://www.balticshipping.com/vessel/imo/9074729/ \n"),
            Some(9074729)
        );
    }

    #[test]
    fn test_imo_from_vessel_url_rejects_other_lines() {
        assert_eq!(imo_from_vessel_url(""), None);
        assert_eq!(imo_from_vessel_url("https://example.com/about"), None);
        assert_eq!(
            imo_from_vessel_url("https://www.balticshipping.com/vessel/imo/abc"),
            None
        );
        assert_eq!(imo_from_vessel_url("9538428"), None);
    }
}
