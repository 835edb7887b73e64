// Nightly-stay price breakdown.
//
// Pure and input-deterministic: the listing-detail preview and the payment
// confirmation summary both call `compute_breakdown` with the same inputs
// and must display matching numbers. All amounts are whole currency units.

use chrono::NaiveDate;
use thiserror::Error;

// Fixed platform rates applied to the subtotal.
pub const SERVICE_FEE_RATE: f64 = 0.14;
pub const TAX_RATE: f64 = 0.12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    // Check-out must be strictly after check-in; a non-positive night count
    // would produce a zero or negative price, so the caller must block
    // payment until the range is corrected.
    #[error("invalid date range: check-out {check_out} is not after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

// Computed price decomposition for a stay.
//
// `total` is always exactly the sum of `subtotal`, `cleaning_fee`,
// `service_fee` and `taxes`. Service fee and taxes are each rounded to the
// nearest whole unit independently before summing, so the total can differ
// by one unit from a round-at-the-end computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub base_rate: i64,
    pub nights: i64,
    pub subtotal: i64,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub taxes: i64,
    pub total: i64,
}

// Number of nights between two dates. Zero or negative when the range is
// inverted or empty; `compute_breakdown` rejects those.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

pub fn compute_breakdown(
    base_rate: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    cleaning_fee: i64,
) -> Result<PriceBreakdown, PricingError> {
    let nights = nights_between(check_in, check_out);
    if nights <= 0 {
        return Err(PricingError::InvalidRange {
            check_in,
            check_out,
        });
    }

    let subtotal = base_rate * nights;
    let service_fee = round_fee(subtotal, SERVICE_FEE_RATE);
    let taxes = round_fee(subtotal, TAX_RATE);
    let total = subtotal + cleaning_fee + service_fee + taxes;

    Ok(PriceBreakdown {
        base_rate,
        nights,
        subtotal,
        cleaning_fee,
        service_fee,
        taxes,
        total,
    })
}

fn round_fee(subtotal: i64, rate: f64) -> i64 {
    (subtotal as f64 * rate).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn three_night_stay_breakdown() {
        let b = compute_breakdown(100, date("2024-01-01"), date("2024-01-04"), 25).unwrap();
        assert_eq!(b.nights, 3);
        assert_eq!(b.subtotal, 300);
        assert_eq!(b.service_fee, 42);
        assert_eq!(b.taxes, 36);
        assert_eq!(b.total, 403);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err =
            compute_breakdown(100, date("2024-01-05"), date("2024-01-01"), 0).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidRange {
                check_in: date("2024-01-05"),
                check_out: date("2024-01-01"),
            }
        );
    }

    #[test]
    fn zero_night_range_is_rejected() {
        let d = date("2024-03-10");
        assert!(compute_breakdown(100, d, d, 25).is_err());
    }

    #[test]
    fn total_equals_sum_of_components() {
        let b = compute_breakdown(87, date("2025-02-01"), date("2025-02-06"), 40).unwrap();
        assert_eq!(
            b.total,
            b.subtotal + b.cleaning_fee + b.service_fee + b.taxes
        );
    }

    // Fees round independently, half away from zero.
    #[test_case(75, 1, 0, 11, 9, 95; "one night at 75")]
    #[test_case(125, 2, 50, 35, 30, 365; "two nights with cleaning fee")]
    #[test_case(33, 3, 0, 14, 12, 125; "odd rate rounds each fee")]
    fn fee_rounding_table(
        rate: i64,
        nights: i64,
        cleaning: i64,
        service: i64,
        taxes: i64,
        total: i64,
    ) {
        let check_in = date("2024-06-01");
        let check_out = check_in + chrono::Duration::days(nights);
        let b = compute_breakdown(rate, check_in, check_out, cleaning).unwrap();
        assert_eq!(b.service_fee, service);
        assert_eq!(b.taxes, taxes);
        assert_eq!(b.total, total);
    }

    #[test]
    fn identical_inputs_yield_identical_breakdowns() {
        let a = compute_breakdown(150, date("2024-08-10"), date("2024-08-15"), 30).unwrap();
        let b = compute_breakdown(150, date("2024-08-10"), date("2024-08-15"), 30).unwrap();
        assert_eq!(a, b);
    }
}
