use crate::limits::RESIDENT_DISCOUNT;
use crate::model::{ClassTag, TermUnit};

use super::EngineError;

/// Compute the rental fee for a term. Pure: no state, no clock, identical
/// arguments always yield identical results.
///
/// The duration is converted to a day count using the term unit's length,
/// then `fee = (2 × days + 5 × rate_weight(class)) × (1 − discount)`.
pub fn compute_fee(
    class_tag: ClassTag,
    term: TermUnit,
    duration_units: u32,
    discount: f64,
) -> Result<f64, EngineError> {
    if !(0.0..=1.0).contains(&discount) {
        return Err(EngineError::InvalidDiscount(discount));
    }
    let days = duration_units as i64 * term.length_days();
    let base = 2.0 * days as f64 + 5.0 * class_tag.rate_weight() as f64;
    Ok(base * (1.0 - discount))
}

/// The canonical discount for a resident customer; everyone else pays full
/// rate. Mapping customers to residency is the caller's concern.
pub fn discount_for_resident(is_resident: bool) -> f64 {
    if is_resident { RESIDENT_DISCOUNT } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(c: char) -> ClassTag {
        ClassTag::new(c).unwrap()
    }

    #[test]
    fn five_days_class_a() {
        let fee = compute_fee(tag('A'), TermUnit::Day, 5, 0.0).unwrap();
        assert_eq!(fee, 140.0); // 2*5 + 5*26
    }

    #[test]
    fn day_count_follows_term_unit() {
        // 2 weeks = 14 days, class Z weight 1: 2*14 + 5 = 33.
        let fee = compute_fee(tag('Z'), TermUnit::Week, 2, 0.0).unwrap();
        assert_eq!(fee, 33.0);

        // 1 month = 30 days, class M weight 14: 2*30 + 70 = 130.
        let fee = compute_fee(tag('M'), TermUnit::Month, 1, 0.0).unwrap();
        assert_eq!(fee, 130.0);
    }

    #[test]
    fn discount_applies_proportionally() {
        let full = compute_fee(tag('A'), TermUnit::Day, 5, 0.0).unwrap();
        let quarter_off = compute_fee(tag('A'), TermUnit::Day, 5, 0.25).unwrap();
        assert_eq!(quarter_off, full * 0.75);

        let free = compute_fee(tag('A'), TermUnit::Day, 5, 1.0).unwrap();
        assert_eq!(free, 0.0);
    }

    #[test]
    fn rejects_out_of_range_discount() {
        assert!(matches!(
            compute_fee(tag('A'), TermUnit::Day, 5, -0.1),
            Err(EngineError::InvalidDiscount(_))
        ));
        assert!(matches!(
            compute_fee(tag('A'), TermUnit::Day, 5, 1.5),
            Err(EngineError::InvalidDiscount(_))
        ));
    }

    #[test]
    fn identical_arguments_identical_fee() {
        let a = compute_fee(tag('G'), TermUnit::Week, 3, 0.1).unwrap();
        let b = compute_fee(tag('G'), TermUnit::Week, 3, 0.1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resident_discount_rate() {
        assert_eq!(discount_for_resident(true), 0.25);
        assert_eq!(discount_for_resident(false), 0.0);
    }
}
