use super::category::Category;
use super::commission::{CommissionLineItem, CommissionResult, LineItemKind};
use super::rules::{PricingMode, RuleSet};
use super::sale::SaleInput;
use crate::error::{CommissionError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Share of the accumulated commission clawed back below redline.
const REDLINE_PENALTY_FACTOR: Decimal = dec!(0.5);

/// Pure commission calculator.
///
/// The engine never validates rule ranges. Negative intermediate values are
/// carried through and only the final payable total is floored at zero.
#[derive(Debug, Clone, Copy)]
pub struct CommissionEngine {
    category: Category,
}

impl CommissionEngine {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    /// Computes the commission for one sale.
    ///
    /// `monthly_completed_count` is the number of completed sales in the
    /// category this calendar month. Returns `Ok(None)` when the input is not
    /// ready (non-positive unit count) and a validation error when an amount
    /// does not fit in a `Decimal`.
    pub fn compute(
        &self,
        input: &SaleInput,
        rules: &RuleSet,
        monthly_completed_count: u32,
    ) -> Result<Option<CommissionResult>> {
        if !input.is_ready() {
            return Ok(None);
        }
        let result = match rules.mode {
            PricingMode::PercentOfSale => percent_of_sale(input, rules, monthly_completed_count)?,
            PricingMode::MarginAboveRedline => {
                margin_above_redline(input, rules, monthly_completed_count, self.category)?
            }
        };
        Ok(Some(result))
    }
}

fn too_large() -> CommissionError {
    CommissionError::Validation("sale is too large to calculate".to_string())
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(too_large)
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(too_large)
}

fn sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(too_large)
}

fn percent(amount: Decimal, rate_percent: Decimal) -> Result<Decimal> {
    Ok(mul(amount, rate_percent)? / Decimal::ONE_HUNDRED)
}

fn volume_bonus(
    on_amount: Decimal,
    rules: &RuleSet,
    monthly_completed_count: u32,
) -> Result<Option<CommissionLineItem>> {
    let bonus = &rules.volume_bonus;
    if !bonus.enabled || monthly_completed_count < bonus.monthly_threshold {
        return Ok(None);
    }
    Ok(Some(CommissionLineItem::new(
        format!(
            "Volume Bonus ({}/{} sales)",
            monthly_completed_count, bonus.monthly_threshold
        ),
        percent(on_amount, bonus.bonus_rate_percent)?,
        LineItemKind::Bonus,
    )))
}

/// Applies sharing to `total` and builds the final result.
fn finish(
    sale_amount: Decimal,
    total: Decimal,
    rules: &RuleSet,
    mut breakdown: Vec<CommissionLineItem>,
) -> Result<CommissionResult> {
    let mut final_commission = total;
    if rules.sharing.enabled {
        let shared = percent(total, rules.sharing.shared_percent)?;
        breakdown.push(CommissionLineItem::new(
            format!(
                "{} ({}%)",
                rules.sharing.reason,
                rules.sharing.shared_percent.normalize()
            ),
            shared,
            LineItemKind::Shared,
        ));
        final_commission = sub(total, shared)?;
    }

    Ok(CommissionResult {
        sale_amount,
        gross_commission: total,
        total_commission: final_commission.max(Decimal::ZERO),
        breakdown,
    })
}

fn percent_of_sale(
    input: &SaleInput,
    rules: &RuleSet,
    monthly_completed_count: u32,
) -> Result<CommissionResult> {
    let sale_amount = input.sale_amount().ok_or_else(too_large)?;
    let base = percent(sale_amount, rules.base_rate_percent)?;
    let mut breakdown = vec![CommissionLineItem::new(
        "Base Commission",
        base,
        LineItemKind::Base,
    )];
    let mut total = base;

    if let Some(bonus) = volume_bonus(sale_amount, rules, monthly_completed_count)? {
        total = add(total, bonus.amount)?;
        breakdown.push(bonus);
    }

    if rules.is_below_redline(input.unit_price) {
        let penalty = mul(total, REDLINE_PENALTY_FACTOR)?;
        breakdown.push(CommissionLineItem::new(
            "Below Redline Penalty",
            penalty,
            LineItemKind::Penalty,
        ));
        total = sub(total, penalty)?;
    }

    finish(sale_amount, total, rules, breakdown)
}

fn margin_above_redline(
    input: &SaleInput,
    rules: &RuleSet,
    monthly_completed_count: u32,
    category: Category,
) -> Result<CommissionResult> {
    let base_units = mul(input.unit_count, category.base_unit_factor())?;
    let sale_amount = mul(base_units, input.unit_price)?;

    if rules.is_below_redline(input.unit_price) {
        return Ok(CommissionResult {
            sale_amount,
            gross_commission: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            breakdown: vec![CommissionLineItem::new(
                "Below Redline - No Commission",
                Decimal::ZERO,
                LineItemKind::Penalty,
            )],
        });
    }

    let redline_amount = mul(base_units, rules.redline_price)?;
    let commission = percent(sub(sale_amount, redline_amount)?, rules.base_rate_percent)?;
    let mut breakdown = vec![
        CommissionLineItem::new("Redline Amount", redline_amount, LineItemKind::Base),
        CommissionLineItem::new("Above Redline Commission", commission, LineItemKind::Bonus),
    ];
    let mut total = commission;

    if let Some(bonus) = volume_bonus(commission, rules, monthly_completed_count)? {
        total = add(total, bonus.amount)?;
        breakdown.push(bonus);
    }

    finish(sale_amount, total, rules, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::{Sharing, VolumeBonus};
    use LineItemKind::*;

    fn solar() -> CommissionEngine {
        CommissionEngine::new(Category::Solar)
    }

    fn plain_rules(base_rate: Decimal, redline: Decimal) -> RuleSet {
        RuleSet {
            base_rate_percent: base_rate,
            redline_price: redline,
            ..RuleSet::default()
        }
    }

    fn margin_rules(base_rate: Decimal, redline: Decimal) -> RuleSet {
        RuleSet {
            mode: PricingMode::MarginAboveRedline,
            ..plain_rules(base_rate, redline)
        }
    }

    #[test]
    fn test_percent_of_sale_reference_scenario() {
        let input = SaleInput::new(dec!(8.5), dec!(3.20));
        let result = solar()
            .compute(&input, &plain_rules(dec!(3.5), dec!(2.80)), 0)
            .unwrap()
            .unwrap();

        assert_eq!(result.sale_amount, dec!(27.20));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].label, "Base Commission");
        assert_eq!(result.breakdown[0].amount, dec!(0.952));
        assert_eq!(result.total_commission, dec!(0.952));
        assert_eq!(result.gross_commission, dec!(0.952));
    }

    #[test]
    fn test_not_ready_input_is_a_no_op() {
        let rules = RuleSet::default();
        assert!(solar().compute(&SaleInput::new(dec!(0), dec!(3)), &rules, 0).unwrap().is_none());
        assert!(solar().compute(&SaleInput::new(dec!(-1), dec!(3)), &rules, 0).unwrap().is_none());
    }

    #[test]
    fn test_redline_penalty_halves_accumulated_total() {
        let mut rules = plain_rules(dec!(4), dec!(3.00));
        rules.volume_bonus = VolumeBonus {
            enabled: true,
            monthly_threshold: 2,
            bonus_rate_percent: dec!(1),
        };
        let input = SaleInput::new(dec!(10), dec!(2.50));
        let result = solar().compute(&input, &rules, 2).unwrap().unwrap();

        // base 1.00 + bonus 0.25 = 1.25 before the penalty
        assert_eq!(result.kinds(), vec![Base, Bonus, Penalty]);
        assert_eq!(result.item(Penalty).unwrap().amount, dec!(0.625));
        assert_eq!(result.total_commission, dec!(0.625));
        assert_eq!(result.item(Penalty).unwrap().label, "Below Redline Penalty");
    }

    #[test]
    fn test_price_at_redline_has_no_penalty_in_percent_mode() {
        let input = SaleInput::new(dec!(10), dec!(2.80));
        let result = solar()
            .compute(&input, &plain_rules(dec!(3.5), dec!(2.80)), 0)
            .unwrap()
            .unwrap();
        assert!(result.item(Penalty).is_none());
        assert_eq!(result.total_commission, dec!(0.98));
    }

    #[test]
    fn test_volume_bonus_threshold_boundary() {
        let mut rules = plain_rules(dec!(3.5), dec!(2.80));
        rules.volume_bonus = VolumeBonus {
            enabled: true,
            monthly_threshold: 10,
            bonus_rate_percent: dec!(0.5),
        };
        let input = SaleInput::new(dec!(100), dec!(3.00));

        let below = solar().compute(&input, &rules, 9).unwrap().unwrap();
        assert!(below.item(Bonus).is_none());
        assert_eq!(below.total_commission, dec!(10.5));

        let at = solar().compute(&input, &rules, 10).unwrap().unwrap();
        let bonus = at.item(Bonus).unwrap();
        assert_eq!(bonus.label, "Volume Bonus (10/10 sales)");
        assert_eq!(bonus.amount, dec!(1.5));
        assert_eq!(at.total_commission, dec!(12.0));
    }

    #[test]
    fn test_disabled_volume_bonus_ignores_count() {
        let input = SaleInput::new(dec!(100), dec!(3.00));
        let result = solar()
            .compute(&input, &plain_rules(dec!(3.5), dec!(2.80)), 50)
            .unwrap()
            .unwrap();
        assert_eq!(result.kinds(), vec![Base]);
    }

    #[test]
    fn test_sharing_reduces_payable_but_not_gross() {
        let mut rules = plain_rules(dec!(5), dec!(2.80));
        rules.sharing = Sharing {
            enabled: true,
            shared_percent: dec!(25.0),
            reason: "Split with setter".to_string(),
        };
        let input = SaleInput::new(dec!(200), dec!(3.00));
        let result = solar().compute(&input, &rules, 0).unwrap().unwrap();

        assert_eq!(result.gross_commission, dec!(30));
        let shared = result.item(Shared).unwrap();
        assert_eq!(shared.label, "Split with setter (25%)");
        assert_eq!(shared.amount, dec!(7.5));
        assert_eq!(
            result.total_commission,
            result.gross_commission * (Decimal::ONE - dec!(25) / Decimal::ONE_HUNDRED)
        );
    }

    #[test]
    fn test_full_breakdown_order_in_percent_mode() {
        let mut rules = plain_rules(dec!(3.5), dec!(3.00));
        rules.volume_bonus.enabled = true;
        rules.volume_bonus.monthly_threshold = 1;
        rules.sharing.enabled = true;
        let input = SaleInput::new(dec!(8), dec!(2.90));
        let result = solar().compute(&input, &rules, 3).unwrap().unwrap();
        assert_eq!(result.kinds(), vec![Base, Bonus, Penalty, Shared]);
    }

    #[test]
    fn test_margin_mode_below_redline_is_hard_cutoff() {
        let mut rules = margin_rules(dec!(10), dec!(2.80));
        rules.volume_bonus.enabled = true;
        rules.volume_bonus.monthly_threshold = 0;
        rules.sharing.enabled = true;
        let input = SaleInput::new(dec!(12), dec!(2.50));
        let result = solar().compute(&input, &rules, 5).unwrap().unwrap();

        assert_eq!(result.total_commission, Decimal::ZERO);
        assert_eq!(result.sale_amount, dec!(30000));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].kind, Penalty);
        assert_eq!(result.breakdown[0].label, "Below Redline - No Commission");
        assert_eq!(result.breakdown[0].amount, Decimal::ZERO);
    }

    #[test]
    fn test_margin_mode_at_redline_pays_nothing() {
        let input = SaleInput::new(dec!(5), dec!(2.80));
        let result = solar()
            .compute(&input, &margin_rules(dec!(10), dec!(2.80)), 0)
            .unwrap()
            .unwrap();
        assert_eq!(result.kinds(), vec![Penalty]);
    }

    #[test]
    fn test_margin_mode_commission_on_margin() {
        let mut rules = margin_rules(dec!(10), dec!(2.80));
        rules.volume_bonus = VolumeBonus {
            enabled: true,
            monthly_threshold: 3,
            bonus_rate_percent: dec!(20),
        };
        rules.sharing = Sharing {
            enabled: true,
            shared_percent: dec!(50),
            reason: "Split with setter".to_string(),
        };
        let input = SaleInput::new(dec!(10), dec!(3.20));
        let result = solar().compute(&input, &rules, 3).unwrap().unwrap();

        assert_eq!(result.sale_amount, dec!(32000));
        assert_eq!(result.kinds(), vec![Base, Bonus, Bonus, Shared]);
        assert_eq!(result.breakdown[0].label, "Redline Amount");
        assert_eq!(result.breakdown[0].amount, dec!(28000));
        assert_eq!(result.breakdown[1].amount, dec!(400));
        // bonus is a share of the margin commission, not of the sale
        assert_eq!(result.breakdown[2].amount, dec!(80));
        assert_eq!(result.gross_commission, dec!(480));
        assert_eq!(result.total_commission, dec!(240));
    }

    #[test]
    fn test_margin_mode_uses_category_conversion() {
        let input = SaleInput::new(dec!(100), dec!(3.00));
        let result = CommissionEngine::new(Category::Lighting)
            .compute(&input, &margin_rules(dec!(10), dec!(2.00)), 0)
            .unwrap()
            .unwrap();
        assert_eq!(result.sale_amount, dec!(300));
        assert_eq!(result.total_commission, dec!(10));
    }

    // Out-of-range rules are not rejected here; only the payable total is floored.
    #[test]
    fn test_engine_is_lenient_with_out_of_range_rules() {
        let mut rules = plain_rules(dec!(-5), dec!(2.80));
        let input = SaleInput::new(dec!(10), dec!(3.00));
        let result = solar().compute(&input, &rules, 0).unwrap().unwrap();
        assert_eq!(result.breakdown[0].amount, dec!(-1.5));
        assert_eq!(result.gross_commission, dec!(-1.5));
        assert_eq!(result.total_commission, Decimal::ZERO);

        rules = plain_rules(dec!(5), dec!(2.80));
        rules.sharing.enabled = true;
        rules.sharing.shared_percent = dec!(150);
        let result = solar().compute(&input, &rules, 0).unwrap().unwrap();
        assert_eq!(result.item(Shared).unwrap().amount, dec!(2.25));
        assert_eq!(result.total_commission, Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_amounts_are_rejected_not_panicking() {
        let huge = SaleInput::new(dec!(100000000000000000000000000), dec!(1000));
        let err = solar()
            .compute(&huge, &RuleSet::default(), 0)
            .unwrap_err();
        assert!(matches!(err, CommissionError::Validation(_)));

        let wide = SaleInput::new(dec!(100000000000000000000000000), dec!(3.20));
        let err = solar()
            .compute(&wide, &margin_rules(dec!(10), dec!(2.80)), 0)
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
