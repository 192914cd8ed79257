//! Food, preschool and transport allowance calculation.
//!
//! The transport debit is reported separately from the credit. When the
//! debit reaches the claimed expense the credit is reported as zero, so
//! the net credit is never negative.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BaseComponents, BenefitsInput, BenefitsResult};

use super::rounding::round_money;

/// Calculates the benefit allowances for one period.
///
/// # Arguments
///
/// * `input` - The claimed benefit units and transport expense
/// * `components` - The base components; salary (or the function bonus when
///   the salary is zero) is the transport debit base
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
///
/// # Returns
///
/// A [`BenefitsResult`], or `MissingRequiredRule` when units are claimed for
/// an allowance the organization does not configure.
pub fn calculate_benefits(
    input: &BenefitsInput,
    components: &BaseComponents,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<BenefitsResult> {
    let food_allowance = if input.food_units > 0 {
        let value = rules
            .benefits
            .food_allowance
            .ok_or_else(|| EngineError::missing("benefits.food_allowance"))?;
        round_money(value * Decimal::from(input.food_units))
    } else {
        Decimal::ZERO
    };

    let preschool_allowance = if input.preschool_units > 0 {
        let quota = input
            .preschool_quota
            .or(rules.benefits.preschool_allowance)
            .ok_or_else(|| EngineError::missing("benefits.preschool_allowance"))?;
        round_money(quota * Decimal::from(input.preschool_units))
    } else {
        Decimal::ZERO
    };

    let transport_base = if components.salary.is_zero() {
        components.function_bonus
    } else {
        components.salary
    };

    let (transport_credit, transport_debit) = match &input.transport {
        Some(transport) => {
            let claimed = round_money(transport.claimed_expense.max(Decimal::ZERO));
            let debit = transport_debit(
                transport_base,
                rules.constants.month_day_divisor,
                transport.workdays,
                rules.benefits.transport_discount_rate,
            );
            if debit >= claimed {
                (Decimal::ZERO, debit)
            } else {
                (claimed, debit)
            }
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "benefits".to_string(),
        rule_name: "Benefits".to_string(),
        rule_ref: "benefits".to_string(),
        input: serde_json::json!({
            "food_units": input.food_units,
            "preschool_units": input.preschool_units,
            "transport_claimed": input.transport.as_ref().map(|t| t.claimed_expense.to_string()),
            "transport_workdays": input.transport.as_ref().map(|t| t.workdays),
            "transport_base": transport_base.to_string()
        }),
        output: serde_json::json!({
            "food_allowance": food_allowance.to_string(),
            "preschool_allowance": preschool_allowance.to_string(),
            "transport_credit": transport_credit.to_string(),
            "transport_debit": transport_debit.to_string()
        }),
        reasoning: if input.transport.is_some() && transport_credit.is_zero() {
            format!(
                "Transport debit ${} absorbs the claimed expense: credit reported as zero",
                transport_debit
            )
        } else {
            format!(
                "Food ${} + preschool ${} + transport ${} (debit ${})",
                food_allowance, preschool_allowance, transport_credit, transport_debit
            )
        },
    };

    Ok(BenefitsResult {
        food_allowance,
        preschool_allowance,
        transport_credit,
        transport_debit,
        audit_step,
    })
}

/// Computes the statutory transport debit, rounded to cents.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::transport_debit;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let d = |s: &str| Decimal::from_str(s).unwrap();
///
/// // (3000 / 30 × 22) × 6%
/// assert_eq!(transport_debit(d("3000.00"), d("30"), 22, d("0.06")), d("132.00"));
/// ```
pub fn transport_debit(base: Decimal, month_day_divisor: Decimal, workdays: u32, rate: Decimal) -> Decimal {
    round_money(base / month_day_divisor * Decimal::from(workdays) * rate)
}
