//! Pension, complementary pension and income-tax withholding.
//!
//! ## Formulas
//!
//! - **Pension** is a marginal bracket accumulation: every bracket whose floor
//!   is below the base contributes `(min(base, max) - min) × rate`.
//! - **Capped regimes** clamp the pension base to the ceiling; the excess is
//!   the complementary-pension base.
//! - **Complementary pension** is `excess × mandatory_rate + excess × voluntary / 100`.
//! - **Income tax** is flat with the top bracket: `max(0, base × rate - deduction)`.

use rust_decimal::Decimal;

use crate::config::{IncomeTaxBracket, NormalizedRules, TaxBracket};
use crate::error::EngineResult;
use crate::models::{AuditStep, BaseComponents, CalculationParameters, PensionRegime, WithholdingResult};

use super::rounding::round_money;

/// Computes the marginal pension contribution for a base.
///
/// The result is not rounded.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::pension_contribution;
/// use payroll_engine::config::TaxBracket;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let d = |s: &str| Decimal::from_str(s).unwrap();
/// let brackets = vec![
///     TaxBracket { min: d("0"), max: Some(d("1000")), rate: d("0.075") },
///     TaxBracket { min: d("1000"), max: None, rate: d("0.09") },
/// ];
///
/// // 1000 × 7.5% + 500 × 9%
/// assert_eq!(pension_contribution(d("1500"), &brackets), d("120.00"));
/// ```
pub fn pension_contribution(base: Decimal, brackets: &[TaxBracket]) -> Decimal {
    brackets
        .iter()
        .filter(|bracket| bracket.min < base)
        .map(|bracket| {
            let upper = bracket.max.map_or(base, |max| max.min(base));
            (upper - bracket.min).max(Decimal::ZERO) * bracket.rate
        })
        .sum()
}

/// Splits a contribution base at the regime ceiling.
///
/// Returns `(pension_base, excess)`. Uncapped regimes never have an excess.
pub fn split_at_ceiling(base: Decimal, regime: PensionRegime, ceiling: Decimal) -> (Decimal, Decimal) {
    if regime.is_capped() && base > ceiling {
        (ceiling, base - ceiling)
    } else {
        (base, Decimal::ZERO)
    }
}

/// Computes the complementary-pension contribution on the excess over the ceiling.
pub fn complementary_contribution(
    excess: Decimal,
    mandatory_rate: Decimal,
    voluntary_percent: Decimal,
) -> Decimal {
    excess * mandatory_rate + excess * voluntary_percent / Decimal::ONE_HUNDRED
}

/// Computes the flat income-tax withholding with the top bracket.
pub fn flat_income_tax(base: Decimal, top_bracket: &IncomeTaxBracket) -> Decimal {
    (base * top_bracket.rate - top_bracket.deduction).max(Decimal::ZERO)
}

/// Computes income tax with the single bracket containing the base.
///
/// Not used by [`calculate_withholding`], which always applies the top
/// bracket. A base below every bracket is untaxed.
pub fn progressive_income_tax(base: Decimal, brackets: &[IncomeTaxBracket]) -> Decimal {
    brackets
        .iter()
        .filter(|bracket| bracket.min <= base)
        .max_by_key(|bracket| bracket.min)
        .map_or(Decimal::ZERO, |bracket| flat_income_tax(base, bracket))
}

/// Returns the part of the remuneration subject to pension.
///
/// The training qualification never counts. The function bonus and the
/// specific gratification count only when the pension rules say so.
pub fn pension_sensitive_base(components: &BaseComponents, rules: &NormalizedRules) -> Decimal {
    let mut base = components.total() - components.qualification.training;
    if !rules.pension.function_counts {
        base -= components.function_bonus;
    }
    if !rules.pension.gratification_counts {
        base -= components.specific_gratification;
    }
    base
}

/// Estimates the pension contribution on the capped pension-sensitive base.
///
/// Shared by the withholding, overtime and leave calculators.
pub fn estimate_pension(
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
) -> EngineResult<Decimal> {
    let (pension_base, _) = capped_split(pension_sensitive_base(components, rules), params, rules)?;
    let brackets = rules.pension.brackets_for(params.pension_table)?;
    Ok(round_money(pension_contribution(pension_base, brackets)))
}

/// Splits a base at the ceiling of the caller's pension table.
///
/// The ceiling is only looked up for capped regimes.
pub(crate) fn capped_split(
    base: Decimal,
    params: &CalculationParameters,
    rules: &NormalizedRules,
) -> EngineResult<(Decimal, Decimal)> {
    if !params.pension_regime.is_capped() {
        return Ok((base, Decimal::ZERO));
    }
    let ceiling = rules.pension.ceiling_for(params.pension_table)?;
    Ok(split_at_ceiling(base, params.pension_regime, ceiling))
}

/// Calculates the monthly pension, complementary pension and income-tax withholding.
///
/// # Arguments
///
/// * `components` - The base components from the base remuneration calculator
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `step_number_start` - The starting step number for audit trail sequencing
///
/// # Returns
///
/// A [`WithholdingResult`] with every amount rounded to cents, or
/// `MissingRequiredRule` if the selected pension or income-tax table version
/// (or the ceiling of a capped regime) is not configured.
pub fn calculate_withholding(
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number_start: u32,
) -> EngineResult<WithholdingResult> {
    let sensitive_base = pension_sensitive_base(components, rules);
    let (pension_base, excess) = capped_split(sensitive_base, params, rules)?;
    let brackets = rules.pension.brackets_for(params.pension_table)?;
    let top_bracket = rules.income_tax.top_bracket(params.income_tax_table)?;

    let pension = round_money(pension_contribution(pension_base, brackets));
    let complementary = round_money(complementary_contribution(
        excess,
        rules.pension.complementary_mandatory_rate,
        params.voluntary_complementary_percent,
    ));
    let permanence_bonus = if params.permanence_bonus {
        pension
    } else {
        Decimal::ZERO
    };

    let dependents_deduction = Decimal::from(params.dependents) * rules.income_tax.dependent_deduction;
    let income_tax_base =
        round_money(components.total() + permanence_bonus - pension - complementary - dependents_deduction);
    let income_tax = round_money(flat_income_tax(income_tax_base, top_bracket));

    let mut step_number = step_number_start;
    let mut audit_steps = Vec::with_capacity(3);

    audit_steps.push(AuditStep {
        step_number,
        rule_id: "pension_contribution".to_string(),
        rule_name: "Pension Contribution".to_string(),
        rule_ref: "pension.brackets".to_string(),
        input: serde_json::json!({
            "sensitive_base": sensitive_base.to_string(),
            "regime": params.pension_regime,
            "table": params.pension_table,
            "brackets": brackets.len()
        }),
        output: serde_json::json!({
            "pension_base": pension_base.to_string(),
            "contribution": pension.to_string(),
            "permanence_bonus": permanence_bonus.to_string()
        }),
        reasoning: format!(
            "Marginal brackets of table {} applied to ${} = ${}",
            params.pension_table, pension_base, pension
        ),
    });
    step_number += 1;

    audit_steps.push(AuditStep {
        step_number,
        rule_id: "complementary_pension".to_string(),
        rule_name: "Complementary Pension".to_string(),
        rule_ref: "pension.complementary_mandatory_rate".to_string(),
        input: serde_json::json!({
            "excess": excess.to_string(),
            "mandatory_rate": rules.pension.complementary_mandatory_rate.to_string(),
            "voluntary_percent": params.voluntary_complementary_percent.to_string()
        }),
        output: serde_json::json!({
            "contribution": complementary.to_string()
        }),
        reasoning: if excess.is_zero() {
            "Base does not exceed the ceiling: no complementary contribution".to_string()
        } else {
            format!(
                "Excess ${} × ({} + {}%) = ${}",
                excess,
                rules.pension.complementary_mandatory_rate,
                params.voluntary_complementary_percent,
                complementary
            )
        },
    });
    step_number += 1;

    audit_steps.push(AuditStep {
        step_number,
        rule_id: "income_tax".to_string(),
        rule_name: "Income Tax Withholding".to_string(),
        rule_ref: "income_tax.brackets".to_string(),
        input: serde_json::json!({
            "table": params.income_tax_table,
            "dependents": params.dependents,
            "taxable_base": income_tax_base.to_string(),
            "top_rate": top_bracket.rate.to_string(),
            "deduction": top_bracket.deduction.to_string()
        }),
        output: serde_json::json!({
            "income_tax": income_tax.to_string()
        }),
        reasoning: format!(
            "max(0, ${} × {} - ${}) = ${}",
            income_tax_base, top_bracket.rate, top_bracket.deduction, income_tax
        ),
    });

    Ok(WithholdingResult {
        pension_base,
        pension_contribution: pension,
        complementary_base: excess,
        complementary_contribution: complementary,
        permanence_bonus,
        income_tax_base,
        income_tax,
        audit_steps,
    })
}
