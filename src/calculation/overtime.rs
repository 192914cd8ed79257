//! Overtime pay calculation.
//!
//! The hourly rate is the monthly overtime base divided by the configured
//! hour divisor (175 by default). For permanence-bonus holders the base
//! includes the estimated pension contribution, since that bonus is paid
//! back with the salary.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BaseComponents, CalculationParameters, OvertimeInput, OvertimeResult};

use super::rounding::round_money;
use super::tax_withholding::estimate_pension;

/// Calculates overtime pay at the two configured multipliers.
///
/// # Arguments
///
/// * `input` - Claimed first-tier and second-tier hours
/// * `components` - The base components from the base remuneration calculator
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
///
/// # Returns
///
/// An [`OvertimeResult`]. Errors when the permanence-bonus addback needs
/// a pension table or ceiling that is not configured, or with
/// `CalculationError` when the claimed hours overflow a tier amount.
pub fn calculate_overtime(
    input: &OvertimeInput,
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<OvertimeResult> {
    let constants = &rules.constants;

    let permanence_addback = if params.permanence_bonus {
        estimate_pension(components, params, rules)?
    } else {
        Decimal::ZERO
    };
    let overtime_base = components.total() + permanence_addback;
    let hourly_rate = overtime_base / constants.overtime_hour_divisor;

    let first_tier_amount = round_money(tier_amount(
        hourly_rate,
        constants.overtime_multiplier_first,
        input.first_tier_hours,
    )?);
    let second_tier_amount = round_money(tier_amount(
        hourly_rate,
        constants.overtime_multiplier_second,
        input.second_tier_hours,
    )?);
    let total = first_tier_amount
        .checked_add(second_tier_amount)
        .ok_or_else(|| EngineError::CalculationError {
            message: "overtime total overflowed".to_string(),
        })?;
    let hourly_rate = round_money(hourly_rate);

    let audit_step = AuditStep {
        step_number,
        rule_id: "overtime".to_string(),
        rule_name: "Overtime".to_string(),
        rule_ref: "constants.overtime_hour_divisor".to_string(),
        input: serde_json::json!({
            "first_tier_hours": input.first_tier_hours.to_string(),
            "second_tier_hours": input.second_tier_hours.to_string(),
            "base_total": components.total().to_string(),
            "permanence_addback": permanence_addback.to_string()
        }),
        output: serde_json::json!({
            "hourly_rate": hourly_rate.to_string(),
            "first_tier_amount": first_tier_amount.to_string(),
            "second_tier_amount": second_tier_amount.to_string(),
            "total": total.to_string()
        }),
        reasoning: format!(
            "${} / {} per hour: {}h × {} + {}h × {} = ${}",
            overtime_base,
            constants.overtime_hour_divisor,
            input.first_tier_hours,
            constants.overtime_multiplier_first,
            input.second_tier_hours,
            constants.overtime_multiplier_second,
            total
        ),
    };

    Ok(OvertimeResult {
        overtime_base,
        permanence_addback,
        hourly_rate,
        first_tier_amount,
        second_tier_amount,
        total,
        audit_step,
    })
}

fn tier_amount(hourly_rate: Decimal, multiplier: Decimal, hours: Decimal) -> EngineResult<Decimal> {
    hourly_rate
        .checked_mul(multiplier)
        .and_then(|rate| rate.checked_mul(hours))
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("overtime tier overflowed for {} hours", hours),
        })
}
