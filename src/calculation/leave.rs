//! Leave converted to pay.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, BaseComponents, CalculationParameters, LeaveInput, LeaveResult, active_function_code,
};

use super::rounding::round_money;
use super::tax_withholding::estimate_pension;

/// Calculates leave pay as `((base + pension estimate) / divisor) × days`.
///
/// The base is the remuneration total valued with the designated function:
/// the alternate function when the caller names one, otherwise the current
/// function. The pension estimate is added only when requested.
///
/// # Arguments
///
/// * `input` - Days of leave, alternate function and estimate flag
/// * `components` - The base components from the base remuneration calculator
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
pub fn calculate_leave(
    input: &LeaveInput,
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<LeaveResult> {
    let alternate = active_function_code(input.alternate_function.as_deref());
    let designated = match alternate {
        Some(code) => components.with_function_bonus(rules.salary.function_value(code, params.period)?),
        None => components.clone(),
    };

    let base = designated.total();
    let pension_estimate = if input.include_pension_estimate {
        estimate_pension(&designated, params, rules)?
    } else {
        Decimal::ZERO
    };
    let divisor = rules.constants.leave_divisor;
    let amount = round_money((base + pension_estimate) / divisor * Decimal::from(input.days));

    let audit_step = AuditStep {
        step_number,
        rule_id: "leave".to_string(),
        rule_name: "Leave Pay".to_string(),
        rule_ref: "constants.leave_divisor".to_string(),
        input: serde_json::json!({
            "days": input.days,
            "function_code": alternate.or(params.active_function()),
            "include_pension_estimate": input.include_pension_estimate
        }),
        output: serde_json::json!({
            "base": base.to_string(),
            "pension_estimate": pension_estimate.to_string(),
            "amount": amount.to_string()
        }),
        reasoning: format!(
            "((${} + ${}) / {}) × {} days = ${}",
            base, pension_estimate, divisor, input.days, amount
        ),
    };

    Ok(LeaveResult {
        base,
        pension_estimate,
        days: input.days,
        amount,
        audit_step,
    })
}
