//! Base remuneration calculation.
//!
//! This module derives the [`BaseComponents`] every other calculator
//! consumes. It is the only place these components are computed, so all
//! dependents see identical figures for identical inputs.
//!
//! ## Qualification regimes
//!
//! - **Legacy** (period before `current_regime_from_period`): salary × multiplier
//! - **Current**: `reference_value` × multiplier

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::NormalizedRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, BaseComponents, BaseRemunerationResult, CalculationParameters,
    QualificationBonus,
};

use super::rounding::round_money;

/// Calculates the base remuneration components for one period.
///
/// # Arguments
///
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
///
/// # Returns
///
/// A [`BaseRemunerationResult`] with the components, their total and any
/// stale-parameter warnings, or an error if:
/// - The salary table has no entry for the role and grade (`MissingRequiredRule`)
/// - The function code is unknown (`MissingRequiredRule`)
/// - A needed bonus rate or reference value is not configured (`MissingRequiredRule`)
///
/// A qualification multiplier below zero or above `max_multiplier` is
/// reported as a high-severity warning and its component is computed as zero.
pub fn calculate_base_remuneration(
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<BaseRemunerationResult> {
    let salary = rules.salary.salary(&params.role, &params.grade, params.period)?;

    let activity_rate = rules
        .bonuses
        .activity_rate
        .ok_or_else(|| EngineError::missing("bonus_rates.activity"))?;
    let activity_bonus = round_money(salary * activity_rate);

    let function_bonus = match params.active_function() {
        Some(code) => rules.salary.function_value(code, params.period)?,
        None => Decimal::ZERO,
    };

    let mut warnings = Vec::new();
    let current_regime = rules
        .qualification
        .current_regime_from_period
        .is_some_and(|from| params.period >= from);
    let qualification = QualificationBonus {
        training: qualification_component(
            "qualification.training",
            params.qualification.training,
            salary,
            current_regime,
            rules,
            &mut warnings,
        )?,
        title: qualification_component(
            "qualification.title",
            params.qualification.title,
            salary,
            current_regime,
            rules,
            &mut warnings,
        )?,
    };

    let specific_gratification = match params.manual_specific_gratification {
        Some(manual) => manual,
        None => {
            let rate = rules
                .bonuses
                .specific_gratification_rate
                .ok_or_else(|| EngineError::missing("bonus_rates.specific_gratification"))?;
            round_money(salary * rate)
        }
    };

    let components = BaseComponents {
        salary,
        activity_bonus,
        function_bonus,
        qualification,
        specific_gratification,
        personal_allowance: params.allowances.personal,
        individual_allowance: params.allowances.individual,
        seniority_allowance: params.allowances.seniority,
    };
    let total = components.total();

    let audit_step = AuditStep {
        step_number,
        rule_id: "base_remuneration".to_string(),
        rule_name: "Base Remuneration".to_string(),
        rule_ref: "salary_tables".to_string(),
        input: serde_json::json!({
            "role": params.role,
            "grade": params.grade,
            "period": params.period,
            "function_code": params.active_function(),
            "adjustment_steps": rules.salary.adjustments.elapsed_steps(params.period),
            "qualification_regime": if current_regime { "current" } else { "legacy" }
        }),
        output: serde_json::json!({
            "salary": salary.to_string(),
            "activity_bonus": activity_bonus.to_string(),
            "function_bonus": function_bonus.to_string(),
            "qualification_training": components.qualification.training.to_string(),
            "qualification_title": components.qualification.title.to_string(),
            "specific_gratification": specific_gratification.to_string(),
            "total": total.to_string()
        }),
        reasoning: format!(
            "Salary ${} for {}/{} at period {}, plus bonuses and allowances = ${}",
            salary, params.role, params.grade, params.period, total
        ),
    };

    Ok(BaseRemunerationResult {
        components,
        total,
        warnings,
        audit_step,
    })
}

fn qualification_component(
    field: &str,
    multiplier: Decimal,
    salary: Decimal,
    current_regime: bool,
    rules: &NormalizedRules,
    warnings: &mut Vec<AuditWarning>,
) -> EngineResult<Decimal> {
    if multiplier.is_zero() {
        return Ok(Decimal::ZERO);
    }

    if multiplier.is_sign_negative() || multiplier > rules.qualification.max_multiplier {
        let error = EngineError::StaleParameterDetected {
            field: field.to_string(),
            value: multiplier,
        };
        warn!(
            field = field,
            value = %multiplier,
            max_multiplier = %rules.qualification.max_multiplier,
            "Stale qualification multiplier, component computed as zero"
        );
        warnings.push(AuditWarning::from(&error));
        return Ok(Decimal::ZERO);
    }

    let reference = if current_regime {
        rules
            .qualification
            .reference_value
            .ok_or_else(|| EngineError::missing("qualification.reference_value"))?
    } else {
        salary
    };

    Ok(round_money(reference * multiplier))
}
