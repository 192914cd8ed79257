//! Thirteenth-salary installments.
//!
//! The annual salary is paid in up to two installments. In automatic mode
//! January, June and November pay the first installment and November also
//! pays the second. The first installment alone is never taxed; the second
//! triggers pension and income tax on the combined two-installment base.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, BaseComponents, CalculationParameters, InstallmentMode, ThirteenthSalaryResult,
    ThirteenthState,
};

use super::rounding::round_money;
use super::tax_withholding::{
    capped_split, complementary_contribution, flat_income_tax, pension_contribution,
    pension_sensitive_base,
};

const FIRST_INSTALLMENT_MONTHS: [u32; 3] = [1, 6, 11];
const SECOND_INSTALLMENT_MONTH: u32 = 11;

/// Determines which installments a calculation pays.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::thirteenth_state;
/// use payroll_engine::config::TableVersion;
/// use payroll_engine::models::{CalculationParameters, PensionRegime, ThirteenthState};
///
/// let mut params = CalculationParameters::new("analyst", "C13", 6, PensionRegime::Legacy, TableVersion::year(2025));
/// assert_eq!(thirteenth_state(&params), ThirteenthState::FirstOnly);
///
/// params.month = 11;
/// assert_eq!(thirteenth_state(&params), ThirteenthState::Both);
/// ```
pub fn thirteenth_state(params: &CalculationParameters) -> ThirteenthState {
    let (first, second) = match params.thirteenth.mode {
        InstallmentMode::Automatic => (
            FIRST_INSTALLMENT_MONTHS.contains(&params.month),
            params.month == SECOND_INSTALLMENT_MONTH,
        ),
        InstallmentMode::Manual => (
            params.thirteenth.first_installment,
            params.thirteenth.second_installment,
        ),
    };

    match (first, second) {
        (_, true) => ThirteenthState::Both,
        (true, false) => ThirteenthState::FirstOnly,
        (false, false) => ThirteenthState::Neither,
    }
}

/// Calculates the thirteenth-salary installments and their deductions.
///
/// Each installment defaults to half the base total unless the caller
/// overrides its value. With a second installment, the deductions are
/// computed on the combined base; in automatic mode a zero first
/// installment is replaced by its theoretical half for that base.
///
/// # Arguments
///
/// * `components` - The base components from the base remuneration calculator
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
///
/// # Returns
///
/// A [`ThirteenthSalaryResult`], or `MissingRequiredRule` when a second
/// installment needs a table version that is not configured.
pub fn calculate_thirteenth_salary(
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<ThirteenthSalaryResult> {
    let state = thirteenth_state(params);
    let total = components.total();
    let half = round_money(total / Decimal::TWO);

    let (pays_first, pays_second) = match (params.thirteenth.mode, state) {
        (InstallmentMode::Manual, ThirteenthState::Both) => (params.thirteenth.first_installment, true),
        (_, ThirteenthState::Both) => (true, true),
        (_, ThirteenthState::FirstOnly) => (true, false),
        (_, ThirteenthState::Neither) => (false, false),
    };
    let first_installment = if pays_first {
        params.thirteenth.first_value.unwrap_or(half)
    } else {
        Decimal::ZERO
    };
    let second_installment = if pays_second {
        params.thirteenth.second_value.unwrap_or(half)
    } else {
        Decimal::ZERO
    };

    let mut combined_base = Decimal::ZERO;
    let mut pension = Decimal::ZERO;
    let mut complementary = Decimal::ZERO;
    let mut permanence_addback = Decimal::ZERO;
    let mut income_tax = Decimal::ZERO;

    if state == ThirteenthState::Both {
        let theoretical_first =
            if params.thirteenth.mode == InstallmentMode::Automatic && first_installment.is_zero() {
                half
            } else {
                first_installment
            };
        combined_base = theoretical_first + second_installment;

        let sensitive_share = if total.is_zero() {
            Decimal::ZERO
        } else {
            combined_base * pension_sensitive_base(components, rules) / total
        };
        let (pension_base, excess) = capped_split(sensitive_share, params, rules)?;
        let brackets = rules.pension.brackets_for(params.pension_table)?;
        let top_bracket = rules.income_tax.top_bracket(params.income_tax_table)?;

        pension = round_money(pension_contribution(pension_base, brackets));
        complementary = round_money(complementary_contribution(
            excess,
            rules.pension.complementary_mandatory_rate,
            params.voluntary_complementary_percent,
        ));
        if params.permanence_bonus {
            permanence_addback = pension;
        }

        let dependents_deduction =
            Decimal::from(params.dependents) * rules.income_tax.dependent_deduction;
        let taxable =
            combined_base + permanence_addback - pension - complementary - dependents_deduction;
        income_tax = round_money(flat_income_tax(taxable, top_bracket));
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "thirteenth_salary".to_string(),
        rule_name: "Thirteenth Salary".to_string(),
        rule_ref: "pension.brackets".to_string(),
        input: serde_json::json!({
            "month": params.month,
            "mode": params.thirteenth.mode,
            "base_total": total.to_string()
        }),
        output: serde_json::json!({
            "state": state,
            "first_installment": first_installment.to_string(),
            "second_installment": second_installment.to_string(),
            "combined_base": combined_base.to_string(),
            "pension": pension.to_string(),
            "complementary": complementary.to_string(),
            "income_tax": income_tax.to_string()
        }),
        reasoning: match state {
            ThirteenthState::Both => format!(
                "Second installment paid: deductions on combined base ${}",
                combined_base
            ),
            ThirteenthState::FirstOnly => {
                "First installment only: no deductions".to_string()
            }
            ThirteenthState::Neither => format!("No installment due in month {}", params.month),
        },
    };

    Ok(ThirteenthSalaryResult {
        state,
        first_installment,
        second_installment,
        combined_base,
        pension_contribution: pension,
        complementary_contribution: complementary,
        permanence_addback,
        income_tax,
        audit_step,
    })
}
