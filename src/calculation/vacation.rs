//! Vacation pay calculation.
//!
//! Vacation pay is due in January, or whenever the caller supplies a
//! positive manual value. It defaults to a third of the remuneration total
//! and is taxed with the flat income-tax formula unless paid in advance.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::EngineResult;
use crate::models::{AuditStep, BaseComponents, CalculationParameters, VacationResult};

use super::rounding::round_money;
use super::tax_withholding::flat_income_tax;

const VACATION_MONTH: u32 = 1;

/// Returns true when vacation pay applies to the calculation.
pub fn vacation_triggered(params: &CalculationParameters) -> bool {
    params.month == VACATION_MONTH
        || params
            .vacation
            .manual_value
            .is_some_and(|value| value > Decimal::ZERO)
}

/// Calculates vacation pay and its income tax.
///
/// When not triggered the result carries zero amounts and
/// `triggered: false`; the income-tax table is only consulted when tax is due.
pub fn calculate_vacation(
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<VacationResult> {
    let triggered = vacation_triggered(params);
    let anticipated = params.vacation.anticipated;

    let value = match params.vacation.manual_value {
        _ if !triggered => Decimal::ZERO,
        Some(manual) if manual > Decimal::ZERO => manual,
        _ => round_money(components.total() / rules.constants.vacation_divisor),
    };

    let income_tax = if triggered && !anticipated {
        let top_bracket = rules.income_tax.top_bracket(params.income_tax_table)?;
        let dependents_deduction =
            Decimal::from(params.dependents) * rules.income_tax.dependent_deduction;
        round_money(flat_income_tax(value - dependents_deduction, top_bracket))
    } else {
        Decimal::ZERO
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "vacation".to_string(),
        rule_name: "Vacation Pay".to_string(),
        rule_ref: "constants.vacation_divisor".to_string(),
        input: serde_json::json!({
            "month": params.month,
            "manual_value": params.vacation.manual_value.map(|v| v.to_string()),
            "anticipated": anticipated,
            "dependents": params.dependents
        }),
        output: serde_json::json!({
            "triggered": triggered,
            "value": value.to_string(),
            "income_tax": income_tax.to_string()
        }),
        reasoning: if !triggered {
            format!("No vacation pay due in month {}", params.month)
        } else if anticipated {
            format!("Anticipated vacation pay ${}: not taxed", value)
        } else {
            format!("Vacation pay ${} taxed at the top bracket: ${}", value, income_tax)
        },
    };

    Ok(VacationResult {
        triggered,
        value,
        anticipated,
        income_tax,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::fixtures::{dec, flat_rules, params};
    use crate::models::PensionRegime;

    fn components(salary: &str) -> BaseComponents {
        BaseComponents {
            salary: dec(salary),
            ..BaseComponents::default()
        }
    }

    #[test]
    fn test_triggered_in_january() {
        let rules = flat_rules("15000.00");
        let mut p = params(PensionRegime::Legacy);
        p.month = 1;

        let result = calculate_vacation(&components("15000.00"), &p, &rules, 1).unwrap();

        assert!(result.triggered);
        assert_eq!(result.value, dec("5000.00"));
        // 5000 × 27.5% - 896
        assert_eq!(result.income_tax, dec("479.00"));
    }

    #[test]
    fn test_not_triggered_outside_january() {
        let rules = flat_rules("15000.00");
        let p = params(PensionRegime::Legacy);

        let result = calculate_vacation(&components("15000.00"), &p, &rules, 1).unwrap();

        assert!(!result.triggered);
        assert_eq!(result.value, Decimal::ZERO);
        assert_eq!(result.income_tax, Decimal::ZERO);
    }

    #[test]
    fn test_manual_value_triggers_any_month() {
        let rules = flat_rules("15000.00");
        let mut p = params(PensionRegime::Legacy);
        p.vacation.manual_value = Some(dec("6000.00"));
        p.dependents = 1;

        let result = calculate_vacation(&components("15000.00"), &p, &rules, 1).unwrap();

        assert!(result.triggered);
        assert_eq!(result.value, dec("6000.00"));
        // (6000 - 189.59) × 27.5% - 896 = 701.86275
        assert_eq!(result.income_tax, dec("701.86"));
    }

    #[test]
    fn test_anticipated_is_untaxed() {
        let rules = flat_rules("15000.00");
        let mut p = params(PensionRegime::Legacy);
        p.month = 1;
        p.vacation.anticipated = true;

        let result = calculate_vacation(&components("15000.00"), &p, &rules, 1).unwrap();

        assert_eq!(result.value, dec("5000.00"));
        assert_eq!(result.income_tax, Decimal::ZERO);
    }
}
