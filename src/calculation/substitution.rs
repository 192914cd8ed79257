//! Function-substitution pay.
//!
//! An employee covering a better-paid function receives the daily
//! difference between that function and what they already earn for their
//! own function plus the specific gratification. Substituting a function
//! worth the same or less pays nothing.

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, BaseComponents, CalculationParameters, SubstitutionInput, SubstitutionLine,
    SubstitutionResult,
};

use super::rounding::round_money;

/// Calculates the substitution pay for every claim.
///
/// Target values come from the adjusted function table for the caller's
/// period. An unknown function code fails the whole item with
/// `MissingRequiredRule`.
pub fn calculate_substitution(
    claims: &[SubstitutionInput],
    components: &BaseComponents,
    params: &CalculationParameters,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<SubstitutionResult> {
    let current_value = components.function_bonus + components.specific_gratification;
    let divisor = rules.constants.substitution_divisor;

    let lines = claims
        .iter()
        .map(|claim| -> EngineResult<SubstitutionLine> {
            let code = claim.function_code.trim();
            let target_value = rules.salary.function_value(code, params.period)?;
            let difference = target_value - current_value;
            let amount = if difference > Decimal::ZERO {
                round_money(difference / divisor * Decimal::from(claim.days))
            } else {
                Decimal::ZERO
            };
            Ok(SubstitutionLine {
                function_code: code.to_string(),
                days: claim.days,
                target_value,
                current_value,
                amount,
            })
        })
        .collect::<EngineResult<Vec<SubstitutionLine>>>()?;

    let total: Decimal = lines.iter().map(|line| line.amount).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "function_substitution".to_string(),
        rule_name: "Function Substitution".to_string(),
        rule_ref: "function_values".to_string(),
        input: serde_json::json!({
            "claims": claims.iter().map(|c| serde_json::json!({
                "function_code": c.function_code,
                "days": c.days
            })).collect::<Vec<_>>(),
            "current_value": current_value.to_string()
        }),
        output: serde_json::json!({
            "amounts": lines.iter().map(|l| l.amount.to_string()).collect::<Vec<_>>(),
            "total": total.to_string()
        }),
        reasoning: format!(
            "{} claim(s) against current value ${} / {} per day = ${}",
            lines.len(),
            current_value,
            divisor,
            total
        ),
    };

    Ok(SubstitutionResult {
        lines,
        total,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::fixtures::{dec, flat_rules, params};
    use crate::config::{AdjustmentSchedule, AdjustmentStep};
    use crate::error::EngineError;
    use crate::models::PensionRegime;

    fn claim(code: &str, days: u32) -> SubstitutionInput {
        SubstitutionInput {
            function_code: code.to_string(),
            days,
        }
    }

    fn components(function_bonus: &str, gratification: &str) -> BaseComponents {
        BaseComponents {
            salary: dec("5000.00"),
            function_bonus: dec(function_bonus),
            specific_gratification: dec(gratification),
            ..BaseComponents::default()
        }
    }

    #[test]
    fn test_pays_daily_difference() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);

        let result =
            calculate_substitution(&[claim("CJ1", 10)], &components("1000.00", "500.00"), &p, &rules, 1)
                .unwrap();

        // (4000 - 1500) / 30 × 10
        assert_eq!(result.lines[0].amount, dec("833.33"));
        assert_eq!(result.total, dec("833.33"));
    }

    #[test]
    fn test_lower_target_pays_nothing() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);

        let result = calculate_substitution(
            &[claim("FC1", 15), claim("FC3", 15)],
            &components("2000.00", "0"),
            &p,
            &rules,
            1,
        )
        .unwrap();

        assert_eq!(result.lines[0].amount, Decimal::ZERO);
        assert_eq!(result.lines[1].amount, Decimal::ZERO);
        assert_eq!(result.total, Decimal::ZERO);
    }

    #[test]
    fn test_multiple_claims_sum() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);

        let result = calculate_substitution(
            &[claim("FC3", 30), claim("CJ1", 3)],
            &components("0", "0"),
            &p,
            &rules,
            1,
        )
        .unwrap();

        assert_eq!(result.lines[0].amount, dec("2000.00"));
        assert_eq!(result.lines[1].amount, dec("400.00"));
        assert_eq!(result.total, dec("2400.00"));
    }

    #[test]
    fn test_targets_use_adjusted_table() {
        let mut rules = flat_rules("5000.00");
        rules.salary.adjustments = AdjustmentSchedule::new(vec![AdjustmentStep { period: 1, percent: dec("10") }]);
        let mut p = params(PensionRegime::Legacy);
        p.period = 1;

        let result =
            calculate_substitution(&[claim("FC3", 30)], &components("0", "0"), &p, &rules, 1).unwrap();

        assert_eq!(result.lines[0].target_value, dec("2200.00"));
        assert_eq!(result.total, dec("2200.00"));
    }

    #[test]
    fn test_unknown_target_function() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);

        match calculate_substitution(&[claim("XX9", 5)], &components("0", "0"), &p, &rules, 1) {
            Err(EngineError::MissingRequiredRule { rule }) => assert_eq!(rule, "function_values.XX9"),
            other => panic!("Expected MissingRequiredRule, got {:?}", other),
        }
    }
}
