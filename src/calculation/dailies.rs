//! Travel per-diem calculation.
//!
//! ## Steps
//!
//! 1. **Rate**: the executive rate for `CJ` functions, otherwise the role rate
//! 2. **Gross**: rate × quantity plus the embarkation allowance
//! 3. **Gloss**: gross × the sum of the selected external-cost rates
//! 4. **Deductions**: food and transport allowances already paid for the
//!    travel days, each opt-in
//! 5. **Net**: gross - gloss - deductions, floored at zero

use rust_decimal::Decimal;

use crate::config::NormalizedRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, BenefitsResult, CalculationParameters, DailiesInput, DailiesResult, Embarkation,
};

use super::rounding::round_money;

/// Function codes with this prefix are paid the executive per-diem rate.
pub const EXECUTIVE_FUNCTION_PREFIX: &str = "CJ";

/// Calculates the net travel per-diem.
///
/// # Arguments
///
/// * `input` - Quantity, embarkation, external costs and deduction flags
/// * `params` - The caller's calculation parameters (role and function)
/// * `benefits` - The benefits computed for the same period, if any; the
///   food and transport deductions are zero without them
/// * `rules` - The organization's normalized rules
/// * `step_number` - The step number for the audit trail
///
/// # Returns
///
/// A [`DailiesResult`], or `MissingRequiredRule` when the applicable rate,
/// embarkation value or an external-cost rate is not configured.
/// `CalculationError` when the quantity overflows the gross.
pub fn calculate_dailies(
    input: &DailiesInput,
    params: &CalculationParameters,
    benefits: Option<&BenefitsResult>,
    rules: &NormalizedRules,
    step_number: u32,
) -> EngineResult<DailiesResult> {
    let dailies = &rules.dailies;

    let rate = match dailies_rate_key(params.active_function(), &params.role) {
        None => dailies
            .executive_rate
            .ok_or_else(|| EngineError::missing("dailies.executive_rate"))?,
        Some(role) => *dailies
            .rates
            .get(role)
            .ok_or_else(|| EngineError::missing(format!("dailies.rates.{}", role)))?,
    };

    let embarkation = match input.embarkation {
        Embarkation::Without => Decimal::ZERO,
        Embarkation::Half => dailies
            .embarkation_half
            .ok_or_else(|| EngineError::missing("dailies.embarkation_half"))?,
        Embarkation::Full => dailies
            .embarkation_full
            .ok_or_else(|| EngineError::missing("dailies.embarkation_full"))?,
    };

    let gloss_rate = input
        .external_costs
        .iter()
        .map(|name| {
            dailies
                .external_costs
                .get(name)
                .copied()
                .ok_or_else(|| EngineError::missing(format!("dailies.external_costs.{}", name)))
        })
        .sum::<EngineResult<Decimal>>()?;

    let gross = rate
        .checked_mul(input.quantity)
        .and_then(|amount| amount.checked_add(embarkation))
        .ok_or_else(|| overflow("dailies gross", input.quantity))?;
    let gloss = gross
        .checked_mul(gloss_rate)
        .ok_or_else(|| overflow("dailies gloss", input.quantity))?;

    let divisor = rules.constants.month_day_divisor;
    let travel_days = Decimal::from(input.travel_days);
    let mut deductions = Decimal::ZERO;
    if let Some(benefits) = benefits {
        if input.deduct_food {
            deductions += benefits.food_allowance / divisor * travel_days;
        }
        if input.deduct_transport {
            deductions += benefits.transport_credit / divisor * travel_days;
        }
    }

    let net = (gross - gloss - deductions).max(Decimal::ZERO);

    let (gross, gloss, deductions, net) = (
        round_money(gross),
        round_money(gloss),
        round_money(deductions),
        round_money(net),
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "dailies".to_string(),
        rule_name: "Travel Per-Diem".to_string(),
        rule_ref: "dailies".to_string(),
        input: serde_json::json!({
            "quantity": input.quantity.to_string(),
            "embarkation": input.embarkation,
            "external_costs": input.external_costs,
            "travel_days": input.travel_days,
            "deduct_food": input.deduct_food,
            "deduct_transport": input.deduct_transport,
            "benefits_available": benefits.is_some()
        }),
        output: serde_json::json!({
            "rate": rate.to_string(),
            "gross": gross.to_string(),
            "gloss": gloss.to_string(),
            "deductions": deductions.to_string(),
            "net": net.to_string()
        }),
        reasoning: format!(
            "${} × {} + ${} embarkation = ${}, less gloss ${} and deductions ${} = ${}",
            rate, input.quantity, embarkation, gross, gloss, deductions, net
        ),
    };

    Ok(DailiesResult {
        rate,
        gross,
        gloss,
        deductions,
        net,
        audit_step,
    })
}

fn overflow(amount: &str, quantity: Decimal) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} overflowed for quantity {}", amount, quantity),
    }
}

/// Returns the role whose per-diem rate applies, or `None` when the
/// executive rate applies.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::dailies_rate_key;
///
/// assert_eq!(dailies_rate_key(Some("CJ2"), "analyst"), None);
/// assert_eq!(dailies_rate_key(Some("FC3"), "analyst"), Some("analyst"));
/// ```
pub fn dailies_rate_key<'a>(function_code: Option<&str>, role: &'a str) -> Option<&'a str> {
    let executive = function_code.is_some_and(|code| {
        code.to_ascii_uppercase()
            .starts_with(EXECUTIVE_FUNCTION_PREFIX)
    });
    if executive { None } else { Some(role) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::fixtures::{dec, flat_rules, params};
    use crate::models::PensionRegime;

    fn input(quantity: &str) -> DailiesInput {
        DailiesInput {
            quantity: dec(quantity),
            ..DailiesInput::default()
        }
    }

    fn benefits(food: &str, transport: &str) -> BenefitsResult {
        BenefitsResult {
            food_allowance: dec(food),
            preschool_allowance: Decimal::ZERO,
            transport_credit: dec(transport),
            transport_debit: Decimal::ZERO,
            audit_step: AuditStep {
                step_number: 1,
                rule_id: "benefits".to_string(),
                rule_name: "Benefits".to_string(),
                rule_ref: "benefits".to_string(),
                input: serde_json::Value::Null,
                output: serde_json::Value::Null,
                reasoning: String::new(),
            },
        }
    }

    /// Rate 300.00, quantity 3, no embarkation, gloss or deductions
    #[test]
    fn test_scenario_plain_dailies() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);

        let result = calculate_dailies(&input("3"), &p, None, &rules, 1).unwrap();

        assert_eq!(result.rate, dec("300.00"));
        assert_eq!(result.gross, dec("900.00"));
        assert_eq!(result.gloss, Decimal::ZERO);
        assert_eq!(result.deductions, Decimal::ZERO);
        assert_eq!(result.net, dec("900.00"));
    }

    #[test]
    fn test_executive_function_rate() {
        let rules = flat_rules("5000.00");
        let mut p = params(PensionRegime::Legacy);
        p.function_code = Some("cj1".to_string());

        let result = calculate_dailies(&input("2"), &p, None, &rules, 1).unwrap();
        assert_eq!(result.rate, dec("500.00"));
        assert_eq!(result.net, dec("1000.00"));
    }

    #[test]
    fn test_embarkation_and_gloss() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let mut i = input("2.5");
        i.embarkation = Embarkation::Full;
        i.external_costs = vec!["lodging".to_string()];

        let result = calculate_dailies(&i, &p, None, &rules, 1).unwrap();

        // 300 × 2.5 + 200
        assert_eq!(result.gross, dec("950.00"));
        assert_eq!(result.gloss, dec("522.50"));
        assert_eq!(result.net, dec("427.50"));
    }

    #[test]
    fn test_food_and_transport_deductions() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let mut i = input("3");
        i.travel_days = 3;
        i.deduct_food = true;
        i.deduct_transport = true;

        let b = benefits("900.00", "300.00");
        let result = calculate_dailies(&i, &p, Some(&b), &rules, 1).unwrap();

        // 900 / 30 × 3 + 300 / 30 × 3
        assert_eq!(result.deductions, dec("120.00"));
        assert_eq!(result.net, dec("780.00"));
    }

    #[test]
    fn test_deductions_zero_without_benefits() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let mut i = input("1");
        i.travel_days = 1;
        i.deduct_food = true;

        let result = calculate_dailies(&i, &p, None, &rules, 1).unwrap();
        assert_eq!(result.deductions, Decimal::ZERO);
    }

    #[test]
    fn test_net_never_negative() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let mut i = input("1");
        i.external_costs = vec!["lodging".to_string(), "meals".to_string()];
        i.travel_days = 30;
        i.deduct_food = true;

        let b = benefits("1393.10", "0");
        let result = calculate_dailies(&i, &p, Some(&b), &rules, 1).unwrap();

        assert_eq!(result.net, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_external_cost() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let mut i = input("1");
        i.external_costs = vec!["parking".to_string()];

        match calculate_dailies(&i, &p, None, &rules, 1) {
            Err(EngineError::MissingRequiredRule { rule }) => {
                assert_eq!(rule, "dailies.external_costs.parking")
            }
            other => panic!("Expected MissingRequiredRule, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_quantity_is_calculation_error() {
        let rules = flat_rules("5000.00");
        let p = params(PensionRegime::Legacy);
        let i = DailiesInput {
            quantity: Decimal::MAX,
            ..DailiesInput::default()
        };

        match calculate_dailies(&i, &p, None, &rules, 1) {
            Err(EngineError::CalculationError { message }) => {
                assert!(message.contains("dailies gross"))
            }
            other => panic!("Expected CalculationError, got {:?}", other),
        }
    }
}
