//! Shared rule and parameter fixtures for calculator tests.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::config::{
    AdjustmentSchedule, BenefitRules, BonusRules, DailiesRules, IncomeTaxBracket, IncomeTaxRules,
    NormalizedRules, PayrollConstants, PensionRules, QualificationRules, SalaryRules, TableVersion,
    TaxBracket, VersionedTable,
};
use crate::models::{CalculationParameters, PensionRegime};

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) fn version() -> TableVersion {
    TableVersion::year(2025)
}

/// Rules with a single 14% pension bracket up to a 7,000.00 ceiling and
/// every bonus rate at zero, so the salary alone drives the figures.
pub(crate) fn flat_rules(salary: &str) -> NormalizedRules {
    let mut grades = HashMap::new();
    grades.insert("C13".to_string(), dec(salary));
    let mut tables = HashMap::new();
    tables.insert("analyst".to_string(), grades);

    let mut function_values = HashMap::new();
    function_values.insert("FC1".to_string(), dec("1000.00"));
    function_values.insert("FC3".to_string(), dec("2000.00"));
    function_values.insert("CJ1".to_string(), dec("4000.00"));

    let mut pension_brackets = VersionedTable::new();
    pension_brackets.insert(
        version(),
        vec![TaxBracket { min: dec("0"), max: Some(dec("7000")), rate: dec("0.14") }],
    );
    let mut ceilings = VersionedTable::new();
    ceilings.insert(version(), dec("7000.00"));

    let mut tax_brackets = VersionedTable::new();
    tax_brackets.insert(
        version(),
        vec![
            IncomeTaxBracket { min: dec("0"), max: Some(dec("2259.20")), rate: dec("0"), deduction: dec("0") },
            IncomeTaxBracket { min: dec("2259.21"), max: Some(dec("4664.68")), rate: dec("0.15"), deduction: dec("381.44") },
            IncomeTaxBracket { min: dec("4664.69"), max: None, rate: dec("0.275"), deduction: dec("896.00") },
        ],
    );

    let mut rates = HashMap::new();
    rates.insert("analyst".to_string(), dec("300.00"));
    let mut external_costs = HashMap::new();
    external_costs.insert("lodging".to_string(), dec("0.55"));
    external_costs.insert("meals".to_string(), dec("0.25"));

    NormalizedRules {
        salary: SalaryRules {
            tables,
            function_values,
            adjustments: AdjustmentSchedule::default(),
        },
        bonuses: BonusRules {
            activity_rate: Some(dec("0")),
            specific_gratification_rate: Some(dec("0")),
        },
        qualification: QualificationRules {
            current_regime_from_period: Some(3),
            reference_value: Some(dec("1000.00")),
            max_multiplier: dec("1"),
        },
        pension: PensionRules {
            brackets: pension_brackets,
            ceilings,
            complementary_mandatory_rate: dec("0.085"),
            function_counts: false,
            gratification_counts: false,
        },
        income_tax: IncomeTaxRules {
            brackets: tax_brackets,
            dependent_deduction: dec("189.59"),
        },
        benefits: BenefitRules {
            food_allowance: Some(dec("1393.10")),
            preschool_allowance: Some(dec("1235.77")),
            transport_discount_rate: dec("0.06"),
        },
        dailies: DailiesRules {
            rates,
            executive_rate: Some(dec("500.00")),
            embarkation_full: Some(dec("200.00")),
            embarkation_half: Some(dec("100.00")),
            external_costs,
        },
        constants: PayrollConstants {
            month_day_divisor: dec("30"),
            overtime_hour_divisor: dec("175"),
            overtime_multiplier_first: dec("1.5"),
            overtime_multiplier_second: dec("2.0"),
            leave_divisor: dec("30"),
            substitution_divisor: dec("30"),
            vacation_divisor: dec("3"),
        },
    }
}

pub(crate) fn params(regime: PensionRegime) -> CalculationParameters {
    CalculationParameters::new("analyst", "C13", 3, regime, version())
}
