//! Projection of an effective configuration into normalized rules.
//!
//! Each top-level rule is deserialized on its own so that errors name the
//! offending rule. Missing numeric settings fall back to the documented
//! constants below; settings without a safe fallback stay `None` and are
//! reported by the calculator that needs them.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::resolver::EffectiveConfig;
use super::types::{
    AdjustmentSchedule, AdjustmentStep, BenefitRules, BonusRules, DailiesRules, IncomeTaxBracket,
    IncomeTaxRules, NormalizedRules, PayrollConstants, PensionRules, QualificationRules,
    SalaryRules, TableVersion, TaxBracket, VersionedTable,
};

/// Deduction of the top income-tax bracket when the table omits it.
pub const DEFAULT_INCOME_TAX_DEDUCTION: Decimal = Decimal::from_parts(89600, 0, 0, false, 2);
/// Income-tax deduction per dependent.
pub const DEFAULT_DEPENDENT_DEDUCTION: Decimal = Decimal::from_parts(18959, 0, 0, false, 2);
/// Mandatory complementary-pension rate.
pub const DEFAULT_COMPLEMENTARY_MANDATORY_RATE: Decimal = Decimal::from_parts(85, 0, 0, false, 3);
/// Statutory transport-allowance discount rate.
pub const DEFAULT_TRANSPORT_DISCOUNT_RATE: Decimal = Decimal::from_parts(6, 0, 0, false, 2);
/// Largest qualification multiplier accepted as fresh input.
pub const DEFAULT_MAX_QUALIFICATION_MULTIPLIER: Decimal = Decimal::ONE;
/// Days in a payroll month.
pub const DEFAULT_MONTH_DAY_DIVISOR: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
/// Monthly hours used for the overtime hourly rate.
pub const DEFAULT_OVERTIME_HOUR_DIVISOR: Decimal = Decimal::from_parts(175, 0, 0, false, 0);
/// Multiplier of the first overtime tier.
pub const DEFAULT_OVERTIME_MULTIPLIER_FIRST: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
/// Multiplier of the second overtime tier.
pub const DEFAULT_OVERTIME_MULTIPLIER_SECOND: Decimal = Decimal::from_parts(20, 0, 0, false, 1);
/// Days used to derive the daily leave value.
pub const DEFAULT_LEAVE_DIVISOR: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
/// Days used to derive the daily substitution difference.
pub const DEFAULT_SUBSTITUTION_DIVISOR: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
/// Divisor of the automatic vacation value.
pub const DEFAULT_VACATION_DIVISOR: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBonusRates {
    activity: Option<Decimal>,
    specific_gratification: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQualification {
    current_regime_from_period: Option<u32>,
    reference_value: Option<Decimal>,
    max_multiplier: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPension {
    brackets: HashMap<String, Vec<TaxBracket>>,
    ceilings: HashMap<String, Decimal>,
    complementary_mandatory_rate: Option<Decimal>,
    function_counts: Option<bool>,
    gratification_counts: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawIncomeTaxBracket {
    min: Decimal,
    #[serde(default)]
    max: Option<Decimal>,
    rate: Decimal,
    #[serde(default)]
    deduction: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIncomeTax {
    brackets: HashMap<String, Vec<RawIncomeTaxBracket>>,
    dependent_deduction: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBenefits {
    food_allowance: Option<Decimal>,
    preschool_allowance: Option<Decimal>,
    transport_discount_rate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDailies {
    rates: HashMap<String, Decimal>,
    executive_rate: Option<Decimal>,
    embarkation_full: Option<Decimal>,
    embarkation_half: Option<Decimal>,
    external_costs: HashMap<String, Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConstants {
    month_day_divisor: Option<Decimal>,
    overtime_hour_divisor: Option<Decimal>,
    overtime_multiplier_first: Option<Decimal>,
    overtime_multiplier_second: Option<Decimal>,
    leave_divisor: Option<Decimal>,
    substitution_divisor: Option<Decimal>,
    vacation_divisor: Option<Decimal>,
}

/// Projects an effective configuration into the calculators' rule schema.
///
/// # Errors
///
/// Returns `InvalidRule` when a rule has the wrong shape, a version label
/// cannot be parsed, a divisor is not positive, or a non-exempt income-tax
/// bracket below the top one has no deduction.
///
/// # Example
///
/// ```
/// use payroll_engine::config::{project, EffectiveConfig, OrganizationIdentity};
/// use payroll_engine::config::DEFAULT_DEPENDENT_DEDUCTION;
/// use serde_json::json;
///
/// let config = EffectiveConfig {
///     organization: OrganizationIdentity {
///         slug: "trf-demo".to_string(),
///         name: "Demo Regional Court".to_string(),
///         sector: None,
///     },
///     values: json!({"bonus_rates": {"activity": "1.40"}}),
/// };
///
/// let rules = project(&config).unwrap();
/// assert_eq!(rules.bonuses.activity_rate.unwrap().to_string(), "1.40");
/// assert_eq!(rules.income_tax.dependent_deduction, DEFAULT_DEPENDENT_DEDUCTION);
/// ```
pub fn project(config: &EffectiveConfig) -> EngineResult<NormalizedRules> {
    let values = &config.values;

    let salary = SalaryRules {
        tables: section(values, "salary_tables")?,
        function_values: section(values, "function_values")?,
        adjustments: AdjustmentSchedule::new(section::<Vec<AdjustmentStep>>(
            values,
            "salary_adjustments",
        )?),
    };

    let raw_bonus: RawBonusRates = section(values, "bonus_rates")?;
    let bonuses = BonusRules {
        activity_rate: raw_bonus.activity,
        specific_gratification_rate: raw_bonus.specific_gratification,
    };

    let raw_qualification: RawQualification = section(values, "qualification")?;
    let qualification = QualificationRules {
        current_regime_from_period: raw_qualification.current_regime_from_period,
        reference_value: raw_qualification.reference_value,
        max_multiplier: raw_qualification
            .max_multiplier
            .unwrap_or(DEFAULT_MAX_QUALIFICATION_MULTIPLIER),
    };

    let raw_pension: RawPension = section(values, "pension")?;
    let mut pension_brackets = versioned(raw_pension.brackets, "pension.brackets")?;
    backfill_january_entries(&mut pension_brackets, "pension.brackets");
    let pension = PensionRules {
        brackets: pension_brackets,
        ceilings: versioned(raw_pension.ceilings, "pension.ceilings")?,
        complementary_mandatory_rate: raw_pension
            .complementary_mandatory_rate
            .unwrap_or(DEFAULT_COMPLEMENTARY_MANDATORY_RATE),
        function_counts: raw_pension.function_counts.unwrap_or(false),
        gratification_counts: raw_pension.gratification_counts.unwrap_or(false),
    };

    let raw_income_tax: RawIncomeTax = section(values, "income_tax")?;
    let mut tax_brackets = VersionedTable::new();
    for (label, brackets) in raw_income_tax.brackets {
        let version = parse_version(&label, "income_tax.brackets")?;
        let rule = format!("income_tax.brackets.{}", label);
        tax_brackets.insert(version, normalize_income_tax_brackets(brackets, &rule)?);
    }
    backfill_january_entries(&mut tax_brackets, "income_tax.brackets");
    let income_tax = IncomeTaxRules {
        brackets: tax_brackets,
        dependent_deduction: raw_income_tax
            .dependent_deduction
            .unwrap_or(DEFAULT_DEPENDENT_DEDUCTION),
    };

    let raw_benefits: RawBenefits = section(values, "benefits")?;
    let benefits = BenefitRules {
        food_allowance: raw_benefits.food_allowance,
        preschool_allowance: raw_benefits.preschool_allowance,
        transport_discount_rate: raw_benefits
            .transport_discount_rate
            .unwrap_or(DEFAULT_TRANSPORT_DISCOUNT_RATE),
    };

    let raw_dailies: RawDailies = section(values, "dailies")?;
    let dailies = DailiesRules {
        rates: raw_dailies.rates,
        executive_rate: raw_dailies.executive_rate,
        embarkation_full: raw_dailies.embarkation_full,
        embarkation_half: raw_dailies.embarkation_half,
        external_costs: raw_dailies.external_costs,
    };

    let raw_constants: RawConstants = section(values, "constants")?;
    let constants = PayrollConstants {
        month_day_divisor: divisor(
            raw_constants.month_day_divisor,
            DEFAULT_MONTH_DAY_DIVISOR,
            "constants.month_day_divisor",
        )?,
        overtime_hour_divisor: divisor(
            raw_constants.overtime_hour_divisor,
            DEFAULT_OVERTIME_HOUR_DIVISOR,
            "constants.overtime_hour_divisor",
        )?,
        overtime_multiplier_first: raw_constants
            .overtime_multiplier_first
            .unwrap_or(DEFAULT_OVERTIME_MULTIPLIER_FIRST),
        overtime_multiplier_second: raw_constants
            .overtime_multiplier_second
            .unwrap_or(DEFAULT_OVERTIME_MULTIPLIER_SECOND),
        leave_divisor: divisor(
            raw_constants.leave_divisor,
            DEFAULT_LEAVE_DIVISOR,
            "constants.leave_divisor",
        )?,
        substitution_divisor: divisor(
            raw_constants.substitution_divisor,
            DEFAULT_SUBSTITUTION_DIVISOR,
            "constants.substitution_divisor",
        )?,
        vacation_divisor: divisor(
            raw_constants.vacation_divisor,
            DEFAULT_VACATION_DIVISOR,
            "constants.vacation_divisor",
        )?,
    };

    debug!(
        org_slug = %config.organization.slug,
        pension_tables = pension.brackets.len(),
        income_tax_tables = income_tax.brackets.len(),
        "Projected normalized rules"
    );

    Ok(NormalizedRules {
        salary,
        bonuses,
        qualification,
        pension,
        income_tax,
        benefits,
        dailies,
        constants,
    })
}

/// Deserializes one top-level rule; absent or null rules yield the default.
fn section<T: DeserializeOwned + Default>(values: &Value, key: &str) -> EngineResult<T> {
    match values.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value).map_err(|e| EngineError::invalid_rule(key, e.to_string())),
    }
}

fn parse_version(label: &str, rule: &str) -> EngineResult<TableVersion> {
    TableVersion::from_str(label).map_err(|message| EngineError::invalid_rule(rule, message))
}

fn versioned<T>(entries: HashMap<String, T>, rule: &str) -> EngineResult<VersionedTable<T>> {
    entries
        .into_iter()
        .map(|(label, value)| Ok((parse_version(&label, rule)?, value)))
        .collect()
}

fn divisor(value: Option<Decimal>, fallback: Decimal, rule: &str) -> EngineResult<Decimal> {
    match value {
        None => Ok(fallback),
        Some(v) if v > Decimal::ZERO => Ok(v),
        Some(v) => Err(EngineError::invalid_rule(
            rule,
            format!("divisor must be positive, found {}", v),
        )),
    }
}

/// Fills absent bracket deductions.
///
/// The top bracket falls back to [`DEFAULT_INCOME_TAX_DEDUCTION`]; exempt
/// brackets (rate zero) fall back to zero. Any other bracket must carry its
/// own deduction.
fn normalize_income_tax_brackets(
    brackets: Vec<RawIncomeTaxBracket>,
    rule: &str,
) -> EngineResult<Vec<IncomeTaxBracket>> {
    let top_min = brackets.iter().map(|b| b.min).max();

    brackets
        .into_iter()
        .map(|bracket| {
            let deduction = match bracket.deduction {
                Some(deduction) => deduction,
                None if Some(bracket.min) == top_min => DEFAULT_INCOME_TAX_DEDUCTION,
                None if bracket.rate.is_zero() => Decimal::ZERO,
                None => {
                    return Err(EngineError::invalid_rule(
                        rule,
                        format!("bracket starting at {} has no deduction", bracket.min),
                    ));
                }
            };
            Ok(IncomeTaxBracket {
                min: bracket.min,
                max: bracket.max,
                rate: bracket.rate,
                deduction,
            })
        })
        .collect()
}

/// Synthesizes missing January entries of a bracket table.
///
/// When year `Y` has entries only after January but year `Y-1` has an
/// entry, the January entry of `Y` is a copy of the latest `Y-1` entry.
fn backfill_january_entries<T: Clone>(table: &mut VersionedTable<T>, rule: &str) {
    let versions: Vec<TableVersion> = table.versions().collect();

    let mut synthesized = Vec::new();
    for version in &versions {
        let january = TableVersion::year(version.year);
        if version.month == 1 || table.contains(january) || synthesized.contains(&january) {
            continue;
        }

        let previous = versions.iter().rev().find(|v| v.year == version.year - 1);
        if let Some(previous) = previous {
            if let Some(value) = table.get(*previous).cloned() {
                synthesized.push(january);
                debug!(
                    rule = %rule,
                    synthesized = %january,
                    copied_from = %previous,
                    "Backfilled missing January bracket table"
                );
                table.insert(january, value);
            }
        }
    }
}
