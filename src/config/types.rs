//! Normalized rule types consumed by the calculators.
//!
//! These structures are produced by [`project`](super::project) from an
//! [`EffectiveConfig`](super::EffectiveConfig). Rules with a documented
//! fallback are plain values; rules without one stay `Option` so that only
//! the calculator needing them fails.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, EngineResult};

/// An explicitly ordered version of a rule table.
///
/// Parsed once from labels such as `"2024"` (January) or `"2024-05"`.
/// Ordering compares `(year, month)` structurally.
///
/// # Example
///
/// ```
/// use payroll_engine::config::TableVersion;
///
/// let january: TableVersion = "2025".parse().unwrap();
/// let may: TableVersion = "2025-05".parse().unwrap();
/// assert!(january < may);
/// assert_eq!(may.to_string(), "2025-05");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableVersion {
    /// The calendar year of the version.
    pub year: i32,
    /// The month (1..=12) the version takes effect.
    pub month: u32,
}

impl TableVersion {
    /// Creates a version effective from the given year and month.
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Creates a version effective from January of the given year.
    pub fn year(year: i32) -> Self {
        Self { year, month: 1 }
    }
}

impl FromStr for TableVersion {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let label = label.trim();
        let (year_part, month_part) = match label.split_once('-') {
            Some((year, month)) => (year, Some(month)),
            None => (label, None),
        };

        let year = year_part
            .parse::<i32>()
            .map_err(|_| format!("invalid version label '{}'", label))?;
        let month = match month_part {
            Some(month) => month
                .parse::<u32>()
                .map_err(|_| format!("invalid version label '{}'", label))?,
            None => 1,
        };

        if !(1..=12).contains(&month) {
            return Err(format!("invalid month in version label '{}'", label));
        }

        Ok(Self { year, month })
    }
}

impl fmt::Display for TableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.month == 1 {
            write!(f, "{}", self.year)
        } else {
            write!(f, "{}-{:02}", self.year, self.month)
        }
    }
}

impl Serialize for TableVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TableVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = TableVersion;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version label such as \"2024\" or \"2024-05\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TableVersion, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<TableVersion, E> {
                i32::try_from(value)
                    .map(TableVersion::year)
                    .map_err(|_| E::custom(format!("year {} out of range", value)))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<TableVersion, E> {
                i32::try_from(value)
                    .map(TableVersion::year)
                    .map_err(|_| E::custom(format!("year {} out of range", value)))
            }
        }

        deserializer.deserialize_any(VersionVisitor)
    }
}

/// A table of values keyed by [`TableVersion`], ordered oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedTable<T> {
    entries: BTreeMap<TableVersion, T>,
}

impl<T> Default for VersionedTable<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> VersionedTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for a version.
    pub fn insert(&mut self, version: TableVersion, value: T) {
        self.entries.insert(version, value);
    }

    /// Returns the entry for exactly this version.
    pub fn get(&self, version: TableVersion) -> Option<&T> {
        self.entries.get(&version)
    }

    /// Returns the most recent entry effective on or before `version`.
    pub fn effective_at(&self, version: TableVersion) -> Option<&T> {
        self.entries.range(..=version).next_back().map(|(_, v)| v)
    }

    /// Returns the newest entry.
    pub fn latest(&self) -> Option<(TableVersion, &T)> {
        self.entries.iter().next_back().map(|(k, v)| (*k, v))
    }

    /// Returns true if an entry exists for exactly this version.
    pub fn contains(&self, version: TableVersion) -> bool {
        self.entries.contains_key(&version)
    }

    /// Iterates over all versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = TableVersion> + '_ {
        self.entries.keys().copied()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(TableVersion, T)> for VersionedTable<T> {
    fn from_iter<I: IntoIterator<Item = (TableVersion, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A marginal pension-contribution bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// The bracket floor.
    pub min: Decimal,
    /// The bracket ceiling; `None` for an open top bracket.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// The rate applied to the slice of income inside the bracket.
    pub rate: Decimal,
}

/// An income-tax bracket with its fixed deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxBracket {
    /// The bracket floor.
    pub min: Decimal,
    /// The bracket ceiling; `None` for an open top bracket.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// The rate applied to the whole base.
    pub rate: Decimal,
    /// The fixed amount deducted after applying the rate.
    pub deduction: Decimal,
}

/// One step of a progressive salary-adjustment schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentStep {
    /// The period index from which this step applies.
    pub period: u32,
    /// The percentage increase of this step (e.g. `6.0` for 6%).
    pub percent: Decimal,
}

/// An ordered salary-adjustment schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentSchedule {
    steps: Vec<AdjustmentStep>,
}

impl AdjustmentSchedule {
    /// Creates a schedule, sorting the steps by period.
    pub fn new(mut steps: Vec<AdjustmentStep>) -> Self {
        steps.sort_by_key(|step| step.period);
        Self { steps }
    }

    /// Returns the steps ordered by period.
    pub fn steps(&self) -> &[AdjustmentStep] {
        &self.steps
    }

    /// Returns how many steps have elapsed at `period`.
    pub fn elapsed_steps(&self, period: u32) -> usize {
        self.steps.iter().take_while(|s| s.period <= period).count()
    }

    /// Returns the compounded factor of every step elapsed at `period`.
    pub fn factor_at(&self, period: u32) -> Decimal {
        self.steps
            .iter()
            .take(self.elapsed_steps(period))
            .fold(Decimal::ONE, |factor, step| {
                factor * (Decimal::ONE + step.percent / Decimal::ONE_HUNDRED)
            })
    }

    /// Applies the elapsed steps to a table value, rounded to cents.
    pub fn adjust(&self, value: Decimal, period: u32) -> Decimal {
        (value * self.factor_at(period))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Salary and function tables with their adjustment schedule.
#[derive(Debug, Clone, Default)]
pub struct SalaryRules {
    /// Base salary by role, then grade.
    pub tables: HashMap<String, HashMap<String, Decimal>>,
    /// Function bonus by function code.
    pub function_values: HashMap<String, Decimal>,
    /// The progressive salary-adjustment schedule.
    pub adjustments: AdjustmentSchedule,
}

impl SalaryRules {
    /// Looks up the adjusted base salary for a role and grade.
    pub fn salary(&self, role: &str, grade: &str, period: u32) -> EngineResult<Decimal> {
        self.tables
            .get(role)
            .and_then(|grades| grades.get(grade))
            .map(|value| self.adjustments.adjust(*value, period))
            .ok_or_else(|| EngineError::missing(format!("salary_tables.{}.{}", role, grade)))
    }

    /// Looks up the adjusted value of a commissioned function.
    pub fn function_value(&self, code: &str, period: u32) -> EngineResult<Decimal> {
        self.function_values
            .get(code)
            .map(|value| self.adjustments.adjust(*value, period))
            .ok_or_else(|| EngineError::missing(format!("function_values.{}", code)))
    }
}

/// Rates of the salary-linked bonuses.
#[derive(Debug, Clone, Default)]
pub struct BonusRules {
    /// Judiciary-activity bonus as a fraction of salary.
    pub activity_rate: Option<Decimal>,
    /// Specific gratification as a fraction of salary.
    pub specific_gratification_rate: Option<Decimal>,
}

/// Qualification-bonus regime settings.
#[derive(Debug, Clone)]
pub struct QualificationRules {
    /// The first period of the reference-value regime; `None` keeps the legacy regime.
    pub current_regime_from_period: Option<u32>,
    /// The reference value multiplied under the current regime.
    pub reference_value: Option<Decimal>,
    /// The largest multiplier accepted before a parameter is considered stale.
    pub max_multiplier: Decimal,
}

/// Pension-contribution tables and settings.
#[derive(Debug, Clone)]
pub struct PensionRules {
    /// Marginal brackets by table version.
    pub brackets: VersionedTable<Vec<TaxBracket>>,
    /// Statutory ceiling by table version.
    pub ceilings: VersionedTable<Decimal>,
    /// Mandatory complementary-pension rate on the excess over the ceiling.
    pub complementary_mandatory_rate: Decimal,
    /// Whether the function bonus counts toward the contribution base.
    pub function_counts: bool,
    /// Whether the specific gratification counts toward the contribution base.
    pub gratification_counts: bool,
}

impl PensionRules {
    /// Returns the brackets of exactly this version.
    pub fn brackets_for(&self, version: TableVersion) -> EngineResult<&[TaxBracket]> {
        self.brackets
            .get(version)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::missing(format!("pension.brackets.{}", version)))
    }

    /// Returns the ceiling effective at this version.
    pub fn ceiling_for(&self, version: TableVersion) -> EngineResult<Decimal> {
        self.ceilings
            .effective_at(version)
            .copied()
            .ok_or_else(|| EngineError::missing(format!("pension.ceilings.{}", version)))
    }
}

/// Income-tax tables and settings.
#[derive(Debug, Clone)]
pub struct IncomeTaxRules {
    /// Brackets by table version.
    pub brackets: VersionedTable<Vec<IncomeTaxBracket>>,
    /// Fixed deduction per dependent.
    pub dependent_deduction: Decimal,
}

impl IncomeTaxRules {
    /// Returns the brackets of exactly this version.
    pub fn brackets_for(&self, version: TableVersion) -> EngineResult<&[IncomeTaxBracket]> {
        self.brackets
            .get(version)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::missing(format!("income_tax.brackets.{}", version)))
    }

    /// Returns the bracket with the highest floor for this version.
    pub fn top_bracket(&self, version: TableVersion) -> EngineResult<&IncomeTaxBracket> {
        self.brackets_for(version)?
            .iter()
            .max_by_key(|bracket| bracket.min)
            .ok_or_else(|| EngineError::missing(format!("income_tax.brackets.{}", version)))
    }
}

/// Benefit amounts.
#[derive(Debug, Clone)]
pub struct BenefitRules {
    /// Monthly food allowance per unit.
    pub food_allowance: Option<Decimal>,
    /// Monthly preschool allowance per dependent.
    pub preschool_allowance: Option<Decimal>,
    /// Statutory discount rate of the transport allowance.
    pub transport_discount_rate: Decimal,
}

/// Travel per-diem rates.
#[derive(Debug, Clone, Default)]
pub struct DailiesRules {
    /// Per-diem rate by role.
    pub rates: HashMap<String, Decimal>,
    /// Per-diem rate for executive (`CJ`) functions.
    pub executive_rate: Option<Decimal>,
    /// Full embarkation additive.
    pub embarkation_full: Option<Decimal>,
    /// Half embarkation additive.
    pub embarkation_half: Option<Decimal>,
    /// External-cost reduction rates by cost name.
    pub external_costs: HashMap<String, Decimal>,
}

/// Divisors and multipliers shared by the calculators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollConstants {
    /// Days in a payroll month.
    pub month_day_divisor: Decimal,
    /// Monthly hours used to derive the hourly rate.
    pub overtime_hour_divisor: Decimal,
    /// Multiplier of the first overtime tier.
    pub overtime_multiplier_first: Decimal,
    /// Multiplier of the second overtime tier.
    pub overtime_multiplier_second: Decimal,
    /// Days used to derive the daily leave value.
    pub leave_divisor: Decimal,
    /// Days used to derive the daily substitution difference.
    pub substitution_divisor: Decimal,
    /// Divisor of the automatic vacation value.
    pub vacation_divisor: Decimal,
}

/// The complete rule set of one organization, normalized for the calculators.
#[derive(Debug, Clone)]
pub struct NormalizedRules {
    /// Salary and function tables.
    pub salary: SalaryRules,
    /// Salary-linked bonus rates.
    pub bonuses: BonusRules,
    /// Qualification regime settings.
    pub qualification: QualificationRules,
    /// Pension tables and settings.
    pub pension: PensionRules,
    /// Income-tax tables and settings.
    pub income_tax: IncomeTaxRules,
    /// Benefit amounts.
    pub benefits: BenefitRules,
    /// Travel per-diem rates.
    pub dailies: DailiesRules,
    /// Shared divisors and multipliers.
    pub constants: PayrollConstants,
}
