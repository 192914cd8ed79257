//! Calculation parameters supplied by the caller.
//!
//! A [`CalculationParameters`] record describes one simulation request. It
//! is owned by the caller and never modified by the calculators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TableVersion;
use crate::error::{EngineError, EngineResult};

/// Function codes that mean "no commissioned function".
const NO_FUNCTION_CODES: [&str; 2] = ["", "none"];

/// The pension regime the employee contributes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PensionRegime {
    /// Contributes on the full base, without a ceiling.
    Legacy,
    /// Migrated to the capped regime.
    Migrated,
    /// Joined under the complementary-pension regime, capped.
    Complementary,
}

impl PensionRegime {
    /// Returns true if the contribution base is limited to the ceiling.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::PensionRegime;
    ///
    /// assert!(!PensionRegime::Legacy.is_capped());
    /// assert!(PensionRegime::Migrated.is_capped());
    /// assert!(PensionRegime::Complementary.is_capped());
    /// ```
    pub fn is_capped(self) -> bool {
        matches!(self, PensionRegime::Migrated | PensionRegime::Complementary)
    }
}

/// Qualification multipliers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationInput {
    /// Multiplier of the training qualification bonus.
    #[serde(default)]
    pub training: Decimal,
    /// Multiplier of the academic-title qualification bonus.
    #[serde(default)]
    pub title: Decimal,
}

/// Pass-through allowances added to the base remuneration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraAllowances {
    /// First legal-adjustment allowance.
    #[serde(default)]
    pub personal: Decimal,
    /// Second legal-adjustment allowance.
    #[serde(default)]
    pub individual: Decimal,
    /// Time-in-service allowance.
    #[serde(default)]
    pub seniority: Decimal,
}

/// Transport-allowance claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportInput {
    /// The claimed monthly transport expense.
    pub claimed_expense: Decimal,
    /// Workdays the statutory discount applies to.
    pub workdays: u32,
}

/// Benefits claimed for the period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitsInput {
    /// Units of food allowance claimed.
    #[serde(default)]
    pub food_units: u32,
    /// Dependents the preschool allowance is claimed for.
    #[serde(default)]
    pub preschool_units: u32,
    /// Caller override of the preschool quota.
    #[serde(default)]
    pub preschool_quota: Option<Decimal>,
    /// Transport-allowance claim, if any.
    #[serde(default)]
    pub transport: Option<TransportInput>,
}

/// Overtime hours claimed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeInput {
    /// Hours paid at the first-tier multiplier.
    #[serde(default)]
    pub first_tier_hours: Decimal,
    /// Hours paid at the second-tier multiplier.
    #[serde(default)]
    pub second_tier_hours: Decimal,
}

/// One function-substitution claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionInput {
    /// The substituted function code.
    pub function_code: String,
    /// Days spent in the substituted function.
    pub days: u32,
}

/// Embarkation additive of a trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Embarkation {
    /// No embarkation additive.
    #[default]
    Without,
    /// Half additive.
    Half,
    /// Full additive.
    Full,
}

/// Travel per-diem claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailiesInput {
    /// Number of per-diems (may be fractional).
    pub quantity: Decimal,
    /// Embarkation additive.
    #[serde(default)]
    pub embarkation: Embarkation,
    /// Names of external costs already covered, each reducing the gross.
    #[serde(default)]
    pub external_costs: Vec<String>,
    /// Days of travel used by the internal deductions.
    #[serde(default)]
    pub travel_days: u32,
    /// Deduct the food allowance for the travel days.
    #[serde(default)]
    pub deduct_food: bool,
    /// Deduct the transport allowance for the travel days.
    #[serde(default)]
    pub deduct_transport: bool,
}

/// Leave converted to pay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveInput {
    /// Days of leave.
    pub days: u32,
    /// Function to value the leave with instead of the current one.
    #[serde(default)]
    pub alternate_function: Option<String>,
    /// Add the estimated pension contribution to the base.
    #[serde(default)]
    pub include_pension_estimate: bool,
}

/// Vacation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationInput {
    /// A manually supplied vacation value.
    #[serde(default)]
    pub manual_value: Option<Decimal>,
    /// Paid outside the normal cycle; no income tax is withheld.
    #[serde(default)]
    pub anticipated: bool,
}

/// How thirteenth-salary installments are selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentMode {
    /// Installments follow the calculation month.
    #[default]
    Automatic,
    /// Installments follow the caller's flags.
    Manual,
}

/// Thirteenth-salary settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirteenthInput {
    /// Installment selection mode.
    #[serde(default)]
    pub mode: InstallmentMode,
    /// Pay the first installment (manual mode).
    #[serde(default)]
    pub first_installment: bool,
    /// Pay the second installment (manual mode).
    #[serde(default)]
    pub second_installment: bool,
    /// Override of the first installment value.
    #[serde(default)]
    pub first_value: Option<Decimal>,
    /// Override of the second installment value.
    #[serde(default)]
    pub second_value: Option<Decimal>,
}

/// One payroll simulation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationParameters {
    /// Salary period index; selects elapsed adjustments and the qualification regime.
    pub period: u32,
    /// Calendar month of the calculation (1..=12).
    pub month: u32,
    /// Salary table role.
    pub role: String,
    /// Salary table grade.
    pub grade: String,
    /// Commissioned function code.
    #[serde(default)]
    pub function_code: Option<String>,
    /// Qualification multipliers.
    #[serde(default)]
    pub qualification: QualificationInput,
    /// Manually supplied specific gratification.
    #[serde(default)]
    pub manual_specific_gratification: Option<Decimal>,
    /// Pass-through allowances.
    #[serde(default)]
    pub allowances: ExtraAllowances,
    /// Pension regime.
    pub pension_regime: PensionRegime,
    /// Voluntary complementary-pension percent.
    #[serde(default)]
    pub voluntary_complementary_percent: Decimal,
    /// Pension bracket table version.
    pub pension_table: TableVersion,
    /// Income-tax bracket table version.
    pub income_tax_table: TableVersion,
    /// Income-tax dependents.
    #[serde(default)]
    pub dependents: u32,
    /// Eligible for the permanence bonus.
    #[serde(default)]
    pub permanence_bonus: bool,
    /// Benefits claim.
    #[serde(default)]
    pub benefits: Option<BenefitsInput>,
    /// Overtime claim.
    #[serde(default)]
    pub overtime: Option<OvertimeInput>,
    /// Function-substitution claims.
    #[serde(default)]
    pub substitutions: Vec<SubstitutionInput>,
    /// Travel per-diem claim.
    #[serde(default)]
    pub dailies: Option<DailiesInput>,
    /// Leave converted to pay.
    #[serde(default)]
    pub leave: Option<LeaveInput>,
    /// Vacation settings.
    #[serde(default)]
    pub vacation: VacationInput,
    /// Thirteenth-salary settings.
    #[serde(default)]
    pub thirteenth: ThirteenthInput,
}

impl CalculationParameters {
    /// Creates parameters with every optional feature off.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::config::TableVersion;
    /// use payroll_engine::models::{CalculationParameters, PensionRegime};
    ///
    /// let params = CalculationParameters::new(
    ///     "analyst",
    ///     "C13",
    ///     3,
    ///     PensionRegime::Migrated,
    ///     TableVersion::year(2025),
    /// );
    /// assert_eq!(params.active_function(), None);
    /// assert!(params.validate().is_ok());
    /// ```
    pub fn new(
        role: impl Into<String>,
        grade: impl Into<String>,
        month: u32,
        pension_regime: PensionRegime,
        table_version: TableVersion,
    ) -> Self {
        Self {
            period: 0,
            month,
            role: role.into(),
            grade: grade.into(),
            function_code: None,
            qualification: QualificationInput::default(),
            manual_specific_gratification: None,
            allowances: ExtraAllowances::default(),
            pension_regime,
            voluntary_complementary_percent: Decimal::ZERO,
            pension_table: table_version,
            income_tax_table: table_version,
            dependents: 0,
            permanence_bonus: false,
            benefits: None,
            overtime: None,
            substitutions: Vec::new(),
            dailies: None,
            leave: None,
            vacation: VacationInput::default(),
            thirteenth: ThirteenthInput::default(),
        }
    }

    /// Returns the commissioned function code, or `None` for "no function".
    pub fn active_function(&self) -> Option<&str> {
        active_function_code(self.function_code.as_deref())
    }

    /// Checks the parameters that have a closed domain.
    ///
    /// The month must be in `1..=12`. Caller-supplied amounts, hours and
    /// quantities must not be negative; qualification multipliers are
    /// excluded, since the base calculator reports those as stale.
    pub fn validate(&self) -> EngineResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(EngineError::InvalidParameters {
                field: "month".to_string(),
                message: format!("expected 1..=12, found {}", self.month),
            });
        }

        non_negative("voluntary_complementary_percent", Some(self.voluntary_complementary_percent))?;
        non_negative("manual_specific_gratification", self.manual_specific_gratification)?;
        non_negative("allowances.personal", Some(self.allowances.personal))?;
        non_negative("allowances.individual", Some(self.allowances.individual))?;
        non_negative("allowances.seniority", Some(self.allowances.seniority))?;

        if let Some(benefits) = &self.benefits {
            non_negative("benefits.preschool_quota", benefits.preschool_quota)?;
        }
        if let Some(overtime) = &self.overtime {
            non_negative("overtime.first_tier_hours", Some(overtime.first_tier_hours))?;
            non_negative("overtime.second_tier_hours", Some(overtime.second_tier_hours))?;
        }
        if let Some(dailies) = &self.dailies {
            non_negative("dailies.quantity", Some(dailies.quantity))?;
        }

        non_negative("vacation.manual_value", self.vacation.manual_value)?;
        non_negative("thirteenth.first_value", self.thirteenth.first_value)?;
        non_negative("thirteenth.second_value", self.thirteenth.second_value)?;
        Ok(())
    }
}

fn non_negative(field: &str, value: Option<Decimal>) -> EngineResult<()> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(EngineError::InvalidParameters {
            field: field.to_string(),
            message: format!("must not be negative, found {}", v),
        }),
        _ => Ok(()),
    }
}

/// Normalizes a function code, mapping the "no function" codes to `None`.
pub(crate) fn active_function_code(code: Option<&str>) -> Option<&str> {
    code.map(str::trim)
        .filter(|c| !NO_FUNCTION_CODES.contains(&c.to_ascii_lowercase().as_str()))
}
