//! Calculation result models for the payroll engine.
//!
//! This module contains the per-calculator result records, the
//! [`LineItem`] wrapper that scopes calculator failures to one item, and the
//! [`PayrollSimulation`] aggregate with its totals and audit trace.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::OrganizationIdentity;
use crate::error::EngineError;

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The configuration rule consulted, e.g. `pension.brackets`.
    pub rule_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl From<&EngineError> for AuditWarning {
    fn from(error: &EngineError) -> Self {
        let severity = match error {
            EngineError::StaleParameterDetected { .. } => "high",
            _ => "medium",
        };
        AuditWarning {
            code: error.code().to_string(),
            message: error.to_string(),
            severity: severity.to_string(),
        }
    }
}

/// The complete audit trace for a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// The two qualification bonuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationBonus {
    /// Training qualification bonus.
    pub training: Decimal,
    /// Academic-title qualification bonus.
    pub title: Decimal,
}

impl QualificationBonus {
    /// Returns the sum of both bonuses.
    pub fn total(&self) -> Decimal {
        self.training + self.title
    }
}

/// The base remuneration components shared by every downstream calculator.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{BaseComponents, QualificationBonus};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let components = BaseComponents {
///     salary: Decimal::from_str("5000.00").unwrap(),
///     activity_bonus: Decimal::from_str("7000.00").unwrap(),
///     qualification: QualificationBonus {
///         training: Decimal::from_str("100.00").unwrap(),
///         title: Decimal::ZERO,
///     },
///     ..BaseComponents::default()
/// };
/// assert_eq!(components.total(), Decimal::from_str("12100.00").unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseComponents {
    /// Base salary for the period.
    pub salary: Decimal,
    /// Judiciary-activity bonus.
    pub activity_bonus: Decimal,
    /// Commissioned-function bonus.
    pub function_bonus: Decimal,
    /// Qualification bonuses.
    pub qualification: QualificationBonus,
    /// Specific gratification.
    pub specific_gratification: Decimal,
    /// First legal-adjustment allowance.
    pub personal_allowance: Decimal,
    /// Second legal-adjustment allowance.
    pub individual_allowance: Decimal,
    /// Time-in-service allowance.
    pub seniority_allowance: Decimal,
}

impl BaseComponents {
    /// Returns the total remuneration: the sum of every component.
    pub fn total(&self) -> Decimal {
        self.salary
            + self.activity_bonus
            + self.function_bonus
            + self.qualification.total()
            + self.specific_gratification
            + self.personal_allowance
            + self.individual_allowance
            + self.seniority_allowance
    }

    /// Returns a copy valued with a different function bonus.
    pub fn with_function_bonus(&self, function_bonus: Decimal) -> Self {
        Self {
            function_bonus,
            ..self.clone()
        }
    }
}

/// The result of the base remuneration calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRemunerationResult {
    /// The derived components.
    pub components: BaseComponents,
    /// The total remuneration.
    pub total: Decimal,
    /// Warnings raised while deriving the components.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Pension, complementary pension and income-tax withholding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingResult {
    /// The base the pension contribution was computed on (after capping).
    pub pension_base: Decimal,
    /// The mandatory pension contribution.
    pub pension_contribution: Decimal,
    /// The excess over the ceiling.
    pub complementary_base: Decimal,
    /// The complementary-pension contribution.
    pub complementary_contribution: Decimal,
    /// The permanence bonus paid back to the employee.
    pub permanence_bonus: Decimal,
    /// The income-tax base after deductions.
    pub income_tax_base: Decimal,
    /// The income-tax withholding.
    pub income_tax: Decimal,
    /// Audit steps for each deduction.
    pub audit_steps: Vec<AuditStep>,
}

impl WithholdingResult {
    /// Returns the sum of every amount withheld.
    pub fn total_deductions(&self) -> Decimal {
        self.pension_contribution + self.complementary_contribution + self.income_tax
    }
}

/// Which thirteenth-salary installments are paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirteenthState {
    /// Only the first installment; never taxed.
    FirstOnly,
    /// The second installment, taxed on the combined base.
    Both,
    /// No installment.
    Neither,
}

/// The thirteenth-salary installments and their deductions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirteenthSalaryResult {
    /// Installments paid.
    pub state: ThirteenthState,
    /// First installment paid in this calculation.
    pub first_installment: Decimal,
    /// Second installment paid in this calculation.
    pub second_installment: Decimal,
    /// Combined two-installment base the deductions were computed on.
    pub combined_base: Decimal,
    /// Pension contribution on the combined base.
    pub pension_contribution: Decimal,
    /// Complementary-pension contribution on the combined base.
    pub complementary_contribution: Decimal,
    /// Estimated permanence bonus added to the income-tax base.
    pub permanence_addback: Decimal,
    /// Income-tax withholding on the combined base.
    pub income_tax: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

impl ThirteenthSalaryResult {
    /// Returns the installments paid.
    pub fn gross(&self) -> Decimal {
        self.first_installment + self.second_installment
    }

    /// Returns the amounts withheld.
    pub fn deductions(&self) -> Decimal {
        self.pension_contribution + self.complementary_contribution + self.income_tax
    }
}

/// Food, preschool and transport allowances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitsResult {
    /// Food allowance.
    pub food_allowance: Decimal,
    /// Preschool allowance.
    pub preschool_allowance: Decimal,
    /// Transport allowance credited (zero when the debit absorbs it).
    pub transport_credit: Decimal,
    /// Statutory transport debit.
    pub transport_debit: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

impl BenefitsResult {
    /// Returns the sum of the credited benefits.
    pub fn credited(&self) -> Decimal {
        self.food_allowance + self.preschool_allowance + self.transport_credit
    }
}

/// Overtime pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeResult {
    /// The monthly base the hourly rate derives from.
    pub overtime_base: Decimal,
    /// Estimated pension contribution added for permanence-bonus holders.
    pub permanence_addback: Decimal,
    /// The hourly rate.
    pub hourly_rate: Decimal,
    /// Pay for first-tier hours.
    pub first_tier_amount: Decimal,
    /// Pay for second-tier hours.
    pub second_tier_amount: Decimal,
    /// Total overtime pay.
    pub total: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// One function-substitution pay line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionLine {
    /// The substituted function code.
    pub function_code: String,
    /// Days in the substituted function.
    pub days: u32,
    /// Value of the substituted function.
    pub target_value: Decimal,
    /// Current function value plus specific gratification.
    pub current_value: Decimal,
    /// Amount paid (zero when the target is not worth more).
    pub amount: Decimal,
}

/// Function-substitution pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionResult {
    /// One line per claim.
    pub lines: Vec<SubstitutionLine>,
    /// Sum of the line amounts.
    pub total: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Travel per-diem pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailiesResult {
    /// The per-diem rate applied.
    pub rate: Decimal,
    /// Rate × quantity plus embarkation.
    pub gross: Decimal,
    /// Reduction for external costs.
    pub gloss: Decimal,
    /// Internal food and transport deductions.
    pub deductions: Decimal,
    /// Net per-diem pay, never negative.
    pub net: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Leave converted to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveResult {
    /// Monthly base the leave is valued on.
    pub base: Decimal,
    /// Estimated pension contribution added to the base.
    pub pension_estimate: Decimal,
    /// Days of leave.
    pub days: u32,
    /// Leave pay.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Vacation pay and its income tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationResult {
    /// Whether vacation pay applies to this calculation.
    pub triggered: bool,
    /// Vacation pay.
    pub value: Decimal,
    /// Whether the payment is anticipated (untaxed).
    pub anticipated: bool,
    /// Income tax on the vacation pay.
    pub income_tax: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// A calculator failure reported in place of its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorFailure {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl From<&EngineError> for CalculatorFailure {
    fn from(error: &EngineError) -> Self {
        CalculatorFailure {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// The outcome of one optional calculator.
///
/// # Example
///
/// ```
/// use payroll_engine::models::LineItem;
///
/// let item: LineItem<u32> = LineItem::NotRequested;
/// assert_eq!(serde_json::to_string(&item).unwrap(), r#"{"status":"not_requested"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum LineItem<T> {
    /// The calculator ran successfully.
    Computed(T),
    /// The caller did not request this item.
    NotRequested,
    /// The calculator failed; other items are unaffected.
    Failed(CalculatorFailure),
}

impl<T> LineItem<T> {
    /// Returns the computed value, if any.
    pub fn computed(&self) -> Option<&T> {
        match self {
            LineItem::Computed(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the calculator failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, LineItem::Failed(_))
    }
}

/// Aggregated totals of a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    /// Sum of every earning.
    pub gross_earnings: Decimal,
    /// Sum of every deduction.
    pub total_deductions: Decimal,
    /// Gross earnings minus deductions.
    pub net_pay: Decimal,
}

/// The complete result of one payroll simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSimulation {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The organization whose rules were applied.
    pub organization: OrganizationIdentity,
    /// Base remuneration.
    pub base: BaseRemunerationResult,
    /// Pension and income-tax withholding.
    pub withholding: LineItem<WithholdingResult>,
    /// Thirteenth salary.
    pub thirteenth: LineItem<ThirteenthSalaryResult>,
    /// Benefits.
    pub benefits: LineItem<BenefitsResult>,
    /// Overtime.
    pub overtime: LineItem<OvertimeResult>,
    /// Function substitution.
    pub substitution: LineItem<SubstitutionResult>,
    /// Travel per-diems.
    pub dailies: LineItem<DailiesResult>,
    /// Leave.
    pub leave: LineItem<LeaveResult>,
    /// Vacation.
    pub vacation: LineItem<VacationResult>,
    /// Aggregated totals over the computed items.
    pub totals: PayrollTotals,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}
