//! Core data models for the payroll engine.
//!
//! This module contains the caller-supplied calculation parameters and the
//! result records produced by the calculators.

mod calculation_result;
mod parameters;

pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, BaseComponents, BaseRemunerationResult, BenefitsResult,
    CalculatorFailure, DailiesResult, LeaveResult, LineItem, OvertimeResult, PayrollSimulation,
    PayrollTotals, QualificationBonus, SubstitutionLine, SubstitutionResult,
    ThirteenthSalaryResult, ThirteenthState, VacationResult, WithholdingResult,
};
pub use parameters::{
    BenefitsInput, CalculationParameters, DailiesInput, Embarkation, ExtraAllowances,
    InstallmentMode, LeaveInput, OvertimeInput, PensionRegime, QualificationInput,
    SubstitutionInput, ThirteenthInput, TransportInput, VacationInput,
};
pub(crate) use parameters::active_function_code;
