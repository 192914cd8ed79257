//! Calculation logic for the payroll engine.
//!
//! This module contains the base remuneration calculator, the pension and
//! income-tax withholding functions, the thirteenth-salary splitter, the
//! benefit, overtime, substitution, travel per-diem, leave and vacation
//! calculators, and the [`simulate`] orchestrator that runs them together.

mod base_remuneration;
mod benefits;
mod dailies;
mod leave;
mod overtime;
mod rounding;
mod simulation;
mod substitution;
mod tax_withholding;
mod thirteenth_salary;
mod vacation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use base_remuneration::calculate_base_remuneration;
pub use benefits::{calculate_benefits, transport_debit};
pub use dailies::{EXECUTIVE_FUNCTION_PREFIX, calculate_dailies, dailies_rate_key};
pub use leave::calculate_leave;
pub use overtime::calculate_overtime;
pub use rounding::round_money;
pub use simulation::simulate;
pub use substitution::calculate_substitution;
pub use tax_withholding::{
    calculate_withholding, complementary_contribution, estimate_pension, flat_income_tax,
    pension_contribution, pension_sensitive_base, progressive_income_tax, split_at_ceiling,
};
pub use thirteenth_salary::{calculate_thirteenth_salary, thirteenth_state};
pub use vacation::{calculate_vacation, vacation_triggered};
