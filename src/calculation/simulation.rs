//! Payroll simulation orchestration.
//!
//! The base remuneration runs first; its components are shared by reference
//! with every dependent calculator. Each optional calculator is scoped to
//! its own [`LineItem`], so a missing rule for one item never hides the
//! others.

use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{NormalizedRules, OrganizationIdentity};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditTrace, CalculationParameters, CalculatorFailure, LineItem, PayrollSimulation,
    PayrollTotals, ThirteenthState,
};

use super::base_remuneration::calculate_base_remuneration;
use super::benefits::calculate_benefits;
use super::dailies::calculate_dailies;
use super::leave::calculate_leave;
use super::overtime::calculate_overtime;
use super::substitution::calculate_substitution;
use super::tax_withholding::calculate_withholding;
use super::thirteenth_salary::{calculate_thirteenth_salary, thirteenth_state};
use super::vacation::{calculate_vacation, vacation_triggered};

/// Runs a complete payroll simulation.
///
/// # Arguments
///
/// * `params` - The caller's calculation parameters
/// * `rules` - The organization's normalized rules
/// * `organization` - The identity of the organization the rules belong to
///
/// # Returns
///
/// A [`PayrollSimulation`] with every requested line item, the totals over
/// the computed items and the audit trace. Returns an error only when the
/// parameters are invalid, the base remuneration cannot be computed or the
/// totals overflow; every other calculator failure is reported as
/// [`LineItem::Failed`].
///
/// # Totals
///
/// - Gross earnings: base total, permanence bonus, thirteenth installments,
///   credited benefits, overtime, substitution, net dailies, leave and vacation
/// - Deductions: pension, complementary pension and income tax (monthly,
///   thirteenth and vacation) plus the transport debit when a credit is paid
pub fn simulate(
    params: &CalculationParameters,
    rules: &NormalizedRules,
    organization: &OrganizationIdentity,
) -> EngineResult<PayrollSimulation> {
    let start_time = Instant::now();
    params.validate()?;

    let base = calculate_base_remuneration(params, rules, 1)?;
    let components = &base.components;

    let mut steps = vec![base.audit_step.clone()];

    let withholding = line_item(
        "withholding",
        Some(calculate_withholding(components, params, rules, next_step(&steps))),
    );
    if let LineItem::Computed(result) = &withholding {
        steps.extend(result.audit_steps.iter().cloned());
    }

    let thirteenth = line_item(
        "thirteenth",
        (thirteenth_state(params) != ThirteenthState::Neither).then(|| {
            calculate_thirteenth_salary(components, params, rules, next_step(&steps))
        }),
    );
    record(&mut steps, thirteenth.computed().map(|r| &r.audit_step));

    let benefits = line_item(
        "benefits",
        params
            .benefits
            .as_ref()
            .map(|input| calculate_benefits(input, components, rules, next_step(&steps))),
    );
    record(&mut steps, benefits.computed().map(|r| &r.audit_step));

    let overtime = line_item(
        "overtime",
        params.overtime.as_ref().map(|input| {
            calculate_overtime(input, components, params, rules, next_step(&steps))
        }),
    );
    record(&mut steps, overtime.computed().map(|r| &r.audit_step));

    let substitution = line_item(
        "substitution",
        (!params.substitutions.is_empty()).then(|| {
            calculate_substitution(&params.substitutions, components, params, rules, next_step(&steps))
        }),
    );
    record(&mut steps, substitution.computed().map(|r| &r.audit_step));

    let dailies = line_item(
        "dailies",
        params.dailies.as_ref().map(|input| {
            calculate_dailies(input, params, benefits.computed(), rules, next_step(&steps))
        }),
    );
    record(&mut steps, dailies.computed().map(|r| &r.audit_step));

    let leave = line_item(
        "leave",
        params
            .leave
            .as_ref()
            .map(|input| calculate_leave(input, components, params, rules, next_step(&steps))),
    );
    record(&mut steps, leave.computed().map(|r| &r.audit_step));

    let vacation = line_item(
        "vacation",
        vacation_triggered(params)
            .then(|| calculate_vacation(components, params, rules, next_step(&steps))),
    );
    record(&mut steps, vacation.computed().map(|r| &r.audit_step));

    let mut gross = vec![base.total];
    let mut deductions = Vec::new();

    if let Some(w) = withholding.computed() {
        gross.push(w.permanence_bonus);
        deductions.push(w.total_deductions());
    }
    if let Some(t) = thirteenth.computed() {
        gross.push(t.gross());
        deductions.push(t.deductions());
    }
    if let Some(b) = benefits.computed() {
        gross.push(b.credited());
        if b.transport_credit > Decimal::ZERO {
            deductions.push(b.transport_debit);
        }
    }
    if let Some(o) = overtime.computed() {
        gross.push(o.total);
    }
    if let Some(s) = substitution.computed() {
        gross.push(s.total);
    }
    if let Some(d) = dailies.computed() {
        gross.push(d.net);
    }
    if let Some(l) = leave.computed() {
        gross.push(l.amount);
    }
    if let Some(v) = vacation.computed() {
        gross.push(v.value);
        deductions.push(v.income_tax);
    }

    let gross_earnings = checked_sum("gross_earnings", &gross)?;
    let total_deductions = checked_sum("total_deductions", &deductions)?;
    let totals = PayrollTotals {
        gross_earnings,
        total_deductions,
        net_pay: gross_earnings
            .checked_sub(total_deductions)
            .ok_or_else(|| total_overflow("net_pay"))?,
    };

    let duration_us = start_time.elapsed().as_micros() as u64;

    info!(
        org_slug = %organization.slug,
        role = %params.role,
        grade = %params.grade,
        period = params.period,
        month = params.month,
        gross_earnings = %totals.gross_earnings,
        net_pay = %totals.net_pay,
        warnings = base.warnings.len(),
        duration_us = duration_us,
        "Simulation completed"
    );

    Ok(PayrollSimulation {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        organization: organization.clone(),
        audit_trace: AuditTrace {
            steps,
            warnings: base.warnings.clone(),
            duration_us,
        },
        base,
        withholding,
        thirteenth,
        benefits,
        overtime,
        substitution,
        dailies,
        leave,
        vacation,
        totals,
    })
}

fn line_item<T>(item: &str, outcome: Option<EngineResult<T>>) -> LineItem<T> {
    match outcome {
        None => LineItem::NotRequested,
        Some(Ok(value)) => LineItem::Computed(value),
        Some(Err(error)) => {
            warn!(item = item, code = error.code(), error = %error, "Calculator failed");
            LineItem::Failed(CalculatorFailure::from(&error))
        }
    }
}

fn checked_sum(total: &str, amounts: &[Decimal]) -> EngineResult<Decimal> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
        .ok_or_else(|| total_overflow(total))
}

fn total_overflow(total: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} overflowed", total),
    }
}

fn next_step(steps: &[AuditStep]) -> u32 {
    steps.len() as u32 + 1
}

fn record(steps: &mut Vec<AuditStep>, step: Option<&AuditStep>) {
    if let Some(step) = step {
        steps.push(step.clone());
    }
}
