//! Configuration resolution and normalization for the payroll engine.
//!
//! Rules live in an external [`ConfigurationStore`] as three layers:
//! global, sector and organization. The [`ConfigResolver`] merges them into
//! an [`EffectiveConfig`] per organization and caches it; [`project`] turns
//! that generic document into the [`NormalizedRules`] the calculators use.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::{ConfigResolver, InMemoryStore};
//!
//! # async fn run() -> payroll_engine::error::EngineResult<()> {
//! let store = InMemoryStore::load("./config/store.yaml").expect("store");
//! let resolver = ConfigResolver::new(store);
//! let rules = resolver.resolve_rules("trf-demo").await?;
//! println!("Dependent deduction: {}", rules.income_tax.dependent_deduction);
//! # Ok(())
//! # }
//! ```

mod cache;
mod mapper;
mod merge;
mod resolver;
mod store;
mod types;

pub use cache::{ConfigCache, InMemoryConfigCache};
pub use mapper::{
    DEFAULT_COMPLEMENTARY_MANDATORY_RATE, DEFAULT_DEPENDENT_DEDUCTION,
    DEFAULT_INCOME_TAX_DEDUCTION, DEFAULT_LEAVE_DIVISOR, DEFAULT_MAX_QUALIFICATION_MULTIPLIER,
    DEFAULT_MONTH_DAY_DIVISOR, DEFAULT_OVERTIME_HOUR_DIVISOR, DEFAULT_OVERTIME_MULTIPLIER_FIRST,
    DEFAULT_OVERTIME_MULTIPLIER_SECOND, DEFAULT_SUBSTITUTION_DIVISOR,
    DEFAULT_TRANSPORT_DISCOUNT_RATE, DEFAULT_VACATION_DIVISOR, project,
};
pub use merge::deep_merge;
pub use resolver::{ConfigResolver, EffectiveConfig, OrganizationIdentity};
pub use store::{
    ConfigRecord, ConfigurationStore, InMemoryStore, OrganizationRecord, StoreDocument, StoreError,
};
pub use types::{
    AdjustmentSchedule, AdjustmentStep, BenefitRules, BonusRules, DailiesRules, IncomeTaxBracket,
    IncomeTaxRules, NormalizedRules, PayrollConstants, PensionRules, QualificationRules,
    SalaryRules, TableVersion, TaxBracket, VersionedTable,
};
