//! Onboarding orchestration and hierarchical validation for new subscribers.
//!
//! A submission describes the organizational tree a subscriber wants
//! (organization, complexes, departments, clinics, services). The service
//! validates it against the subscription plan's rules, resolves inherited
//! attributes down the hierarchy, checks that child working hours nest inside
//! parent working hours, and commits the whole graph in one unit of work.

pub mod domain;
pub(crate) mod hierarchy;
pub(crate) mod inheritance;
pub mod memory;
pub mod plan;
pub mod progress;
pub mod repository;
pub mod router;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AccessGrant, AccessRole, AttributeField, Clinic, ClinicDraft, ClinicService, ComplexDepartment,
    ComplexDraft, ContactCard, CreatedEntities, DayOfWeek, DaySchedule, Department,
    DepartmentDraft, DynamicInfoRecord, EntityCounts, EntityId, EntityKind, FacilityComplex,
    InheritanceSettings, InvalidPlanType, OnboardingPayload, OnboardingResult, Organization,
    OrganizationDraft, PlanType, ScheduleRecord, ScopeRef, ServiceDraft, ServiceOffering,
    SharedAttributes, Subscription, TimeRange, UserId, ValidationIssue,
};
pub use hierarchy::{creation_order, validate_hierarchy, validate_relationships};
pub use inheritance::inherit;
pub use memory::{InMemoryDirectory, InMemoryProgressRepository, RecordingAuditSink};
pub use plan::{validate_limits, CreationStage, LimitCheck, PlanRules};
pub use progress::{
    EntityIds, OnboardingStep, ProgressError, ProgressStoreError, ProgressTracker, StepProgress,
    StepProgressRepository, StepProgressView, UnknownStep,
};
pub use repository::{
    AuditError, AuditEvent, AuditSink, DirectoryError, DirectoryTransaction, FacilityDirectory,
};
pub use router::onboarding_router;
pub use schedule::{
    validate_against_parent, validate_day_schedules, ScheduleCheck, ScheduleViolation,
};
pub use service::{OnboardingError, OnboardingService, ValidationReport};
