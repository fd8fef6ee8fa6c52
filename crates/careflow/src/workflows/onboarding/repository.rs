use std::collections::HashSet;

use serde::Serialize;

use super::domain::{
    AccessGrant, Clinic, ClinicService, ComplexDepartment, ContactCard, DaySchedule, Department,
    DynamicInfoRecord, EntityId, FacilityComplex, Organization, PlanType, ScheduleRecord, ScopeRef,
    ServiceOffering, SharedAttributes, Subscription, UserId,
};

/// Failures from the transactional entity store. Opaque to callers; the
/// orchestrator logs the detail server-side.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("storage conflict: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The transactional store the orchestrator builds the hierarchy in.
///
/// Read methods observe committed state only. `begin` opens the unit of work
/// all entity creation for one submission happens inside.
pub trait FacilityDirectory: Send + Sync {
    fn begin(&self) -> Result<Box<dyn DirectoryTransaction>, DirectoryError>;

    fn subscription_by_user(&self, user_id: &UserId)
        -> Result<Option<Subscription>, DirectoryError>;
    fn organization_by_owner(&self, owner: &UserId)
        -> Result<Option<Organization>, DirectoryError>;
    fn complex(&self, id: &EntityId) -> Result<Option<FacilityComplex>, DirectoryError>;
    /// Committed link for a complex+department pair, if one exists. Follow-up
    /// submissions reuse it instead of linking the pair again.
    fn complex_department(
        &self,
        complex_id: &EntityId,
        department_id: &EntityId,
    ) -> Result<Option<ComplexDepartment>, DirectoryError>;
    fn schedule_for(&self, scope: &ScopeRef) -> Result<Option<ScheduleRecord>, DirectoryError>;
    /// Every persisted entity id, for resolving cross-references in
    /// incremental submissions.
    fn known_ids(&self) -> Result<HashSet<EntityId>, DirectoryError>;
}

/// Unit of work covering one onboarding submission. Writes are staged; nothing
/// is visible until `commit`. Dropping the handle without committing aborts,
/// leaving the store untouched.
pub trait DirectoryTransaction: Send {
    fn create_subscription(
        &mut self,
        user_id: &UserId,
        plan: PlanType,
    ) -> Result<Subscription, DirectoryError>;

    fn create_organization(
        &mut self,
        owner: &UserId,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Organization, DirectoryError>;

    fn update_organization(
        &mut self,
        id: &EntityId,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Organization, DirectoryError>;

    fn create_complex(
        &mut self,
        organization_id: Option<&EntityId>,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<FacilityComplex, DirectoryError>;

    fn create_department(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Department, DirectoryError>;

    fn link_complex_department(
        &mut self,
        complex_id: &EntityId,
        department_id: &EntityId,
    ) -> Result<ComplexDepartment, DirectoryError>;

    fn create_clinic(
        &mut self,
        complex_department_id: Option<&EntityId>,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Clinic, DirectoryError>;

    fn create_service(
        &mut self,
        name: &str,
        price: Option<u32>,
        duration_minutes: Option<u32>,
    ) -> Result<ServiceOffering, DirectoryError>;

    fn link_clinic_service(
        &mut self,
        clinic_id: &EntityId,
        service_id: &EntityId,
    ) -> Result<ClinicService, DirectoryError>;

    fn put_schedule(
        &mut self,
        scope: ScopeRef,
        days: Vec<DaySchedule>,
    ) -> Result<(), DirectoryError>;

    fn put_contact(&mut self, card: ContactCard) -> Result<(), DirectoryError>;

    fn put_dynamic_info(&mut self, record: DynamicInfoRecord) -> Result<(), DirectoryError>;

    fn grant_access(&mut self, grant: AccessGrant) -> Result<(), DirectoryError>;

    fn commit(self: Box<Self>) -> Result<(), DirectoryError>;
}

/// Best-effort audit event emitted after a submission commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub user_id: UserId,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeRef>,
}

/// Audit transport failure; callers log and move on, never abort.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}

/// Fire-and-forget audit hook. Failures must never affect the onboarding
/// transaction outcome.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}
