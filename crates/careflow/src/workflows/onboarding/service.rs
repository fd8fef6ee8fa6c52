use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    AccessGrant, AccessRole, ClinicDraft, ContactCard, CreatedEntities, DaySchedule,
    DynamicInfoRecord, EntityId, EntityKind, OnboardingPayload, OnboardingResult, PlanType,
    ScopeRef, SharedAttributes, UserId, ValidationIssue,
};
use super::hierarchy;
use super::inheritance;
use super::plan::{self, CreationStage, PlanRules};
use super::progress::{
    EntityIds, OnboardingStep, ProgressError, ProgressTracker, StepProgress,
    StepProgressRepository,
};
use super::repository::{
    AuditEvent, AuditSink, DirectoryError, DirectoryTransaction, FacilityDirectory,
};
use super::schedule::{self, ScheduleViolation};

/// Full list of violations found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation issue(s)", self.issues.len())
    }
}

/// Error taxonomy for the orchestrator: validation failures surface the full
/// report to the caller; everything else is an internal failure that aborted
/// the transaction.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("onboarding payload failed validation: {0}")]
    Validation(ValidationReport),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Top-level coordinator: validates a submission, then builds the whole
/// entity graph inside one unit of work that commits or aborts as a whole.
pub struct OnboardingService<D, P, A> {
    directory: Arc<D>,
    tracker: ProgressTracker<P>,
    audit: Arc<A>,
}

impl<D, P, A> OnboardingService<D, P, A>
where
    D: FacilityDirectory,
    P: StepProgressRepository,
    A: AuditSink,
{
    pub fn new(directory: Arc<D>, progress: Arc<P>, audit: Arc<A>) -> Self {
        Self {
            directory,
            tracker: ProgressTracker::new(progress),
            audit,
        }
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Validate a submission without touching storage state. Returns the
    /// parsed plan when the payload is clean, otherwise the full report.
    pub fn validate(&self, payload: &OnboardingPayload) -> Result<PlanType, OnboardingError> {
        let mut issues = Vec::new();

        let plan = match PlanType::from_str(&payload.plan_type) {
            Ok(plan) => Some(plan),
            Err(err) => {
                issues.push(ValidationIssue::new("plan_type", err.to_string()));
                None
            }
        };

        let limit_check = plan::validate_limits(&payload.plan_type, &payload.counts());
        if plan.is_some() {
            // The invalid-plan error is already reported once above.
            issues.extend(limit_check.errors);
        }

        if let Some(plan) = plan {
            issues.extend(hierarchy::validate_hierarchy(plan, payload));
        }

        let persisted = self.directory.known_ids()?;
        issues.extend(hierarchy::validate_relationships(payload, &persisted));

        issues.extend(self.validate_schedules(payload)?);

        match (plan, issues.is_empty()) {
            (Some(plan), true) => Ok(plan),
            _ => Err(OnboardingError::Validation(ValidationReport { issues })),
        }
    }

    fn validate_schedules(
        &self,
        payload: &OnboardingPayload,
    ) -> Result<Vec<ValidationIssue>, DirectoryError> {
        let mut issues = Vec::new();

        for (index, complex) in payload.complexes.iter().enumerate() {
            let violations = schedule::validate_day_schedules(&complex.schedule, &complex.name);
            push_schedule_issues(
                &mut issues,
                format!("complexes[{index}].schedule"),
                violations,
            );
        }

        for (index, clinic) in payload.clinics.iter().enumerate() {
            let field = format!("clinics[{index}].schedule");
            let violations = schedule::validate_day_schedules(&clinic.schedule, &clinic.name);
            push_schedule_issues(&mut issues, field.clone(), violations);

            if clinic.schedule.is_empty() {
                continue;
            }

            if let Some((parent_label, parent_days)) = self.parent_schedule(payload, clinic)? {
                let check = schedule::validate_against_parent(
                    &clinic.schedule,
                    &parent_days,
                    &parent_label,
                    &clinic.name,
                );
                push_schedule_issues(&mut issues, field, check.violations);
            }
        }

        Ok(issues)
    }

    /// Locate the schedule of a clinic's parent complex, either in the same
    /// submission or already persisted.
    fn parent_schedule(
        &self,
        payload: &OnboardingPayload,
        clinic: &ClinicDraft,
    ) -> Result<Option<(String, Vec<DaySchedule>)>, DirectoryError> {
        let complex_ref = match &clinic.complex {
            Some(complex_ref) => complex_ref,
            None => return Ok(None),
        };

        if let Some(draft) = payload
            .complexes
            .iter()
            .find(|draft| &draft.reference == complex_ref)
        {
            if draft.schedule.is_empty() {
                return Ok(None);
            }
            return Ok(Some((draft.name.clone(), draft.schedule.clone())));
        }

        let scope = ScopeRef::new(EntityKind::Complex, complex_ref.clone());
        let record = self.directory.schedule_for(&scope)?;
        let label = match self.directory.complex(complex_ref)? {
            Some(complex) => complex.name,
            None => format!("complex {complex_ref}"),
        };
        Ok(record.map(|record| (label, record.days)))
    }

    /// Run the whole onboarding submission: validate, then create the entity
    /// graph, schedules, contacts, and access grants atomically. The plan's
    /// `creation_order` table dictates the stage sequence; each stage reads
    /// only identities earlier stages resolved.
    pub fn complete_onboarding(
        &self,
        payload: &OnboardingPayload,
    ) -> Result<OnboardingResult, OnboardingError> {
        let plan = self.validate(payload)?;
        let rules = PlanRules::for_plan(plan);

        let mut subscription = self.directory.subscription_by_user(&payload.user_id)?;
        let existing_organization = self.directory.organization_by_owner(&payload.user_id)?;

        let mut tx = self.directory.begin()?;

        let mut created = CreatedEntities::default();
        // Client-local draft references mapped to persisted identities.
        let mut identities: HashMap<EntityId, EntityId> = HashMap::new();
        // Complex+department pairs linked (or reused) in this submission.
        let mut links: HashMap<(EntityId, EntityId), EntityId> = HashMap::new();

        for stage in rules.creation_order {
            match stage {
                CreationStage::Subscription => {
                    if subscription.is_none() {
                        subscription = Some(tx.create_subscription(&payload.user_id, plan)?);
                    }
                }
                CreationStage::Organization => {
                    if let Some(draft) = &payload.organization {
                        let organization = match &existing_organization {
                            // Resubmission recovery: the owner already has an
                            // organization, so this is an update, never a
                            // duplicate.
                            Some(existing) => tx.update_organization(
                                &existing.id,
                                &draft.name,
                                draft.attributes.clone(),
                            )?,
                            None => tx.create_organization(
                                &payload.user_id,
                                &draft.name,
                                draft.attributes.clone(),
                            )?,
                        };
                        identities.insert(draft.reference.clone(), organization.id.clone());
                        created.organization = Some(organization);
                    }
                }
                CreationStage::Complex => {
                    for draft in &payload.complexes {
                        let attributes = match &created.organization {
                            Some(parent) => inheritance::inherit(
                                &parent.attributes,
                                draft.attributes.clone(),
                                draft.inheritance.as_ref(),
                            ),
                            None => draft.attributes.clone(),
                        };
                        let organization_id = draft
                            .organization
                            .as_ref()
                            .map(|reference| resolve(&identities, reference));
                        let complex =
                            tx.create_complex(organization_id.as_ref(), &draft.name, attributes)?;
                        identities.insert(draft.reference.clone(), complex.id.clone());
                        created.complexes.push(complex);
                    }
                }
                CreationStage::Department => {
                    for draft in &payload.departments {
                        let department =
                            tx.create_department(&draft.name, draft.description.as_deref())?;
                        identities.insert(draft.reference.clone(), department.id.clone());
                        created.departments.push(department);
                    }
                }
                CreationStage::ComplexDepartment => {
                    for draft in &payload.complexes {
                        let complex_id = resolve(&identities, &draft.reference);
                        for department_ref in &draft.departments {
                            let department_id = resolve(&identities, department_ref);
                            self.resolve_department_link(
                                tx.as_mut(),
                                &mut links,
                                &mut created,
                                complex_id.clone(),
                                department_id,
                            )?;
                        }
                    }
                }
                CreationStage::Clinic => {
                    for draft in &payload.clinics {
                        let parent_attributes =
                            self.clinic_parent_attributes(&created, &identities, draft)?;
                        let attributes = match &parent_attributes {
                            Some(parent) => inheritance::inherit(
                                parent,
                                draft.attributes.clone(),
                                draft.inheritance.as_ref(),
                            ),
                            None => draft.attributes.clone(),
                        };

                        let complex_department_id = match (&draft.complex, &draft.department) {
                            (Some(complex_ref), Some(department_ref)) => {
                                let complex_id = resolve(&identities, complex_ref);
                                let department_id = resolve(&identities, department_ref);
                                Some(self.resolve_department_link(
                                    tx.as_mut(),
                                    &mut links,
                                    &mut created,
                                    complex_id,
                                    department_id,
                                )?)
                            }
                            _ => None,
                        };

                        let clinic = tx.create_clinic(
                            complex_department_id.as_ref(),
                            &draft.name,
                            attributes,
                        )?;
                        identities.insert(draft.reference.clone(), clinic.id.clone());
                        created.clinics.push(clinic);
                    }
                }
                CreationStage::Service => {
                    for draft in &payload.services {
                        let service =
                            tx.create_service(&draft.name, draft.price, draft.duration_minutes)?;
                        identities.insert(draft.reference.clone(), service.id.clone());
                        created.services.push(service);
                    }
                }
                CreationStage::ClinicService => {
                    for draft in &payload.services {
                        let service_id = resolve(&identities, &draft.reference);
                        for clinic_ref in &draft.clinics {
                            let clinic_id = resolve(&identities, clinic_ref);
                            tx.link_clinic_service(&clinic_id, &service_id)?;
                        }
                    }
                }
                CreationStage::WorkingHours => {
                    for draft in &payload.complexes {
                        if draft.schedule.is_empty() {
                            continue;
                        }
                        let scope = ScopeRef::new(
                            EntityKind::Complex,
                            resolve(&identities, &draft.reference),
                        );
                        tx.put_schedule(scope, draft.schedule.clone())?;
                    }
                    for draft in &payload.clinics {
                        if draft.schedule.is_empty() {
                            continue;
                        }
                        let scope = ScopeRef::new(
                            EntityKind::Clinic,
                            resolve(&identities, &draft.reference),
                        );
                        tx.put_schedule(scope, draft.schedule.clone())?;
                    }
                }
                CreationStage::Contact => self.persist_contacts(tx.as_mut(), &created)?,
                CreationStage::DynamicInfo => self.persist_dynamic_info(tx.as_mut(), &created)?,
                CreationStage::UserAccess => {
                    self.grant_owner_access(tx.as_mut(), &payload.user_id, &created)?
                }
            }
        }

        // Every plan table opens with the subscription stage.
        let subscription = subscription.ok_or_else(|| {
            DirectoryError::Unavailable("subscription stage absent from creation order".to_string())
        })?;

        tx.commit()?;

        let entity_ids = EntityIds {
            organization_id: created.organization.as_ref().map(|org| org.id.clone()),
            complex_id: created.complexes.first().map(|complex| complex.id.clone()),
            clinic_id: created.clinics.first().map(|clinic| clinic.id.clone()),
        };
        self.tracker
            .complete_all(&payload.user_id, plan, entity_ids)?;

        let audit_scope = created
            .organization
            .as_ref()
            .map(|org| ScopeRef::new(EntityKind::Organization, org.id.clone()));
        self.emit_audit(&payload.user_id, "onboarding.completed", audit_scope);

        info!(user = %payload.user_id, plan = %plan, "onboarding committed");

        Ok(OnboardingResult {
            success: true,
            user_id: payload.user_id.clone(),
            subscription_id: subscription.id,
            entities: created,
            errors: Vec::new(),
        })
    }

    /// Nearest already-created ancestor a clinic inherits from.
    fn clinic_parent_attributes(
        &self,
        created: &CreatedEntities,
        identities: &HashMap<EntityId, EntityId>,
        draft: &ClinicDraft,
    ) -> Result<Option<SharedAttributes>, DirectoryError> {
        let complex_ref = match &draft.complex {
            Some(complex_ref) => complex_ref,
            None => return Ok(None),
        };
        let complex_id = resolve(identities, complex_ref);

        if let Some(complex) = created
            .complexes
            .iter()
            .find(|complex| complex.id == complex_id)
        {
            return Ok(Some(complex.attributes.clone()));
        }

        Ok(self
            .directory
            .complex(&complex_id)?
            .map(|complex| complex.attributes))
    }

    /// Link id for a clinic's complex+department pair: first one staged in
    /// this submission, then one already committed, and only then a new link.
    fn resolve_department_link(
        &self,
        tx: &mut dyn DirectoryTransaction,
        links: &mut HashMap<(EntityId, EntityId), EntityId>,
        created: &mut CreatedEntities,
        complex_id: EntityId,
        department_id: EntityId,
    ) -> Result<EntityId, DirectoryError> {
        let key = (complex_id, department_id);
        if let Some(link_id) = links.get(&key) {
            return Ok(link_id.clone());
        }
        if let Some(link) = self.directory.complex_department(&key.0, &key.1)? {
            links.insert(key, link.id.clone());
            return Ok(link.id);
        }
        let link = tx.link_complex_department(&key.0, &key.1)?;
        let link_id = link.id.clone();
        links.insert(key, link_id.clone());
        created.department_links.push(link);
        Ok(link_id)
    }

    fn persist_contacts(
        &self,
        tx: &mut dyn DirectoryTransaction,
        created: &CreatedEntities,
    ) -> Result<(), DirectoryError> {
        for (scope, attributes) in scoped_attributes(created) {
            let card = ContactCard::from_attributes(scope, attributes);
            if !card.is_empty() {
                tx.put_contact(card)?;
            }
        }
        Ok(())
    }

    fn persist_dynamic_info(
        &self,
        tx: &mut dyn DirectoryTransaction,
        created: &CreatedEntities,
    ) -> Result<(), DirectoryError> {
        for (scope, attributes) in scoped_attributes(created) {
            if let Some(vat) = &attributes.vat_number {
                tx.put_dynamic_info(DynamicInfoRecord {
                    scope: scope.clone(),
                    key: "vat_number".to_string(),
                    value: vat.clone(),
                })?;
            }
            if let Some(cr) = &attributes.cr_number {
                tx.put_dynamic_info(DynamicInfoRecord {
                    scope,
                    key: "cr_number".to_string(),
                    value: cr.clone(),
                })?;
            }
        }
        Ok(())
    }

    fn grant_owner_access(
        &self,
        tx: &mut dyn DirectoryTransaction,
        user_id: &UserId,
        created: &CreatedEntities,
    ) -> Result<(), DirectoryError> {
        let mut scopes: Vec<ScopeRef> = Vec::new();
        if let Some(organization) = &created.organization {
            scopes.push(ScopeRef::new(
                EntityKind::Organization,
                organization.id.clone(),
            ));
        }
        scopes.extend(
            created
                .complexes
                .iter()
                .map(|complex| ScopeRef::new(EntityKind::Complex, complex.id.clone())),
        );
        scopes.extend(
            created
                .departments
                .iter()
                .map(|department| ScopeRef::new(EntityKind::Department, department.id.clone())),
        );
        scopes.extend(
            created
                .clinics
                .iter()
                .map(|clinic| ScopeRef::new(EntityKind::Clinic, clinic.id.clone())),
        );
        scopes.extend(
            created
                .services
                .iter()
                .map(|service| ScopeRef::new(EntityKind::Service, service.id.clone())),
        );

        for scope in scopes {
            tx.grant_access(AccessGrant {
                user_id: user_id.clone(),
                scope,
                role: AccessRole::Owner,
            })?;
        }

        Ok(())
    }

    fn emit_audit(&self, user_id: &UserId, action: &str, scope: Option<ScopeRef>) {
        let event = AuditEvent {
            user_id: user_id.clone(),
            action: action.to_string(),
            scope,
        };
        if let Err(err) = self.audit.record(event) {
            warn!(user = %user_id, error = %err, "audit event dropped");
        }
    }

    // --- step progress passthroughs -------------------------------------

    pub fn progress(&self, user_id: &UserId) -> Result<Option<StepProgress>, ProgressError> {
        self.tracker.progress(user_id)
    }

    pub fn mark_step_complete(
        &self,
        user_id: &UserId,
        plan: PlanType,
        step: OnboardingStep,
    ) -> Result<StepProgress, ProgressError> {
        let progress = self.tracker.mark_step_complete(user_id, plan, step)?;
        self.emit_audit(user_id, &format!("onboarding.step.{step}"), None);
        Ok(progress)
    }

    pub fn skip_current_step(&self, user_id: &UserId) -> Result<StepProgress, ProgressError> {
        self.tracker.skip_current_step(user_id)
    }
}

/// Attribute-bearing scopes of a submission, in parent-first order.
fn scoped_attributes(created: &CreatedEntities) -> Vec<(ScopeRef, &SharedAttributes)> {
    let mut scoped: Vec<(ScopeRef, &SharedAttributes)> = Vec::new();
    if let Some(organization) = &created.organization {
        scoped.push((
            ScopeRef::new(EntityKind::Organization, organization.id.clone()),
            &organization.attributes,
        ));
    }
    for complex in &created.complexes {
        scoped.push((
            ScopeRef::new(EntityKind::Complex, complex.id.clone()),
            &complex.attributes,
        ));
    }
    for clinic in &created.clinics {
        scoped.push((
            ScopeRef::new(EntityKind::Clinic, clinic.id.clone()),
            &clinic.attributes,
        ));
    }
    scoped
}

fn resolve(identities: &HashMap<EntityId, EntityId>, reference: &EntityId) -> EntityId {
    identities
        .get(reference)
        .cloned()
        .unwrap_or_else(|| reference.clone())
}

fn push_schedule_issues(
    issues: &mut Vec<ValidationIssue>,
    field: String,
    violations: Vec<ScheduleViolation>,
) {
    for violation in violations {
        let message = match violation.suggested_range {
            Some(range) => format!("{} (suggested range {range})", violation.message),
            None => violation.message,
        };
        issues.push(ValidationIssue::new(field.clone(), message));
    }
}
