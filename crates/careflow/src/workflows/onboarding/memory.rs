//! In-memory implementations of the storage seams, used by the API service,
//! the CLI demo, and the test suites.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::domain::{
    AccessGrant, Clinic, ClinicService, ComplexDepartment, ContactCard, DaySchedule, Department,
    DynamicInfoRecord, EntityId, FacilityComplex, Organization, PlanType, ScheduleRecord, ScopeRef,
    ServiceOffering, SharedAttributes, Subscription, UserId,
};
use super::progress::{ProgressStoreError, StepProgress, StepProgressRepository};
use super::repository::{
    AuditError, AuditEvent, AuditSink, DirectoryError, DirectoryTransaction, FacilityDirectory,
};

#[derive(Debug, Default, Clone)]
struct DirectoryState {
    subscriptions: HashMap<UserId, Subscription>,
    organizations: HashMap<EntityId, Organization>,
    complexes: HashMap<EntityId, FacilityComplex>,
    departments: HashMap<EntityId, Department>,
    complex_departments: HashMap<EntityId, ComplexDepartment>,
    clinics: HashMap<EntityId, Clinic>,
    services: HashMap<EntityId, ServiceOffering>,
    clinic_services: Vec<ClinicService>,
    schedules: HashMap<ScopeRef, ScheduleRecord>,
    contacts: Vec<ContactCard>,
    dynamic_info: Vec<DynamicInfoRecord>,
    grants: Vec<AccessGrant>,
}

/// In-memory facility store with staged, all-or-nothing transactions.
///
/// Commit re-checks the owner-to-organization and user-to-subscription
/// uniqueness constraints against live state, which is what serializes
/// concurrent submissions for the same user.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
    sequence: Arc<AtomicU64>,
    fail_entity_named: Arc<Mutex<Option<String>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: the next transaction fails when asked to create an
    /// entity with this exact name. Lets tests and demos exercise rollback.
    pub fn fail_when_creating(&self, name: impl Into<String>) {
        let mut guard = self
            .fail_entity_named
            .lock()
            .expect("directory fault mutex poisoned");
        *guard = Some(name.into());
    }

    fn next_id(&self, prefix: &str) -> EntityId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        EntityId(format!("{prefix}-{id:06}"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        self.state.lock().expect("directory mutex poisoned")
    }

    pub fn organizations(&self) -> Vec<Organization> {
        self.lock().organizations.values().cloned().collect()
    }

    pub fn complexes(&self) -> Vec<FacilityComplex> {
        self.lock().complexes.values().cloned().collect()
    }

    pub fn departments(&self) -> Vec<Department> {
        self.lock().departments.values().cloned().collect()
    }

    pub fn department_links(&self) -> Vec<ComplexDepartment> {
        self.lock().complex_departments.values().cloned().collect()
    }

    pub fn clinics(&self) -> Vec<Clinic> {
        self.lock().clinics.values().cloned().collect()
    }

    pub fn services(&self) -> Vec<ServiceOffering> {
        self.lock().services.values().cloned().collect()
    }

    pub fn clinic_services(&self) -> Vec<ClinicService> {
        self.lock().clinic_services.clone()
    }

    pub fn schedules(&self) -> Vec<ScheduleRecord> {
        self.lock().schedules.values().cloned().collect()
    }

    pub fn contacts(&self) -> Vec<ContactCard> {
        self.lock().contacts.clone()
    }

    pub fn dynamic_info(&self) -> Vec<DynamicInfoRecord> {
        self.lock().dynamic_info.clone()
    }

    pub fn grants(&self) -> Vec<AccessGrant> {
        self.lock().grants.clone()
    }
}

impl FacilityDirectory for InMemoryDirectory {
    fn begin(&self) -> Result<Box<dyn DirectoryTransaction>, DirectoryError> {
        let fail_entity_named = self
            .fail_entity_named
            .lock()
            .expect("directory fault mutex poisoned")
            .clone();
        Ok(Box::new(StagedTransaction {
            directory: self.clone(),
            staged: DirectoryState::default(),
            updated_organizations: Vec::new(),
            fail_entity_named,
        }))
    }

    fn subscription_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DirectoryError> {
        Ok(self.lock().subscriptions.get(user_id).cloned())
    }

    fn organization_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Option<Organization>, DirectoryError> {
        Ok(self
            .lock()
            .organizations
            .values()
            .find(|organization| &organization.owner == owner)
            .cloned())
    }

    fn complex(&self, id: &EntityId) -> Result<Option<FacilityComplex>, DirectoryError> {
        Ok(self.lock().complexes.get(id).cloned())
    }

    fn complex_department(
        &self,
        complex_id: &EntityId,
        department_id: &EntityId,
    ) -> Result<Option<ComplexDepartment>, DirectoryError> {
        Ok(self
            .lock()
            .complex_departments
            .values()
            .find(|link| {
                &link.complex_id == complex_id && &link.department_id == department_id
            })
            .cloned())
    }

    fn schedule_for(&self, scope: &ScopeRef) -> Result<Option<ScheduleRecord>, DirectoryError> {
        Ok(self.lock().schedules.get(scope).cloned())
    }

    fn known_ids(&self) -> Result<HashSet<EntityId>, DirectoryError> {
        let state = self.lock();
        let mut ids = HashSet::new();
        ids.extend(state.organizations.keys().cloned());
        ids.extend(state.complexes.keys().cloned());
        ids.extend(state.departments.keys().cloned());
        ids.extend(state.complex_departments.keys().cloned());
        ids.extend(state.clinics.keys().cloned());
        ids.extend(state.services.keys().cloned());
        Ok(ids)
    }
}

struct StagedTransaction {
    directory: InMemoryDirectory,
    staged: DirectoryState,
    /// Ids of organizations this transaction rewrote rather than created.
    updated_organizations: Vec<EntityId>,
    fail_entity_named: Option<String>,
}

impl StagedTransaction {
    fn check_fault(&self, name: &str) -> Result<(), DirectoryError> {
        if self.fail_entity_named.as_deref() == Some(name) {
            return Err(DirectoryError::Unavailable(format!(
                "injected failure creating '{name}'"
            )));
        }
        Ok(())
    }
}

impl DirectoryTransaction for StagedTransaction {
    fn create_subscription(
        &mut self,
        user_id: &UserId,
        plan: PlanType,
    ) -> Result<Subscription, DirectoryError> {
        let subscription = Subscription {
            id: self.directory.next_id("sub"),
            user_id: user_id.clone(),
            plan_type: plan,
        };
        self.staged
            .subscriptions
            .insert(user_id.clone(), subscription.clone());
        Ok(subscription)
    }

    fn create_organization(
        &mut self,
        owner: &UserId,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Organization, DirectoryError> {
        self.check_fault(name)?;
        let organization = Organization {
            id: self.directory.next_id("org"),
            owner: owner.clone(),
            name: name.to_string(),
            attributes,
        };
        self.staged
            .organizations
            .insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    fn update_organization(
        &mut self,
        id: &EntityId,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Organization, DirectoryError> {
        self.check_fault(name)?;
        let existing = self
            .directory
            .lock()
            .organizations
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("organization {id}")))?;
        let organization = Organization {
            id: existing.id.clone(),
            owner: existing.owner,
            name: name.to_string(),
            attributes,
        };
        self.staged
            .organizations
            .insert(organization.id.clone(), organization.clone());
        self.updated_organizations.push(organization.id.clone());
        Ok(organization)
    }

    fn create_complex(
        &mut self,
        organization_id: Option<&EntityId>,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<FacilityComplex, DirectoryError> {
        self.check_fault(name)?;
        let complex = FacilityComplex {
            id: self.directory.next_id("cpx"),
            organization_id: organization_id.cloned(),
            name: name.to_string(),
            attributes,
        };
        self.staged
            .complexes
            .insert(complex.id.clone(), complex.clone());
        Ok(complex)
    }

    fn create_department(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Department, DirectoryError> {
        self.check_fault(name)?;
        let department = Department {
            id: self.directory.next_id("dep"),
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.staged
            .departments
            .insert(department.id.clone(), department.clone());
        Ok(department)
    }

    fn link_complex_department(
        &mut self,
        complex_id: &EntityId,
        department_id: &EntityId,
    ) -> Result<ComplexDepartment, DirectoryError> {
        let link = ComplexDepartment {
            id: self.directory.next_id("cpd"),
            complex_id: complex_id.clone(),
            department_id: department_id.clone(),
        };
        self.staged
            .complex_departments
            .insert(link.id.clone(), link.clone());
        Ok(link)
    }

    fn create_clinic(
        &mut self,
        complex_department_id: Option<&EntityId>,
        name: &str,
        attributes: SharedAttributes,
    ) -> Result<Clinic, DirectoryError> {
        self.check_fault(name)?;
        let clinic = Clinic {
            id: self.directory.next_id("cln"),
            complex_department_id: complex_department_id.cloned(),
            name: name.to_string(),
            attributes,
        };
        self.staged.clinics.insert(clinic.id.clone(), clinic.clone());
        Ok(clinic)
    }

    fn create_service(
        &mut self,
        name: &str,
        price: Option<u32>,
        duration_minutes: Option<u32>,
    ) -> Result<ServiceOffering, DirectoryError> {
        self.check_fault(name)?;
        let service = ServiceOffering {
            id: self.directory.next_id("svc"),
            name: name.to_string(),
            price,
            duration_minutes,
        };
        self.staged
            .services
            .insert(service.id.clone(), service.clone());
        Ok(service)
    }

    fn link_clinic_service(
        &mut self,
        clinic_id: &EntityId,
        service_id: &EntityId,
    ) -> Result<ClinicService, DirectoryError> {
        let link = ClinicService {
            id: self.directory.next_id("cls"),
            clinic_id: clinic_id.clone(),
            service_id: service_id.clone(),
        };
        self.staged.clinic_services.push(link.clone());
        Ok(link)
    }

    fn put_schedule(
        &mut self,
        scope: ScopeRef,
        days: Vec<DaySchedule>,
    ) -> Result<(), DirectoryError> {
        self.staged
            .schedules
            .insert(scope.clone(), ScheduleRecord { scope, days });
        Ok(())
    }

    fn put_contact(&mut self, card: ContactCard) -> Result<(), DirectoryError> {
        self.staged.contacts.push(card);
        Ok(())
    }

    fn put_dynamic_info(&mut self, record: DynamicInfoRecord) -> Result<(), DirectoryError> {
        self.staged.dynamic_info.push(record);
        Ok(())
    }

    fn grant_access(&mut self, grant: AccessGrant) -> Result<(), DirectoryError> {
        self.staged.grants.push(grant);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), DirectoryError> {
        let StagedTransaction {
            directory,
            staged,
            updated_organizations,
            ..
        } = *self;

        let mut state = directory.lock();

        // Uniqueness constraints are enforced at commit against live state so
        // a racing submission for the same user cannot create duplicates.
        for user_id in staged.subscriptions.keys() {
            if state.subscriptions.contains_key(user_id) {
                return Err(DirectoryError::Conflict(format!(
                    "subscription already exists for user {user_id}"
                )));
            }
        }
        for organization in staged.organizations.values() {
            if updated_organizations.contains(&organization.id) {
                continue;
            }
            let duplicate = state
                .organizations
                .values()
                .any(|existing| existing.owner == organization.owner);
            if duplicate {
                return Err(DirectoryError::Conflict(format!(
                    "organization already exists for user {}",
                    organization.owner
                )));
            }
        }

        state.subscriptions.extend(staged.subscriptions);
        state.organizations.extend(staged.organizations);
        state.complexes.extend(staged.complexes);
        state.departments.extend(staged.departments);
        state.complex_departments.extend(staged.complex_departments);
        state.clinics.extend(staged.clinics);
        state.services.extend(staged.services);
        state.clinic_services.extend(staged.clinic_services);
        state.schedules.extend(staged.schedules);
        state.contacts.extend(staged.contacts);
        state.dynamic_info.extend(staged.dynamic_info);
        state.grants.extend(staged.grants);

        Ok(())
    }
}

/// In-memory step-progress store backing the tracker's read-through cache.
#[derive(Default)]
pub struct InMemoryProgressRepository {
    records: Mutex<HashMap<UserId, StepProgress>>,
    loads: AtomicU64,
}

impl InMemoryProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of load calls served, so tests can observe cache behavior.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl StepProgressRepository for InMemoryProgressRepository {
    fn load(&self, user_id: &UserId) -> Result<Option<StepProgress>, ProgressStoreError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let guard = self.records.lock().expect("progress mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    fn save(&self, progress: &StepProgress) -> Result<(), ProgressStoreError> {
        let mut guard = self.records.lock().expect("progress mutex poisoned");
        guard.insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }
}

/// Audit sink that records events in memory; can be flipped into a failing
/// mode to prove audit failures never abort onboarding.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(AuditError::Transport("audit sink offline".to_string()));
        }
        let mut guard = self.events.lock().expect("audit mutex poisoned");
        guard.push(event);
        Ok(())
    }
}
