use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Subscription tier determining which entities may be created and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Company,
    Complex,
    Clinic,
}

impl PlanType {
    pub const fn label(self) -> &'static str {
        match self {
            PlanType::Company => "company",
            PlanType::Complex => "complex",
            PlanType::Clinic => "clinic",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a caller submits a plan label outside the supported tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid plan type: {0}")]
pub struct InvalidPlanType(pub String);

impl FromStr for PlanType {
    type Err = InvalidPlanType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "company" => Ok(PlanType::Company),
            "complex" => Ok(PlanType::Complex),
            "clinic" => Ok(PlanType::Clinic),
            other => Err(InvalidPlanType(other.to_string())),
        }
    }
}

/// Identifier wrapper for subscriber accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper shared by drafts (client-local references) and persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The entity kinds the hierarchy is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Complex,
    Department,
    Clinic,
    Service,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Complex => "complex",
            EntityKind::Department => "department",
            EntityKind::Clinic => "clinic",
            EntityKind::Service => "service",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scope handle identifying one persisted entity for schedules, contacts, and access grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl ScopeRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

/// Access level granted on a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Owner,
    Staff,
}

impl AccessRole {
    pub const fn label(self) -> &'static str {
        match self {
            AccessRole::Owner => "owner",
            AccessRole::Staff => "staff",
        }
    }
}

/// The attribute names the inheritance resolver recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeField {
    Logo,
    Website,
    YearEstablished,
    Mission,
    Vision,
    Overview,
    Goals,
    CeoName,
    Email,
    PhoneNumbers,
    Address,
    EmergencyContact,
    SocialLinks,
    VatNumber,
    CrNumber,
}

/// Shared attribute bag that parents pass down the hierarchy.
///
/// `None` means the field was never set and may inherit; `Some` values are kept
/// as-is, including explicitly emptied strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_established: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cr_number: Option<String>,
}

/// Per-step directive controlling which fields the resolver may copy down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InheritanceSettings {
    /// Never inherit these fields; the child value stands even when empty.
    #[serde(default)]
    pub fields_to_override: Vec<AttributeField>,
    /// When present, only these fields are eligible to inherit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_to_inherit: Option<Vec<AttributeField>>,
}

/// Days of the week as schedules name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const fn label(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serde helpers for `HH:MM` clock values on schedule payloads.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .map_err(|err| format!("failed to parse '{raw}' as HH:MM ({err})"))
    }

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        opt.map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Working interval, rendered as `HH:MM-HH:MM` in violation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "time_range_field")]
    pub start: NaiveTime,
    #[serde(with = "time_range_field")]
    pub end: NaiveTime,
}

mod time_range_field {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(super::hhmm::FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::hhmm::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(hhmm::FORMAT),
            self.end.format(hhmm::FORMAT)
        )
    }
}

/// One day's working hours for a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day_of_week: DayOfWeek,
    pub is_working_day: bool,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub opening_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub closing_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub break_start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub break_end_time: Option<NaiveTime>,
}

impl DaySchedule {
    /// The active interval, available once opening and closing are both set.
    pub fn working_range(&self) -> Option<TimeRange> {
        match (self.opening_time, self.closing_time) {
            (Some(start), Some(end)) => Some(TimeRange::new(start, end)),
            _ => None,
        }
    }

    pub fn break_range(&self) -> Option<TimeRange> {
        match (self.break_start_time, self.break_end_time) {
            (Some(start), Some(end)) => Some(TimeRange::new(start, end)),
            _ => None,
        }
    }
}

/// Draft organization as submitted during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationDraft {
    /// Client-local reference other drafts use to point at this entity.
    pub reference: EntityId,
    pub name: String,
    #[serde(default)]
    pub attributes: SharedAttributes,
}

/// Draft complex; may sit under an organization or stand alone (complex plan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexDraft {
    pub reference: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<EntityId>,
    /// Department references this complex offers.
    #[serde(default)]
    pub departments: Vec<EntityId>,
    #[serde(default)]
    pub attributes: SharedAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<InheritanceSettings>,
    #[serde(default)]
    pub schedule: Vec<DaySchedule>,
}

/// Draft department (a medical specialty offered by complexes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentDraft {
    pub reference: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Draft clinic; under a company/complex plan it points at a complex + department pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicDraft {
    pub reference: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<EntityId>,
    #[serde(default)]
    pub attributes: SharedAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<InheritanceSettings>,
    #[serde(default)]
    pub schedule: Vec<DaySchedule>,
}

/// Draft service offered by one or more clinics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub reference: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub clinics: Vec<EntityId>,
}

/// The full multi-entity submission the orchestrator commits atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingPayload {
    pub user_id: UserId,
    /// Raw plan label; parsed fail-closed during validation.
    pub plan_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationDraft>,
    #[serde(default)]
    pub complexes: Vec<ComplexDraft>,
    #[serde(default)]
    pub departments: Vec<DepartmentDraft>,
    #[serde(default)]
    pub clinics: Vec<ClinicDraft>,
    #[serde(default)]
    pub services: Vec<ServiceDraft>,
}

impl OnboardingPayload {
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            organizations: usize::from(self.organization.is_some()),
            complexes: self.complexes.len(),
            departments: self.departments.len(),
            clinics: self.clinics.len(),
            services: self.services.len(),
        }
    }
}

/// Proposed entity counts checked against a plan's limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub organizations: usize,
    pub complexes: usize,
    pub departments: usize,
    pub clinics: usize,
    pub services: usize,
}

impl EntityCounts {
    pub fn of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Organization => self.organizations,
            EntityKind::Complex => self.complexes,
            EntityKind::Department => self.departments,
            EntityKind::Clinic => self.clinics,
            EntityKind::Service => self.services,
        }
    }
}

/// Field-scoped validation finding surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Persisted subscription tying a user to a plan tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: EntityId,
    pub user_id: UserId,
    pub plan_type: PlanType,
}

/// Persisted organization record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: EntityId,
    pub owner: UserId,
    pub name: String,
    pub attributes: SharedAttributes,
}

/// Persisted complex record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityComplex {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<EntityId>,
    pub name: String,
    pub attributes: SharedAttributes,
}

/// Persisted department record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Link record placing a department inside a complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexDepartment {
    pub id: EntityId,
    pub complex_id: EntityId,
    pub department_id: EntityId,
}

/// Persisted clinic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex_department_id: Option<EntityId>,
    pub name: String,
    pub attributes: SharedAttributes,
}

/// Persisted service offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Link record attaching a service to a clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicService {
    pub id: EntityId,
    pub clinic_id: EntityId,
    pub service_id: EntityId,
}

/// Persisted working-hours record scoped to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub scope: ScopeRef,
    pub days: Vec<DaySchedule>,
}

/// Contact card split out of the shared attribute bag at persistence time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactCard {
    pub scope: ScopeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

impl ContactCard {
    /// Lift the contact-shaped fields out of an entity's effective attributes.
    pub fn from_attributes(scope: ScopeRef, attributes: &SharedAttributes) -> Self {
        Self {
            scope,
            email: attributes.email.clone(),
            phone_numbers: attributes.phone_numbers.clone().unwrap_or_default(),
            address: attributes.address.clone(),
            emergency_contact: attributes.emergency_contact.clone(),
            social_links: attributes.social_links.clone().unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone_numbers.is_empty()
            && self.address.is_none()
            && self.emergency_contact.is_none()
            && self.social_links.is_empty()
    }
}

/// Free-form supporting record (legal registration numbers and similar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicInfoRecord {
    pub scope: ScopeRef,
    pub key: String,
    pub value: String,
}

/// Owner-level grant on a created entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub user_id: UserId,
    pub scope: ScopeRef,
    pub role: AccessRole,
}

/// Everything one successful orchestration created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreatedEntities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    pub complexes: Vec<FacilityComplex>,
    pub departments: Vec<Department>,
    pub department_links: Vec<ComplexDepartment>,
    pub clinics: Vec<Clinic>,
    pub services: Vec<ServiceOffering>,
}

/// Outcome of one orchestration attempt. Not persisted; the persisted effect is
/// the entity graph plus the step-progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingResult {
    pub success: bool,
    pub user_id: UserId,
    pub subscription_id: EntityId,
    pub entities: CreatedEntities,
    pub errors: Vec<ValidationIssue>,
}
