use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::domain::{EntityId, PlanType, UserId};
use super::plan::PlanRules;

/// Onboarding steps across all plan tiers; each plan walks a suffix of the
/// company sequence. `Completed` is the terminal state, not a walkable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    OrganizationOverview,
    OrganizationContact,
    OrganizationLegal,
    ComplexOverview,
    ComplexContact,
    ComplexLegal,
    ComplexSchedule,
    ClinicOverview,
    ClinicContact,
    ClinicLegal,
    ClinicSchedule,
    Completed,
}

impl OnboardingStep {
    pub const fn label(self) -> &'static str {
        match self {
            OnboardingStep::OrganizationOverview => "organization-overview",
            OnboardingStep::OrganizationContact => "organization-contact",
            OnboardingStep::OrganizationLegal => "organization-legal",
            OnboardingStep::ComplexOverview => "complex-overview",
            OnboardingStep::ComplexContact => "complex-contact",
            OnboardingStep::ComplexLegal => "complex-legal",
            OnboardingStep::ComplexSchedule => "complex-schedule",
            OnboardingStep::ClinicOverview => "clinic-overview",
            OnboardingStep::ClinicContact => "clinic-contact",
            OnboardingStep::ClinicLegal => "clinic-legal",
            OnboardingStep::ClinicSchedule => "clinic-schedule",
            OnboardingStep::Completed => "completed",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a path or payload names a step label that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown onboarding step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for OnboardingStep {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "organization-overview" => Ok(OnboardingStep::OrganizationOverview),
            "organization-contact" => Ok(OnboardingStep::OrganizationContact),
            "organization-legal" => Ok(OnboardingStep::OrganizationLegal),
            "complex-overview" => Ok(OnboardingStep::ComplexOverview),
            "complex-contact" => Ok(OnboardingStep::ComplexContact),
            "complex-legal" => Ok(OnboardingStep::ComplexLegal),
            "complex-schedule" => Ok(OnboardingStep::ComplexSchedule),
            "clinic-overview" => Ok(OnboardingStep::ClinicOverview),
            "clinic-contact" => Ok(OnboardingStep::ClinicContact),
            "clinic-legal" => Ok(OnboardingStep::ClinicLegal),
            "clinic-schedule" => Ok(OnboardingStep::ClinicSchedule),
            "completed" => Ok(OnboardingStep::Completed),
            other => Err(UnknownStep(other.to_string())),
        }
    }
}

/// Entity identities captured as the steps that create them complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<EntityId>,
}

impl EntityIds {
    fn merge(&mut self, other: EntityIds) {
        if other.organization_id.is_some() {
            self.organization_id = other.organization_id;
        }
        if other.complex_id.is_some() {
            self.complex_id = other.complex_id;
        }
        if other.clinic_id.is_some() {
            self.clinic_id = other.clinic_id;
        }
    }
}

/// Per-user onboarding progress. `completed_steps` is an append-only log;
/// the current step is always derived from the plan's sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub completed_steps: Vec<OnboardingStep>,
    #[serde(default)]
    pub entity_ids: EntityIds,
}

impl StepProgress {
    pub fn new(user_id: UserId, plan_type: PlanType) -> Self {
        Self {
            user_id,
            plan_type,
            completed_steps: Vec::new(),
            entity_ids: EntityIds::default(),
        }
    }

    /// First not-yet-completed step in the plan's sequence, or `Completed`.
    pub fn current_step(&self) -> OnboardingStep {
        PlanRules::for_plan(self.plan_type)
            .step_sequence()
            .find(|step| !self.completed_steps.contains(step))
            .unwrap_or(OnboardingStep::Completed)
    }

    pub fn is_completed(&self) -> bool {
        self.current_step() == OnboardingStep::Completed
    }

    fn record(&mut self, step: OnboardingStep) {
        if !self.completed_steps.contains(&step) {
            self.completed_steps.push(step);
        }
    }

    pub fn view(&self) -> StepProgressView {
        StepProgressView {
            user_id: self.user_id.clone(),
            plan_type: self.plan_type,
            current_step: self.current_step(),
            completed_steps: self.completed_steps.clone(),
            entity_ids: self.entity_ids.clone(),
        }
    }
}

/// Caller-facing projection with the derived current step included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepProgressView {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub current_step: OnboardingStep,
    pub completed_steps: Vec<OnboardingStep>,
    pub entity_ids: EntityIds,
}

/// Storage failures from the progress record store.
#[derive(Debug, thiserror::Error)]
pub enum ProgressStoreError {
    #[error("progress store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for progress records; the tracker fronts it with a cache.
pub trait StepProgressRepository: Send + Sync {
    fn load(&self, user_id: &UserId) -> Result<Option<StepProgress>, ProgressStoreError>;
    fn save(&self, progress: &StepProgress) -> Result<(), ProgressStoreError>;
}

/// Errors raised by step transitions.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("onboarding has not started for user {0}")]
    NotStarted(UserId),
    #[error("onboarding is already completed for user {0}")]
    AlreadyCompleted(UserId),
    #[error("step {step} is not part of the {plan} plan")]
    StepNotInPlan { plan: PlanType, step: OnboardingStep },
    #[error("step {0} cannot be skipped on this plan")]
    SkipNotAllowed(OnboardingStep),
    #[error(transparent)]
    Store(#[from] ProgressStoreError),
}

/// Read-through cache over the persisted progress record.
///
/// The repository is the single source of truth; every write lands there
/// first and the cache entry is replaced from the written record.
pub struct ProgressTracker<P> {
    repository: Arc<P>,
    cache: Mutex<HashMap<UserId, StepProgress>>,
}

impl<P> ProgressTracker<P>
where
    P: StepProgressRepository,
{
    pub fn new(repository: Arc<P>) -> Self {
        Self {
            repository,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a user's progress, if onboarding has started.
    pub fn progress(&self, user_id: &UserId) -> Result<Option<StepProgress>, ProgressError> {
        {
            let cache = self.cache.lock().expect("progress cache poisoned");
            if let Some(progress) = cache.get(user_id) {
                return Ok(Some(progress.clone()));
            }
        }

        let loaded = self.repository.load(user_id)?;
        if let Some(progress) = &loaded {
            let mut cache = self.cache.lock().expect("progress cache poisoned");
            cache.insert(user_id.clone(), progress.clone());
        }
        Ok(loaded)
    }

    /// Fetch-or-create the record for a user's first onboarding interaction.
    pub fn start(&self, user_id: &UserId, plan: PlanType) -> Result<StepProgress, ProgressError> {
        if let Some(existing) = self.progress(user_id)? {
            return Ok(existing);
        }
        let progress = StepProgress::new(user_id.clone(), plan);
        self.persist(&progress)?;
        Ok(progress)
    }

    /// Append one completed step. Transitions are monotonic and stop at the
    /// terminal state.
    pub fn mark_step_complete(
        &self,
        user_id: &UserId,
        plan: PlanType,
        step: OnboardingStep,
    ) -> Result<StepProgress, ProgressError> {
        let mut progress = self.start(user_id, plan)?;

        if progress.is_completed() {
            return Err(ProgressError::AlreadyCompleted(user_id.clone()));
        }

        let rules = PlanRules::for_plan(progress.plan_type);
        if rules.step_rule(step).is_none() {
            return Err(ProgressError::StepNotInPlan {
                plan: progress.plan_type,
                step,
            });
        }

        progress.record(step);
        self.persist(&progress)?;
        Ok(progress)
    }

    /// Skip the current step, when the plan marks it skippable. The whole
    /// contiguous skippable block is recorded so the derived current step
    /// lands on the skip target.
    pub fn skip_current_step(&self, user_id: &UserId) -> Result<StepProgress, ProgressError> {
        let mut progress = self
            .progress(user_id)?
            .ok_or_else(|| ProgressError::NotStarted(user_id.clone()))?;

        if progress.is_completed() {
            return Err(ProgressError::AlreadyCompleted(user_id.clone()));
        }

        let current = progress.current_step();
        let rules = PlanRules::for_plan(progress.plan_type);
        let target = rules
            .step_rule(current)
            .and_then(|rule| rule.skip_to)
            .ok_or(ProgressError::SkipNotAllowed(current))?;

        for step in rules.step_sequence() {
            if step == target {
                break;
            }
            if !progress.completed_steps.contains(&step) {
                progress.record(step);
            }
        }

        self.persist(&progress)?;
        Ok(progress)
    }

    /// Record entity identities captured while a submission committed.
    pub fn record_entities(
        &self,
        user_id: &UserId,
        plan: PlanType,
        entity_ids: EntityIds,
    ) -> Result<StepProgress, ProgressError> {
        let mut progress = self.start(user_id, plan)?;
        progress.entity_ids.merge(entity_ids);
        self.persist(&progress)?;
        Ok(progress)
    }

    /// Mark every step of the plan complete in one transition, used when a
    /// full submission commits in a single call.
    pub fn complete_all(
        &self,
        user_id: &UserId,
        plan: PlanType,
        entity_ids: EntityIds,
    ) -> Result<StepProgress, ProgressError> {
        let mut progress = self.start(user_id, plan)?;
        let rules = PlanRules::for_plan(progress.plan_type);
        for step in rules.step_sequence() {
            progress.record(step);
        }
        progress.entity_ids.merge(entity_ids);
        self.persist(&progress)?;
        Ok(progress)
    }

    fn persist(&self, progress: &StepProgress) -> Result<(), ProgressError> {
        self.repository.save(progress)?;
        let mut cache = self.cache.lock().expect("progress cache poisoned");
        cache.insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }
}
