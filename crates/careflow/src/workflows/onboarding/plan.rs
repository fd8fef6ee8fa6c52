use super::domain::{EntityCounts, EntityKind, PlanType, ValidationIssue};
use super::progress::OnboardingStep;
use serde::Serialize;
use std::str::FromStr;

/// Collaborator invocation order; parents are always created before anything
/// that references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CreationStage {
    Subscription,
    Organization,
    Complex,
    Department,
    ComplexDepartment,
    Clinic,
    Service,
    ClinicService,
    WorkingHours,
    Contact,
    DynamicInfo,
    UserAccess,
}

impl CreationStage {
    pub const fn label(self) -> &'static str {
        match self {
            CreationStage::Subscription => "subscription",
            CreationStage::Organization => "organization",
            CreationStage::Complex => "complex",
            CreationStage::Department => "department",
            CreationStage::ComplexDepartment => "complexDepartment",
            CreationStage::Clinic => "clinic",
            CreationStage::Service => "service",
            CreationStage::ClinicService => "clinicService",
            CreationStage::WorkingHours => "workingHours",
            CreationStage::Contact => "contact",
            CreationStage::DynamicInfo => "dynamicInfo",
            CreationStage::UserAccess => "userAccess",
        }
    }
}

impl std::fmt::Display for CreationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One onboarding step in a plan's sequence, with an optional skip target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRule {
    pub step: OnboardingStep,
    /// Skipping is only permitted when a target exists; the tracker jumps here.
    pub skip_to: Option<OnboardingStep>,
}

const fn step(step: OnboardingStep) -> StepRule {
    StepRule {
        step,
        skip_to: None,
    }
}

const fn skippable(step: OnboardingStep, to: OnboardingStep) -> StepRule {
    StepRule {
        step,
        skip_to: Some(to),
    }
}

/// Table-driven plan configuration consumed by the validators, the
/// orchestrator, and the step tracker. One table per tier replaces the
/// per-plan branch arms the engine would otherwise accumulate.
#[derive(Debug)]
pub struct PlanRules {
    pub plan: PlanType,
    /// Entity kinds that must appear at least once.
    pub required: &'static [EntityKind],
    /// Maximum counts per kind; kinds absent from the table are not allowed at all.
    pub limits: &'static [(EntityKind, usize)],
    /// Complexes may not exist without at least one department to staff them.
    pub departments_required_with_complexes: bool,
    pub creation_order: &'static [CreationStage],
    pub steps: &'static [StepRule],
}

const FULL_CREATION_ORDER: &[CreationStage] = &[
    CreationStage::Subscription,
    CreationStage::Organization,
    CreationStage::Complex,
    CreationStage::Department,
    CreationStage::ComplexDepartment,
    CreationStage::Clinic,
    CreationStage::Service,
    CreationStage::ClinicService,
    CreationStage::WorkingHours,
    CreationStage::Contact,
    CreationStage::DynamicInfo,
    CreationStage::UserAccess,
];

const COMPLEX_CREATION_ORDER: &[CreationStage] = &[
    CreationStage::Subscription,
    CreationStage::Complex,
    CreationStage::Department,
    CreationStage::ComplexDepartment,
    CreationStage::Clinic,
    CreationStage::Service,
    CreationStage::ClinicService,
    CreationStage::WorkingHours,
    CreationStage::Contact,
    CreationStage::DynamicInfo,
    CreationStage::UserAccess,
];

const CLINIC_CREATION_ORDER: &[CreationStage] = &[
    CreationStage::Subscription,
    CreationStage::Clinic,
    CreationStage::Service,
    CreationStage::ClinicService,
    CreationStage::WorkingHours,
    CreationStage::Contact,
    CreationStage::DynamicInfo,
    CreationStage::UserAccess,
];

const COMPANY_STEPS: &[StepRule] = &[
    step(OnboardingStep::OrganizationOverview),
    step(OnboardingStep::OrganizationContact),
    step(OnboardingStep::OrganizationLegal),
    skippable(OnboardingStep::ComplexOverview, OnboardingStep::ClinicOverview),
    skippable(OnboardingStep::ComplexContact, OnboardingStep::ClinicOverview),
    skippable(OnboardingStep::ComplexLegal, OnboardingStep::ClinicOverview),
    skippable(OnboardingStep::ComplexSchedule, OnboardingStep::ClinicOverview),
    step(OnboardingStep::ClinicOverview),
    step(OnboardingStep::ClinicContact),
    step(OnboardingStep::ClinicLegal),
    step(OnboardingStep::ClinicSchedule),
];

const COMPLEX_STEPS: &[StepRule] = &[
    step(OnboardingStep::ComplexOverview),
    step(OnboardingStep::ComplexContact),
    step(OnboardingStep::ComplexLegal),
    step(OnboardingStep::ComplexSchedule),
    step(OnboardingStep::ClinicOverview),
    step(OnboardingStep::ClinicContact),
    step(OnboardingStep::ClinicLegal),
    step(OnboardingStep::ClinicSchedule),
];

const CLINIC_STEPS: &[StepRule] = &[
    step(OnboardingStep::ClinicOverview),
    step(OnboardingStep::ClinicContact),
    step(OnboardingStep::ClinicLegal),
    step(OnboardingStep::ClinicSchedule),
];

static COMPANY_RULES: PlanRules = PlanRules {
    plan: PlanType::Company,
    required: &[EntityKind::Organization],
    limits: &[
        (EntityKind::Organization, 1),
        (EntityKind::Complex, 5),
        (EntityKind::Department, 30),
        (EntityKind::Clinic, 20),
        (EntityKind::Service, 100),
    ],
    departments_required_with_complexes: true,
    creation_order: FULL_CREATION_ORDER,
    steps: COMPANY_STEPS,
};

static COMPLEX_RULES: PlanRules = PlanRules {
    plan: PlanType::Complex,
    required: &[EntityKind::Complex, EntityKind::Department],
    limits: &[
        (EntityKind::Complex, 1),
        (EntityKind::Department, 15),
        (EntityKind::Clinic, 10),
        (EntityKind::Service, 50),
    ],
    departments_required_with_complexes: true,
    creation_order: COMPLEX_CREATION_ORDER,
    steps: COMPLEX_STEPS,
};

static CLINIC_RULES: PlanRules = PlanRules {
    plan: PlanType::Clinic,
    required: &[EntityKind::Clinic],
    limits: &[(EntityKind::Clinic, 1), (EntityKind::Service, 20)],
    departments_required_with_complexes: false,
    creation_order: CLINIC_CREATION_ORDER,
    steps: CLINIC_STEPS,
};

impl PlanRules {
    pub fn for_plan(plan: PlanType) -> &'static PlanRules {
        match plan {
            PlanType::Company => &COMPANY_RULES,
            PlanType::Complex => &COMPLEX_RULES,
            PlanType::Clinic => &CLINIC_RULES,
        }
    }

    pub fn limit_for(&self, kind: EntityKind) -> usize {
        self.limits
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, limit)| *limit)
            .unwrap_or(0)
    }

    pub fn step_sequence(&self) -> impl Iterator<Item = OnboardingStep> + '_ {
        self.steps.iter().map(|rule| rule.step)
    }

    pub fn step_rule(&self, step: OnboardingStep) -> Option<&StepRule> {
        self.steps.iter().find(|rule| rule.step == step)
    }
}

/// Outcome of a plan-limit check; lists every exceeded kind, never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitCheck {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Organization,
    EntityKind::Complex,
    EntityKind::Department,
    EntityKind::Clinic,
    EntityKind::Service,
];

/// Payload field each entity kind lives under, for field-scoped errors.
pub fn payload_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => "organization",
        EntityKind::Complex => "complexes",
        EntityKind::Department => "departments",
        EntityKind::Clinic => "clinics",
        EntityKind::Service => "services",
    }
}

/// Check proposed entity counts against a plan's limits. Fails closed: an
/// unrecognized plan label yields a single "invalid plan type" error.
pub fn validate_limits(plan_type: &str, counts: &EntityCounts) -> LimitCheck {
    let plan = match PlanType::from_str(plan_type) {
        Ok(plan) => plan,
        Err(err) => {
            return LimitCheck {
                is_valid: false,
                errors: vec![ValidationIssue::new("plan_type", err.to_string())],
            }
        }
    };

    let rules = PlanRules::for_plan(plan);
    let mut errors = Vec::new();

    for &kind in ALL_KINDS {
        let count = counts.of(kind);
        let limit = rules.limit_for(kind);
        if count == 0 || count <= limit {
            continue;
        }
        let message = if limit == 0 {
            format!("the {plan} plan does not allow {kind} entities")
        } else {
            format!("{kind} count {count} exceeds the {plan} plan limit of {limit}")
        };
        errors.push(ValidationIssue::new(payload_field(kind), message));
    }

    LimitCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}
