use std::collections::HashSet;

use super::domain::{EntityId, EntityKind, OnboardingPayload, PlanType, ValidationIssue};
use super::plan::{payload_field, CreationStage, PlanRules};

/// Check that the proposed entity set satisfies the plan's structural rules.
///
/// Driven by the plan table: each required kind must appear at least once, and
/// plans that stage departments inside complexes reject complexes without any
/// department to staff them.
pub fn validate_hierarchy(plan: PlanType, payload: &OnboardingPayload) -> Vec<ValidationIssue> {
    let rules = PlanRules::for_plan(plan);
    let counts = payload.counts();
    let mut issues = Vec::new();

    for &kind in rules.required {
        if counts.of(kind) > 0 {
            continue;
        }
        let message = match kind {
            EntityKind::Organization => format!("{plan} plan requires an organization"),
            other => format!("{plan} plan requires at least one {other}"),
        };
        issues.push(ValidationIssue::new(payload_field(kind), message));
    }

    if rules.departments_required_with_complexes
        && counts.complexes > 0
        && counts.departments == 0
        && payload
            .complexes
            .iter()
            .all(|complex| complex.departments.is_empty())
    {
        issues.push(ValidationIssue::new(
            "departments",
            "complexes require at least one department",
        ));
    }

    issues
}

/// Verify that every parent reference on every draft resolves, either to
/// another draft in the same submission or to an already-persisted entity.
pub fn validate_relationships(
    payload: &OnboardingPayload,
    persisted: &HashSet<EntityId>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut known: HashSet<EntityId> = persisted.iter().cloned().collect();

    // Local references must be unique so cross-references are unambiguous.
    let mut declared: Vec<(&'static str, &EntityId)> = Vec::new();
    if let Some(organization) = &payload.organization {
        declared.push(("organization.reference", &organization.reference));
    }
    for complex in &payload.complexes {
        declared.push(("complexes[].reference", &complex.reference));
    }
    for department in &payload.departments {
        declared.push(("departments[].reference", &department.reference));
    }
    for clinic in &payload.clinics {
        declared.push(("clinics[].reference", &clinic.reference));
    }
    for service in &payload.services {
        declared.push(("services[].reference", &service.reference));
    }
    for (field, id) in declared {
        if !known.insert(id.clone()) {
            issues.push(ValidationIssue::new(
                field,
                format!("duplicate entity reference '{id}'"),
            ));
        }
    }

    let resolve = |field: String, id: &EntityId, issues: &mut Vec<ValidationIssue>| {
        if !known.contains(id) {
            issues.push(ValidationIssue::new(
                field,
                format!("reference '{id}' does not resolve to any known entity"),
            ));
        }
    };

    for (index, complex) in payload.complexes.iter().enumerate() {
        if let Some(organization) = &complex.organization {
            resolve(
                format!("complexes[{index}].organization"),
                organization,
                &mut issues,
            );
        }
        for department in &complex.departments {
            resolve(
                format!("complexes[{index}].departments"),
                department,
                &mut issues,
            );
        }
    }

    for (index, clinic) in payload.clinics.iter().enumerate() {
        if let Some(complex) = &clinic.complex {
            resolve(format!("clinics[{index}].complex"), complex, &mut issues);
        }
        if let Some(department) = &clinic.department {
            resolve(format!("clinics[{index}].department"), department, &mut issues);
        }
    }

    for (index, service) in payload.services.iter().enumerate() {
        for clinic in &service.clinics {
            resolve(format!("services[{index}].clinics"), clinic, &mut issues);
        }
    }

    issues
}

/// Fixed topological order collaborators are invoked in for this plan.
pub fn creation_order(plan: PlanType) -> &'static [CreationStage] {
    PlanRules::for_plan(plan).creation_order
}
