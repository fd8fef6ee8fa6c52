use super::common::{clinic_payload, company_payload, complex_payload, harness, working_day};
use crate::workflows::onboarding::domain::DayOfWeek;
use crate::workflows::onboarding::progress::StepProgressRepository;
use crate::workflows::onboarding::domain::{AccessRole, EntityId, EntityKind, UserId};
use crate::workflows::onboarding::service::OnboardingError;

#[test]
fn company_onboarding_commits_the_whole_graph() {
    let harness = harness();
    let payload = company_payload("user-1");

    let result = harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert!(result.subscription_id.0.starts_with("sub-"));

    let organization = result.entities.organization.expect("organization created");
    assert_eq!(organization.name, "Al-Zahra Medical Center");
    assert_eq!(result.entities.complexes.len(), 1);
    assert_eq!(result.entities.departments.len(), 2);
    assert_eq!(result.entities.department_links.len(), 2);
    assert_eq!(result.entities.clinics.len(), 1);
    assert_eq!(result.entities.services.len(), 1);

    assert_eq!(harness.directory.organizations().len(), 1);
    assert_eq!(harness.directory.complexes().len(), 1);
    assert_eq!(harness.directory.clinics().len(), 1);
    assert_eq!(harness.directory.clinic_services().len(), 1);
    // One schedule per complex and per clinic that declared one.
    assert_eq!(harness.directory.schedules().len(), 2);
}

#[test]
fn complex_and_clinic_inherit_the_organization_attributes() {
    let harness = harness();
    let payload = company_payload("user-2");

    harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    let complex = &harness.directory.complexes()[0];
    assert_eq!(
        complex.attributes.email.as_deref(),
        Some("info@al-zahra.example.com")
    );
    assert_eq!(
        complex.attributes.logo.as_deref(),
        Some("https://cdn.example.com/al-zahra.png")
    );

    // The clinic inherits through its complex, so the chain reaches it too.
    let clinic = &harness.directory.clinics()[0];
    assert_eq!(
        clinic.attributes.email.as_deref(),
        Some("info@al-zahra.example.com")
    );
}

#[test]
fn supporting_records_are_split_out_of_the_attributes() {
    let harness = harness();
    let payload = company_payload("user-3");

    harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    let contacts = harness.directory.contacts();
    assert!(contacts
        .iter()
        .any(|card| card.scope.kind == EntityKind::Organization
            && card.email.as_deref() == Some("info@al-zahra.example.com")));

    let dynamic = harness.directory.dynamic_info();
    assert!(dynamic
        .iter()
        .any(|record| record.key == "vat_number" && record.value == "310123456700003"));
    assert!(dynamic
        .iter()
        .any(|record| record.key == "cr_number" && record.value == "1010987654"));
}

#[test]
fn the_owner_is_granted_access_to_every_created_entity() {
    let harness = harness();
    let payload = company_payload("user-4");

    harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    let grants = harness.directory.grants();
    // organization + complex + two departments + clinic + service
    assert_eq!(grants.len(), 6);
    assert!(grants
        .iter()
        .all(|grant| grant.user_id == UserId("user-4".to_string())
            && grant.role == AccessRole::Owner));
}

#[test]
fn onboarding_marks_every_plan_step_complete() {
    let harness = harness();
    let payload = company_payload("user-5");

    harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    let progress = harness
        .service
        .progress(&UserId("user-5".to_string()))
        .expect("load")
        .expect("present");
    assert!(progress.is_completed());
    assert!(progress.entity_ids.organization_id.is_some());
    assert!(progress.entity_ids.complex_id.is_some());
    assert!(progress.entity_ids.clinic_id.is_some());

    // The repository holds the same record; the cache is only a front.
    let stored = harness
        .progress
        .load(&UserId("user-5".to_string()))
        .expect("load")
        .expect("present");
    assert!(stored.is_completed());
}

#[test]
fn validation_failure_persists_nothing() {
    let harness = harness();
    let mut payload = clinic_payload("user-6");
    payload.clinics.clear();

    let err = harness.service.complete_onboarding(&payload).unwrap_err();
    let report = match err {
        OnboardingError::Validation(report) => report,
        other => panic!("expected validation error, got {other}"),
    };
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.message == "clinic plan requires at least one clinic"));

    assert!(harness.directory.clinics().is_empty());
    assert!(harness.directory.grants().is_empty());
    assert!(harness
        .service
        .progress(&UserId("user-6".to_string()))
        .expect("load")
        .is_none());
    assert!(harness.audit.events().is_empty());
}

#[test]
fn a_mid_transaction_failure_rolls_everything_back() {
    let harness = harness();
    let payload = company_payload("user-7");

    // The clinic is created late in the transaction, after the organization,
    // complex, and departments have been staged.
    harness.directory.fail_when_creating("North Cardiology Clinic");

    let err = harness.service.complete_onboarding(&payload).unwrap_err();
    assert!(matches!(err, OnboardingError::Directory(_)));

    assert!(harness.directory.organizations().is_empty());
    assert!(harness.directory.complexes().is_empty());
    assert!(harness.directory.departments().is_empty());
    assert!(harness.directory.schedules().is_empty());
    assert!(harness
        .service
        .progress(&UserId("user-7".to_string()))
        .expect("load")
        .is_none());
}

#[test]
fn resubmission_updates_the_organization_instead_of_duplicating_it() {
    let harness = harness();
    let payload = company_payload("user-8");
    harness
        .service
        .complete_onboarding(&payload)
        .expect("first submission");

    let mut resubmission = company_payload("user-8");
    resubmission
        .organization
        .as_mut()
        .expect("organization present")
        .name = "Al-Zahra Medical Group".to_string();
    // Drop the children so the retry only touches the organization.
    resubmission.complexes.clear();
    resubmission.departments.clear();
    resubmission.clinics.clear();
    resubmission.services.clear();

    let result = harness
        .service
        .complete_onboarding(&resubmission)
        .expect("resubmission succeeds");

    assert!(result.success);
    let organizations = harness.directory.organizations();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0].name, "Al-Zahra Medical Group");
}

#[test]
fn audit_events_record_the_completed_onboarding() {
    let harness = harness();
    let payload = clinic_payload("user-9");

    harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    let events = harness.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "onboarding.completed");
    assert_eq!(events[0].user_id, UserId("user-9".to_string()));
}

#[test]
fn an_offline_audit_sink_does_not_abort_onboarding() {
    let harness = harness();
    harness.audit.set_failing(true);
    let payload = clinic_payload("user-10");

    let result = harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds despite audit failure");

    assert!(result.success);
    assert_eq!(harness.directory.clinics().len(), 1);
    assert!(harness.audit.events().is_empty());
}

#[test]
fn entities_are_created_in_the_plan_table_order() {
    let harness = harness();
    let payload = company_payload("user-14");

    let result = harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    // Ids come from one shared sequence, so their numeric suffixes expose
    // the order the transaction staged entities in.
    let seq = |id: &EntityId| -> u64 {
        id.0.rsplit('-')
            .next()
            .expect("id suffix")
            .parse()
            .expect("numeric id suffix")
    };

    let organization = result.entities.organization.as_ref().expect("organization");
    let complex = &result.entities.complexes[0];
    let last_department = result
        .entities
        .departments
        .iter()
        .map(|department| seq(&department.id))
        .max()
        .expect("departments");
    let first_link = result
        .entities
        .department_links
        .iter()
        .map(|link| seq(&link.id))
        .min()
        .expect("links");
    let last_link = result
        .entities
        .department_links
        .iter()
        .map(|link| seq(&link.id))
        .max()
        .expect("links");

    assert!(seq(&result.subscription_id) < seq(&organization.id));
    assert!(seq(&organization.id) < seq(&complex.id));
    assert!(seq(&complex.id) < last_department);
    assert!(last_department < first_link);
    assert!(last_link < seq(&result.entities.clinics[0].id));
    assert!(seq(&result.entities.clinics[0].id) < seq(&result.entities.services[0].id));
}

#[test]
fn a_follow_up_clinic_reuses_the_committed_department_link() {
    let harness = harness();
    harness
        .service
        .complete_onboarding(&company_payload("user-15"))
        .expect("first submission");

    let complex_id = harness.directory.complexes()[0].id.clone();
    let cardiology = harness
        .directory
        .departments()
        .into_iter()
        .find(|department| department.name == "Cardiology")
        .expect("cardiology persisted");
    let existing_link = harness
        .directory
        .department_links()
        .into_iter()
        .find(|link| link.department_id == cardiology.id)
        .expect("link persisted");

    // A second submission adds one clinic under the committed pair.
    let mut follow_up = company_payload("user-15");
    follow_up.complexes.clear();
    follow_up.departments.clear();
    follow_up.services.clear();
    follow_up.clinics[0].reference = EntityId("cln-annex".to_string());
    follow_up.clinics[0].name = "North Cardiology Annex".to_string();
    follow_up.clinics[0].complex = Some(complex_id);
    follow_up.clinics[0].department = Some(cardiology.id);

    let result = harness
        .service
        .complete_onboarding(&follow_up)
        .expect("follow-up succeeds");

    // The committed link is reused, never duplicated.
    assert_eq!(harness.directory.department_links().len(), 2);
    assert!(result.entities.department_links.is_empty());
    assert_eq!(
        result.entities.clinics[0].complex_department_id.as_ref(),
        Some(&existing_link.id)
    );
}

#[test]
fn complex_plan_onboarding_commits_without_an_organization() {
    let harness = harness();
    let payload = complex_payload("user-13");

    let result = harness
        .service
        .complete_onboarding(&payload)
        .expect("onboarding succeeds");

    assert!(result.success);
    assert!(result.entities.organization.is_none());
    assert_eq!(result.entities.complexes.len(), 1);
    assert_eq!(harness.directory.complexes().len(), 1);

    // Standalone complexes have nothing to inherit from.
    let complex = &harness.directory.complexes()[0];
    assert_eq!(complex.organization_id, None);
    assert_eq!(
        complex.attributes.email.as_deref(),
        Some("care@andalus.example.com")
    );

    // The clinic inherits from its parent complex.
    let clinic = &harness.directory.clinics()[0];
    assert_eq!(
        clinic.attributes.email.as_deref(),
        Some("care@andalus.example.com")
    );
}

#[test]
fn complex_plan_clinic_open_on_a_closed_day_persists_nothing() {
    let harness = harness();
    let mut payload = complex_payload("user-12");
    // The complex is closed on friday; schedule the clinic there anyway.
    payload.clinics[0].schedule = vec![working_day(DayOfWeek::Friday, (9, 0), (17, 0))];

    let err = harness.service.complete_onboarding(&payload).unwrap_err();
    let report = match err {
        OnboardingError::Validation(report) => report,
        other => panic!("expected validation error, got {other}"),
    };
    assert!(report.issues.iter().any(|issue| {
        issue.message
            == "Andalus Dental Clinic cannot be open on friday when Andalus Medical Complex is closed"
    }));

    assert!(harness.directory.complexes().is_empty());
    assert!(harness.directory.clinics().is_empty());
    assert!(harness.directory.schedules().is_empty());
}

#[test]
fn clinic_hours_outside_the_complex_hours_fail_validation() {
    let harness = harness();
    let mut payload = company_payload("user-11");
    // Complex is closed on friday; open the clinic anyway.
    payload.clinics[0].schedule = vec![working_day(DayOfWeek::Friday, (9, 0), (12, 0))];

    let err = harness.service.complete_onboarding(&payload).unwrap_err();
    let report = match err {
        OnboardingError::Validation(report) => report,
        other => panic!("expected validation error, got {other}"),
    };

    assert!(report.issues.iter().any(|issue| {
        issue.field == "clinics[0].schedule"
            && issue.message
                == "North Cardiology Clinic cannot be open on friday when Al-Zahra North Complex is closed"
    }));
    assert!(harness.directory.organizations().is_empty());
}
