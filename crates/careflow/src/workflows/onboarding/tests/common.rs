use std::sync::Arc;

use chrono::NaiveTime;

use crate::workflows::onboarding::domain::{
    ClinicDraft, ComplexDraft, DayOfWeek, DaySchedule, DepartmentDraft, EntityId,
    OnboardingPayload, OrganizationDraft, ServiceDraft, SharedAttributes, UserId,
};
use crate::workflows::onboarding::memory::{
    InMemoryDirectory, InMemoryProgressRepository, RecordingAuditSink,
};
use crate::workflows::onboarding::service::OnboardingService;

pub(super) type TestService =
    OnboardingService<InMemoryDirectory, InMemoryProgressRepository, RecordingAuditSink>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) directory: Arc<InMemoryDirectory>,
    pub(super) progress: Arc<InMemoryProgressRepository>,
    pub(super) audit: Arc<RecordingAuditSink>,
}

pub(super) fn harness() -> Harness {
    let directory = Arc::new(InMemoryDirectory::new());
    let progress = Arc::new(InMemoryProgressRepository::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let service = OnboardingService::new(directory.clone(), progress.clone(), audit.clone());
    Harness {
        service,
        directory,
        progress,
        audit,
    }
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn working_day(
    day: DayOfWeek,
    open: (u32, u32),
    close: (u32, u32),
) -> DaySchedule {
    DaySchedule {
        day_of_week: day,
        is_working_day: true,
        opening_time: Some(time(open.0, open.1)),
        closing_time: Some(time(close.0, close.1)),
        break_start_time: None,
        break_end_time: None,
    }
}

pub(super) fn closed_day(day: DayOfWeek) -> DaySchedule {
    DaySchedule {
        day_of_week: day,
        is_working_day: false,
        opening_time: None,
        closing_time: None,
        break_start_time: None,
        break_end_time: None,
    }
}

pub(super) fn organization_attributes() -> SharedAttributes {
    SharedAttributes {
        logo: Some("https://cdn.example.com/al-zahra.png".to_string()),
        website: Some("https://al-zahra.example.com".to_string()),
        email: Some("info@al-zahra.example.com".to_string()),
        phone_numbers: Some(vec!["+966112223344".to_string()]),
        address: Some("King Fahd Road, Riyadh".to_string()),
        vat_number: Some("310123456700003".to_string()),
        cr_number: Some("1010987654".to_string()),
        ..SharedAttributes::default()
    }
}

/// Company-plan submission: organization, one complex with two department
/// links, one clinic under that complex, one service.
pub(super) fn company_payload(user: &str) -> OnboardingPayload {
    OnboardingPayload {
        user_id: UserId(user.to_string()),
        plan_type: "company".to_string(),
        organization: Some(OrganizationDraft {
            reference: EntityId("org-draft".to_string()),
            name: "Al-Zahra Medical Center".to_string(),
            attributes: organization_attributes(),
        }),
        complexes: vec![ComplexDraft {
            reference: EntityId("cpx-draft".to_string()),
            name: "Al-Zahra North Complex".to_string(),
            organization: Some(EntityId("org-draft".to_string())),
            departments: vec![
                EntityId("dep-cardiology".to_string()),
                EntityId("dep-radiology".to_string()),
            ],
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: vec![
                working_day(DayOfWeek::Monday, (9, 0), (18, 0)),
                working_day(DayOfWeek::Tuesday, (9, 0), (18, 0)),
                closed_day(DayOfWeek::Friday),
            ],
        }],
        departments: vec![
            DepartmentDraft {
                reference: EntityId("dep-cardiology".to_string()),
                name: "Cardiology".to_string(),
                description: None,
            },
            DepartmentDraft {
                reference: EntityId("dep-radiology".to_string()),
                name: "Radiology".to_string(),
                description: Some("Imaging and diagnostics".to_string()),
            },
        ],
        clinics: vec![ClinicDraft {
            reference: EntityId("cln-draft".to_string()),
            name: "North Cardiology Clinic".to_string(),
            complex: Some(EntityId("cpx-draft".to_string())),
            department: Some(EntityId("dep-cardiology".to_string())),
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: vec![working_day(DayOfWeek::Monday, (9, 0), (17, 0))],
        }],
        services: vec![ServiceDraft {
            reference: EntityId("svc-draft".to_string()),
            name: "Echocardiogram".to_string(),
            price: Some(450),
            duration_minutes: Some(30),
            clinics: vec![EntityId("cln-draft".to_string())],
        }],
    }
}

/// Complex-plan submission: one standalone complex, one department, one
/// clinic. The complex is closed on friday.
pub(super) fn complex_payload(user: &str) -> OnboardingPayload {
    OnboardingPayload {
        user_id: UserId(user.to_string()),
        plan_type: "complex".to_string(),
        organization: None,
        complexes: vec![ComplexDraft {
            reference: EntityId("cpx-solo".to_string()),
            name: "Andalus Medical Complex".to_string(),
            organization: None,
            departments: vec![EntityId("dep-dental".to_string())],
            attributes: SharedAttributes {
                email: Some("care@andalus.example.com".to_string()),
                ..SharedAttributes::default()
            },
            inheritance: None,
            schedule: vec![
                working_day(DayOfWeek::Monday, (9, 0), (18, 0)),
                closed_day(DayOfWeek::Friday),
            ],
        }],
        departments: vec![DepartmentDraft {
            reference: EntityId("dep-dental".to_string()),
            name: "Dental".to_string(),
            description: None,
        }],
        clinics: vec![ClinicDraft {
            reference: EntityId("cln-dental".to_string()),
            name: "Andalus Dental Clinic".to_string(),
            complex: Some(EntityId("cpx-solo".to_string())),
            department: Some(EntityId("dep-dental".to_string())),
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: vec![working_day(DayOfWeek::Monday, (10, 0), (17, 0))],
        }],
        services: Vec::new(),
    }
}

/// Clinic-plan submission with a single standalone clinic.
pub(super) fn clinic_payload(user: &str) -> OnboardingPayload {
    OnboardingPayload {
        user_id: UserId(user.to_string()),
        plan_type: "clinic".to_string(),
        organization: None,
        complexes: Vec::new(),
        departments: Vec::new(),
        clinics: vec![ClinicDraft {
            reference: EntityId("cln-solo".to_string()),
            name: "Smile Dental Clinic".to_string(),
            complex: None,
            department: None,
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: vec![working_day(DayOfWeek::Sunday, (10, 0), (20, 0))],
        }],
        services: Vec::new(),
    }
}
