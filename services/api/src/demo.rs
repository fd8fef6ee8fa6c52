use crate::infra::onboarding_service;
use careflow::error::AppError;
use careflow::workflows::onboarding::plan::PlanRules;
use careflow::workflows::onboarding::{
    ClinicDraft, ComplexDraft, DayOfWeek, DaySchedule, DepartmentDraft, EntityId,
    OnboardingError, OnboardingPayload, OrganizationDraft, PlanType, ServiceDraft,
    SharedAttributes, UserId,
};
use chrono::NaiveTime;
use clap::Args;
use std::str::FromStr;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Subscriber account the demo submission runs under
    #[arg(long, default_value = "demo-owner")]
    pub(crate) user: String,
    /// Submit a clinic schedule that violates the complex hours to show the
    /// full violation report
    #[arg(long)]
    pub(crate) invalid_schedule: bool,
    /// Inject a storage failure when this entity name is created, to show the
    /// transaction rolling back
    #[arg(long)]
    pub(crate) fail_creating: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct PlanShowArgs {
    /// Plan tier to inspect (company, complex, or clinic)
    #[arg(value_parser = parse_plan)]
    pub(crate) plan_type: PlanType,
}

fn parse_plan(raw: &str) -> Result<PlanType, String> {
    PlanType::from_str(raw).map_err(|err| err.to_string())
}

pub(crate) fn run_plan_show(args: PlanShowArgs) -> Result<(), AppError> {
    let rules = PlanRules::for_plan(args.plan_type);

    println!("{} plan", rules.plan);

    let required: Vec<&str> = rules.required.iter().map(|kind| kind.label()).collect();
    println!("  required entities: {}", required.join(", "));

    println!("  limits:");
    for (kind, limit) in rules.limits {
        println!("    {:<14} {limit}", kind.label());
    }

    let order: Vec<&str> = rules
        .creation_order
        .iter()
        .map(|stage| stage.label())
        .collect();
    println!("  creation order: {}", order.join(" -> "));

    println!("  onboarding steps:");
    for rule in rules.steps {
        match rule.skip_to {
            Some(target) => println!("    {} (skippable -> {target})", rule.step),
            None => println!("    {}", rule.step),
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        user,
        invalid_schedule,
        fail_creating,
    } = args;

    let (service, backing) = onboarding_service();
    if let Some(name) = fail_creating {
        backing.directory.fail_when_creating(name);
    }

    let payload = demo_submission(&user, invalid_schedule);
    println!(
        "Submitting a {} plan onboarding for user '{}'",
        payload.plan_type, user
    );

    match service.complete_onboarding(&payload) {
        Ok(result) => {
            println!("Onboarding committed (subscription {})", result.subscription_id);
            if let Some(organization) = &result.entities.organization {
                println!("  organization {}  {}", organization.id, organization.name);
            }
            for complex in &result.entities.complexes {
                println!("  complex      {}  {}", complex.id, complex.name);
            }
            for department in &result.entities.departments {
                println!("  department   {}  {}", department.id, department.name);
            }
            for clinic in &result.entities.clinics {
                println!("  clinic       {}  {}", clinic.id, clinic.name);
            }
            for offering in &result.entities.services {
                println!("  service      {}  {}", offering.id, offering.name);
            }

            let schedules = backing.directory.schedules();
            println!("  {} working-hours records stored", schedules.len());
            println!("  {} access grants issued", backing.directory.grants().len());
            println!("  {} audit events recorded", backing.audit.events().len());

            if let Some(progress) = service.progress(&UserId(user))? {
                println!(
                    "  progress: {} ({} steps logged)",
                    progress.current_step(),
                    progress.completed_steps.len()
                );
            }
        }
        Err(OnboardingError::Validation(report)) => {
            println!("Submission rejected with {}:", report);
            for issue in &report.issues {
                println!("  {:<28} {}", issue.field, issue.message);
            }
        }
        Err(err) => {
            println!("Onboarding aborted: {err}");
            println!(
                "  rollback left {} organizations and {} clinics in the store",
                backing.directory.organizations().len(),
                backing.directory.clinics().len()
            );
        }
    }

    Ok(())
}

fn demo_submission(user: &str, invalid_schedule: bool) -> OnboardingPayload {
    let clinic_schedule = if invalid_schedule {
        vec![
            day(DayOfWeek::Monday, "08:00", "19:00"),
            day(DayOfWeek::Friday, "09:00", "13:00"),
        ]
    } else {
        vec![
            day(DayOfWeek::Monday, "09:00", "17:00"),
            day(DayOfWeek::Tuesday, "09:00", "17:00"),
        ]
    };

    OnboardingPayload {
        user_id: UserId(user.to_string()),
        plan_type: "company".to_string(),
        organization: Some(OrganizationDraft {
            reference: EntityId("org".to_string()),
            name: "Al-Zahra Medical Center".to_string(),
            attributes: SharedAttributes {
                email: Some("info@al-zahra.example.com".to_string()),
                phone_numbers: Some(vec!["+966112223344".to_string()]),
                address: Some("King Fahd Road, Riyadh".to_string()),
                vat_number: Some("310123456700003".to_string()),
                cr_number: Some("1010987654".to_string()),
                ..SharedAttributes::default()
            },
        }),
        complexes: vec![ComplexDraft {
            reference: EntityId("north".to_string()),
            name: "Al-Zahra North Complex".to_string(),
            organization: Some(EntityId("org".to_string())),
            departments: vec![EntityId("cardiology".to_string())],
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: vec![
                day(DayOfWeek::Monday, "09:00", "18:00"),
                day(DayOfWeek::Tuesday, "09:00", "18:00"),
                closed(DayOfWeek::Friday),
            ],
        }],
        departments: vec![DepartmentDraft {
            reference: EntityId("cardiology".to_string()),
            name: "Cardiology".to_string(),
            description: None,
        }],
        clinics: vec![ClinicDraft {
            reference: EntityId("clinic".to_string()),
            name: "North Cardiology Clinic".to_string(),
            complex: Some(EntityId("north".to_string())),
            department: Some(EntityId("cardiology".to_string())),
            attributes: SharedAttributes::default(),
            inheritance: None,
            schedule: clinic_schedule,
        }],
        services: vec![ServiceDraft {
            reference: EntityId("echo".to_string()),
            name: "Echocardiogram".to_string(),
            price: Some(450),
            duration_minutes: Some(30),
            clinics: vec![EntityId("clinic".to_string())],
        }],
    }
}

fn day(day_of_week: DayOfWeek, open: &str, close: &str) -> DaySchedule {
    DaySchedule {
        day_of_week,
        is_working_day: true,
        opening_time: Some(parse_time(open)),
        closing_time: Some(parse_time(close)),
        break_start_time: None,
        break_end_time: None,
    }
}

fn closed(day_of_week: DayOfWeek) -> DaySchedule {
    DaySchedule {
        day_of_week,
        is_working_day: false,
        opening_time: None,
        closing_time: None,
        break_start_time: None,
        break_end_time: None,
    }
}

fn parse_time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").expect("demo times are valid HH:MM")
}
