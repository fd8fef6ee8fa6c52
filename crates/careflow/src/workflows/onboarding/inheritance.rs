use super::domain::{AttributeField, InheritanceSettings, SharedAttributes};

/// Compute a child's effective attribute set from its parent.
///
/// Pure merge with no side effects: override-listed fields keep the child's
/// value unconditionally; an inherit list, when present, restricts which
/// fields may copy down; otherwise only unset (`None`) child fields take the
/// parent's value. An explicitly emptied child value is user intent and is
/// never overwritten. The entity's own name is not an attribute and never
/// inherits.
pub fn inherit(
    parent: &SharedAttributes,
    child: SharedAttributes,
    settings: Option<&InheritanceSettings>,
) -> SharedAttributes {
    let default_settings = InheritanceSettings::default();
    let settings = settings.unwrap_or(&default_settings);

    SharedAttributes {
        logo: merge(AttributeField::Logo, child.logo, &parent.logo, settings),
        website: merge(AttributeField::Website, child.website, &parent.website, settings),
        year_established: merge(
            AttributeField::YearEstablished,
            child.year_established,
            &parent.year_established,
            settings,
        ),
        mission: merge(AttributeField::Mission, child.mission, &parent.mission, settings),
        vision: merge(AttributeField::Vision, child.vision, &parent.vision, settings),
        overview: merge(
            AttributeField::Overview,
            child.overview,
            &parent.overview,
            settings,
        ),
        goals: merge(AttributeField::Goals, child.goals, &parent.goals, settings),
        ceo_name: merge(
            AttributeField::CeoName,
            child.ceo_name,
            &parent.ceo_name,
            settings,
        ),
        email: merge(AttributeField::Email, child.email, &parent.email, settings),
        phone_numbers: merge(
            AttributeField::PhoneNumbers,
            child.phone_numbers,
            &parent.phone_numbers,
            settings,
        ),
        address: merge(AttributeField::Address, child.address, &parent.address, settings),
        emergency_contact: merge(
            AttributeField::EmergencyContact,
            child.emergency_contact,
            &parent.emergency_contact,
            settings,
        ),
        social_links: merge(
            AttributeField::SocialLinks,
            child.social_links,
            &parent.social_links,
            settings,
        ),
        vat_number: merge(
            AttributeField::VatNumber,
            child.vat_number,
            &parent.vat_number,
            settings,
        ),
        cr_number: merge(
            AttributeField::CrNumber,
            child.cr_number,
            &parent.cr_number,
            settings,
        ),
    }
}

fn merge<T: Clone>(
    field: AttributeField,
    child: Option<T>,
    parent: &Option<T>,
    settings: &InheritanceSettings,
) -> Option<T> {
    if settings.fields_to_override.contains(&field) {
        return child;
    }
    if let Some(allowed) = &settings.fields_to_inherit {
        if !allowed.contains(&field) {
            return child;
        }
    }
    child.or_else(|| parent.clone())
}
