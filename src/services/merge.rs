use crate::domain::sentinel::{is_sentinel, non_sentinel};
use crate::domain::{
    ExtractedAtoms, ExtractionStatus, FieldSource, ProfileProvenance, StructuredCompanyProfile,
};

use super::extractor::strip_query_params;
use super::openai_client::LlmProfile;

/// Model descriptions shorter than this read like headings, not descriptions.
const MIN_DESCRIPTION_LEN: usize = 50;

/// A "description" carrying these is really a contact block the model failed
/// to separate out.
const CONTACT_KEYWORDS: &[&str] = &[
    "teléfono",
    "telefono",
    "phone",
    "email",
    "e-mail",
    "correo",
    "whatsapp",
    "dirección",
    "direccion",
    "address",
];

/// Coarse activity vocabulary, first match wins in this order.
const ACTIVITY_VOCABULARY: &[(&[&str], &str)] = &[
    (&["distribu"], "Distribución"),
    (&["tecnolog", "technolog"], "Tecnología"),
    (&["segur", "security"], "Seguridad"),
    (&["software"], "Software"),
    (&["redes", "network"], "Redes"),
];

/// Field-by-field reconciliation of the model output with the regex atoms
/// and the search-engine answer.
pub fn merge(
    llm: LlmProfile,
    atoms: &ExtractedAtoms,
    search_answer: Option<&str>,
) -> (StructuredCompanyProfile, ProfileProvenance) {
    let mut provenance = ProfileProvenance::default();

    let answer = search_answer
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from);

    let descripcion = match non_sentinel(llm.descripcion).filter(|d| description_usable(d)) {
        Some(model_description) => {
            provenance.descripcion = FieldSource::Web;
            Some(model_description)
        }
        None => {
            if answer.is_some() {
                provenance.descripcion = FieldSource::SearchFallback;
            }
            answer.clone()
        }
    };

    let servicios: Vec<String> = {
        let from_model: Vec<String> = llm
            .servicios
            .into_iter()
            .filter(|s| !is_sentinel(s))
            .collect();
        match from_model.is_empty() {
            true => atoms.service_categories.clone(),
            false => from_model,
        }
    };
    if !servicios.is_empty() {
        provenance.servicios = FieldSource::Web;
    }

    let actividad = non_sentinel(llm.actividad)
        .or_else(|| descripcion.as_deref().and_then(derive_activity));

    let (email_principal, emails_adicionales) =
        pick_principal(non_sentinel(llm.email).filter(|e| e.contains('@')), &atoms.emails);
    if email_principal.is_some() {
        provenance.email = FieldSource::Web;
    }

    let (telefono_principal, telefonos_adicionales) =
        pick_principal(non_sentinel(llm.telefono), &atoms.phones);
    if telefono_principal.is_some() {
        provenance.telefono = FieldSource::Web;
    }

    let whatsapp = non_sentinel(llm.whatsapp).or_else(|| atoms.whatsapp.clone());

    let linkedin_empresa = social(non_sentinel(llm.linkedin), &atoms.linkedin_company);
    let instagram = social(non_sentinel(llm.instagram), &atoms.instagram);
    let facebook = social(non_sentinel(llm.facebook), &atoms.facebook);

    let profile = StructuredCompanyProfile {
        nombre: non_sentinel(llm.nombre),
        actividad,
        descripcion,
        servicios_texto: servicios.clone(),
        servicios,
        email_principal,
        emails_adicionales,
        telefono_principal,
        telefonos_adicionales,
        whatsapp,
        direccion: non_sentinel(llm.direccion),
        ciudad: non_sentinel(llm.ciudad),
        provincia: non_sentinel(llm.provincia),
        pais: non_sentinel(llm.pais),
        horarios: non_sentinel(llm.horarios),
        linkedin_empresa,
        instagram,
        facebook,
        extraction_status: ExtractionStatus::Failed,
    };

    let status = match profile_has_data(&profile) {
        true => ExtractionStatus::Success,
        false => ExtractionStatus::Failed,
    };

    (
        StructuredCompanyProfile {
            extraction_status: status,
            ..profile
        },
        provenance,
    )
}

fn description_usable(description: &str) -> bool {
    let lowered = description.to_lowercase();
    description.chars().count() >= MIN_DESCRIPTION_LEN
        && !CONTACT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

fn derive_activity(description: &str) -> Option<String> {
    let lowered = description.to_lowercase();
    ACTIVITY_VOCABULARY
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, label)| label.to_string())
}

/// Model value wins when present; the regex candidates fill the principal
/// slot otherwise and the rest become additional values either way.
fn pick_principal(model_value: Option<String>, candidates: &[String]) -> (Option<String>, Vec<String>) {
    match model_value {
        Some(value) => {
            let extra = candidates.iter().filter(|c| **c != value).cloned().collect();
            (Some(value), extra)
        }
        None => match candidates.split_first() {
            Some((first, rest)) => (Some(first.clone()), rest.to_vec()),
            None => (None, Vec::new()),
        },
    }
}

fn social(model_value: Option<String>, atom: &Option<String>) -> Option<String> {
    model_value
        .or_else(|| atom.clone())
        .map(|url| strip_query_params(&url))
}

fn profile_has_data(profile: &StructuredCompanyProfile) -> bool {
    profile.nombre.is_some()
        || profile.descripcion.is_some()
        || !profile.servicios.is_empty()
        || profile.email_principal.is_some()
        || profile.telefono_principal.is_some()
        || profile.whatsapp.is_some()
        || profile.linkedin_empresa.is_some()
        || profile.instagram.is_some()
        || profile.facebook.is_some()
}
