use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sentinel;

/// Raw material pulled from one external source, before any extraction runs.
/// Owned by a single pipeline invocation and discarded afterwards.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub kind: SourceKind,
    pub url: String,
    pub text: String,
    pub retrieved_at: DateTime<Utc>,
}

impl FetchedDocument {
    pub fn new(kind: SourceKind, url: impl Into<String>, text: impl Into<String>) -> Self {
        FetchedDocument {
            kind,
            url: url.into(),
            text: text.into(),
            retrieved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    RenderedPage,
    SearchEngineSummary,
    SearchEngineResult,
}

/// Regex-derived atoms. All fields deduplicated and filtered against the
/// known-garbage blocklist before they land here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedAtoms {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub whatsapp: Option<String>,
    pub linkedin_company: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub service_categories: Vec<String>,
}

impl ExtractedAtoms {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
            && self.phones.is_empty()
            && self.whatsapp.is_none()
            && self.linkedin_company.is_none()
            && self.instagram.is_none()
            && self.facebook.is_none()
            && self.service_categories.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Success,
    Failed,
}

/// Fused company profile returned to the conversation layer. `None` fields
/// serialize as the "No encontrado" sentinel the downstream collaborators
/// expect.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredCompanyProfile {
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub nombre: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub actividad: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub descripcion: Option<String>,
    pub servicios: Vec<String>,
    #[serde(serialize_with = "sentinel::serialize_list")]
    pub servicios_texto: Vec<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub email_principal: Option<String>,
    pub emails_adicionales: Vec<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub telefono_principal: Option<String>,
    pub telefonos_adicionales: Vec<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub whatsapp: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub direccion: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub ciudad: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub provincia: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub pais: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub horarios: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub linkedin_empresa: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub instagram: Option<String>,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub facebook: Option<String>,
    pub extraction_status: ExtractionStatus,
}

impl Default for StructuredCompanyProfile {
    fn default() -> Self {
        StructuredCompanyProfile {
            nombre: None,
            actividad: None,
            descripcion: None,
            servicios: Vec::new(),
            servicios_texto: Vec::new(),
            email_principal: None,
            emails_adicionales: Vec::new(),
            telefono_principal: None,
            telefonos_adicionales: Vec::new(),
            whatsapp: None,
            direccion: None,
            ciudad: None,
            provincia: None,
            pais: None,
            horarios: None,
            linkedin_empresa: None,
            instagram: None,
            facebook: None,
            extraction_status: ExtractionStatus::Failed,
        }
    }
}
