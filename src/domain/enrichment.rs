use serde::Serialize;

use super::company::StructuredCompanyProfile;
use super::sentinel;

/// Immutable input for one enrichment run, built per conversation turn.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentRequest {
    pub person_name: String,
    pub company: String,
    pub website: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
}

/// Which search phase discovered a candidate or news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    WebPage,
    EmailSearch,
    EngineA,
    EngineB,
    RoleSearch,
    Crawler,
}

/// A scored profile hypothesis. Lives in the shared pool keyed by URL until
/// consolidation; sub-threshold candidates never reach the final ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCandidate {
    pub url: String,
    pub text: String,
    pub score: u8,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsMention {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Web,
    SearchFallback,
    #[default]
    None,
}

/// Per-field origin flags for the fused profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileProvenance {
    pub descripcion: FieldSource,
    pub servicios: FieldSource,
    pub email: FieldSource,
    pub telefono: FieldSource,
}

/// Top-level aggregate handed back to the conversation layer. Not the system
/// of record; persistence belongs to an external collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentResult {
    pub profile: StructuredCompanyProfile,
    #[serde(serialize_with = "sentinel::serialize_opt")]
    pub linkedin_personal: Option<String>,
    pub confianza: u8,
    pub fuente: Option<CandidateSource>,
    pub noticias: Vec<NewsMention>,
    pub procedencia: ProfileProvenance,
}

impl EnrichmentRequest {
    /// First and last name tokens used by the scoring gate. Middle tokens are
    /// ignored on purpose: the gate wants the two anchors, not the full form.
    /// A single-token name fills both anchors with the same token, so the
    /// gate then requires only that one hit; zeroing the last name instead
    /// would make single-name requests unmatchable everywhere.
    pub fn name_parts(&self) -> (String, String) {
        let tokens: Vec<&str> = self.person_name.split_whitespace().collect();
        let first = tokens.first().copied().unwrap_or("").to_lowercase();
        let last = tokens.last().copied().unwrap_or("").to_lowercase();
        (first, last)
    }
}
