use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::ExtractedAtoms;

/// How much raw page content rides along in the extraction prompt.
pub const CONTENT_CHAR_BUDGET: usize = 6_000;

const MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 1_000;

/// What the model hands back, all-optional. An empty value is the normal
/// outcome of any parse or transport failure; the merge resolver is built to
/// tolerate total absence.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmProfile {
    pub nombre: Option<String>,
    pub actividad: Option<String>,
    pub descripcion: Option<String>,
    pub servicios: Vec<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub whatsapp: Option<String>,
    pub direccion: Option<String>,
    pub ciudad: Option<String>,
    pub provincia: Option<String>,
    pub pais: Option<String>,
    pub horarios: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

impl LlmProfile {
    pub fn is_empty(&self) -> bool {
        self == &LlmProfile::default()
    }
}

#[async_trait]
pub trait CompanyStructurer: Send + Sync {
    /// Single-prompt extraction. Never errors: anything that goes wrong
    /// degrades to an empty profile and the caller falls back to regex and
    /// search-answer data.
    async fn structure(
        &self,
        raw_text: &str,
        atoms: &ExtractedAtoms,
        search_answer: Option<&str>,
    ) -> LlmProfile;
}

pub struct OpenaiClient {
    client: Client<OpenAIConfig>,
}

impl Default for OpenaiClient {
    fn default() -> Self {
        OpenaiClient {
            client: Client::new(),
        }
    }
}

impl OpenaiClient {
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        OpenaiClient {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl CompanyStructurer for OpenaiClient {
    async fn structure(
        &self,
        raw_text: &str,
        atoms: &ExtractedAtoms,
        search_answer: Option<&str>,
    ) -> LlmProfile {
        let prompt = build_prompt(raw_text, atoms, search_answer);

        let message = match ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
        {
            Ok(message) => message,
            Err(e) => {
                log::error!("Failed to build chat message: {:?}", e);
                return LlmProfile::default();
            }
        };

        let request = match CreateChatCompletionRequestArgs::default()
            .model(MODEL)
            .messages([message.into()])
            .max_tokens(MAX_TOKENS)
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                log::error!("Failed to build chat request: {:?}", e);
                return LlmProfile::default();
            }
        };

        let response = match self.client.chat().create(request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Openai request failed: {:?}", e);
                return LlmProfile::default();
            }
        };

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());

        match content {
            Some(content) => parse_profile_json(&content),
            None => {
                log::error!("No content in Openai response");
                LlmProfile::default()
            }
        }
    }
}

fn build_prompt(raw_text: &str, atoms: &ExtractedAtoms, search_answer: Option<&str>) -> String {
    let content: String = raw_text.chars().take(CONTENT_CHAR_BUDGET).collect();

    let mut prompt = String::from(
        "Extraé los datos de la siguiente empresa a partir del contenido de su sitio web. \
         Respondé ÚNICAMENTE con un JSON válido, sin texto adicional, con estas claves: \
         nombre, actividad, descripcion, servicios (lista), email, telefono, whatsapp, \
         direccion, ciudad, provincia, pais, horarios, linkedin, instagram, facebook. \
         Usá \"No encontrado\" cuando un dato no aparezca.\n",
    );

    if !atoms.emails.is_empty() || !atoms.phones.is_empty() {
        prompt.push_str(&format!(
            "\nDatos ya detectados (reutilizalos, no los re-derives): emails: {:?}, telefonos: {:?}\n",
            atoms.emails, atoms.phones
        ));
    }
    if let Some(answer) = search_answer {
        prompt.push_str(&format!(
            "\nResumen de un buscador (copialo textual en descripcion si el sitio no tiene una mejor): {}\n",
            answer
        ));
    }
    prompt.push_str("\nContenido del sitio:\n");
    prompt.push_str(&content);

    prompt
}

/// Strict-JSON parse of a model reply: strip code fences, slice from the
/// first `{` to the last `}`, deserialize. Anything else is an empty profile.
pub fn parse_profile_json(content: &str) -> LlmProfile {
    let cleaned = content.replace("```json", "").replace("```", "");
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');

    let slice = match (start, end) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => {
            log::warn!("Openai reply had no JSON object");
            return LlmProfile::default();
        }
    };

    match serde_json::from_str::<LlmProfile>(slice) {
        Ok(profile) => profile,
        Err(e) => {
            log::warn!("Failed to parse Openai reply as JSON: {:?}", e);
            LlmProfile::default()
        }
    }
}
