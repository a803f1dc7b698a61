use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api_keys: ApiKeySettings,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub filters: FilterSettings,
}

/// An empty key means "source not configured": the phases that need it are
/// skipped, never treated as an error.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiKeySettings {
    #[serde(default)]
    pub openai: String,
    #[serde(default)]
    pub tavily: String,
    #[serde(default)]
    pub google_search: String,
    #[serde(default)]
    pub google_search_cx: String,
    #[serde(default)]
    pub page_proxy: String,
    #[serde(default)]
    pub crawler: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_page_proxy_url")]
    pub page_proxy_url: String,
    #[serde(default = "default_tavily_url")]
    pub tavily_url: String,
    #[serde(default = "default_google_search_url")]
    pub google_search_url: String,
    #[serde(default = "default_crawler_url")]
    pub crawler_url: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            page_proxy_url: default_page_proxy_url(),
            tavily_url: default_tavily_url(),
            google_search_url: default_google_search_url(),
            crawler_url: default_crawler_url(),
        }
    }
}

fn default_page_proxy_url() -> String {
    "https://r.jina.ai".to_string()
}

fn default_tavily_url() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_google_search_url() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_crawler_url() -> String {
    "https://api.apify.com/v2".to_string()
}

/// Hand-curated, Spanish/LatAm-biased lists. Config data rather than code so
/// other locales can swap them without touching the scoring logic.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_industry_blocklist")]
    pub industry_blocklist: Vec<String>,
    #[serde(default = "default_junk_news_domains")]
    pub junk_news_domains: Vec<String>,
    #[serde(default = "default_legal_url_markers")]
    pub legal_url_markers: Vec<String>,
    #[serde(default = "default_legal_keywords")]
    pub legal_keywords: Vec<String>,
    #[serde(default = "default_role_keywords")]
    pub role_keywords: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            industry_blocklist: default_industry_blocklist(),
            junk_news_domains: default_junk_news_domains(),
            legal_url_markers: default_legal_url_markers(),
            legal_keywords: default_legal_keywords(),
            role_keywords: default_role_keywords(),
        }
    }
}

fn default_industry_blocklist() -> Vec<String> {
    [
        "abogado",
        "abogada",
        "estudio jurídico",
        "estudio juridico",
        "law firm",
        "attorney",
        "médico",
        "medico",
        "medicina",
        "clínica",
        "clinica",
        "odontólogo",
        "odontologo",
        "inmobiliaria",
        "real estate",
        "martillero",
        "bienes raíces",
        "bienes raices",
        "pintura",
        "pintor",
        "painting services",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_junk_news_domains() -> Vec<String> {
    [
        "scribd.com",
        "issuu.com",
        "slideshare.net",
        "academia.edu",
        "mercadolibre.com",
        "alamaula.com",
        "olx.com",
        "amazon.com",
        "linkedin.com",
        "facebook.com",
        "instagram.com",
        "twitter.com",
        "x.com",
        "youtube.com",
        "pinterest.com",
        "boletinoficial.gob.ar",
        "argentina.gob.ar",
        "dateas.com",
        "cuit-online.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_legal_url_markers() -> Vec<String> {
    ["edicto", "boletin-oficial", "boletinoficial", "expediente", "licitacion"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_legal_keywords() -> Vec<String> {
    [
        "edicto",
        "sucesorio",
        "quiebra",
        "concurso preventivo",
        "remate judicial",
        "expediente judicial",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_role_keywords() -> Vec<String> {
    ["fundador", "CEO", "dueño", "director", "gerente general"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Optional `configuration.yaml` in the working directory plus `APP_`
/// environment overrides (`APP_API_KEYS__OPENAI=...`). Every field has a
/// default, so a bare environment still yields a usable `Settings`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;

    settings.try_deserialize::<Settings>()
}
