use std::collections::HashSet;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use url::Url;

use crate::domain::ExtractedAtoms;

const MAX_PHONES: usize = 5;
const MAX_SERVICES: usize = 10;
const MIN_PHONE_DIGITS: usize = 7;
const SERVICE_MIN_LEN: usize = 3;
const SERVICE_MAX_LEN: usize = 30;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email regex")
});

// Four independent phone shapes; a hit still has to survive the digit-count
// filter below.
static PHONE_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"tel:([+\d][\d\-\.\s()]{5,})").expect("tel regex"),
        Regex::new(r"\+\d{1,3}[\s\-.]?\(?\d{1,4}\)?[\s\-.]?\d{3,4}[\s\-.]?\d{2,4}")
            .expect("intl phone regex"),
        Regex::new(r"\(\d{2,4}\)\s?\d{3,4}[\s\-]?\d{3,4}").expect("area-code phone regex"),
        Regex::new(r"\b\d{2,4}[\s\-]\d{3,4}[\s\-]\d{3,4}\b").expect("grouped phone regex"),
    ]
});

static WHATSAPP_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"wa\.me/(\+?\d{7,15})").expect("wa.me regex"),
        Regex::new(r#"api\.whatsapp\.com/send\?(?:[^\s"'>]*&)?phone=(\+?\d{7,15})"#)
            .expect("whatsapp api regex"),
    ]
});

static LINKEDIN_COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[a-z]{2,3}\.)?linkedin\.com/company/[A-Za-z0-9\-_.%]+")
        .expect("linkedin company regex")
});

static INSTAGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?instagram\.com/[A-Za-z0-9_.]+[A-Za-z0-9_./]*")
        .expect("instagram regex")
});

static FACEBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?facebook\.com/[A-Za-z0-9.\-]+[A-Za-z0-9.\-/]*")
        .expect("facebook regex")
});

static SERVICE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:servicios|productos|categor[ií]as)\s*:\s*([^\r\n<]+)")
        .expect("service label regex")
});

/// Emails containing any of these are template fixtures, not contacts.
const EMAIL_GARBAGE: &[&str] = &[
    "example",
    "domain.com",
    "email.com",
    "tudominio",
    "sentry",
    "wixpress",
];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Industry keywords scanned literally against the uppercased text.
const INDUSTRY_KEYWORDS: &[&str] = &[
    "SEGURIDAD",
    "VIGILANCIA",
    "MONITOREO",
    "ALARMAS",
    "CCTV",
    "TECNOLOGÍA",
    "TECNOLOGIA",
    "SOFTWARE",
    "HARDWARE",
    "REDES",
    "TELECOMUNICACIONES",
    "INFORMÁTICA",
    "INFORMATICA",
    "DISTRIBUCIÓN",
    "DISTRIBUCION",
    "LOGÍSTICA",
    "LOGISTICA",
    "TRANSPORTE",
    "CONSULTORÍA",
    "CONSULTORIA",
    "MARKETING",
    "CONSTRUCCIÓN",
    "CONSTRUCCION",
    "ENERGÍA",
    "AGRO",
    "ALIMENTOS",
    "AUTOMOTRIZ",
    "FINANZAS",
    "SEGUROS",
    "TURISMO",
];

/// Pure regex pass over raw fetched text. No I/O, no hidden state: calling it
/// twice on the same input yields the same atoms.
pub fn extract(text: &str) -> ExtractedAtoms {
    ExtractedAtoms {
        emails: extract_emails(text),
        phones: extract_phones(text),
        whatsapp: extract_whatsapp(text),
        linkedin_company: first_social(&LINKEDIN_COMPANY_RE, text, &[]),
        instagram: first_social(&INSTAGRAM_RE, text, &["/p/", "/reel/", "/explore", "/stories/"]),
        facebook: first_social(&FACEBOOK_RE, text, &["/posts/", "/photo", "/sharer", "/watch"]),
        service_categories: extract_services(text),
    }
}

/// Query params and fragments off, trailing slash off. Social links carry
/// tracking junk more often than not.
pub fn strip_query_params(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}

fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| !EMAIL_GARBAGE.iter().any(|g| email.contains(g)))
        .filter(|email| !IMAGE_EXTENSIONS.iter().any(|ext| email.ends_with(ext)))
        .unique()
        .collect()
}

fn extract_phones(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();

    for re in PHONE_RES.iter() {
        for captures in re.captures_iter(text) {
            let raw = captures
                .get(1)
                .unwrap_or_else(|| captures.get(0).expect("regex match has group 0"))
                .as_str()
                .trim();
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() < MIN_PHONE_DIGITS {
                continue;
            }
            if seen.insert(digits) {
                phones.push(raw.to_string());
            }
            if phones.len() == MAX_PHONES {
                return phones;
            }
        }
    }

    phones
}

fn extract_whatsapp(text: &str) -> Option<String> {
    WHATSAPP_RES
        .iter()
        .find_map(|re| re.captures(text))
        .map(|captures| captures[1].to_string())
}

fn first_social(re: &Regex, text: &str, excluded_paths: &[&str]) -> Option<String> {
    re.find_iter(text)
        .map(|m| m.as_str())
        .find(|url| !excluded_paths.iter().any(|p| url.contains(p)))
        .map(strip_query_params)
}

fn extract_services(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    let mut services: Vec<String> = INDUSTRY_KEYWORDS
        .iter()
        .filter(|keyword| upper.contains(**keyword))
        .map(|keyword| keyword.to_lowercase())
        .collect();

    for captures in SERVICE_LABEL_RE.captures_iter(text) {
        for item in captures[1].split([',', ';', '|']) {
            let item = item.trim().trim_end_matches('.').to_lowercase();
            if (SERVICE_MIN_LEN..=SERVICE_MAX_LEN).contains(&item.chars().count()) {
                services.push(item);
            }
        }
    }

    services.into_iter().unique().take(MAX_SERVICES).collect()
}
