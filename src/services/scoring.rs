use crate::gazetteer;

/// Empirically tuned cutoffs, kept verbatim: their values are a product
/// decision, not something to re-derive here.
pub const ACCEPT_SCORE: u8 = 60;
pub const PRIMARY_CONFIDENCE_FLOOR: u8 = 70;
pub const FALLBACK_CONFIDENCE_FLOOR: u8 = 50;
pub const FALLBACK_SCORE_THRESHOLD: u8 = 40;
pub const EMAIL_CONFIDENCE_FLOOR: u8 = 70;
pub const MAX_CONFIDENCE: u8 = 95;

const NAME_POINTS: u8 = 40;
const COMPANY_FULL_POINTS: u8 = 10;
const COMPANY_WORD_POINTS: u8 = 5;
const PROVINCE_POINTS: u8 = 5;
const CITY_POINTS: u8 = 5;
const COUNTRY_POINTS: u8 = 3;
const LOCATION_CAP: u8 = 10;

const PROFILE_PATH_MARKER: &str = "/in/";

/// Who we are looking for. Everything but the name is optional signal.
#[derive(Debug, Clone, Default)]
pub struct PersonTarget {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
}

/// Bounded 0-100 estimate that `url`/`text` belong to the target person.
///
/// Both name tokens must appear verbatim in the combined slug+text surface or
/// the score is 0 outright, no matter how well company and location match.
/// That hard gate is what rejects snippets where an unrelated person shows up
/// next to the target's first name.
pub fn score_candidate(text: &str, url: &str, target: &PersonTarget) -> u8 {
    let slug = profile_slug(url);
    let surface = format!("{} {}", slug, text).to_lowercase();

    let first = target.first_name.trim().to_lowercase();
    let last = target.last_name.trim().to_lowercase();

    let first_hit = first.chars().count() > 1 && surface.contains(&first);
    let last_hit = last.chars().count() > 1 && surface.contains(&last);
    if !first_hit || !last_hit {
        return 0;
    }

    let mut score = NAME_POINTS + NAME_POINTS;
    score += company_points(&surface, target.company.as_deref());
    score += location_points(&surface, target);

    score.min(100)
}

/// Confidence for a candidate that already cleared `threshold`: the floor
/// plus the margin above the threshold, capped at `MAX_CONFIDENCE`.
pub fn confidence_for(score: u8, threshold: u8, floor: u8) -> u8 {
    let margin = score.saturating_sub(threshold);
    floor.saturating_add(margin).min(MAX_CONFIDENCE)
}

/// Same-name collisions from unrelated professions: a candidate whose text
/// trips the industry blocklist without any company-name corroboration is
/// dropped before scoring.
pub fn incompatible_industry(text: &str, company: &str, blocklist: &[String]) -> bool {
    let lowered = text.to_lowercase();
    let blocked = blocklist.iter().any(|k| lowered.contains(&k.to_lowercase()));
    blocked && !company_corroborated(&lowered, company)
}

fn company_corroborated(lowered_text: &str, company: &str) -> bool {
    company
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .any(|w| lowered_text.contains(w))
}

fn profile_slug(url: &str) -> String {
    url.to_lowercase()
        .split_once(PROFILE_PATH_MARKER)
        .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or("").to_string())
        .unwrap_or_default()
        .replace(['-', '_'], " ")
}

fn company_points(surface: &str, company: Option<&str>) -> u8 {
    let Some(company) = company.map(str::to_lowercase).filter(|c| !c.trim().is_empty()) else {
        return 0;
    };

    if surface.contains(&company) {
        return COMPANY_FULL_POINTS;
    }
    let word_hit = company
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .any(|w| surface.contains(w));
    match word_hit {
        true => COMPANY_WORD_POINTS,
        false => 0,
    }
}

fn location_points(surface: &str, target: &PersonTarget) -> u8 {
    let mut points = 0;

    if let Some(province) = target.province.as_deref() {
        if gazetteer::location_mentioned(province, surface) {
            points += PROVINCE_POINTS;
        }
    }
    if let Some(city) = target.city.as_deref() {
        if gazetteer::location_mentioned(city, surface) {
            points += CITY_POINTS;
        }
    }
    if points == 0 {
        if let Some(country) = target.country.as_deref() {
            if gazetteer::location_mentioned(country, surface) {
                points += COUNTRY_POINTS;
            }
        }
    }

    points.min(LOCATION_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> PersonTarget {
        PersonTarget {
            first_name: "Pablo".to_string(),
            last_name: "Pansa".to_string(),
            company: Some("Fortia".to_string()),
            city: Some("Buenos Aires".to_string()),
            province: None,
            country: Some("Argentina".to_string()),
        }
    }

    #[test]
    fn full_match_scores_ninety_five() {
        let score = score_candidate(
            "Pablo Pansa - Fortia - Buenos Aires",
            "https://www.linkedin.com/in/pablo-pansa",
            &target(),
        );
        assert_eq!(score, 40 + 40 + 10 + 5);
    }

    #[test]
    fn missing_last_name_is_a_hard_zero() {
        // Company and first name co-occur, but "Pansa" is absent: unrelated
        // person in the same snippet.
        let score = score_candidate(
            "Samuel Rodriguez works near Pablo's office, Fortia client",
            "https://www.linkedin.com/in/samuel-rodriguez",
            &target(),
        );
        assert_eq!(score, 0);
    }

    #[test]
    fn location_alone_never_rescues_a_candidate() {
        let score = score_candidate(
            "Fortia, Buenos Aires, Argentina",
            "https://www.linkedin.com/in/otra-persona",
            &target(),
        );
        assert_eq!(score, 0);
    }

    #[test]
    fn score_stays_within_bounds() {
        let mut t = target();
        t.province = Some("Buenos Aires".to_string());
        let score = score_candidate(
            "Pablo Pansa | Fortia | Buenos Aires, Argentina",
            "https://www.linkedin.com/in/pablo-pansa-fortia",
            &t,
        );
        assert!(score <= 100);
    }

    #[test]
    fn location_contribution_caps_at_ten() {
        // Province, city and country all match; without the cap this would
        // be 40+40+13.
        let t = PersonTarget {
            first_name: "Pablo".to_string(),
            last_name: "Pansa".to_string(),
            company: None,
            city: Some("La Plata".to_string()),
            province: Some("Buenos Aires".to_string()),
            country: Some("Argentina".to_string()),
        };
        let score = score_candidate(
            "Pablo Pansa, La Plata, Buenos Aires, Argentina",
            "https://www.linkedin.com/in/pablo-pansa",
            &t,
        );
        assert_eq!(score, 40 + 40 + 10);
    }

    #[test]
    fn names_can_come_from_the_url_slug() {
        let score = score_candidate(
            "Gerente general en Fortia",
            "https://www.linkedin.com/in/pablo-pansa-123",
            &target(),
        );
        assert_eq!(score, 40 + 40 + 10);
    }

    #[test]
    fn single_token_person_gates_on_that_token_alone() {
        // A mononym request repeats the token as both anchors, so one hit
        // satisfies the gate instead of two.
        let t = PersonTarget {
            first_name: "pansa".to_string(),
            last_name: "pansa".to_string(),
            ..Default::default()
        };
        assert_eq!(
            score_candidate("Pansa Consultores", "https://linkedin.com/in/pansa", &t),
            80
        );
        assert_eq!(score_candidate("otra persona", "https://linkedin.com/in/otra", &t), 0);
    }

    #[test]
    fn single_letter_names_never_match() {
        let t = PersonTarget {
            first_name: "P".to_string(),
            last_name: "Pansa".to_string(),
            ..Default::default()
        };
        assert_eq!(score_candidate("p pansa", "https://linkedin.com/in/p-pansa", &t), 0);
    }

    #[test]
    fn company_word_match_scores_half() {
        let t = PersonTarget {
            first_name: "Pablo".to_string(),
            last_name: "Pansa".to_string(),
            company: Some("Fortia Seguridad Integral".to_string()),
            ..Default::default()
        };
        let score = score_candidate(
            "Pablo Pansa trabaja en Fortia",
            "https://www.linkedin.com/in/pablo-pansa",
            &t,
        );
        assert_eq!(score, 40 + 40 + 5);
    }

    #[test]
    fn confidence_is_floored_and_capped() {
        assert_eq!(confidence_for(60, ACCEPT_SCORE, PRIMARY_CONFIDENCE_FLOOR), 70);
        assert_eq!(confidence_for(80, ACCEPT_SCORE, PRIMARY_CONFIDENCE_FLOOR), 90);
        assert_eq!(confidence_for(100, ACCEPT_SCORE, PRIMARY_CONFIDENCE_FLOOR), 95);
        assert_eq!(
            confidence_for(45, FALLBACK_SCORE_THRESHOLD, FALLBACK_CONFIDENCE_FLOOR),
            55
        );
    }

    #[test]
    fn industry_blocklist_needs_company_corroboration_to_pass() {
        let blocklist = vec!["inmobiliaria".to_string(), "abogado".to_string()];
        assert!(incompatible_industry(
            "Pablo Pansa, martillero de inmobiliaria Pansa Propiedades",
            "Fortia",
            &blocklist
        ));
        assert!(!incompatible_industry(
            "Pablo Pansa, asesor de Fortia, ex inmobiliaria",
            "Fortia",
            &blocklist
        ));
        assert!(!incompatible_industry(
            "Pablo Pansa, gerente en Fortia",
            "Fortia",
            &blocklist
        ));
    }
}
