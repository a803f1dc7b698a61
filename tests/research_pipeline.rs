use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prospector::configuration::FilterSettings;
use prospector::domain::{CandidateSource, EnrichmentRequest, ExtractedAtoms, ExtractionStatus};
use prospector::services::{
    CompanyStructurer, CrawledPage, Enricher, FetchError, LlmProfile, NewsCrawler, PageText,
    SearchEngine, SearchHit, SearchItem, SearchQuery, SearchResponse, SiteSearch,
};

struct NoPage;

#[async_trait]
impl PageText for NoPage {
    async fn fetch_text(&self, _url: &str) -> Result<Option<String>, FetchError> {
        Ok(None)
    }
}

struct StaticHtml(&'static str);

#[async_trait]
impl PageText for StaticHtml {
    async fn fetch_text(&self, _url: &str) -> Result<Option<String>, FetchError> {
        Ok(Some(self.0.to_string()))
    }
}

/// Routes queries by substring; unmatched queries come back empty. Records
/// every query it saw.
struct RoutedSearch {
    routes: Vec<(&'static str, SearchResponse)>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl RoutedSearch {
    fn new(routes: Vec<(&'static str, SearchResponse)>) -> Self {
        RoutedSearch {
            routes,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl SearchEngine for RoutedSearch {
    async fn search(&self, query: SearchQuery) -> Result<SearchResponse, FetchError> {
        self.seen.lock().unwrap().push(query.query.clone());
        for (needle, response) in &self.routes {
            if query.query.contains(needle) {
                return Ok(response.clone());
            }
        }
        Ok(SearchResponse::default())
    }
}

struct FailingSearch;

#[async_trait]
impl SearchEngine for FailingSearch {
    async fn search(&self, _query: SearchQuery) -> Result<SearchResponse, FetchError> {
        Err(FetchError::Status(500))
    }
}

struct StaticSiteSearch(Vec<SearchItem>);

#[async_trait]
impl SiteSearch for StaticSiteSearch {
    async fn search_site(&self, _query: &str, _site: &str) -> Result<Vec<SearchItem>, FetchError> {
        Ok(self.0.clone())
    }
}

struct FailingSiteSearch;

#[async_trait]
impl SiteSearch for FailingSiteSearch {
    async fn search_site(&self, _query: &str, _site: &str) -> Result<Vec<SearchItem>, FetchError> {
        Err(FetchError::Status(500))
    }
}

struct NullStructurer;

#[async_trait]
impl CompanyStructurer for NullStructurer {
    async fn structure(
        &self,
        _raw_text: &str,
        _atoms: &ExtractedAtoms,
        _search_answer: Option<&str>,
    ) -> LlmProfile {
        LlmProfile::default()
    }
}

struct StubCrawler(Vec<CrawledPage>);

#[async_trait]
impl NewsCrawler for StubCrawler {
    async fn crawl(
        &self,
        _start_urls: Vec<String>,
        _max_pages: u32,
    ) -> Result<Vec<CrawledPage>, FetchError> {
        Ok(self.0.clone())
    }
}

struct SlowCrawler;

#[async_trait]
impl NewsCrawler for SlowCrawler {
    async fn crawl(
        &self,
        _start_urls: Vec<String>,
        _max_pages: u32,
    ) -> Result<Vec<CrawledPage>, FetchError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(vec![CrawledPage {
            url: "https://diario.com/demasiado-tarde".to_string(),
            title: "Fortia".to_string(),
            text: "Fortia llegó tarde".to_string(),
        }])
    }
}

fn hit(url: &str, title: &str, content: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        raw_content: None,
    }
}

fn item(link: &str, title: &str, snippet: &str) -> SearchItem {
    SearchItem {
        link: link.to_string(),
        title: title.to_string(),
        snippet: snippet.to_string(),
    }
}

fn request() -> EnrichmentRequest {
    EnrichmentRequest {
        person_name: "Pablo Pansa".to_string(),
        company: "Fortia".to_string(),
        website: None,
        city: None,
        province: None,
        country: Some("Argentina".to_string()),
        email: None,
    }
}

fn enricher(
    site_html: Arc<dyn PageText>,
    search: Option<Arc<dyn SearchEngine>>,
    site_search: Option<Arc<dyn SiteSearch>>,
    crawler: Option<Arc<dyn NewsCrawler>>,
) -> Enricher {
    Enricher::from_parts(
        Arc::new(NoPage),
        site_html,
        search,
        site_search,
        Arc::new(NullStructurer),
        crawler,
        FilterSettings::default(),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn every_phase_empty_degrades_to_not_found() {
    let e = enricher(
        Arc::new(NoPage),
        Some(Arc::new(RoutedSearch::empty())),
        Some(Arc::new(StaticSiteSearch(Vec::new()))),
        None,
    );
    let mut req = request();
    req.website = Some("https://fortia.com.ar".to_string());
    req.email = Some("ppansa@fortia.com.ar".to_string());

    let result = e.research_person_and_company(&req).await;

    assert_eq!(result.linkedin_personal, None);
    assert_eq!(result.confianza, 0);
    assert_eq!(result.fuente, None);
    assert!(result.noticias.is_empty());
    assert_eq!(result.profile.extraction_status, ExtractionStatus::Failed);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["linkedin_personal"], "No encontrado");
}

#[tokio::test]
async fn failing_sources_contribute_nothing_instead_of_erroring() {
    let e = enricher(
        Arc::new(NoPage),
        Some(Arc::new(FailingSearch)),
        Some(Arc::new(FailingSiteSearch)),
        None,
    );
    let mut req = request();
    req.website = Some("fortia.com.ar".to_string());
    req.email = Some("ppansa@fortia.com.ar".to_string());

    let result = e.research_person_and_company(&req).await;
    assert_eq!(result.linkedin_personal, None);
    assert_eq!(result.confianza, 0);
}

#[tokio::test]
async fn web_page_scan_finds_and_scores_profiles() {
    let html = r#"<html><body>
        <h2>Equipo</h2>
        <p>Pablo Pansa, Gerente General de Fortia, Buenos Aires.
           <a href="https://www.linkedin.com/in/pablo-pansa">LinkedIn</a></p>
    </body></html>"#;

    let e = enricher(Arc::new(StaticHtml(html)), None, None, None);
    let mut req = request();
    req.website = Some("fortia.com.ar".to_string());
    req.city = Some("Buenos Aires".to_string());

    let result = e.research_person_and_company(&req).await;

    assert_eq!(
        result.linkedin_personal.as_deref(),
        Some("https://www.linkedin.com/in/pablo-pansa")
    );
    assert_eq!(result.fuente, Some(CandidateSource::WebPage));
    assert!(result.confianza >= 90);
}

#[tokio::test]
async fn email_hit_gets_floor_confidence_even_without_name() {
    let items = vec![item(
        "https://www.linkedin.com/in/perfil-reservado",
        "Perfil privado",
        "",
    )];
    let e = enricher(Arc::new(NoPage), None, Some(Arc::new(StaticSiteSearch(items))), None);
    let mut req = request();
    req.email = Some("ppansa@fortia.com.ar".to_string());

    let result = e.research_person_and_company(&req).await;

    assert_eq!(result.confianza, 70);
    assert_eq!(result.fuente, Some(CandidateSource::EmailSearch));
}

#[tokio::test]
async fn duplicate_url_across_phases_keeps_max_score_once() {
    let html = r#"<p>Pablo Pansa, Gerente General de Fortia
        <a href="https://www.linkedin.com/in/pablo-pansa">perfil</a></p>"#;
    let items = vec![item(
        "https://www.linkedin.com/in/pablo-pansa?trk=mail",
        "Pablo Pansa",
        "",
    )];

    let e = enricher(
        Arc::new(StaticHtml(html)),
        None,
        Some(Arc::new(StaticSiteSearch(items))),
        None,
    );
    let mut req = request();
    req.website = Some("fortia.com.ar".to_string());
    req.email = Some("ppansa@fortia.com.ar".to_string());

    let result = e.research_person_and_company(&req).await;

    let urls = result.linkedin_personal.expect("one candidate expected");
    assert_eq!(urls.lines().count(), 1);
    assert_eq!(result.fuente, Some(CandidateSource::WebPage));
    assert_eq!(result.confianza, 90);
}

#[tokio::test]
async fn engine_b_loses_when_engine_a_is_more_confident() {
    let engine_a = RoutedSearch::new(vec![(
        "Pablo Pansa",
        SearchResponse {
            answer: None,
            results: vec![hit(
                "https://www.linkedin.com/in/pablo-pansa",
                "Pablo Pansa - Fortia",
                "Gerente General en Fortia, Argentina",
            )],
        },
    )]);
    let engine_b = StaticSiteSearch(vec![item(
        "https://www.linkedin.com/in/pablo-pansa-2",
        "Pablo Pansa",
        "Consultor independiente",
    )]);

    let e = enricher(Arc::new(NoPage), Some(Arc::new(engine_a)), Some(Arc::new(engine_b)), None);
    let result = e.research_person_and_company(&request()).await;

    assert_eq!(
        result.linkedin_personal.as_deref(),
        Some("https://www.linkedin.com/in/pablo-pansa")
    );
    assert_eq!(result.fuente, Some(CandidateSource::EngineA));
    assert_eq!(result.confianza, 95);
}

#[tokio::test]
async fn engine_b_wins_when_engine_a_finds_nothing() {
    let engine_b = StaticSiteSearch(vec![item(
        "https://www.linkedin.com/in/pablo-pansa",
        "Pablo Pansa",
        "Fortia",
    )]);

    let e = enricher(
        Arc::new(NoPage),
        Some(Arc::new(RoutedSearch::empty())),
        Some(Arc::new(engine_b)),
        None,
    );
    let result = e.research_person_and_company(&request()).await;

    assert_eq!(result.fuente, Some(CandidateSource::EngineB));
    assert!(result.confianza >= 70);
}

#[tokio::test]
async fn role_search_fills_a_thin_pool() {
    let search = RoutedSearch::new(vec![(
        "fundador",
        SearchResponse {
            answer: None,
            results: vec![hit(
                "https://www.linkedin.com/in/pablo-pansa",
                "Pablo Pansa, fundador de Fortia",
                "Fortia, Argentina",
            )],
        },
    )]);

    let e = enricher(Arc::new(NoPage), Some(Arc::new(search)), None, None);
    let result = e.research_person_and_company(&request()).await;

    assert_eq!(result.fuente, Some(CandidateSource::RoleSearch));
    assert!(result.confianza >= 60);
}

#[tokio::test]
async fn role_search_is_skipped_when_pool_is_full_enough() {
    let search = RoutedSearch::new(vec![(
        "Pablo Pansa",
        SearchResponse {
            answer: None,
            results: vec![
                hit(
                    "https://www.linkedin.com/in/pablo-pansa",
                    "Pablo Pansa - Fortia",
                    "Gerente General en Fortia, Argentina",
                ),
                hit(
                    "https://www.linkedin.com/in/pablo-pansa-fortia",
                    "Pablo Pansa",
                    "Fortia",
                ),
            ],
        },
    )]);
    let seen = search.seen.clone();

    let e = enricher(Arc::new(NoPage), Some(Arc::new(search)), None, None);
    let _ = e.research_person_and_company(&request()).await;

    let queries = seen.lock().unwrap();
    assert!(
        !queries.iter().any(|q| q.contains("fundador")),
        "role queries should not run with two accepted candidates: {:?}",
        *queries
    );
}

#[tokio::test]
async fn news_gates_drop_junk_search_pages_and_legal_filings() {
    let search = RoutedSearch::new(vec![(
        "noticias",
        SearchResponse {
            answer: None,
            results: vec![
                hit(
                    "https://eldiario.com.ar/economia/fortia-inaugura-planta",
                    "Fortia inaugura una planta",
                    "La empresa Fortia anunció su expansión",
                ),
                hit(
                    "https://listado.mercadolibre.com.ar/fortia",
                    "Fortia en venta",
                    "Productos Fortia",
                ),
                hit(
                    "https://buscador.com/search?q=fortia",
                    "Resultados para Fortia",
                    "Fortia resultados",
                ),
                hit(
                    "https://eldiario.com.ar/edicto-societario-fortia",
                    "Edicto Fortia SA",
                    "Constitución de sociedad Fortia",
                ),
                hit(
                    "https://eldiario.com.ar/otra-nota",
                    "Nota sin relación",
                    "nada que ver con la búsqueda",
                ),
                hit(
                    "https://eldiario.com.ar/nota-fortia?q=destacada",
                    "Fortia destacada",
                    "Fortia entre las empresas del año",
                ),
            ],
        },
    )]);

    let e = enricher(Arc::new(NoPage), Some(Arc::new(search)), None, None);
    let result = e.research_person_and_company(&request()).await;

    let urls: Vec<&str> = result.noticias.iter().map(|n| n.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://eldiario.com.ar/economia/fortia-inaugura-planta",
            // a q query parameter alone does not make an article a search page
            "https://eldiario.com.ar/nota-fortia?q=destacada",
        ]
    );
    assert_eq!(result.noticias[0].source, CandidateSource::EngineA);
}

#[tokio::test]
async fn news_falls_back_to_crawler_when_search_is_empty() {
    let crawler = StubCrawler(vec![
        CrawledPage {
            url: "https://eldiario.com.ar/fortia-crece".to_string(),
            title: "Fortia crece".to_string(),
            text: "La empresa Fortia anunció nuevas oficinas en Córdoba".to_string(),
        },
        CrawledPage {
            url: "https://boletinoficial.gob.ar/aviso/123".to_string(),
            title: "Aviso Fortia".to_string(),
            text: "Edicto".to_string(),
        },
    ]);

    let e = enricher(
        Arc::new(NoPage),
        Some(Arc::new(RoutedSearch::empty())),
        None,
        Some(Arc::new(crawler)),
    );
    let result = e.research_person_and_company(&request()).await;

    assert_eq!(result.noticias.len(), 1);
    assert_eq!(result.noticias[0].source, CandidateSource::Crawler);
}

#[tokio::test]
async fn slow_news_crawl_is_cancelled_by_the_timeout() {
    let e = Enricher::from_parts(
        Arc::new(NoPage),
        Arc::new(NoPage),
        Some(Arc::new(RoutedSearch::empty())),
        None,
        Arc::new(NullStructurer),
        Some(Arc::new(SlowCrawler)),
        FilterSettings::default(),
        Duration::from_millis(30),
    );

    let result = e.research_person_and_company(&request()).await;
    assert!(result.noticias.is_empty());
}
