use std::sync::{Arc, LazyLock};
use std::time::Duration;

use itertools::Itertools;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::configuration::{FilterSettings, Settings};
use crate::domain::{
    CandidateSource, EnrichmentRequest, EnrichmentResult, FetchedDocument, NewsMention,
    ProfileCandidate, ProfileProvenance, SourceKind, StructuredCompanyProfile,
};

use super::extractor::{self, strip_query_params};
use super::fetchers::{
    CrawlerNewsClient, GoogleCseSearch, NewsCrawler, PageText, RawHtmlFetcher,
    RenderedPageFetcher, SearchEngine, SearchItem, SearchQuery, SiteSearch, TavilySearch,
};
use super::merge::merge;
use super::openai_client::{CompanyStructurer, LlmProfile, OpenaiClient};
use super::scoring::{
    self, confidence_for, incompatible_industry, score_candidate, PersonTarget,
};

const LINKEDIN_PROFILE_SITE: &str = "linkedin.com/in";
const MAX_FINAL_CANDIDATES: usize = 5;
const MAX_NEWS: usize = 10;
const NEWS_CRAWL_TIMEOUT: Duration = Duration::from_secs(90);
const NEWS_CRAWL_MAX_PAGES: u32 = 20;
/// Role search only runs when the pool is this thin.
const ROLE_SEARCH_MIN_POOL: usize = 2;
const ROLE_QUERY_MAX_RESULTS: u8 = 3;
/// Characters of page text kept around a profile-URL hit as its snippet.
const SCAN_CONTEXT_WINDOW: usize = 300;

/// Likely pages for a team/contact scan of the company's own site.
const SCAN_PATHS: &[&str] = &["", "about", "nosotros", "equipo", "team", "contacto", "contact"];

static PROFILE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[a-z]{2,3}\.)?linkedin\.com/in/[A-Za-z0-9%_.\-]+")
        .expect("profile url regex")
});

/// Path segments that mark a search-results page rather than an article.
/// Matching on the path keeps articles that merely carry a `q` query
/// parameter.
const SEARCH_PAGE_SEGMENTS: &[&str] = &["search", "buscar"];

/// Drives the whole enrichment: company-profile pipeline plus the multi-phase
/// person/news research. Optional collaborators model missing credentials;
/// a `None` source is skipped, never an error.
pub struct Enricher {
    rendered_page: Arc<dyn PageText>,
    site_html: Arc<dyn PageText>,
    search: Option<Arc<dyn SearchEngine>>,
    site_search: Option<Arc<dyn SiteSearch>>,
    structurer: Arc<dyn CompanyStructurer>,
    crawler: Option<Arc<dyn NewsCrawler>>,
    filters: FilterSettings,
    news_crawl_timeout: Duration,
}

impl Enricher {
    pub fn new(settings: &Settings) -> Self {
        let keys = &settings.api_keys;
        let sources = &settings.sources;

        let search: Option<Arc<dyn SearchEngine>> = match keys.tavily.is_empty() {
            true => None,
            false => Some(Arc::new(TavilySearch::new(sources, keys))),
        };
        let site_search: Option<Arc<dyn SiteSearch>> =
            match keys.google_search.is_empty() || keys.google_search_cx.is_empty() {
                true => None,
                false => Some(Arc::new(GoogleCseSearch::new(sources, keys))),
            };
        let crawler: Option<Arc<dyn NewsCrawler>> = match keys.crawler.is_empty() {
            true => None,
            false => Some(Arc::new(CrawlerNewsClient::new(sources, keys))),
        };
        let structurer: Arc<dyn CompanyStructurer> = match keys.openai.is_empty() {
            true => Arc::new(OpenaiClient::default()),
            false => Arc::new(OpenaiClient::new(keys.openai.clone())),
        };

        Enricher {
            rendered_page: Arc::new(RenderedPageFetcher::new(sources, keys)),
            site_html: Arc::new(RawHtmlFetcher::new()),
            search,
            site_search,
            structurer,
            crawler,
            filters: settings.filters.clone(),
            news_crawl_timeout: NEWS_CRAWL_TIMEOUT,
        }
    }

    /// Wiring point for tests and alternative backends.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        rendered_page: Arc<dyn PageText>,
        site_html: Arc<dyn PageText>,
        search: Option<Arc<dyn SearchEngine>>,
        site_search: Option<Arc<dyn SiteSearch>>,
        structurer: Arc<dyn CompanyStructurer>,
        crawler: Option<Arc<dyn NewsCrawler>>,
        filters: FilterSettings,
        news_crawl_timeout: Duration,
    ) -> Self {
        Enricher {
            rendered_page,
            site_html,
            search,
            site_search,
            structurer,
            crawler,
            filters,
            news_crawl_timeout,
        }
    }

    /// Company-profile pipeline: rendered page + search answer → regex atoms
    /// + LLM structuring → fused profile.
    pub async fn extract_company_profile(&self, website: &str) -> StructuredCompanyProfile {
        self.profile_with_provenance(website).await.0
    }

    async fn profile_with_provenance(
        &self,
        website: &str,
    ) -> (StructuredCompanyProfile, ProfileProvenance) {
        let domain = normalize_domain(website);
        let mut documents: Vec<FetchedDocument> = Vec::new();

        let page_url = format!("https://{}", domain);
        match self.rendered_page.fetch_text(&page_url).await {
            Ok(Some(text)) => {
                documents.push(FetchedDocument::new(SourceKind::RenderedPage, &page_url, text))
            }
            Ok(None) => log::info!("Rendered page for {} came back empty", domain),
            Err(e) => log::warn!("Rendered-page fetch failed for {}: {}", domain, e),
        }

        let mut answer: Option<String> = None;
        if let Some(search) = &self.search {
            let mut query =
                SearchQuery::new(format!("información sobre la empresa del sitio {}", domain));
            query.max_results = 5;
            query.include_raw_content = true;

            match search.search(query).await {
                Ok(response) => {
                    answer = response.answer.filter(|a| !a.trim().is_empty());
                    if let Some(a) = &answer {
                        documents.push(FetchedDocument::new(
                            SourceKind::SearchEngineSummary,
                            &page_url,
                            a.clone(),
                        ));
                    }
                    for hit in response.results {
                        let text = hit.raw_content.unwrap_or(hit.content);
                        if !text.trim().is_empty() {
                            documents.push(FetchedDocument::new(
                                SourceKind::SearchEngineResult,
                                hit.url,
                                text,
                            ));
                        }
                    }
                }
                Err(e) => log::warn!("Company search failed for {}: {}", domain, e),
            }
        }

        let corpus = documents.iter().map(|d| d.text.as_str()).join("\n\n");
        let atoms = extractor::extract(&corpus);

        let llm = match corpus.is_empty() && answer.is_none() {
            true => LlmProfile::default(),
            false => self.structurer.structure(&corpus, &atoms, answer.as_deref()).await,
        };

        merge(llm, &atoms, answer.as_deref())
    }

    /// Multi-phase person research plus news discovery, assembled with the
    /// company profile into one result. Never errors: empty phases just
    /// contribute nothing.
    pub async fn research_person_and_company(
        &self,
        request: &EnrichmentRequest,
    ) -> EnrichmentResult {
        let (first_name, last_name) = request.name_parts();
        let target = PersonTarget {
            first_name,
            last_name,
            company: Some(request.company.clone()),
            city: request.city.clone(),
            province: request.province.clone(),
            country: request.country.clone(),
        };

        let mut pool = CandidatePool::default();

        if let Some(website) = &request.website {
            self.scan_company_site(website, &target, &request.company, &mut pool)
                .await;
        }
        self.email_search(request, &target, &mut pool).await;

        let best_a = self.engine_a_phases(request, &target, &mut pool).await;
        self.engine_b_phases(request, &target, best_a, &mut pool).await;

        if pool.accepted_count() < ROLE_SEARCH_MIN_POOL {
            self.role_search(request, &target, &mut pool).await;
        }

        let ranked = pool.consolidate();
        let (confianza, fuente) = ranked
            .first()
            .map(|c| (c.score, Some(c.source)))
            .unwrap_or((0, None));
        let linkedin_personal = match ranked.is_empty() {
            true => None,
            false => Some(ranked.iter().map(|c| c.url.as_str()).join("\n")),
        };

        let noticias = self.discover_news(&request.company).await;

        let (profile, procedencia) = match &request.website {
            Some(website) => self.profile_with_provenance(website).await,
            None => (StructuredCompanyProfile::default(), ProfileProvenance::default()),
        };

        EnrichmentResult {
            profile,
            linkedin_personal,
            confianza,
            fuente,
            noticias,
            procedencia,
        }
    }

    /// Phase 1: scan the company's own pages for profile URLs.
    async fn scan_company_site(
        &self,
        website: &str,
        target: &PersonTarget,
        company: &str,
        pool: &mut CandidatePool,
    ) {
        let domain = normalize_domain(website);
        let mut html = String::new();

        for path in SCAN_PATHS {
            let url = match path.is_empty() {
                true => format!("https://{}", domain),
                false => format!("https://{}/{}", domain, path),
            };
            match self.site_html.fetch_text(&url).await {
                Ok(Some(body)) => {
                    html.push_str(&body);
                    html.push('\n');
                }
                Ok(None) => {}
                Err(e) => log::info!("Site scan skipped {}: {}", url, e),
            }
        }
        if html.is_empty() {
            return;
        }

        for (url, context) in profile_urls_with_context(&html) {
            if incompatible_industry(&context, company, &self.filters.industry_blocklist) {
                continue;
            }
            let score = score_candidate(&context, &url, target);
            if score >= scoring::ACCEPT_SCORE {
                pool.add(ProfileCandidate {
                    url,
                    text: context,
                    score,
                    source: CandidateSource::WebPage,
                });
            }
        }
    }

    /// Phase 2: literal-email query against the profile domain. A hit through
    /// the person's own email is identity evidence, so confidence is floored.
    async fn email_search(
        &self,
        request: &EnrichmentRequest,
        target: &PersonTarget,
        pool: &mut CandidatePool,
    ) {
        let (Some(email), Some(site_search)) = (request.email.as_ref(), self.site_search.as_ref())
        else {
            return;
        };

        let items = match site_search
            .search_site(&format!("\"{}\"", email), LINKEDIN_PROFILE_SITE)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Email search failed: {}", e);
                return;
            }
        };

        for item in items {
            if !item.link.contains(LINKEDIN_PROFILE_SITE) {
                continue;
            }
            let text = format!("{} {}", item.title, item.snippet);
            if incompatible_industry(&text, &request.company, &self.filters.industry_blocklist) {
                continue;
            }
            let score = score_candidate(&text, &item.link, target)
                .max(scoring::EMAIL_CONFIDENCE_FLOOR);
            pool.add(ProfileCandidate {
                url: item.link,
                text,
                score,
                source: CandidateSource::EmailSearch,
            });
        }
    }

    /// Phase 3: engine A, name+company first, name-only fallback. Returns the
    /// best confidence produced so engine B knows what it has to beat.
    async fn engine_a_phases(
        &self,
        request: &EnrichmentRequest,
        target: &PersonTarget,
        pool: &mut CandidatePool,
    ) -> u8 {
        let Some(search) = &self.search else {
            return 0;
        };

        let location = simple_location(request);
        let primary = profile_query(&request.person_name, Some(request.company.as_str()), &location);

        let mut best = self
            .run_engine_a_query(search, &primary, target, request, true, pool)
            .await;

        if best < scoring::PRIMARY_CONFIDENCE_FLOOR {
            let fallback = profile_query(&request.person_name, None, &location);
            let fallback_best = self
                .run_engine_a_query(search, &fallback, target, request, false, pool)
                .await;
            best = best.max(fallback_best);
        }

        best
    }

    async fn run_engine_a_query(
        &self,
        search: &Arc<dyn SearchEngine>,
        query: &str,
        target: &PersonTarget,
        request: &EnrichmentRequest,
        primary_phase: bool,
        pool: &mut CandidatePool,
    ) -> u8 {
        let mut q = SearchQuery::new(query);
        q.include_domains = vec!["linkedin.com".to_string()];

        let response = match search.search(q).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Engine A query failed: {}", e);
                return 0;
            }
        };

        let mut best = 0;
        for hit in response.results {
            let text = format!("{} {}", hit.title, hit.content);
            if let Some(candidate) =
                self.verify_engine_hit(&hit.url, &text, target, request, primary_phase)
            {
                best = best.max(candidate.score);
                pool.add(ProfileCandidate {
                    source: CandidateSource::EngineA,
                    ..candidate
                });
            }
        }
        best
    }

    /// Phase 4: engine B runs the same two-phase search but its candidates
    /// only join the pool when they beat engine A's best confidence.
    async fn engine_b_phases(
        &self,
        request: &EnrichmentRequest,
        target: &PersonTarget,
        best_a: u8,
        pool: &mut CandidatePool,
    ) {
        let Some(site_search) = &self.site_search else {
            return;
        };

        let location = simple_location(request);
        let primary =
            profile_query_plain(&request.person_name, Some(request.company.as_str()), &location);

        let mut candidates = self
            .run_engine_b_query(site_search, &primary, target, request, true)
            .await;

        let best_primary = candidates.iter().map(|c| c.score).max().unwrap_or(0);
        if best_primary < scoring::PRIMARY_CONFIDENCE_FLOOR {
            let fallback = profile_query_plain(&request.person_name, None, &location);
            candidates.extend(
                self.run_engine_b_query(site_search, &fallback, target, request, false)
                    .await,
            );
        }

        let best_b = candidates.iter().map(|c| c.score).max().unwrap_or(0);
        if best_b > best_a {
            for candidate in candidates {
                pool.add(candidate);
            }
        }
    }

    async fn run_engine_b_query(
        &self,
        site_search: &Arc<dyn SiteSearch>,
        query: &str,
        target: &PersonTarget,
        request: &EnrichmentRequest,
        primary_phase: bool,
    ) -> Vec<ProfileCandidate> {
        let items = match site_search.search_site(query, LINKEDIN_PROFILE_SITE).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Engine B query failed: {}", e);
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item: SearchItem| {
                let text = format!("{} {}", item.title, item.snippet);
                self.verify_engine_hit(&item.link, &text, target, request, primary_phase)
                    .map(|candidate| ProfileCandidate {
                        source: CandidateSource::EngineB,
                        ..candidate
                    })
            })
            .collect()
    }

    /// Post-hoc verification shared by both engines: the snippet must carry
    /// the name, survive the industry gate, and clear the scoring threshold
    /// for its phase. The stored score is the phase confidence.
    fn verify_engine_hit(
        &self,
        url: &str,
        text: &str,
        target: &PersonTarget,
        request: &EnrichmentRequest,
        primary_phase: bool,
    ) -> Option<ProfileCandidate> {
        if !url.contains(LINKEDIN_PROFILE_SITE) {
            return None;
        }

        let lowered = text.to_lowercase();
        let full_name = request.person_name.to_lowercase();
        let name_present = lowered.contains(&full_name)
            || (lowered.contains(&target.first_name.to_lowercase())
                && lowered.contains(&target.last_name.to_lowercase()));
        if !name_present {
            return None;
        }

        if incompatible_industry(text, &request.company, &self.filters.industry_blocklist) {
            return None;
        }

        let (threshold, floor) = match primary_phase {
            true => (scoring::ACCEPT_SCORE, scoring::PRIMARY_CONFIDENCE_FLOOR),
            false => (scoring::FALLBACK_SCORE_THRESHOLD, scoring::FALLBACK_CONFIDENCE_FLOOR),
        };

        let score = score_candidate(text, url, target);
        if score < threshold {
            return None;
        }

        Some(ProfileCandidate {
            url: url.to_string(),
            text: text.to_string(),
            score: confidence_for(score, threshold, floor),
            source: CandidateSource::EngineA,
        })
    }

    /// Phase 5: role keywords next to the company name, for when the person
    /// search came back thin.
    async fn role_search(
        &self,
        request: &EnrichmentRequest,
        target: &PersonTarget,
        pool: &mut CandidatePool,
    ) {
        let Some(search) = &self.search else {
            return;
        };

        for role in &self.filters.role_keywords {
            let mut query = SearchQuery::new(format!(
                "\"{}\" {} site:{}",
                request.company, role, LINKEDIN_PROFILE_SITE
            ));
            query.max_results = ROLE_QUERY_MAX_RESULTS;
            query.include_domains = vec!["linkedin.com".to_string()];

            let response = match search.search(query).await {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("Role search for '{}' failed: {}", role, e);
                    continue;
                }
            };

            for hit in response.results {
                if !hit.url.contains(LINKEDIN_PROFILE_SITE) {
                    continue;
                }
                let text = format!("{} {}", hit.title, hit.content);
                if incompatible_industry(&text, &request.company, &self.filters.industry_blocklist)
                {
                    continue;
                }
                let score = score_candidate(&text, &hit.url, target);
                if score >= scoring::ACCEPT_SCORE {
                    pool.add(ProfileCandidate {
                        url: hit.url,
                        text,
                        score,
                        source: CandidateSource::RoleSearch,
                    });
                }
            }
        }
    }

    /// News runs independently of the person search: structured query first,
    /// crawler fallback bounded by a timeout when the fast path finds nothing.
    async fn discover_news(&self, company: &str) -> Vec<NewsMention> {
        let mut mentions = Vec::new();

        if let Some(search) = &self.search {
            let mut query = SearchQuery::new(format!("\"{}\" noticias", company));
            query.max_results = MAX_NEWS as u8;

            match search.search(query).await {
                Ok(response) => {
                    for hit in response.results {
                        if self.news_acceptable(&hit.url, &hit.title, &hit.content, company) {
                            mentions.push(NewsMention {
                                title: hit.title,
                                url: hit.url,
                                snippet: hit.content,
                                source: CandidateSource::EngineA,
                            });
                        }
                    }
                }
                Err(e) => log::warn!("News search failed for {}: {}", company, e),
            }
        }

        if mentions.is_empty() {
            if let Some(crawler) = &self.crawler {
                let start_urls = vec![format!(
                    "https://news.google.com/search?q={}",
                    company.replace(' ', "+")
                )];
                match tokio::time::timeout(
                    self.news_crawl_timeout,
                    crawler.crawl(start_urls, NEWS_CRAWL_MAX_PAGES),
                )
                .await
                {
                    Ok(Ok(pages)) => {
                        for page in pages {
                            let snippet: String = page.text.chars().take(280).collect();
                            if self.news_acceptable(&page.url, &page.title, &snippet, company) {
                                mentions.push(NewsMention {
                                    title: page.title,
                                    url: page.url,
                                    snippet,
                                    source: CandidateSource::Crawler,
                                });
                            }
                        }
                    }
                    Ok(Err(e)) => log::warn!("News crawl failed for {}: {}", company, e),
                    Err(_) => log::warn!("News crawl for {} timed out, proceeding without", company),
                }
            }
        }

        mentions.truncate(MAX_NEWS);
        mentions
    }

    /// Three independent validity gates plus company-token corroboration.
    fn news_acceptable(&self, url: &str, title: &str, snippet: &str, company: &str) -> bool {
        let url_lower = url.to_lowercase();

        if self.filters.junk_news_domains.iter().any(|d| url_lower.contains(d)) {
            return false;
        }
        if search_results_page(url) {
            return false;
        }

        let text_lower = format!("{} {}", title, snippet).to_lowercase();
        let legal_url = self.filters.legal_url_markers.iter().any(|m| url_lower.contains(m));
        let legal_text = self.filters.legal_keywords.iter().any(|k| text_lower.contains(k));
        if legal_url || legal_text {
            return false;
        }

        company
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .any(|w| text_lower.contains(w))
    }
}

/// Shared pool keyed by normalized URL: duplicates keep the max score and the
/// first-seen source tag.
#[derive(Default)]
struct CandidatePool {
    items: Vec<ProfileCandidate>,
}

impl CandidatePool {
    fn add(&mut self, candidate: ProfileCandidate) {
        let key = pool_key(&candidate.url);
        match self.items.iter_mut().find(|c| pool_key(&c.url) == key) {
            Some(existing) => existing.score = existing.score.max(candidate.score),
            None => self.items.push(candidate),
        }
    }

    fn accepted_count(&self) -> usize {
        self.items.iter().filter(|c| c.score >= scoring::ACCEPT_SCORE).count()
    }

    fn consolidate(mut self) -> Vec<ProfileCandidate> {
        self.items.retain(|c| c.score >= scoring::ACCEPT_SCORE);
        self.items.sort_by(|a, b| b.score.cmp(&a.score));
        self.items.truncate(MAX_FINAL_CANDIDATES);
        self.items
    }
}

fn pool_key(url: &str) -> String {
    strip_query_params(url).to_lowercase()
}

fn search_results_page(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .into_iter()
            .flatten()
            .any(|segment| SEARCH_PAGE_SEGMENTS.iter().any(|m| segment.eq_ignore_ascii_case(m))),
        Err(_) => {
            let lowered = url.to_lowercase();
            SEARCH_PAGE_SEGMENTS.iter().any(|m| lowered.contains(&format!("/{}", m)))
        }
    }
}

fn normalize_domain(website: &str) -> String {
    website
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/')
        .to_lowercase()
}

/// Province + country only: full addresses make engine queries too brittle.
fn simple_location(request: &EnrichmentRequest) -> String {
    [request.province.as_deref(), request.country.as_deref()]
        .into_iter()
        .flatten()
        .join(" ")
}

fn profile_query(person_name: &str, company: Option<&str>, location: &str) -> String {
    let mut parts = vec![format!("\"{}\"", person_name)];
    if let Some(company) = company {
        parts.push(format!("\"{}\"", company));
    }
    if !location.is_empty() {
        parts.push(location.to_string());
    }
    parts.push(format!("site:{}", LINKEDIN_PROFILE_SITE));
    parts.join(" ")
}

/// Engine B gets the site restriction as a parameter, not in the query text.
fn profile_query_plain(person_name: &str, company: Option<&str>, location: &str) -> String {
    let mut parts = vec![format!("\"{}\"", person_name)];
    if let Some(company) = company {
        parts.push(format!("\"{}\"", company));
    }
    if !location.is_empty() {
        parts.push(location.to_string());
    }
    parts.join(" ")
}

/// Profile URLs found in raw HTML, each with a window of surrounding text as
/// its snippet. Anchors are pulled with a selector too: hrefs survive even
/// when the regex window lands mid-attribute.
fn profile_urls_with_context(html: &str) -> Vec<(String, String)> {
    let mut found: Vec<(String, String)> = Vec::new();

    for m in PROFILE_URL_RE.find_iter(html) {
        let url = strip_query_params(m.as_str());
        let mut start = m.start().saturating_sub(SCAN_CONTEXT_WINDOW);
        while !html.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (m.end() + SCAN_CONTEXT_WINDOW).min(html.len());
        while end < html.len() && !html.is_char_boundary(end) {
            end += 1;
        }
        found.push((url, plain_text(&html[start..end])));
    }

    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").expect("anchor selector");
    for element in document.select(&anchor) {
        if let Some(href) = element.value().attr("href") {
            if PROFILE_URL_RE.is_match(href) {
                let url = strip_query_params(href);
                let context = plain_text(&element.text().collect::<String>());
                found.push((url, context));
            }
        }
    }

    found
        .into_iter()
        .unique_by(|(url, _)| url.to_lowercase())
        .collect()
}

/// Good enough de-tagging for a context window; real parsing is overkill here.
fn plain_text(html_fragment: &str) -> String {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
    TAG_RE.replace_all(html_fragment, " ").to_string()
}
