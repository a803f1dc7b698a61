use anyhow::Context;
use env_logger::Env;
use prospector::{
    configuration::get_configuration,
    domain::EnrichmentRequest,
    services::Enricher,
};

/// prospector <website> [person_name] [company] [city] [province] [country] [email]
///
/// With only a website it extracts the company profile; with a person name it
/// runs the full research pipeline.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration")?;
    let enricher = Enricher::new(&configuration);

    let mut args = std::env::args().skip(1);
    let website = args.next().context(
        "usage: prospector <website> [person_name] [company] [city] [province] [country] [email]",
    )?;

    match args.next() {
        Some(person_name) => {
            let request = EnrichmentRequest {
                person_name,
                company: args.next().unwrap_or_default(),
                website: Some(website),
                city: args.next(),
                province: args.next(),
                country: args.next(),
                email: args.next(),
            };
            let result = enricher.research_person_and_company(&request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => {
            let profile = enricher.extract_company_profile(&website).await;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}
