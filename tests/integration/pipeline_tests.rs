//! Integration tests for the resolution pipeline
//!
//! Pages are served by an in-memory renderer keyed by URL; the property feed
//! is a wiremock server.

use async_trait::async_trait;
use listing_resolver::feed::{FeedCache, FeedSettings};
use listing_resolver::fetcher::{
    FetchSettings, Fetcher, Interaction, Pacing, RenderContext, Renderer, StealthProfile,
};
use listing_resolver::retry::RetryPolicy;
use listing_resolver::{ErrorKind, Pipeline, ResolverError, NOT_INFORMED};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMOVELWEB_URL: &str = "https://www.imovelweb.com.br/propriedades/apartamento-2-quartos-2991234.html";
const CHAVESNAMAO_URL: &str = "https://www.chavesnamao.com.br/imovel/casa-a-venda-curitiba/id-4410/";
const HUBURBANA_URL: &str = "https://huburbana.com.br/imovel/301";
const PLAIN_URL: &str = "https://imobiliaria.example.com/anuncio/77";

const IMOVELWEB_PAGE: &str = r#"<html><head><title>Apartamento 2 quartos</title>
<script>
  window.dataLayer = window.dataLayer || [];
  const publisher_house_id = "AB1234-Z9";
</script></head>
<body><h1>Apartamento com 2 quartos</h1></body></html>"#;

const CHALLENGE_PAGE: &str = r#"<!DOCTYPE html><html><head><title>Just a moment...</title></head>
<body><script src="/cdn-cgi/challenge-platform/h/b/orchestrate/chl_page/v1"></script></body></html>"#;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListingDataFeed>
  <Listings>
    <Listing>
      <ListingID>AB1234-Z9</ListingID>
      <ContactInfo>
        <Name>Jane Realty</Name>
      </ContactInfo>
    </Listing>
    <Listing>
      <ListingID>HU-301</ListingID>
      <ContactInfo>
        <Name>Hub Urbana</Name>
        <Email>contato@huburbana.example</Email>
        <Telephone>(41) 3000-0301</Telephone>
      </ContactInfo>
    </Listing>
  </Listings>
</ListingDataFeed>"#;

/// Serves fixed HTML per URL
struct StaticRenderer {
    pages: HashMap<String, String>,
    contexts: Arc<AtomicUsize>,
}

struct StaticContext {
    pages: HashMap<String, String>,
    current: Option<String>,
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn new_context(&self, _profile: &StealthProfile) -> anyhow::Result<Box<dyn RenderContext>> {
        self.contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticContext {
            pages: self.pages.clone(),
            current: None,
        }))
    }
}

#[async_trait]
impl RenderContext for StaticContext {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}"))?;
        self.current = Some(html.clone());
        Ok(())
    }

    async fn perform(&mut self, _interaction: &Interaction) -> anyhow::Result<()> {
        Ok(())
    }

    async fn html(&mut self) -> anyhow::Result<String> {
        self.current
            .clone()
            .ok_or_else(|| anyhow::anyhow!("nothing loaded"))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

fn fast_fetch_settings() -> FetchSettings {
    FetchSettings {
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
        attempt_timeout: Duration::from_secs(5),
        settle: Duration::ZERO,
        pacing: Pacing {
            min_pause: Duration::ZERO,
            max_pause: Duration::ZERO,
        },
    }
}

/// Builds a pipeline over the given pages and a feed served by `server`
fn create_test_pipeline(server: &MockServer, pages: &[(&str, &str)]) -> (Pipeline, Arc<AtomicUsize>) {
    let contexts = Arc::new(AtomicUsize::new(0));
    let renderer = StaticRenderer {
        pages: pages
            .iter()
            .map(|(url, html)| (url.to_string(), html.to_string()))
            .collect(),
        contexts: Arc::clone(&contexts),
    };

    let feed = FeedCache::new(FeedSettings {
        url: format!("{}/feed.xml", server.uri()),
        ttl: Duration::from_secs(12 * 3600),
        scheduled_timeout: Duration::from_secs(5),
        fallback_timeout: Duration::from_secs(10),
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
    })
    .expect("Failed to build feed cache");

    let fetcher = Fetcher::new(Arc::new(renderer), fast_fetch_settings());
    (Pipeline::new(fetcher, Arc::new(feed)), contexts)
}

async fn mount_feed(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_imovelweb_page_resolves_to_contact() {
    let server = MockServer::start().await;
    mount_feed(&server, FEED).await;
    let (pipeline, _) = create_test_pipeline(&server, &[(IMOVELWEB_URL, IMOVELWEB_PAGE)]);

    let code = pipeline
        .resolve_from_url(IMOVELWEB_URL)
        .await
        .expect("Failed to resolve code");
    assert_eq!(code.as_str(), "AB1234-Z9");

    let contact = pipeline
        .get_contact(code.as_str())
        .await
        .expect("Failed to look up contact");
    assert_eq!(contact.name, "Jane Realty");
    assert_eq!(contact.email, NOT_INFORMED);
    assert_eq!(contact.phone, NOT_INFORMED);
}

#[tokio::test]
async fn test_url_inside_chat_message() {
    let server = MockServer::start().await;
    mount_feed(&server, FEED).await;
    let page = r#"<html><body><div><span class="ref">CÓDIGO: HU-301</span></div></body></html>"#;
    let (pipeline, _) = create_test_pipeline(&server, &[(HUBURBANA_URL, page)]);

    let message = format!("Oi! Vi esse anúncio ({}), ainda está disponível?", HUBURBANA_URL);
    let (code, contact) = pipeline
        .resolve_contact(&message)
        .await
        .expect("Failed to resolve message with link");

    assert_eq!(code.as_str(), "HU-301");
    assert_eq!(contact.email, "contato@huburbana.example");
    assert_eq!(contact.phone, "(41) 3000-0301");
}

#[tokio::test]
async fn test_chavesnamao_comment_reference() {
    let server = MockServer::start().await;
    let page = "<html><body><!-- Ref: CN-4410 --><h1>Casa</h1></body></html>";
    let (pipeline, _) = create_test_pipeline(&server, &[(CHAVESNAMAO_URL, page)]);

    let code = pipeline.resolve_from_url(CHAVESNAMAO_URL).await.unwrap();
    assert_eq!(code.as_str(), "CN-4410");
}

#[tokio::test]
async fn test_blocked_page_fails_with_blocked() {
    let server = MockServer::start().await;
    let (pipeline, contexts) = create_test_pipeline(&server, &[(IMOVELWEB_URL, CHALLENGE_PAGE)]);

    let err = pipeline.resolve_from_url(IMOVELWEB_URL).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Blocked);
    assert_eq!(contexts.load(Ordering::SeqCst), 1, "blocked pages are not retried");
}

#[tokio::test]
async fn test_page_without_code_is_code_not_found() {
    let server = MockServer::start().await;
    let page = "<html><body><h1>Imóvel</h1><p>Sem referência</p></body></html>";
    let (pipeline, _) = create_test_pipeline(&server, &[(PLAIN_URL, page)]);

    let err = pipeline.resolve_from_url(PLAIN_URL).await.unwrap_err();
    assert!(matches!(err, ResolverError::CodeNotFound { ref source_name } if source_name == PLAIN_URL));
}

#[tokio::test]
async fn test_unreachable_page_is_fetch_failed() {
    let server = MockServer::start().await;
    let (pipeline, contexts) = create_test_pipeline(&server, &[]);

    let err = pipeline.resolve_from_url(PLAIN_URL).await.unwrap_err();

    assert!(matches!(err, ResolverError::FetchFailed { attempts: 2, .. }));
    assert_eq!(contexts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_url() {
    let server = MockServer::start().await;
    let (pipeline, contexts) = create_test_pipeline(&server, &[]);

    for input in ["", "not a url", "ftp://example.com/file"] {
        let err = pipeline.resolve_from_url(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl, "input {:?}", input);
    }
    assert_eq!(contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_message_resolution_needs_no_browser() {
    let server = MockServer::start().await;
    mount_feed(&server, FEED).await;
    let (pipeline, contexts) = create_test_pipeline(&server, &[]);

    let code = pipeline
        .resolve_from_message("Boa tarde, Referência: AB1234-Z9")
        .unwrap();
    assert_eq!(code.as_str(), "AB1234-Z9");

    let (_, contact) = pipeline.resolve_contact("Gostaria de visitar o HU-301").await.unwrap();
    assert_eq!(contact.name, "Hub Urbana");

    let err = pipeline.resolve_from_message("no reference here").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CodeNotFound);
    assert_eq!(contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_code_is_listing_not_found() {
    let server = MockServer::start().await;
    mount_feed(&server, FEED).await;
    let (pipeline, _) = create_test_pipeline(&server, &[]);

    let err = pipeline.get_contact("ZZ-0000").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ListingNotFound);
}

#[tokio::test]
async fn test_feed_is_fetched_once_for_many_lookups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;
    let (pipeline, _) = create_test_pipeline(&server, &[]);

    for _ in 0..3 {
        pipeline.get_contact("AB1234-Z9").await.unwrap();
        pipeline.get_contact("HU-301").await.unwrap();
    }
}

#[tokio::test]
async fn test_unreachable_feed_is_feed_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let (pipeline, _) = create_test_pipeline(&server, &[]);

    let err = pipeline.get_contact("AB1234-Z9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FeedUnavailable);
}

#[tokio::test]
async fn test_malformed_feed() {
    let server = MockServer::start().await;
    mount_feed(&server, "<Listings><Listing><ListingID>AB1234-Z9</ListingID>").await;
    let (pipeline, _) = create_test_pipeline(&server, &[]);

    let err = pipeline.get_contact("AB1234-Z9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedFeed);
}
