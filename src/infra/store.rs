//! PostgREST adapter for the listing store.
//!
//! Reads go through the public (anon) key. Refreshing the card view needs the
//! service key, and view tracking runs as the viewer when a token is present
//! so the store procedure can dedup per user.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CardViewRepo, PropertiesRepo, PropertyFilter, PropertyView, PropertyViewsRepo, StoreError,
    Viewer,
};
use crate::config::StoreSettings;
use crate::domain::property::{Property, PropertyCard};

const REST_PREFIX: &str = "rest/v1/";
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub url: Url,
    pub anon_key: String,
    pub service_key: Option<String>,
    pub timeout: Duration,
    pub properties_table: String,
    pub cards_view: String,
    pub refresh_procedure: String,
    pub track_procedure: String,
}

impl RestStoreConfig {
    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        let url = settings
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| StoreError::Configuration("store url is not configured".to_string()))?;
        let url = Url::parse(url.trim())
            .map_err(|err| StoreError::Configuration(format!("invalid store url: {err}")))?;
        let anon_key = settings
            .anon_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StoreError::Configuration("store anon key is not configured".to_string()))?;
        Ok(Self {
            url,
            anon_key,
            service_key: settings.service_key.clone().filter(|key| !key.is_empty()),
            timeout: Duration::from_secs(settings.timeout_seconds.get()),
            properties_table: settings.properties_table.clone(),
            cards_view: settings.cards_view.clone(),
            refresh_procedure: settings.refresh_procedure.clone(),
            track_procedure: settings.track_procedure.clone(),
        })
    }
}

#[derive(Serialize)]
struct TrackViewArgs<'a> {
    p_property_id: &'a str,
    p_session_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct RestPropertyStore {
    client: Client,
    rest_base: Url,
    config: RestStoreConfig,
}

impl RestPropertyStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let mut root = config.url.clone();
        if !root.path().ends_with('/') {
            root.set_path(&format!("{}/", root.path()));
        }
        let rest_base = root
            .join(REST_PREFIX)
            .map_err(|err| StoreError::Configuration(err.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("javea/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|err| StoreError::Configuration(err.to_string()))?;
        Ok(Self {
            client,
            rest_base,
            config,
        })
    }

    fn endpoint(&self, relation: &str) -> Result<Url, StoreError> {
        self.rest_base
            .join(relation)
            .map_err(|err| StoreError::Configuration(err.to_string()))
    }

    fn rpc_endpoint(&self, procedure: &str) -> Result<Url, StoreError> {
        self.endpoint(&format!("rpc/{procedure}"))
    }

    fn request(&self, method: Method, url: Url, api_key: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", api_key)
            .bearer_auth(bearer)
    }

    fn anon(&self, method: Method, url: Url) -> RequestBuilder {
        self.request(method, url, &self.config.anon_key, &self.config.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(StoreError::transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let bytes = response.bytes().await.map_err(StoreError::transport)?;
        serde_json::from_slice(&bytes).map_err(StoreError::decode)
    }
}

#[async_trait]
impl PropertiesRepo for RestPropertyStore {
    async fn find_property(&self, id: &str) -> Result<Option<Property>, StoreError> {
        let mut url = self.endpoint(&self.config.properties_table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("limit", "1");

        let response = self.send(self.anon(Method::GET, url)).await?;
        let rows: Vec<Property> = Self::decode(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_properties(
        &self,
        filter: &PropertyFilter,
        page: PageRequest,
    ) -> Result<Page<PropertyCard>, StoreError> {
        let mut url = self.endpoint(&self.config.cards_view)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("select", "*")
                .append_pair("order", "created_at.desc")
                .append_pair("offset", &page.offset().to_string())
                .append_pair("limit", &page.per_page.to_string());
            for (key, value) in filter_params(filter) {
                query.append_pair(key, &value);
            }
        }

        let request = self
            .anon(Method::GET, url)
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        let items: Vec<PropertyCard> = Self::decode(response).await?;
        let total = total.unwrap_or(page.offset() + items.len() as u64);

        debug!(
            items = items.len(),
            total,
            page = page.page,
            "Loaded property cards"
        );
        Ok(Page::new(items, page, total))
    }
}

#[async_trait]
impl CardViewRepo for RestPropertyStore {
    async fn refresh_card_view(&self) -> Result<(), StoreError> {
        let service_key = self.config.service_key.as_deref().ok_or_else(|| {
            StoreError::Configuration("store service key is not configured".to_string())
        })?;
        let url = self.rpc_endpoint(&self.config.refresh_procedure)?;
        let request = self
            .request(Method::POST, url, service_key, service_key)
            .json(&serde_json::json!({}));
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl PropertyViewsRepo for RestPropertyStore {
    async fn record_view(&self, view: PropertyView) -> Result<(), StoreError> {
        let url = self.rpc_endpoint(&self.config.track_procedure)?;
        let bearer = match &view.viewer {
            Viewer::Authenticated { access_token } => access_token.as_str(),
            Viewer::Anonymous => self.config.anon_key.as_str(),
        };
        let args = TrackViewArgs {
            p_property_id: &view.property_id,
            p_session_id: view.session_id.as_deref(),
        };
        let request = self
            .request(Method::POST, url, &self.config.anon_key, bearer)
            .json(&args);
        self.send(request).await?;
        Ok(())
    }
}

/// PostgREST filter parameters for a listing query.
fn filter_params(filter: &PropertyFilter) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(category) = filter.category {
        params.push((
            "category",
            format!("in.({})", category.stored_values().join(",")),
        ));
    }
    if let Some(term) = filter.search.as_deref().map(sanitize_search_term)
        && !term.is_empty()
    {
        params.push((
            "or",
            format!("(title.ilike.*{term}*,municipality.ilike.*{term}*,location.ilike.*{term}*)"),
        ));
    }
    if let Some(min) = filter.min_price {
        params.push(("price", format!("gte.{min}")));
    }
    if let Some(max) = filter.max_price {
        params.push(("price", format!("lte.{max}")));
    }
    if let Some(bedrooms) = filter.min_bedrooms {
        params.push(("bedrooms", format!("gte.{bedrooms}")));
    }
    params
}

/// Drop characters with meaning in PostgREST logic trees.
fn sanitize_search_term(term: &str) -> String {
    term.chars()
        .filter(|ch| !matches!(ch, ',' | '(' | ')' | '*' | '.' | ':'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `0-11/25` → 25, `*/0` → 0, `0-11/*` → unknown.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}
