//! PostgREST adapter against a mock store.

use std::time::Duration;

use httpmock::MockServer;
use serde_json::json;
use url::Url;

use javea::application::{
    pagination::PageRequest,
    repos::{
        CardViewRepo, PropertiesRepo, PropertyFilter, PropertyView, PropertyViewsRepo, StoreError,
        Viewer,
    },
};
use javea::domain::property::PropertyCategory;
use javea::infra::store::{RestPropertyStore, RestStoreConfig};

const ANON: &str = "anon-key";
const SERVICE: &str = "service-key";

fn store(server: &MockServer, service_key: Option<&str>) -> RestPropertyStore {
    RestPropertyStore::new(RestStoreConfig {
        url: Url::parse(&server.base_url()).expect("url"),
        anon_key: ANON.to_string(),
        service_key: service_key.map(str::to_string),
        timeout: Duration::from_secs(5),
        properties_table: "properties".to_string(),
        cards_view: "property_cards".to_string(),
        refresh_procedure: "refresh_property_cards".to_string(),
        track_procedure: "track_property_view".to_string(),
    })
    .expect("store")
}

#[tokio::test]
async fn find_property_reads_with_the_anon_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/properties")
            .query_param("id", "eq.42")
            .query_param("limit", "1")
            .header("apikey", ANON)
            .header("authorization", "Bearer anon-key");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"[{"id":"42","type":"rent","title":"Apartamento","price":1200,"municipality":"Jávea","images":null,"features":null,"specs":null,"created_at":"2025-01-01T00:00:00+00:00"}]"#,
            );
    });

    let property = store(&server, None)
        .find_property("42")
        .await
        .expect("lookup")
        .expect("row");

    mock.assert();
    assert_eq!(property.category, PropertyCategory::Rent);
    assert_eq!(property.location.municipality.as_deref(), Some("Jávea"));
    assert!(property.images.is_empty());
}

#[tokio::test]
async fn empty_result_is_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/rest/v1/properties");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let found = store(&server, None).find_property("7").await.expect("lookup");
    assert!(found.is_none());
}

#[tokio::test]
async fn listing_filters_by_category_and_reads_the_total() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/property_cards")
            .query_param("category", "in.(rent)")
            .query_param("offset", "12")
            .query_param("limit", "12")
            .query_param("order", "created_at.desc")
            .header("prefer", "count=exact");
        then.status(200)
            .header("content-type", "application/json")
            .header("content-range", "12-12/13")
            .body(
                r#"[{"id":"3","category":"rent","title":"Ático","price":900,"created_at":"2025-02-01T00:00:00Z"}]"#,
            );
    });

    let page = store(&server, None)
        .list_properties(
            &PropertyFilter::category(PropertyCategory::Rent),
            PageRequest::new(2, 12),
        )
        .await
        .expect("listing");

    mock.assert();
    assert_eq!(page.total, 13);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items[0].id, "3");
}

#[tokio::test]
async fn refresh_uses_the_service_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/rest/v1/rpc/refresh_property_cards")
            .header("apikey", SERVICE)
            .header("authorization", "Bearer service-key");
        then.status(204);
    });

    store(&server, Some(SERVICE))
        .refresh_card_view()
        .await
        .expect("refresh");
    mock.assert();
}

#[tokio::test]
async fn refresh_without_service_key_never_calls_the_store() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(204);
    });

    let err = store(&server, None)
        .refresh_card_view()
        .await
        .expect_err("missing key");

    assert!(matches!(err, StoreError::Configuration(_)));
    mock.assert_calls(0);
}

#[tokio::test]
async fn signed_in_views_run_as_the_viewer() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/rest/v1/rpc/track_property_view")
            .header("apikey", ANON)
            .header("authorization", "Bearer user-jwt")
            .json_body(json!({ "p_property_id": "42", "p_session_id": null }));
        then.status(204);
    });

    store(&server, None)
        .record_view(PropertyView {
            property_id: "42".to_string(),
            session_id: None,
            viewer: Viewer::Authenticated {
                access_token: "user-jwt".to_string(),
            },
        })
        .await
        .expect("tracked");
    mock.assert();
}

#[tokio::test]
async fn store_errors_carry_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/rest/v1/rpc/track_property_view");
        then.status(409).body("duplicate view");
    });

    let err = store(&server, None)
        .record_view(PropertyView {
            property_id: "42".to_string(),
            session_id: Some("sess".to_string()),
            viewer: Viewer::Anonymous,
        })
        .await
        .expect_err("conflict");

    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 409);
            assert_eq!(body, "duplicate view");
        }
        other => panic!("unexpected error: {other}"),
    }
}
