use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::router::{doctor_routes, patient_routes};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestResponses, TestConfig, TestUser};

fn bearer(user: &TestUser, config: &AppConfig) -> String {
    let token = JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(24));
    format!("Bearer {}", token)
}

fn get_request(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_list_doctors_endpoint() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app: Router = doctor_routes(Arc::new(config.clone()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::doctor_row(Uuid::new_v4(), "Dr. Ana Garcia"),
            MockPostgrestResponses::doctor_row(Uuid::new_v4(), "Dr. Ben Lee"),
        ])))
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request("/", &bearer(&patient, &config)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = json_body(response).await;
    assert_eq!(json_response["count"], 2);
    assert_eq!(json_response["page"], 1);
    assert_eq!(json_response["per_page"], 20);
    assert_eq!(json_response["doctors"][0]["full_name"], "Dr. Ana Garcia");
}

#[tokio::test]
async fn test_list_doctors_paginates() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = doctor_routes(Arc::new(config.clone()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request("/?page=2&per_page=5", &bearer(&patient, &config)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = json_body(response).await;
    assert_eq!(json_response["page"], 2);
    assert_eq!(json_response["per_page"], 5);
}

#[tokio::test]
async fn test_list_doctors_search_filters_name_and_specialty() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = doctor_routes(Arc::new(config.clone()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param(
            "or",
            "(full_name.ilike.*garcia*,specialty.ilike.*garcia*)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::doctor_row(Uuid::new_v4(), "Dr. Ana Garcia")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request("/?q=garcia", &bearer(&patient, &config)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = json_body(response).await;
    assert_eq!(json_response["count"], 1);
}

#[tokio::test]
async fn test_get_doctor_endpoint() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = doctor_routes(Arc::new(config.clone()));

    let doctor_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::doctor_row(doctor_id, "Dr. Ana Garcia")
        ])))
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request(
            &format!("/{}", doctor_id),
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = json_body(response).await;
    assert_eq!(json_response["id"], json!(doctor_id));
    assert_eq!(json_response["full_name"], "Dr. Ana Garcia");
}

#[tokio::test]
async fn test_get_doctor_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = doctor_routes(Arc::new(config.clone()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request(
            &format!("/{}", Uuid::new_v4()),
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_patient_profile_self() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = patient_routes(Arc::new(config.clone()));

    let patient = TestUser::patient("patient@example.com");
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::patient_row(patient.id, "Pat Example")
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(get_request(
            &format!("/{}", patient.id),
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = json_body(response).await;
    assert_eq!(json_response["full_name"], "Pat Example");
}

#[tokio::test]
async fn test_get_patient_profile_forbidden_for_other_patients() {
    let config = TestConfig::default().to_app_config();
    let app = patient_routes(Arc::new(config.clone()));

    let patient = TestUser::patient("patient@example.com");
    let response = app
        .oneshot(get_request(
            &format!("/{}", Uuid::new_v4()),
            &bearer(&patient, &config),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_patient_profile_visible_to_doctors() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_gateway(&mock_server.uri()).to_app_config();
    let app = patient_routes(Arc::new(config.clone()));

    let patient_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::patient_row(patient_id, "Pat Example")
        ])))
        .mount(&mock_server)
        .await;

    let doctor = TestUser::doctor("doctor@example.com");
    let response = app
        .oneshot(get_request(
            &format!("/{}", patient_id),
            &bearer(&doctor, &config),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_directory_routes_require_auth() {
    let config = TestConfig::default().to_app_config();

    let response = doctor_routes(Arc::new(config.clone()))
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = patient_routes(Arc::new(config))
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
