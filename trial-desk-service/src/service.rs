use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post, put},
};
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use protocol_extract::{
    ExtractError, ExtractionResult, GenerationClient, OpenRouterClient, ProtocolExtractor,
    ResponseSynthesizer, StudyAssistant, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    error::StoreError,
    models::{
        AdverseEventDraft, ClinicalTeam, MonitorInfo, Patient, PatientDraft, ScreeningOutcome,
        Study, StudyDraft,
    },
    store::TrialStore,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn conflict_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn store_error(error: StoreError) -> ApiError {
    match &error {
        StoreError::StudyNotFound(id) => not_found_error("Study not found", id),
        StoreError::PatientNotFound(id) => not_found_error("Patient not found", id),
        StoreError::DuplicateStudy(id) => conflict_error("Study already exists", id),
        StoreError::DuplicatePatient(id) => conflict_error("Patient already exists", id),
        StoreError::Invalid(_) => bad_request_error(&error.to_string()),
    }
}

fn extraction_error(error: ExtractError) -> ApiError {
    match error {
        ExtractError::Validation(ValidationError::UnsupportedMimeType(mime_type)) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({
                "error": "Only PDF protocols are supported",
                "mime_type": mime_type
            })),
        ),
        ExtractError::Validation(e) => bad_request_error(&e.to_string()),
        ExtractError::Transport(details) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "Protocol analysis failed",
                "details": details,
                "retry": true
            })),
        ),
        ExtractError::Config(details) => {
            internal_error("Generation client misconfigured", &details)
        }
    }
}

/// Studies with a protocol extraction currently running.
#[derive(Clone, Default)]
pub struct ExtractionSlots {
    active: Arc<DashMap<String, ()>>,
}

impl ExtractionSlots {
    /// Claim the study's slot, or `None` if an extraction is already running.
    pub fn try_acquire(&self, study_id: &str) -> Option<ExtractionSlot> {
        match self.active.entry(study_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(ExtractionSlot {
                    active: self.active.clone(),
                    study_id: study_id.to_string(),
                })
            }
        }
    }

    pub fn is_busy(&self, study_id: &str) -> bool {
        self.active.contains_key(study_id)
    }
}

/// Released on drop.
pub struct ExtractionSlot {
    active: Arc<DashMap<String, ()>>,
    study_id: String,
}

impl Drop for ExtractionSlot {
    fn drop(&mut self) {
        self.active.remove(&self.study_id);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TrialStore>,
    pub extractor: ProtocolExtractor,
    pub assistant: StudyAssistant,
    pub extraction_slots: ExtractionSlots,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(client: Arc<dyn GenerationClient>, max_upload_bytes: usize) -> Self {
        let synthesizer = ResponseSynthesizer::new(client);
        Self {
            store: Arc::new(TrialStore::new()),
            extractor: ProtocolExtractor::new(synthesizer.clone()),
            assistant: StudyAssistant::new(synthesizer),
            extraction_slots: ExtractionSlots::default(),
            max_upload_bytes,
        }
    }
}

pub fn create_app(config: &ServiceConfig) -> Router {
    let client = OpenRouterClient::new(config.generation.clone());
    info!(model = %client.model(), "generation client ready");
    build_router(AppState::new(Arc::new(client), config.max_upload_bytes))
}

pub fn build_router(app_state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(app_state.max_upload_bytes);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/studies", get(list_studies).post(create_study))
        .route("/studies/{study_id}", get(get_study))
        .route("/studies/{study_id}/team", put(update_team))
        .route("/studies/{study_id}/monitor", put(update_monitor))
        .route("/studies/{study_id}/enrollment", post(adjust_enrollment))
        .route(
            "/studies/{study_id}/protocol",
            post(upload_protocol).layer(upload_limit),
        )
        .route("/studies/{study_id}/ask", post(ask_about_study))
        .route(
            "/studies/{study_id}/patients",
            get(list_patients).post(add_patient),
        )
        .route("/patients/{patient_id}/consent", post(sign_consent))
        .route("/patients/{patient_id}/screening", get(screening_status))
        .route(
            "/patients/{patient_id}/screening/toggle",
            post(toggle_screening_item),
        )
        .route(
            "/patients/{patient_id}/screening/finalize",
            post(finalize_screening),
        )
        .route(
            "/patients/{patient_id}/adverse-events",
            post(report_adverse_event),
        )
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tags every request with a fresh `x-correlation-id` and runs it inside a
/// span carrying that id.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Trial Desk Service",
        "version": "1.0.0",
        "description": "Clinical trial coordination with AI protocol extraction",
        "endpoints": {
            "GET /studies": "List studies",
            "POST /studies": "Register a study",
            "GET /studies/{study_id}": "Get a study",
            "POST /studies/{study_id}/protocol": "Upload a protocol PDF for extraction",
            "POST /studies/{study_id}/ask": "Ask the research assistant about a study",
            "POST /studies/{study_id}/patients": "Add a patient for screening",
            "GET /patients/{patient_id}/screening": "Screening checklist and progress",
            "POST /patients/{patient_id}/adverse-events": "Report an adverse event",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn list_studies(State(state): State<AppState>) -> Json<Vec<Study>> {
    Json(state.store.list_studies())
}

async fn create_study(
    State(state): State<AppState>,
    Json(draft): Json<StudyDraft>,
) -> ApiResult<Study> {
    let study = draft.build(today()).map_err(store_error)?;
    let study = state.store.add_study(study).map_err(store_error)?;
    Ok(Json(study))
}

async fn get_study(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
) -> ApiResult<Study> {
    state.store.get_study(&study_id).map(Json).map_err(store_error)
}

async fn update_team(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    Json(team): Json<ClinicalTeam>,
) -> ApiResult<Study> {
    state
        .store
        .update_team(&study_id, team)
        .map(Json)
        .map_err(store_error)
}

async fn update_monitor(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    Json(monitor): Json<MonitorInfo>,
) -> ApiResult<Study> {
    state
        .store
        .update_monitor(&study_id, monitor)
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Deserialize)]
struct EnrollmentRequest {
    delta: i64,
}

async fn adjust_enrollment(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    Json(request): Json<EnrollmentRequest>,
) -> ApiResult<Study> {
    state
        .store
        .adjust_enrollment(&study_id, request.delta)
        .map(Json)
        .map_err(store_error)
}

async fn upload_protocol(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ExtractionResult> {
    state.store.get_study(&study_id).map_err(store_error)?;

    let Some(_slot) = state.extraction_slots.try_acquire(&study_id) else {
        warn!(study_id = %study_id, "protocol extraction already in progress");
        return Err(conflict_error(
            "Protocol extraction already in progress",
            &study_id,
        ));
    };

    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    info!(
        study_id = %study_id,
        mime_type = %mime_type,
        bytes = body.len(),
        "Starting protocol extraction"
    );

    let result = state
        .extractor
        .extract_protocol(body.to_vec(), mime_type)
        .await
        .map_err(|e| {
            error!(study_id = %study_id, error = %e, "Protocol extraction failed");
            extraction_error(e)
        })?;

    state
        .store
        .apply_protocol_extraction(&study_id, result.clone())
        .map_err(store_error)?;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
}

async fn ask_about_study(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    if request.question.trim().is_empty() {
        return Err(bad_request_error("Question is required"));
    }

    let study = state.store.get_study(&study_id).map_err(store_error)?;
    let (context, narrative) = study.into_question_context();
    let answer = state
        .assistant
        .answer_about_study(&context, narrative.as_deref(), &request.question)
        .await;

    Ok(Json(AskResponse { answer }))
}

async fn list_patients(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
) -> ApiResult<Vec<Patient>> {
    state
        .store
        .list_patients(&study_id)
        .map(Json)
        .map_err(store_error)
}

async fn add_patient(
    State(state): State<AppState>,
    Path(study_id): Path<String>,
    Json(draft): Json<PatientDraft>,
) -> ApiResult<Patient> {
    let patient = draft.build(&study_id, today()).map_err(store_error)?;
    state
        .store
        .add_patient(patient)
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsentRequest {
    patient_signature: String,
    pi_signature: String,
}

async fn sign_consent(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<ConsentRequest>,
) -> ApiResult<Patient> {
    state
        .store
        .sign_consent(&patient_id, request.patient_signature, request.pi_signature)
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreeningStatus {
    patient_id: String,
    checklist: Vec<String>,
    completed_items: Vec<String>,
}

async fn screening_status(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<ScreeningStatus> {
    let patient = state.store.get_patient(&patient_id).map_err(store_error)?;
    let checklist = state
        .store
        .screening_checklist_for(&patient_id)
        .map_err(store_error)?;

    Ok(Json(ScreeningStatus {
        patient_id,
        checklist,
        completed_items: patient.completed_screening_items,
    }))
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    item: String,
}

async fn toggle_screening_item(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Patient> {
    state
        .store
        .toggle_screening_item(&patient_id, &request.item)
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Deserialize)]
struct FinalizeRequest {
    outcome: ScreeningOutcome,
}

async fn finalize_screening(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Patient> {
    state
        .store
        .finalize_screening(&patient_id, request.outcome)
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdverseEventReport {
    patient: Patient,
    ae_guidelines: Option<String>,
}

async fn report_adverse_event(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(draft): Json<AdverseEventDraft>,
) -> ApiResult<AdverseEventReport> {
    let event = draft.build(today()).map_err(store_error)?;
    let patient = state
        .store
        .report_adverse_event(&patient_id, event)
        .map_err(store_error)?;
    let ae_guidelines = state
        .store
        .ae_guidelines_for(&patient_id)
        .map_err(store_error)?;

    Ok(Json(AdverseEventReport {
        patient,
        ae_guidelines,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use http_body_util::BodyExt;
    use protocol_extract::{ASSISTANT_ERROR_FALLBACK, MockGenerationClient};
    use tower::ServiceExt;

    const PROTOCOL_REPLY: &str = "The protocol enrolls adults with heart failure.\n\
        SCREENING_LIST_START\n- Informed consent\n- ECG\nSCREENING_LIST_END\n\
        AE_GUIDELINES_START Report SAEs within 24 hours. AE_GUIDELINES_END";

    fn app_with(client: Arc<MockGenerationClient>) -> (Router, AppState) {
        let state = AppState::new(client, 1024);
        (build_router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        read(response).await
    }

    async fn upload(
        app: &Router,
        study_id: &str,
        mime: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let request = HttpRequest::builder()
            .method("POST")
            .uri(format!("/studies/{study_id}/protocol"))
            .header("content-type", mime)
            .body(Body::from(bytes.to_vec()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        read(response).await
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_trial(app: &Router) {
        let (status, _) = send(
            app,
            "POST",
            "/studies",
            Some(json!({
                "id": "TRIAL-001",
                "title": "Phase II mRNA Cardiac Regeneration Study",
                "phase": "Phase II",
                "principalInvestigator": "Dr. Sarah Chen"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::new("")));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "Trial Desk Service");
    }

    #[tokio::test]
    async fn test_create_and_fetch_study() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::new("")));
        create_trial(&app).await;

        let (status, body) = send(&app, "GET", "/studies/TRIAL-001", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["principalInvestigator"], "Dr. Sarah Chen");
        assert_eq!(body["currentEnrollment"], 0);

        let (status, _) = send(&app, "GET", "/studies/TRIAL-404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            "/studies",
            Some(json!({ "id": "TRIAL-001", "title": "Again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_never_reaches_model() {
        let client = Arc::new(MockGenerationClient::new(PROTOCOL_REPLY));
        let (app, _) = app_with(client.clone());
        create_trial(&app).await;

        let (status, body) = upload(&app, "TRIAL-001", "image/png", b"\x89PNG").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["mime_type"], "image/png");

        let (status, _) = upload(&app, "TRIAL-001", "application/pdf", b"not a pdf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_pdf_upload_replaces_protocol_insight() {
        let client = Arc::new(MockGenerationClient::new(PROTOCOL_REPLY));
        let (app, state) = app_with(client.clone());
        create_trial(&app).await;

        let (status, body) = upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.7 body").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["aeGuidelines"], "Report SAEs within 24 hours.");
        assert_eq!(
            body["narrativeText"],
            "The protocol enrolls adults with heart failure."
        );
        assert_eq!(client.calls(), 1);
        assert!(!state.extraction_slots.is_busy("TRIAL-001"));

        let (_, study) = send(&app, "GET", "/studies/TRIAL-001", None).await;
        assert_eq!(study["screeningChecklist"], json!(["Informed consent", "ECG"]));
        assert_eq!(study["protocolInsight"]["summary"], "");
    }

    #[tokio::test]
    async fn test_upload_transport_failure_is_bad_gateway() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::failing("upstream 503")));
        create_trial(&app).await;

        let (status, body) = upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.4").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retry"], true);

        let (_, study) = send(&app, "GET", "/studies/TRIAL-001", None).await;
        assert!(study.get("protocolInsight").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_upload_is_rejected() {
        let client = Arc::new(MockGenerationClient::new(PROTOCOL_REPLY));
        let (app, state) = app_with(client.clone());
        create_trial(&app).await;

        let held = state.extraction_slots.try_acquire("TRIAL-001");
        assert!(held.is_some());

        let (status, _) = upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.7").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(client.calls(), 0);

        drop(held);
        let (status, _) = upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.7").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::new(PROTOCOL_REPLY)));
        create_trial(&app).await;

        let mut document = b"%PDF-1.7 ".to_vec();
        document.resize(4096, b'x');
        let (status, _) = upload(&app, "TRIAL-001", "application/pdf", &document).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_ask_uses_study_and_narrative() {
        let client = Arc::new(MockGenerationClient::new(PROTOCOL_REPLY));
        let (app, _) = app_with(client.clone());
        create_trial(&app).await;
        upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.7").await;

        let (status, body) = send(
            &app,
            "POST",
            "/studies/TRIAL-001/ask",
            Some(json!({ "question": "What is the enrollment status?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], PROTOCOL_REPLY);

        let request = client.last_request().unwrap();
        let prompt = format!("{:?}", request.parts);
        assert!(prompt.contains("TRIAL-001"));
        assert_eq!(prompt.matches("heart failure").count(), 1);
        assert!(prompt.contains("protocolInsightContent"));
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_and_falls_back_on_failure() {
        let client = Arc::new(MockGenerationClient::failing("timeout"));
        let (app, _) = app_with(client.clone());
        create_trial(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            "/studies/TRIAL-001/ask",
            Some(json!({ "question": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.calls(), 0);

        let (status, body) = send(
            &app,
            "POST",
            "/studies/TRIAL-001/ask",
            Some(json!({ "question": "Who is the PI?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], ASSISTANT_ERROR_FALLBACK);
    }

    #[tokio::test]
    async fn test_screening_flow_enrolls_patient() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::new(PROTOCOL_REPLY)));
        create_trial(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            "/studies/TRIAL-001/patients",
            Some(json!({ "id": "SUB-1022", "gender": "M" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, screening) = send(&app, "GET", "/patients/SUB-1022/screening", None).await;
        assert_eq!(
            screening["checklist"],
            json!(["Informed Consent", "Eligibility Review", "Vitals"])
        );

        let (status, patient) = send(
            &app,
            "POST",
            "/patients/SUB-1022/consent",
            Some(json!({ "patientSignature": "data:a", "piSignature": "data:b" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patient["consentStatus"], "Signed");

        let (_, patient) = send(
            &app,
            "POST",
            "/patients/SUB-1022/screening/toggle",
            Some(json!({ "item": "Vitals" })),
        )
        .await;
        assert_eq!(patient["completedScreeningItems"], json!(["Vitals"]));

        let (_, patient) = send(
            &app,
            "POST",
            "/patients/SUB-1022/screening/finalize",
            Some(json!({ "outcome": "Pass" })),
        )
        .await;
        assert_eq!(patient["status"], "Enrolled");

        let (status, _) = send(
            &app,
            "POST",
            "/patients/SUB-1022/screening/finalize",
            Some(json!({ "outcome": "Pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, study) = send(&app, "GET", "/studies/TRIAL-001", None).await;
        assert_eq!(study["currentEnrollment"], 1);
    }

    #[tokio::test]
    async fn test_adverse_event_report_includes_guidelines() {
        let (app, _) = app_with(Arc::new(MockGenerationClient::new(PROTOCOL_REPLY)));
        create_trial(&app).await;
        upload(&app, "TRIAL-001", "application/pdf", b"%PDF-1.7").await;
        send(
            &app,
            "POST",
            "/studies/TRIAL-001/patients",
            Some(json!({ "id": "SUB-1025", "gender": "F" })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/patients/SUB-1025/adverse-events",
            Some(json!({ "eventType": "SAE", "description": "Chest pain", "severity": "Severe" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["aeGuidelines"], "Report SAEs within 24 hours.");
        assert_eq!(body["patient"]["reportedEvents"][0]["status"], "Reported");

        let (status, _) = send(
            &app,
            "POST",
            "/patients/SUB-404/adverse-events",
            Some(json!({ "description": "Nausea" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
