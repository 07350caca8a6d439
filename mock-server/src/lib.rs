use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const DEMO_EMAIL: &str = "admin@example.com";
pub const DEMO_PASSWORD: &str = "admin123";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create and update share one loose shape so validation can report every
/// problem at once instead of failing on the first missing field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInput {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub place_of_birth: Option<String>,
    pub nationality: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    token: Arc<str>,
    user_id: Uuid,
}

type ApiError = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        token: Uuid::new_v4().simple().to_string().into(),
        user_id: Uuid::new_v4(),
    };
    Router::new()
        .route("/auth/login", post(login))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    if input.email != DEMO_EMAIL || input.password != DEMO_PASSWORD {
        return Err(error(StatusCode::UNAUTHORIZED, json!("Credenciais inválidas")));
    }
    let session = json!({
        "access_token": &*state.token,
        "user": {"id": state.user_id, "email": DEMO_EMAIL, "isActive": true},
    });
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let users = state.db.read().await;
    let mut data: Vec<User> = users.values().cloned().collect();
    data.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(Json(json!({
        "message": "Usuários listados com sucesso",
        "total": data.len(),
        "data": data,
    })))
}

async fn get_user(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<User>, ApiError> {
    authorize(&state, &headers)?;
    let id = parse_id(&id)?;
    let users = state.db.read().await;
    users.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    authorize(&state, &headers)?;
    let problems = validate(&input, true);
    let birth_date = input.birth_date.as_deref().and_then(parse_date);
    let Some(birth_date) = birth_date.filter(|_| problems.is_empty()) else {
        return Err(error(StatusCode::BAD_REQUEST, json!(problems)));
    };

    let mut users = state.db.write().await;
    let cpf = input.cpf.unwrap_or_default();
    if users.values().any(|u| u.cpf == cpf) {
        return Err(error(StatusCode::CONFLICT, json!("CPF já cadastrado")));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: input.name.unwrap_or_default().trim().to_string(),
        cpf,
        birth_date,
        gender: input.gender,
        email: input.email,
        place_of_birth: input.place_of_birth,
        nationality: input.nationality,
        created_at: now,
        updated_at: now,
    };
    users.insert(user.id, user.clone());
    info!(id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Usuário criado com sucesso", "data": user})),
    ))
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let id = parse_id(&id)?;
    let problems = validate(&input, false);
    if !problems.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, json!(problems)));
    }

    let mut users = state.db.write().await;
    if let Some(cpf) = &input.cpf {
        if users.values().any(|u| u.id != id && &u.cpf == cpf) {
            return Err(error(StatusCode::CONFLICT, json!("CPF já cadastrado")));
        }
    }
    let user = users.get_mut(&id).ok_or_else(not_found)?;
    if let Some(name) = input.name {
        user.name = name.trim().to_string();
    }
    if let Some(cpf) = input.cpf {
        user.cpf = cpf;
    }
    if let Some(birth_date) = input.birth_date.as_deref().and_then(parse_date) {
        user.birth_date = birth_date;
    }
    if input.gender.is_some() {
        user.gender = input.gender;
    }
    if input.email.is_some() {
        user.email = input.email;
    }
    if input.place_of_birth.is_some() {
        user.place_of_birth = input.place_of_birth;
    }
    if input.nationality.is_some() {
        user.nationality = input.nationality;
    }
    user.updated_at = Utc::now();
    Ok(Json(json!({"message": "Usuário atualizado com sucesso", "data": user})))
}

async fn delete_user(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    let id = parse_id(&id)?;
    let mut users = state.db.write().await;
    users.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or_else(not_found)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == &*state.token => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, json!("Unauthorized"))),
    }
}

/// Field checks in declaration order, collecting every problem.
/// On create every required field must be present; on update only the
/// fields sent are checked.
pub fn validate(input: &UserInput, creating: bool) -> Vec<String> {
    let mut problems = Vec::new();

    match &input.name {
        Some(name) if name.trim().is_empty() => problems.push("name should not be empty".to_string()),
        None if creating => problems.push("name should not be empty".to_string()),
        _ => {}
    }
    match &input.cpf {
        Some(cpf) if cpf.len() != 11 || !cpf.chars().all(|c| c.is_ascii_digit()) => {
            problems.push("cpf must be exactly 11 digits".to_string())
        }
        None if creating => problems.push("cpf must be exactly 11 digits".to_string()),
        _ => {}
    }
    match &input.birth_date {
        Some(date) if parse_date(date).is_none() => {
            problems.push("birthDate must be a valid ISO 8601 date string".to_string())
        }
        None if creating => problems.push("birthDate must be a valid ISO 8601 date string".to_string()),
        _ => {}
    }
    if let Some(gender) = &input.gender {
        if !matches!(gender.as_str(), "M" | "F" | "O") {
            problems.push("gender must be one of the following values: M, F, O".to_string());
        }
    }
    if let Some(email) = &input.email {
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            problems.push("email must be an email".to_string());
        }
    }

    problems
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Ids that are not UUIDs can never match a record.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| not_found())
}

fn not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, json!("Usuário não encontrado"))
}

fn error(status: StatusCode, message: Value) -> ApiError {
    let body = json!({
        "message": message,
        "error": status.canonical_reason().unwrap_or_default(),
        "statusCode": status.as_u16(),
    });
    (status, Json(body))
}
