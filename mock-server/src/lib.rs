use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
}

fn default_role() -> String {
    "member".to_string()
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Deserialize)]
pub struct PatchUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct ListFilter {
    pub role: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Default)]
pub struct Store {
    users: BTreeMap<u64, User>,
    next_id: u64,
}

impl Store {
    fn insert(&mut self, name: String, email: String, role: String) -> User {
        self.next_id += 1;
        let user = User {
            id: self.next_id,
            name,
            email,
            role,
        };
        self.users.insert(user.id, user.clone());
        user
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_users(Vec::new())
}

/// Router pre-populated with `users`; new ids continue after the highest
/// seeded id.
pub fn app_with_users(users: Vec<User>) -> Router {
    let next_id = users.iter().map(|u| u.id).max().unwrap_or(0);
    let store = Store {
        users: users.into_iter().map(|u| (u.id, u)).collect(),
        next_id,
    };
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

async fn list_users(State(db): State<Db>, Query(filter): Query<ListFilter>) -> Json<Vec<User>> {
    let store = db.read().await;
    let users = store
        .users
        .values()
        .filter(|u| filter.role.as_ref().is_none_or(|role| &u.role == role))
        .take(filter.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(users)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> (StatusCode, Json<User>) {
    let user = db.write().await.insert(input.name, input.email, input.role);
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
    let store = db.read().await;
    store.users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<CreateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut store = db.write().await;
    let user = store.users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    user.name = input.name;
    user.email = input.email;
    user.role = input.role;
    Ok(Json(user.clone()))
}

async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PatchUser>,
) -> Result<Json<User>, StatusCode> {
    let mut store = db.write().await;
    let user = store.users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(role) = input.role {
        user.role = role;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    store
        .users
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// What the server saw, for asserting on request assembly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: 7,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: "admin".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn create_user_defaults_role_to_member() {
        let input: CreateUser =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(input.role, "member");
    }

    #[test]
    fn create_user_rejects_missing_email() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"name":"Ada"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_user_all_fields_optional() {
        let input: PatchUser = serde_json::from_str("{}").unwrap();
        assert!(input.name.is_none());
        assert!(input.email.is_none());
        assert!(input.role.is_none());
    }

    #[test]
    fn store_assigns_increasing_ids() {
        let mut store = Store::default();
        let first = store.insert("A".into(), "a@x".into(), default_role());
        let second = store.insert("B".into(), "b@x".into(), default_role());
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }
}
