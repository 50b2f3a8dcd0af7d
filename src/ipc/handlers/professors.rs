use crate::ipc::helpers::{
    get_opt_str, get_required_str, parse_object, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Professor;
use crate::store::{names, CollectionStore, SqliteStore};
use serde_json::json;
use uuid::Uuid;

fn professors_list(store: &SqliteStore, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let professors: Vec<Professor> = store.load(names::PROFESSORS)?;
    Ok(json!({ "professors": professors }))
}

fn professors_create(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let professor = Professor {
        id: Uuid::new_v4().to_string(),
        name,
        email: get_opt_str(params, "email").unwrap_or_default(),
        phone: get_opt_str(params, "phone").unwrap_or_default(),
    };
    let mut professors: Vec<Professor> = store.load(names::PROFESSORS)?;
    professors.push(professor.clone());
    store.save(names::PROFESSORS, &professors)?;
    Ok(json!({ "professor": professor }))
}

fn professors_update(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let professor: Professor = parse_object(params, "professor")?;
    let mut professors: Vec<Professor> = store.load(names::PROFESSORS)?;
    let Some(slot) = professors.iter_mut().find(|p| p.id == professor.id) else {
        return Err(HandlerErr::not_found("professor not found"));
    };
    *slot = professor.clone();
    store.save(names::PROFESSORS, &professors)?;
    Ok(json!({ "professor": professor }))
}

// No cascade: sections keep their professorId even after the professor row
// is gone.
fn professors_delete(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let professor_id = get_required_str(params, "professorId")?;
    let mut professors: Vec<Professor> = store.load(names::PROFESSORS)?;
    let before = professors.len();
    professors.retain(|p| p.id != professor_id);
    if professors.len() == before {
        return Err(HandlerErr::not_found("professor not found"));
    }
    store.save(names::PROFESSORS, &professors)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "professors.list" => Some(respond(state, req, professors_list)),
        "professors.create" => Some(respond(state, req, professors_create)),
        "professors.update" => Some(respond(state, req, professors_update)),
        "professors.delete" => Some(respond(state, req, professors_delete)),
        _ => None,
    }
}
