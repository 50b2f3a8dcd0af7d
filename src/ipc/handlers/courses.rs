use crate::ipc::helpers::{
    get_opt_str, get_required_str, parse_object, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Course;
use crate::store::{names, CollectionStore, SqliteStore};
use serde_json::json;
use uuid::Uuid;

fn courses_list(store: &SqliteStore, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let courses: Vec<Course> = store.load(names::COURSES)?;
    Ok(json!({ "courses": courses }))
}

fn courses_create(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let course = Course {
        id: Uuid::new_v4().to_string(),
        name,
        description: get_opt_str(params, "description").unwrap_or_default(),
    };
    let mut courses: Vec<Course> = store.load(names::COURSES)?;
    courses.push(course.clone());
    store.save(names::COURSES, &courses)?;
    Ok(json!({ "course": course }))
}

fn courses_update(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course: Course = parse_object(params, "course")?;
    let mut courses: Vec<Course> = store.load(names::COURSES)?;
    let Some(slot) = courses.iter_mut().find(|c| c.id == course.id) else {
        return Err(HandlerErr::not_found("course not found"));
    };
    *slot = course.clone();
    store.save(names::COURSES, &courses)?;
    Ok(json!({ "course": course }))
}

// Deletion does not cascade: sections and enrollments referencing the
// course are left in place (soft orphaning).
fn courses_delete(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let mut courses: Vec<Course> = store.load(names::COURSES)?;
    let before = courses.len();
    courses.retain(|c| c.id != course_id);
    if courses.len() == before {
        return Err(HandlerErr::not_found("course not found"));
    }
    store.save(names::COURSES, &courses)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(respond(state, req, courses_list)),
        "courses.create" => Some(respond(state, req, courses_create)),
        "courses.update" => Some(respond(state, req, courses_update)),
        "courses.delete" => Some(respond(state, req, courses_delete)),
        _ => None,
    }
}
