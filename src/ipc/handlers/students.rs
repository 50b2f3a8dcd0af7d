use crate::engine::{enroll, status};
use crate::ipc::helpers::{
    as_of_date, get_opt_str, get_required_bool, get_required_str, get_str_array, now_stamp,
    parse_object, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, StudentStatusEvent};
use crate::store::{names, CollectionStore, Snapshot, SqliteStore};
use serde_json::json;
use uuid::Uuid;

fn students_list(store: &SqliteStore, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<Student> = store.load(names::STUDENTS)?;
    Ok(json!({ "students": students }))
}

fn students_create(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name,
        email: get_opt_str(params, "email").unwrap_or_default(),
        phone: get_opt_str(params, "phone").unwrap_or_default(),
        birth_date: get_opt_str(params, "birthDate"),
        sex: get_opt_str(params, "sex"),
    };
    let mut students: Vec<Student> = store.load(names::STUDENTS)?;
    students.push(student.clone());
    store.save(names::STUDENTS, &students)?;
    Ok(json!({ "student": student }))
}

fn students_update(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student: Student = parse_object(params, "student")?;
    let mut students: Vec<Student> = store.load(names::STUDENTS)?;
    let Some(slot) = students.iter_mut().find(|s| s.id == student.id) else {
        return Err(HandlerErr::not_found("student not found"));
    };
    *slot = student.clone();
    store.save(names::STUDENTS, &students)?;
    Ok(json!({ "student": student }))
}

// There is no student delete: deactivation goes through the status log so
// the history stays auditable.
fn students_set_active(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let active = get_required_bool(params, "active")?;
    let stamp = now_stamp();
    let mut history: Vec<StudentStatusEvent> = store.load(names::STUDENT_STATUS_HISTORY)?;
    enroll::bulk_status_change(&mut history, &[student_id.clone()], active, &stamp);
    store.save(names::STUDENT_STATUS_HISTORY, &history)?;
    tracing::debug!(student = %student_id, active, "global status event appended");
    Ok(json!({ "changedAt": stamp, "active": active }))
}

fn students_bulk_set_active(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_ids = get_str_array(params, "studentIds")?;
    let active = get_required_bool(params, "active")?;
    let stamp = now_stamp();
    let mut history: Vec<StudentStatusEvent> = store.load(names::STUDENT_STATUS_HISTORY)?;
    let count = enroll::bulk_status_change(&mut history, &student_ids, active, &stamp);
    store.save(names::STUDENT_STATUS_HISTORY, &history)?;
    Ok(json!({ "count": count, "changedAt": stamp }))
}

fn students_active_status(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let history: Vec<StudentStatusEvent> = store.load(names::STUDENT_STATUS_HISTORY)?;
    Ok(json!({ "active": status::student_active(&history, &student_id) }))
}

fn students_status_history(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let history: Vec<StudentStatusEvent> = store.load(names::STUDENT_STATUS_HISTORY)?;
    let events: Vec<&StudentStatusEvent> = history
        .iter()
        .filter(|e| e.student_id == student_id)
        .collect();
    Ok(json!({ "events": events }))
}

fn students_enrollment_status(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let today = as_of_date(params)?;
    let snapshot = Snapshot::load(store)?;
    let result = status::enrollment_status(
        &snapshot.enrollments,
        &snapshot.sections,
        &snapshot.student_status_history,
        &snapshot.section_student_status_history,
        &student_id,
        today,
    );
    Ok(json!({ "status": result.as_str() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(respond(state, req, students_list)),
        "students.create" => Some(respond(state, req, students_create)),
        "students.update" => Some(respond(state, req, students_update)),
        "students.setActive" => Some(respond(state, req, students_set_active)),
        "students.bulkSetActive" => Some(respond(state, req, students_bulk_set_active)),
        "students.activeStatus" => Some(respond(state, req, students_active_status)),
        "students.statusHistory" => Some(respond(state, req, students_status_history)),
        "students.enrollmentStatus" => Some(respond(state, req, students_enrollment_status)),
        _ => None,
    }
}
