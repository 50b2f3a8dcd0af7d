use crate::engine::error::EngineError;
use crate::engine::{enroll, schedule, status};
use crate::ipc::helpers::{
    as_of_date, get_bool_or, get_required_bool, get_required_str, now_stamp, opt_str_array,
    respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Section, SectionStatusEvent, StudentStatusEvent};
use crate::store::{names, CollectionStore, Snapshot, SqliteStore};
use serde_json::json;
use uuid::Uuid;

/// Section payload for create/update. Create may omit the id.
fn section_from_params(params: &serde_json::Value) -> Result<Section, HandlerErr> {
    let Some(raw) = params.get("section") else {
        return Err(HandlerErr::bad_params("missing section"));
    };
    if !raw.is_object() {
        return Err(HandlerErr::bad_params("section must be an object"));
    }
    let mut raw = raw.clone();
    if raw.get("id").and_then(|v| v.as_str()).is_none() {
        raw["id"] = json!(Uuid::new_v4().to_string());
    }
    serde_json::from_value(raw).map_err(|e| HandlerErr::bad_params(format!("invalid section: {e}")))
}

/// Conflict validation happens here, at write time only. `skipValidation`
/// is the documented opt-out for callers that pre-validated (two-section
/// swaps, bulk loads); it lets transient overlaps into the data on
/// purpose.
fn check_schedule(
    candidate: &Section,
    others: &[Section],
    params: &serde_json::Value,
) -> Result<(), HandlerErr> {
    if get_bool_or(params, "skipValidation", false) {
        return Ok(());
    }
    let exclude = opt_str_array(params, "excludeSectionIds");
    schedule::validate(candidate, others, &exclude).map_err(HandlerErr::from)
}

fn sections_list(store: &SqliteStore, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let sections: Vec<Section> = store.load(names::SECTIONS)?;
    Ok(json!({ "sections": sections }))
}

fn sections_create(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section = section_from_params(params)?;
    if section.name.trim().is_empty() {
        return Err(HandlerErr::bad_params("section name must not be empty"));
    }
    let mut sections: Vec<Section> = store.load(names::SECTIONS)?;
    check_schedule(&section, &sections, params)?;
    sections.push(section.clone());
    store.save(names::SECTIONS, &sections)?;
    Ok(json!({ "section": section }))
}

fn sections_update(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section = section_from_params(params)?;
    let mut sections: Vec<Section> = store.load(names::SECTIONS)?;
    if !sections.iter().any(|s| s.id == section.id) {
        return Err(EngineError::SectionNotFound(section.id.clone()).into());
    }
    check_schedule(&section, &sections, params)?;
    for slot in sections.iter_mut() {
        if slot.id == section.id {
            *slot = section.clone();
        }
    }
    store.save(names::SECTIONS, &sections)?;
    Ok(json!({ "section": section }))
}

// No cascade: enrollments and attendance rows for the section stay behind.
fn sections_delete(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let mut sections: Vec<Section> = store.load(names::SECTIONS)?;
    let before = sections.len();
    sections.retain(|s| s.id != section_id);
    if sections.len() == before {
        return Err(EngineError::SectionNotFound(section_id).into());
    }
    store.save(names::SECTIONS, &sections)?;
    Ok(json!({ "ok": true }))
}

fn sections_active(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let today = as_of_date(params)?;
    let sections: Vec<Section> = store.load(names::SECTIONS)?;
    let active: Vec<&Section> = sections.iter().filter(|s| s.is_ongoing(today)).collect();
    Ok(json!({ "sections": active }))
}

/// Students enrolled in the section, each with the three status flags the
/// selection UI needs. `activeStudentIds` is the effective-active subset.
fn sections_roster(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let snapshot = Snapshot::load(store)?;
    if !snapshot.sections.iter().any(|s| s.id == section_id) {
        return Err(EngineError::SectionNotFound(section_id).into());
    }

    let mut roster = Vec::new();
    let mut active_student_ids = Vec::new();
    for enrollment in snapshot
        .enrollments
        .iter()
        .filter(|e| e.section_id == section_id)
    {
        let global_active =
            status::student_active(&snapshot.student_status_history, &enrollment.student_id);
        let section_active = status::section_student_active(
            &snapshot.section_student_status_history,
            &enrollment.student_id,
            &section_id,
        );
        let effective = global_active && section_active;
        if effective {
            active_student_ids.push(enrollment.student_id.clone());
        }
        let name = snapshot
            .students
            .iter()
            .find(|s| s.id == enrollment.student_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        roster.push(json!({
            "studentId": enrollment.student_id,
            "name": name,
            "enrollmentId": enrollment.id,
            "globalActive": global_active,
            "sectionActive": section_active,
            "effectiveActive": effective,
        }));
    }
    Ok(json!({ "roster": roster, "activeStudentIds": active_student_ids }))
}

fn sections_student_status(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let student_id = get_required_str(params, "studentId")?;
    let global: Vec<StudentStatusEvent> = store.load(names::STUDENT_STATUS_HISTORY)?;
    let per_section: Vec<SectionStatusEvent> =
        store.load(names::SECTION_STUDENT_STATUS_HISTORY)?;
    let global_active = status::student_active(&global, &student_id);
    let section_active = status::section_student_active(&per_section, &student_id, &section_id);
    Ok(json!({
        "globalActive": global_active,
        "sectionActive": section_active,
        "effectiveActive": global_active && section_active,
    }))
}

/// Append a per-section status event, then reconcile global status from
/// the student's ongoing sections.
fn sections_set_student_active(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let student_id = get_required_str(params, "studentId")?;
    let active = get_required_bool(params, "active")?;
    let today = as_of_date(params)?;
    let stamp = now_stamp();

    let mut snapshot = Snapshot::load(store)?;
    let event = enroll::section_status_change(
        &mut snapshot.section_student_status_history,
        &student_id,
        &section_id,
        active,
        &stamp,
    );
    let global_event = enroll::sync_global_status_from_sections(
        &mut snapshot.student_status_history,
        &snapshot.section_student_status_history,
        &snapshot.enrollments,
        &snapshot.sections,
        &student_id,
        today,
        &stamp,
    );
    store.save(
        names::SECTION_STUDENT_STATUS_HISTORY,
        &snapshot.section_student_status_history,
    )?;
    store.save(names::STUDENT_STATUS_HISTORY, &snapshot.student_status_history)?;
    if let Some(global) = &global_event {
        tracing::debug!(
            student = %student_id,
            active = global.is_active,
            "global status reconciled from sections"
        );
    }
    Ok(json!({ "event": event, "globalEvent": global_event }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sections.list" => Some(respond(state, req, sections_list)),
        "sections.create" => Some(respond(state, req, sections_create)),
        "sections.update" => Some(respond(state, req, sections_update)),
        "sections.delete" => Some(respond(state, req, sections_delete)),
        "sections.active" => Some(respond(state, req, sections_active)),
        "sections.roster" => Some(respond(state, req, sections_roster)),
        "sections.studentStatus" => Some(respond(state, req, sections_student_status)),
        "sections.setStudentActive" => Some(respond(state, req, sections_set_student_active)),
        _ => None,
    }
}
