use crate::ipc::helpers::{get_opt_str, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Payment;
use crate::store::{names, CollectionStore, SqliteStore};
use serde_json::json;
use uuid::Uuid;

fn payments_list(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_opt_str(params, "studentId");
    let payments: Vec<Payment> = store.load(names::PAYMENTS)?;
    let rows: Vec<&Payment> = payments
        .iter()
        .filter(|p| student_id.as_deref().map(|s| p.student_id == s).unwrap_or(true))
        .collect();
    Ok(json!({ "payments": rows }))
}

// Append-only ledger; there is no update or delete path.
fn payments_create(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_str(params, "date")?;
    let amount = params
        .get("amount")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params("missing amount"))?;
    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        student_id,
        amount,
        date,
        concept: get_opt_str(params, "concept").unwrap_or_default(),
    };
    let mut payments: Vec<Payment> = store.load(names::PAYMENTS)?;
    payments.push(payment.clone());
    store.save(names::PAYMENTS, &payments)?;
    Ok(json!({ "payment": payment }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.list" => Some(respond(state, req, payments_list)),
        "payments.create" => Some(respond(state, req, payments_create)),
        _ => None,
    }
}
