mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{open_workspace, request, request_ok};

fn create_course(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> String {
    request_ok(stdin, reader, "c1", "courses.create", json!({ "name": "English" }))
        .get("course")
        .and_then(|c| c.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string()
}

fn section_payload(course_id: &str, name: &str, blocks: &[(&str, &str)]) -> serde_json::Value {
    json!({
        "courseId": course_id,
        "name": name,
        "scheduleBlocks": blocks
            .iter()
            .map(|(day, start)| json!({ "day": day, "startTime": start }))
            .collect::<Vec<_>>()
    })
}

#[test]
fn overlapping_block_within_ninety_minutes_is_rejected() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-conflict");
    let course = create_course(&mut stdin, &mut reader);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "sections.create",
        json!({ "section": section_payload(&course, "Section X", &[("monday", "14:00"), ("wednesday", "14:00")]) }),
    );

    // 14:00 + 90min = 15:30, so Monday 15:00 lands inside the block.
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "sections.create",
        json!({ "section": section_payload(&course, "Section Y", &[("monday", "15:00")]) }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    let error = resp.get("error").unwrap();
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("schedule_conflict"));
    let message = error.get("message").and_then(|v| v.as_str()).unwrap();
    assert!(message.contains("Section X"), "message: {message}");
    assert!(message.contains("Monday"), "message: {message}");
    assert!(message.contains("14:00"), "message: {message}");

    // Touching the endpoint is fine.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "sections.create",
        json!({ "section": section_payload(&course, "Section Z", &[("monday", "15:30")]) }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn editing_a_section_in_place_does_not_self_conflict() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-conflict-edit");
    let course = create_course(&mut stdin, &mut reader);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "sections.create",
        json!({ "section": section_payload(&course, "Section X", &[("monday", "14:00")]) }),
    );
    let section_id = created
        .get("section")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();

    // Shift by 30 minutes: still overlaps the stored row, but that row is
    // the one being replaced.
    let mut payload = section_payload(&course, "Section X", &[("monday", "14:30")]);
    payload["id"] = json!(section_id);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "sections.update",
        json!({ "section": payload }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn swap_uses_exclusions_or_opt_out() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-conflict-swap");
    let course = create_course(&mut stdin, &mut reader);

    let x = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "sections.create",
        json!({ "section": section_payload(&course, "Section X", &[("monday", "14:00")]) }),
    );
    let x_id = x
        .get("section")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();
    let y = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "sections.create",
        json!({ "section": section_payload(&course, "Section Y", &[("tuesday", "14:00")]) }),
    );
    let y_id = y
        .get("section")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();

    // Swap the two slots: each update would trip on the partner's stored
    // row, so the partner is excluded (first write) or validation is
    // skipped entirely (second write, already pre-validated).
    let mut y_payload = section_payload(&course, "Section Y", &[("monday", "14:00")]);
    y_payload["id"] = json!(y_id);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "sections.update",
        json!({ "section": y_payload, "excludeSectionIds": [x_id] }),
    );

    let mut x_payload = section_payload(&course, "Section X", &[("tuesday", "14:00")]);
    x_payload["id"] = json!(x_id);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "sections.update",
        json!({ "section": x_payload, "skipValidation": true }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_day_range_sections_participate_in_conflicts() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-conflict-legacy");
    let course = create_course(&mut stdin, &mut reader);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "sections.create",
        json!({
            "section": {
                "courseId": course,
                "name": "Legacy",
                "days": ["friday"],
                "startTime": "10:00",
                "endTime": "12:00"
            }
        }),
    );
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "sections.create",
        json!({ "section": section_payload(&course, "New", &[("friday", "11:00")]) }),
    );
    assert_eq!(
        resp.get("error").and_then(|e| e.get("code")).and_then(|v| v.as_str()),
        Some("schedule_conflict")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn updating_a_missing_section_is_not_found() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-missing-section");
    let course = create_course(&mut stdin, &mut reader);
    let mut payload = section_payload(&course, "Ghost", &[("monday", "09:00")]);
    payload["id"] = json!("does-not-exist");
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "sections.update",
        json!({ "section": payload }),
    );
    assert_eq!(
        resp.get("error").and_then(|e| e.get("code")).and_then(|v| v.as_str()),
        Some("not_found")
    );
    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
