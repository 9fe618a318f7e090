mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_ok, spawn_sidecar, temp_dir, view_field};

fn set_field(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    form_id: &str,
    field: &str,
    value: serde_json::Value,
) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        id,
        "forms.setField",
        json!({ "formId": form_id, "field": field, "value": value }),
    )
}

#[test]
fn lesson_update_rejects_weekend_and_saves_weekday() {
    let workspace = temp_dir("formsd-lesson-update");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    for (i, (list, id, label)) in [
        ("subjects", "sub1", "Mathematics"),
        ("classes", "c1", "1A"),
        ("teachers", "t1", "Ms Rivera"),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("r{}", i),
            "reference.upsert",
            json!({ "list": list, "id": id, "label": label }),
        );
    }

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "forms.open",
        json!({ "entity": "lesson", "mode": "create" }),
    );
    let form_id = opened["formId"].as_str().expect("formId").to_string();
    assert_eq!(
        view_field(&opened["view"], "subjectId").expect("subjectId")["options"],
        json!([{ "id": "sub1", "label": "Mathematics" }])
    );
    assert_eq!(
        view_field(&opened["view"], "day").expect("day")["options"][0],
        json!({ "id": "MONDAY", "label": "Monday" })
    );

    for (i, (field, value)) in [
        ("name", json!("Algebra")),
        ("day", json!("MONDAY")),
        ("startTime", json!("2024-05-06T09:00")),
        ("endTime", json!("2024-05-06T10:00")),
        ("subjectId", json!("sub1")),
        ("classId", json!("c1")),
        ("teacherId", json!("t1")),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = set_field(&mut stdin, &mut reader, &format!("c{}", i), &form_id, field, value);
    }
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "forms.submit",
        json!({ "formId": form_id }),
    );
    assert_eq!(created["outcome"], json!("success"));
    assert_eq!(created["notice"]["message"], json!("Lesson created!"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "records.list",
        json!({ "entity": "lesson" }),
    );
    let lesson_id = listed["records"][0]["id"]
        .as_str()
        .expect("lesson id")
        .to_string();
    assert_eq!(listed["records"][0]["startTime"], json!("2024-05-06T09:00:00Z"));

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "forms.open",
        json!({ "entity": "lesson", "mode": "update", "recordId": lesson_id }),
    );
    let form_id = opened["formId"].as_str().expect("formId").to_string();
    assert_eq!(opened["view"]["heading"], json!("Update Lesson"));
    assert_eq!(opened["view"]["id"], json!(lesson_id));
    assert_eq!(
        view_field(&opened["view"], "startTime").expect("startTime")["value"],
        json!("2024-05-06T09:00:00")
    );

    let _ = set_field(&mut stdin, &mut reader, "6", &form_id, "day", json!("SATURDAY"));
    let rejected = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "forms.submit",
        json!({ "formId": form_id }),
    );
    assert_eq!(rejected["outcome"], json!("invalid"));
    assert_eq!(
        view_field(&rejected["view"], "day").expect("day")["error"],
        json!("Day must be one of MONDAY, TUESDAY, WEDNESDAY, THURSDAY, FRIDAY")
    );
    let stored = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "records.get",
        json!({ "entity": "lesson", "id": lesson_id }),
    );
    assert_eq!(stored["record"]["day"], json!("MONDAY"));

    let _ = set_field(&mut stdin, &mut reader, "9", &form_id, "day", json!("friday"));
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "forms.submit",
        json!({ "formId": form_id }),
    );
    assert_eq!(saved["outcome"], json!("success"));
    assert_eq!(saved["notice"]["message"], json!("Lesson updated!"));
    assert_eq!(saved["notice"]["id"], json!(lesson_id));

    let stored = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "records.get",
        json!({ "entity": "lesson", "id": lesson_id }),
    );
    assert_eq!(stored["record"]["day"], json!("FRIDAY"));
    assert_eq!(stored["record"]["name"], json!("Algebra"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_update_shows_banner_and_stays_editable() {
    let workspace = temp_dir("formsd-lesson-failure");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    // Seeded from shell data whose id no longer exists in the store.
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "forms.open",
        json!({
            "entity": "lesson",
            "mode": "update",
            "data": {
                "id": "ghost",
                "name": "Biology",
                "day": "TUESDAY",
                "startTime": "2024-05-07T11:00:00Z",
                "endTime": "2024-05-07T12:00:00Z",
                "subjectId": "sub9",
                "classId": "c9",
                "teacherId": "t9"
            }
        }),
    );
    let form_id = opened["formId"].as_str().expect("formId").to_string();

    for id in ["3", "4"] {
        let failed = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "forms.submit",
            json!({ "formId": form_id }),
        );
        assert_eq!(failed["outcome"], json!("failure"));
        assert!(failed.get("notice").is_none());
        assert_eq!(failed["view"]["errorBanner"], json!("Something went wrong!"));
        assert_eq!(failed["view"]["state"], json!("failure"));
        assert_eq!(failed["view"]["canSubmit"], json!(true));
        assert_eq!(failed["view"]["closed"], json!(false));
    }

    let edited = set_field(&mut stdin, &mut reader, "5", &form_id, "name", json!("Botany"));
    assert_eq!(
        view_field(&edited["view"], "name").expect("name")["value"],
        json!("Botany")
    );

    let _ = std::fs::remove_dir_all(workspace);
}
