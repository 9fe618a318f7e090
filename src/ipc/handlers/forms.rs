use serde_json::{json, Map, Value};
use tracing::debug;

use crate::forms::{
    reference, render_form, schema, store, AssessmentType, FormError, FormMode, FormSettings,
    ReferenceData, SqliteGateway,
};
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::load_form_settings;
use crate::ipc::helpers::{entity_param, required_str};
use crate::ipc::types::{AppState, Request};

fn form_err(req: &Request, e: FormError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), None)
}

fn form_id_param(state: &AppState, req: &Request) -> Result<String, serde_json::Value> {
    let form_id = required_str(req, "formId")?;
    if !state.forms.contains_key(&form_id) {
        return Err(err(&req.id, "not_found", "form not found", None));
    }
    Ok(form_id)
}

fn seed_data(state: &AppState, req: &Request) -> Result<Option<Map<String, Value>>, serde_json::Value> {
    let record_id = req
        .params
        .get("recordId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(record_id) = record_id {
        let kind = entity_param(req)?;
        let Some(conn) = state.db.as_ref() else {
            return Err(err(&req.id, "no_workspace", "select a workspace first", None));
        };
        return match store::fetch_record(conn, kind, record_id) {
            Ok(Some(rec)) => Ok(Some(rec)),
            Ok(None) => Err(err(
                &req.id,
                "not_found",
                format!("{} not found", kind.as_str()),
                None,
            )),
            Err(e) => Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        };
    }
    match req.params.get("data") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj.clone())),
        Some(_) => Err(err(&req.id, "bad_params", "data must be an object", None)),
    }
}

fn handle_forms_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(e) => return e,
    };
    let mode_raw = match required_str(req, "mode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(mode) = FormMode::parse(&mode_raw) else {
        return err(&req.id, "bad_params", "mode must be create or update", None);
    };
    let data = match seed_data(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    // The id cannot be typed in later, so an update form must be seeded with one.
    let seeded_id = data
        .as_ref()
        .and_then(|d| schema::raw_text(d.get("id")).ok().flatten());
    if mode == FormMode::Update && seeded_id.is_none() {
        return err(
            &req.id,
            "bad_params",
            "update needs recordId or data.id",
            None,
        );
    }

    let reference_data = match (req.params.get("referenceData"), state.db.as_ref()) {
        (Some(v), _) if !v.is_null() => match ReferenceData::from_json(v) {
            Ok(r) => r,
            Err(msg) => return err(&req.id, "bad_params", msg, None),
        },
        (_, Some(conn)) => match reference::load(conn, kind) {
            Ok(r) => r,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
        (_, None) => ReferenceData::default(),
    };
    let settings = match state.db.as_ref() {
        Some(conn) => match load_form_settings(conn) {
            Ok(s) => s,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
        None => FormSettings::default(),
    };

    let form_id = uuid::Uuid::new_v4().to_string();
    let mut form = render_form(kind, mode, data.as_ref(), reference_data, settings);
    let outbox = state.outbox.clone();
    let tag = form_id.clone();
    form.on_outcome(move |notice| outbox.borrow_mut().push((tag.clone(), notice.clone())));

    let view = form.view();
    state.forms.insert(form_id.clone(), form);
    debug!(form_id = %form_id, entity = kind.as_str(), mode = mode.as_str(), "form opened");
    ok(&req.id, json!({ "formId": form_id, "view": view }))
}

fn handle_forms_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match form_id_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let field = match required_str(req, "field") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let value = req.params.get("value").cloned().unwrap_or(Value::Null);
    let Some(form) = state.forms.get_mut(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    if let Err(e) = form.set_field(&field, value) {
        return form_err(req, e);
    }
    ok(&req.id, json!({ "view": form.view() }))
}

fn handle_forms_set_association(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match form_id_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mode_raw = match required_str(req, "mode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(mode) = AssessmentType::parse(&mode_raw) else {
        return err(&req.id, "bad_params", "mode must be exam or assignment", None);
    };
    let Some(form) = state.forms.get_mut(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    if let Err(e) = form.set_association_mode(mode) {
        return form_err(req, e);
    }
    ok(&req.id, json!({ "view": form.view() }))
}

fn handle_forms_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match form_id_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(form) = state.forms.get_mut(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };

    let mut gateway = SqliteGateway::new(conn);
    let report = match form.submit(&mut gateway) {
        Ok(r) => r,
        Err(e) => return form_err(req, e),
    };
    let view = form.view();

    let notice = {
        let mut outbox = state.outbox.borrow_mut();
        let mut mine = None;
        outbox.retain(|(tag, n)| {
            if *tag == form_id {
                mine.get_or_insert_with(|| n.clone());
                false
            } else {
                true
            }
        });
        mine
    };

    let mut result = json!({ "outcome": report.as_str(), "view": view });
    if let Some(n) = notice {
        result["notice"] = json!(n);
    }
    ok(&req.id, result)
}

fn handle_forms_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match form_id_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.forms.get(&form_id) {
        Some(form) => ok(&req.id, json!({ "view": form.view() })),
        None => err(&req.id, "not_found", "form not found", None),
    }
}

fn handle_forms_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match form_id_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Some(mut form) = state.forms.remove(&form_id) {
        form.close();
    }
    state.outbox.borrow_mut().retain(|(tag, _)| *tag != form_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "forms.open" => Some(handle_forms_open(state, req)),
        "forms.setField" => Some(handle_forms_set_field(state, req)),
        "forms.setAssociation" => Some(handle_forms_set_association(state, req)),
        "forms.submit" => Some(handle_forms_submit(state, req)),
        "forms.get" => Some(handle_forms_get(state, req)),
        "forms.close" => Some(handle_forms_close(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ipc::handle_request;
    use pretty_assertions::assert_eq;

    fn call(state: &mut AppState, method: &str, params: Value) -> Value {
        handle_request(
            state,
            Request {
                id: "1".into(),
                method: method.into(),
                params,
            },
        )
    }

    fn state_with_db() -> AppState {
        let mut state = AppState::new();
        state.db = Some(db::open_in_memory().expect("db"));
        state
    }

    #[test]
    fn successful_submit_returns_notice_exactly_once() {
        let mut state = state_with_db();
        let opened = call(
            &mut state,
            "forms.open",
            json!({ "entity": "announcement", "mode": "create" }),
        );
        let form_id = opened["result"]["formId"].as_str().expect("formId").to_string();
        for (field, value) in [
            ("title", "Sports Day"),
            ("description", "Annual event"),
            ("date", "2024-05-01"),
        ] {
            let resp = call(
                &mut state,
                "forms.setField",
                json!({ "formId": form_id, "field": field, "value": value }),
            );
            assert_eq!(resp["ok"], json!(true));
        }

        let submitted = call(&mut state, "forms.submit", json!({ "formId": form_id }));
        assert_eq!(submitted["result"]["outcome"], json!("success"));
        assert_eq!(
            submitted["result"]["notice"]["message"],
            json!("Announcement created!")
        );
        assert!(state.outbox.borrow().is_empty());

        let again = call(&mut state, "forms.get", json!({ "formId": form_id }));
        assert_eq!(again["result"]["view"]["closed"], json!(true));
        assert!(again["result"].get("notice").is_none());

        let resubmit = call(&mut state, "forms.submit", json!({ "formId": form_id }));
        assert_eq!(resubmit["error"]["code"], json!("form_closed"));
    }

    #[test]
    fn invalid_submit_is_ok_with_errors_in_view() {
        let mut state = state_with_db();
        let opened = call(
            &mut state,
            "forms.open",
            json!({ "entity": "event", "mode": "create" }),
        );
        let form_id = opened["result"]["formId"].as_str().expect("formId").to_string();
        let submitted = call(&mut state, "forms.submit", json!({ "formId": form_id }));
        assert_eq!(submitted["ok"], json!(true));
        assert_eq!(submitted["result"]["outcome"], json!("invalid"));
        assert_eq!(
            submitted["result"]["view"]["fields"][0]["error"],
            json!("Event Title is required!")
        );
    }

    #[test]
    fn update_without_a_seeded_id_is_refused() {
        let mut state = state_with_db();
        let resp = call(
            &mut state,
            "forms.open",
            json!({ "entity": "lesson", "mode": "update" }),
        );
        assert_eq!(resp["error"]["code"], json!("bad_params"));
        let resp = call(
            &mut state,
            "forms.open",
            json!({ "entity": "lesson", "mode": "update", "data": { "name": "Algebra" } }),
        );
        assert_eq!(resp["error"]["code"], json!("bad_params"));
        assert!(state.forms.is_empty());

        let resp = call(
            &mut state,
            "forms.open",
            json!({ "entity": "lesson", "mode": "update", "data": { "id": 12, "name": "Algebra" } }),
        );
        assert_eq!(resp["ok"], json!(true));
        assert_eq!(resp["result"]["view"]["id"], json!("12"));
    }

    #[test]
    fn closed_form_is_forgotten() {
        let mut state = state_with_db();
        let opened = call(
            &mut state,
            "forms.open",
            json!({ "entity": "lesson", "mode": "create" }),
        );
        let form_id = opened["result"]["formId"].as_str().expect("formId").to_string();
        let closed = call(&mut state, "forms.close", json!({ "formId": form_id }));
        assert_eq!(closed["ok"], json!(true));
        let gone = call(&mut state, "forms.get", json!({ "formId": form_id }));
        assert_eq!(gone["error"]["code"], json!("not_found"));
    }
}
