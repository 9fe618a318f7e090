use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::association::{AssessmentType, RelationshipSelector};
use super::controller::{SubmissionController, SubmissionEvent, SubmissionOutcome};
use super::datetime;
use super::error::{FieldErrors, FormError};
use super::gateway::{self, MutationGateway, MutationResult};
use super::model::{EntityKind, FormMode, NormalizedEntity, Weekday};
use super::reference::ReferenceData;
use super::schema::{self, FieldKind, SchemaRules};

const FAILURE_BANNER: &str = "Something went wrong!";

/// Per-workspace knobs that shape forms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormSettings {
    pub rules: SchemaRules,
    /// Selector mode of a Result form opened without a record.
    pub default_assessment: AssessmentType,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            rules: SchemaRules::default(),
            default_assessment: AssessmentType::Assignment,
        }
    }
}

/// Delivered to `on_outcome` hooks after a successful submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeNotice {
    pub entity: &'static str,
    pub mode: &'static str,
    pub id: Option<String>,
    pub message: String,
    /// Views listing this entity set should reload.
    pub refresh: bool,
}

/// A validated payload handed out for the gateway, paired with the ticket its
/// result must be resolved with.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingMutation {
    pub ticket: u64,
    pub mode: FormMode,
    pub entity: NormalizedEntity,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Validation failed; errors are on the form and nothing was sent.
    Invalid,
    Ready(PendingMutation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitReport {
    Invalid,
    Completed(SubmissionOutcome),
}

impl SubmitReport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Completed(o) => o.as_str(),
        }
    }
}

type OutcomeHook = Box<dyn FnMut(&OutcomeNotice)>;

pub struct FormInstance {
    kind: EntityKind,
    mode: FormMode,
    id: Option<String>,
    values: Map<String, Value>,
    selector: Option<RelationshipSelector>,
    reference: ReferenceData,
    settings: FormSettings,
    errors: FieldErrors,
    controller: SubmissionController,
    hooks: Vec<OutcomeHook>,
    closed: bool,
}

fn display_value(kind: FieldKind, value: &Value) -> Value {
    let Some(s) = value.as_str() else {
        return value.clone();
    };
    let shown = match kind {
        FieldKind::Date => datetime::parse_date(s).map(|d| datetime::to_display_date(&d)),
        FieldKind::DateTime => {
            datetime::parse_datetime(s).map(|d| datetime::to_display_datetime(&d))
        }
        _ => None,
    };
    shown.map(Value::String).unwrap_or_else(|| value.clone())
}

/// Open a form. `existing` seeds the controls (wire timestamps are shown in
/// display form); without it every control starts empty.
pub fn render_form(
    kind: EntityKind,
    mode: FormMode,
    existing: Option<&Map<String, Value>>,
    reference: ReferenceData,
    settings: FormSettings,
) -> FormInstance {
    let mut values = Map::new();
    let mut id = None;
    if let Some(data) = existing {
        for spec in schema::fields(kind) {
            if kind == EntityKind::Result && AssessmentType::from_field(spec.name).is_some() {
                continue;
            }
            match data.get(spec.name) {
                None | Some(Value::Null) => {}
                Some(v) => {
                    values.insert(spec.name.to_string(), display_value(spec.kind, v));
                }
            }
        }
        if mode == FormMode::Update {
            id = schema::raw_text(data.get("id")).ok().flatten();
        }
    }

    let selector = match (kind, existing) {
        (EntityKind::Result, Some(data)) => Some(RelationshipSelector::seeded(data)),
        (EntityKind::Result, None) => Some(RelationshipSelector::new(settings.default_assessment)),
        _ => None,
    };

    FormInstance {
        kind,
        mode,
        id,
        values,
        selector,
        reference,
        settings,
        errors: FieldErrors::new(),
        controller: SubmissionController::new(),
        hooks: Vec::new(),
        closed: false,
    }
}

impl FormInstance {
    /// Register a hook run once per successful submission.
    pub fn on_outcome(&mut self, hook: impl FnMut(&OutcomeNotice) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        if self.closed {
            return Err(FormError::Closed);
        }
        if name == "id" {
            return Err(FormError::ImmutableField(name.to_string()));
        }
        if schema::field_spec(self.kind, name).is_none() {
            return Err(FormError::UnknownField(name.to_string()));
        }
        if let (Some(selector), Some(field)) =
            (self.selector.as_mut(), AssessmentType::from_field(name))
        {
            let id = schema::raw_text(Some(&value))
                .map_err(|_| FormError::UnsupportedValue(name.to_string()))?;
            selector.set_reference(field, id)?;
        } else {
            self.values.insert(name.to_string(), value);
        }
        self.errors.remove(name);
        Ok(())
    }

    pub fn set_association_mode(&mut self, mode: AssessmentType) -> Result<(), FormError> {
        if self.closed {
            return Err(FormError::Closed);
        }
        let Some(selector) = self.selector.as_mut() else {
            return Err(FormError::NoAssociation(self.kind.label()));
        };
        let previous = selector.mode();
        selector.set_mode(mode);
        if previous != mode {
            self.errors.remove(previous.field());
        }
        Ok(())
    }

    /// Raw values as they would be submitted right now.
    pub fn payload(&self) -> Map<String, Value> {
        let mut raw = self.values.clone();
        if let Some(id) = &self.id {
            raw.insert("id".into(), Value::String(id.clone()));
        }
        if let Some(selector) = &self.selector {
            selector.apply(&mut raw);
        }
        raw
    }

    /// Validate and, when valid, move to Pending and hand out the mutation.
    pub fn dispatch(&mut self) -> Result<Dispatch, FormError> {
        if self.closed {
            return Err(FormError::Closed);
        }
        if !self.controller.can_submit() {
            return Err(FormError::SubmitInFlight);
        }
        match schema::validate(self.kind, self.mode, &self.payload(), &self.settings.rules) {
            Err(errors) => {
                self.errors = errors;
                Ok(Dispatch::Invalid)
            }
            Ok(entity) => {
                self.errors.clear();
                let ticket = self.controller.begin()?;
                info!(
                    entity = self.kind.as_str(),
                    mode = self.mode.as_str(),
                    ticket,
                    "submission dispatched"
                );
                Ok(Dispatch::Ready(PendingMutation {
                    ticket,
                    mode: self.mode,
                    entity,
                }))
            }
        }
    }

    /// Apply the gateway's answer for `ticket`.
    pub fn resolve(
        &mut self,
        ticket: u64,
        result: MutationResult,
    ) -> Result<SubmissionOutcome, FormError> {
        match self.controller.complete(ticket, result)? {
            SubmissionEvent::Saved => {
                let notice = OutcomeNotice {
                    entity: self.kind.as_str(),
                    mode: self.mode.as_str(),
                    id: self.id.clone(),
                    message: format!("{} {}!", self.kind.label(), self.mode.past_tense()),
                    refresh: true,
                };
                if self.closed {
                    // Closed while in flight: saved, but hooks stay silent.
                    info!(
                        entity = notice.entity,
                        mode = notice.mode,
                        "submission succeeded after close"
                    );
                } else {
                    info!(entity = notice.entity, mode = notice.mode, "submission succeeded");
                    for hook in self.hooks.iter_mut() {
                        hook(&notice);
                    }
                    self.closed = true;
                }
                Ok(SubmissionOutcome::Success)
            }
            SubmissionEvent::Failed => {
                warn!(
                    entity = self.kind.as_str(),
                    mode = self.mode.as_str(),
                    ticket,
                    "submission failed"
                );
                Ok(SubmissionOutcome::Failure)
            }
        }
    }

    /// Dispatch and resolve in one step against `gw`.
    pub fn submit(&mut self, gw: &mut dyn MutationGateway) -> Result<SubmitReport, FormError> {
        match self.dispatch()? {
            Dispatch::Invalid => Ok(SubmitReport::Invalid),
            Dispatch::Ready(pending) => {
                let result = gateway::dispatch(gw, pending.mode, &pending.entity);
                let outcome = self.resolve(pending.ticket, result)?;
                Ok(SubmitReport::Completed(outcome))
            }
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// View model for the shell to render.
    pub fn view(&self) -> Value {
        let mut fields = Vec::new();
        for spec in schema::fields(self.kind) {
            let association_field = AssessmentType::from_field(spec.name);
            let mut value = self.values.get(spec.name).cloned().unwrap_or(Value::Null);
            if let (Some(selector), Some(field)) = (&self.selector, association_field) {
                if field != selector.mode() {
                    continue;
                }
                value = selector
                    .selected()
                    .map(|s| Value::String(s.to_string()))
                    .unwrap_or(Value::Null);
            }

            let mut f = json!({
                "name": spec.name,
                "label": spec.label,
                "kind": spec.kind.as_str(),
                "required": spec.required || association_field.is_some(),
                "value": value,
                "error": self.errors.get(spec.name),
            });
            match spec.kind {
                FieldKind::Reference(list) => {
                    f["placeholder"] = json!(spec.placeholder);
                    f["options"] = json!(self.reference.options(list));
                }
                FieldKind::Weekday => {
                    f["options"] = Value::Array(
                        Weekday::ALL
                            .iter()
                            .map(|d| json!({ "id": d.as_str(), "label": d.label() }))
                            .collect(),
                    );
                }
                _ => {}
            }
            fields.push(f);
        }

        let outcome = self.controller.outcome();
        let banner = matches!(outcome, Some(SubmissionOutcome::Failure)).then_some(FAILURE_BANNER);

        json!({
            "entity": self.kind.as_str(),
            "mode": self.mode.as_str(),
            "id": self.id,
            "heading": format!("{} {}", self.mode.action_label(), self.kind.label()),
            "submitLabel": self.mode.action_label(),
            "fields": fields,
            "association": self.selector.as_ref().map(|s| s.mode().as_str()),
            "formErrors": self.errors.get("form").or_else(|| self.errors.get("id")),
            "state": outcome.map(SubmissionOutcome::as_str).unwrap_or("idle"),
            "errorBanner": banner,
            "canSubmit": !self.closed && self.controller.can_submit(),
            "closed": self.closed,
        })
    }
}
