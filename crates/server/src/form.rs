//! HTML rendering of the prediction form

use forecast_lib::{
    ColumnKind, ColumnSpec, Outcome, RawInputRow, RawValue, SchemaRegistry, FORECAST_NOTE,
};
use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::HashSet;

pub const PAGE_TITLE: &str = "☔️ Tomorrow's Rain Forecast (Australia)";
pub const FORM_HEADER: &str = "Enter Weather Parameters:";
pub const SUBMIT_LABEL: &str = "Predict rain tomorrow";

/// Prefix of the per-column "no data" checkbox field
pub const MISSING_PREFIX: &str = "nan_";

/// The `.html` suffix turns on HTML auto-escaping for every expression
const TEMPLATE_NAME: &str = "form.html";
const TEMPLATE_SOURCE: &str = include_str!("../templates/form.html");

/// Values shown in the widgets when the page is rendered
pub struct FormState<'a> {
    pub row: &'a RawInputRow,
    pub missing: &'a HashSet<String>,
}

#[derive(Serialize)]
struct Widget<'a> {
    name: &'a str,
    label: &'a str,
    help: &'a str,
    kind: &'static str,
    value: String,
    options: Vec<Choice<'a>>,
    min: Option<String>,
    max: Option<String>,
    step: String,
    missing: bool,
}

#[derive(Serialize)]
struct Choice<'a> {
    value: &'a str,
    selected: bool,
}

#[derive(Serialize)]
struct ForecastView {
    phrase: &'static str,
    probability: String,
}

#[derive(Serialize)]
struct FailureView<'a> {
    message: &'a str,
    hint: &'a str,
}

/// Template environment holding the form page
pub struct FormRenderer {
    env: Environment<'static>,
}

impl FormRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE)?;
        Ok(Self { env })
    }

    /// Render the full page: title, one widget per column, submit button and
    /// the outcome of the last submission, if any.
    pub fn render_page(
        &self,
        schema: &SchemaRegistry,
        state: &FormState<'_>,
        outcome: Option<&Outcome>,
    ) -> Result<String, minijinja::Error> {
        let widgets: Vec<Widget<'_>> = schema
            .columns()
            .iter()
            .map(|spec| widget(spec, state))
            .collect();

        let (forecast, failure) = match outcome {
            Some(Outcome::Forecast(result)) => (
                Some(ForecastView {
                    phrase: result.label.phrase(),
                    probability: result.probability_percent(),
                }),
                None,
            ),
            Some(Outcome::Failure { message, hint, .. }) => (
                None,
                Some(FailureView {
                    message: message.as_str(),
                    hint: hint.as_str(),
                }),
            ),
            None => (None, None),
        };

        self.env.get_template(TEMPLATE_NAME)?.render(context! {
            title => PAGE_TITLE,
            header => FORM_HEADER,
            submit => SUBMIT_LABEL,
            missing_prefix => MISSING_PREFIX,
            note => FORECAST_NOTE,
            bundle_version => schema.bundle_version(),
            widgets => widgets,
            forecast => forecast,
            failure => failure,
        })
    }
}

fn widget<'a>(spec: &'a ColumnSpec, state: &FormState<'_>) -> Widget<'a> {
    let current = state.row.get(&spec.name).unwrap_or(&spec.default);
    let mut widget = Widget {
        name: &spec.name,
        label: &spec.label,
        help: &spec.help,
        kind: "free_text",
        value: String::new(),
        options: Vec::new(),
        min: None,
        max: None,
        step: String::new(),
        missing: false,
    };

    match spec.kind {
        ColumnKind::Categorical => {
            let selected = match current {
                RawValue::Text(s) => s.as_str(),
                _ => "",
            };
            widget.kind = "categorical";
            widget.options = spec
                .options
                .iter()
                .map(|option| Choice {
                    value: option,
                    selected: option == selected,
                })
                .collect();
        }
        ColumnKind::Numeric => {
            widget.kind = "numeric";
            widget.value = match current {
                RawValue::Number(v) => format_number(*v, spec.integer),
                RawValue::Text(s) => s.clone(),
                RawValue::Missing => match &spec.default {
                    RawValue::Number(v) => format_number(*v, spec.integer),
                    _ => String::new(),
                },
            };
            widget.min = spec.min.map(|v| v.to_string());
            widget.max = spec.max.map(|v| v.to_string());
            let step = if spec.integer { 1.0 } else { spec.step.unwrap_or(0.1) };
            widget.step = step.to_string();
            widget.missing = state.missing.contains(&spec.name);
        }
        ColumnKind::FreeText => {
            widget.value = match current {
                RawValue::Missing => String::new(),
                other => other.to_string(),
            };
        }
    }
    widget
}

fn format_number(v: f64, integer: bool) -> String {
    if integer {
        format!("{}", v.round() as i64)
    } else {
        v.to_string()
    }
}
