use dioxus::prelude::*;
use staircase_client::{DraftField, SubmissionState, SubmitError};

use crate::context::{AppContext, CreatedGroup, UiSignals};
use crate::icons;

const INPUT_STYLE: &str =
    "w-full border p-2 focus:outline-none focus:ring rounded-lg focus:ring-red-300";

#[component]
pub fn CreateGroupModal() -> Element {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiSignals>();

    let draft = (ui.draft)();
    let state = (ui.submission)();
    let errors = (ui.field_errors)();
    let banner = (ui.banner)().unwrap_or_default();
    let unit = ctx.duration_unit.label();
    let in_flight = state.is_in_flight();

    let submit_ctx = ctx.clone();
    let handle_create = move |_| {
        let ctx = submit_ctx.clone();
        let mut created = ui.created;
        let mut field_errors = ui.field_errors;
        let mut banner = ui.banner;
        field_errors.set(Vec::new());
        banner.set(None);

        // Not tied to this component: a successful submit closes the modal
        wasm_bindgen_futures::spawn_local(async move {
            let draft = ctx.form.snapshot();
            match ctx.controller.submit().await {
                Ok(receipt) => created.write().push(CreatedGroup {
                    name: draft.name,
                    symbol: draft.token_symbol,
                    transaction: receipt.transaction_hash,
                }),
                Err(SubmitError::Validation(validation)) => field_errors.set(
                    validation
                        .fields
                        .iter()
                        .map(|f| (f.field, f.error.to_string()))
                        .collect(),
                ),
                Err(SubmitError::Busy) => {}
                Err(e) => banner.set(Some(e.surface().message)),
            }
        });
    };

    let controller = ctx.controller.clone();
    let handle_cancel = move |_| {
        controller.cancel();
    };

    let modal = ctx.modal.clone();
    let handle_close = move |_| {
        if !in_flight {
            modal.close();
        }
    };

    rsx! {
        div { class: "fixed inset-0 bg-black bg-opacity-40 overflow-y-auto z-10",
            div { class: "sm:w-3/4 w-full bg-white rounded-lg shadow-lg mx-auto my-8 p-6 flex flex-col items-center text-center space-y-4",
                div { class: "w-full flex justify-end",
                    button {
                        class: "text-gray-400 hover:text-gray-600 disabled:opacity-50",
                        disabled: in_flight,
                        onclick: handle_close,
                        icons::X { class: Some("w-5 h-5".to_string()) }
                    }
                }
                h1 { class: "text-4xl bg-red-400 py-2 px-8 rounded-lg text-white mb-6", "Create a new group" }

                for field in DraftField::ALL {
                    FieldInput {
                        key: "{field}",
                        field: field,
                        value: draft.get(field).to_string(),
                        error: errors.iter().find(|(f, _)| *f == field).map(|(_, e)| e.clone()),
                        suffix: (field == DraftField::LoanDurationMonths).then(|| format!("/{}", unit)),
                    }
                }

                if !banner.is_empty() {
                    div { class: "w-full bg-red-50 border border-red-200 rounded-lg p-4 flex items-start",
                        icons::AlertCircle { class: Some("w-4 h-4 text-red-600 mr-2 mt-0.5".to_string()) }
                        p { class: "text-sm text-red-800 text-left", "{banner}" }
                    }
                }

                if state != SubmissionState::Idle {
                    p { class: "text-sm text-gray-600", "{state.label()}" }
                }

                div { class: "flex space-x-2",
                    button {
                        class: "bg-red-400 hover:bg-red-300 py-2 px-4 text-white rounded-lg disabled:opacity-50 disabled:cursor-not-allowed",
                        disabled: in_flight,
                        onclick: handle_create,
                        "Create"
                    }
                    if state == SubmissionState::AwaitingConfirmation {
                        button {
                            class: "bg-gray-200 text-gray-700 py-2 px-4 rounded-lg hover:bg-gray-300",
                            onclick: handle_cancel,
                            "Stop waiting"
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn FieldInput(
    field: DraftField,
    value: String,
    error: Option<String>,
    suffix: Option<String>,
) -> Element {
    let form = use_context::<AppContext>().form;
    let placeholder = if field.is_required() {
        field.label().to_string()
    } else {
        format!("{} (optional)", field.label())
    };
    let ring = if error.is_some() { " border-red-500" } else { "" };
    let message = error.unwrap_or_default();
    let unit = suffix.unwrap_or_default();

    rsx! {
        div { class: "w-full",
            div { class: "flex space-x-2 items-center w-full",
                input {
                    class: "{INPUT_STYLE}{ring}",
                    r#type: "text",
                    name: field.key(),
                    placeholder: "{placeholder}",
                    value: "{value}",
                    oninput: move |e| form.set_field(field, e.value()),
                }
                if !unit.is_empty() {
                    span { "{unit}" }
                }
            }
            if !message.is_empty() {
                p { class: "mt-1 text-xs text-red-600 text-left", "{message}" }
            }
        }
    }
}
