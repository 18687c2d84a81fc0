use dioxus::prelude::*;

mod components;
mod context;
pub mod icons;
mod services;

use components::{CreateGroupModal, GroupsPage, TopNav};
use context::{AppContext, UiSignals};

#[component]
fn App() -> Element {
    let app = use_hook(|| {
        AppContext::from_embedded_config().map_err(|e| {
            log::error!("Failed to start: {:#}", e);
            format!("{:#}", e)
        })
    });

    match app {
        Ok(ctx) => rsx! { Shell { ctx: ctx } },
        Err(message) => rsx! {
            div { class: "max-w-md mx-auto mt-20 p-8 bg-white rounded-lg shadow-lg",
                div { class: "flex items-start",
                    icons::AlertCircle { class: Some("w-5 h-5 text-red-600 mr-2 mt-0.5".to_string()) }
                    p { class: "text-sm text-red-800", "{message}" }
                }
            }
        },
    }
}

#[component]
fn Shell(ctx: AppContext) -> Element {
    use_context_provider(|| ctx.clone());
    let ui = use_hook(|| UiSignals::wire(&ctx));
    use_context_provider(|| ui);

    rsx! {
        div { class: "min-h-screen bg-gray-50",
            TopNav {}
            GroupsPage {}
            if (ui.modal_open)() {
                CreateGroupModal {}
            }
        }
    }
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn run() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Staircase starting...");
    dioxus::launch(App);
}
