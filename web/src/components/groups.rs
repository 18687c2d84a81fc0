use dioxus::prelude::*;

use crate::context::{AppContext, UiSignals};
use crate::icons;

#[component]
pub fn GroupsPage() -> Element {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiSignals>();
    let groups = (ui.created)();

    let modal = ctx.modal.clone();
    let controller = ctx.controller.clone();
    let open_modal = move |_| {
        controller.reset();
        let mut banner = ui.banner;
        let mut field_errors = ui.field_errors;
        banner.set(None);
        field_errors.set(Vec::new());
        modal.open();
    };

    rsx! {
        div { class: "mx-auto md:w-3/4 text-center p-4 bg-red-300 rounded-lg",
            h1 { class: "text-4xl", "Groups" }
            button {
                class: "p-2 bg-blue-500 rounded-lg text-white my-2 inline-flex items-center",
                onclick: open_modal,
                icons::Plus { class: Some("w-4 h-4 mr-1".to_string()) }
                "Create New Group"
            }

            if groups.is_empty() {
                div { class: "text-center py-8 text-gray-600",
                    p { "No groups created yet" }
                }
            }

            div { class: "space-y-2",
                for (index, group) in groups.iter().enumerate() {
                    div {
                        key: "{group.transaction:?}",
                        class: "border rounded-lg pr-4 h-12 flex justify-between items-center overflow-hidden bg-white",
                        div { class: "flex space-x-4 items-center",
                            div { class: "px-4 h-16 border-r bg-gray-100 flex items-center", "{index + 1}" }
                            span { "{group.name}" }
                        }
                        div { class: "flex items-center space-x-2",
                            icons::CheckCircle { class: Some("w-4 h-4 text-green-600".to_string()) }
                            span { class: "font-bold", "{group.symbol}" }
                        }
                    }
                }
            }
        }
    }
}
