use dioxus::prelude::*;
use ethers_core::types::Address;
use ethers_core::utils::to_checksum;
use staircase_client::ConnectPolicy;

use crate::context::{AppContext, UiSignals};
use crate::icons;

const INSTALL_URL: &str = "https://metamask.io/download/";

/// `0xAbCd...1234` form of a checksummed address
fn short_address(address: Address) -> String {
    let full = to_checksum(&address, None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[component]
pub fn TopNav() -> Element {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiSignals>();
    let mut connecting = use_signal(|| false);
    let mut connect_error = use_signal(String::new);

    let provider_present = ctx.session.provider_present();
    let label = match (ui.account)() {
        Some(address) => short_address(address),
        None if connecting() => "Waiting for wallet...".to_string(),
        None => "Connect to a wallet".to_string(),
    };

    let session = ctx.session.clone();
    let handle_connect = move |_| {
        if connecting() {
            return;
        }
        let session = session.clone();
        connecting.set(true);
        connect_error.set(String::new());

        spawn(async move {
            match session.connect(ConnectPolicy::ReuseExisting).await {
                Ok(address) => log::info!("Connected as {:?}", address),
                Err(e) => {
                    log::warn!("Connect failed: {}", e);
                    connect_error.set(e.surface().message);
                }
            }
            connecting.set(false);
        });
    };

    rsx! {
        nav { class: "p-3 flex justify-between items-center",
            span { class: "text-2xl font-bold text-red-400 tracking-wider", "Staircase" }
            div { class: "space-x-2 flex items-center",
                a {
                    href: "#",
                    class: "cursor-pointer text-gray-600 hover:underline font-bold tracking-wider text-md",
                    "Docs"
                }
                if provider_present {
                    button {
                        class: "font-bold py-2 px-4 text-indigo-400 hover:text-indigo-300 flex items-center space-x-1 disabled:opacity-50",
                        disabled: connecting(),
                        onclick: handle_connect,
                        span { "{label}" }
                        icons::ArrowRight { class: Some("w-5 h-5".to_string()) }
                    }
                } else {
                    a {
                        href: INSTALL_URL,
                        target: "_blank",
                        rel: "noopener noreferrer",
                        class: "font-bold py-2 px-4 text-indigo-400 hover:text-indigo-300 flex items-center space-x-1",
                        span { "Install a wallet to continue" }
                        icons::ArrowRight { class: Some("w-5 h-5".to_string()) }
                    }
                }
            }
        }
        if !connect_error().is_empty() {
            div { class: "mx-auto md:w-3/4 mb-2 bg-red-50 border border-red-200 rounded-lg p-3 flex items-center",
                icons::AlertCircle { class: Some("w-4 h-4 text-red-600 mr-2".to_string()) }
                p { class: "text-sm text-red-800", "{connect_error}" }
            }
        }
    }
}
