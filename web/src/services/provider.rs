// window.ethereum bridge
// Payloads cross the JS boundary as JSON text so the client crate only ever sees serde_json values

use async_trait::async_trait;
use serde_json::{json, Value};
use staircase_client::error::{codes, RpcError};
use staircase_client::Eip1193;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone)]
    type Ethereum;

    #[wasm_bindgen(method, catch)]
    fn request(this: &Ethereum, args: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn enable(this: &Ethereum) -> Result<js_sys::Promise, JsValue>;
}

/// The wallet injected into the page, if there is one
pub struct InjectedProvider {
    ethereum: Ethereum,
}

impl InjectedProvider {
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = js_sys::Reflect::get(&window, &"ethereum".into()).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            log::info!("No injected wallet provider found");
            return None;
        }
        log::info!("Injected wallet provider detected");
        Some(Self {
            ethereum: ethereum.unchecked_into(),
        })
    }

    async fn settle(promise: Result<js_sys::Promise, JsValue>) -> Result<Value, RpcError> {
        let promise = promise.map_err(rpc_error)?;
        let result = JsFuture::from(promise).await.map_err(rpc_error)?;
        from_js(&result)
    }
}

#[async_trait(?Send)]
impl Eip1193 for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        log::debug!("-> {}", method);
        let args = to_js(&json!({ "method": method, "params": params }))?;
        Self::settle(self.ethereum.request(&args)).await
    }

    async fn enable(&self) -> Result<Value, RpcError> {
        let has_enable = js_sys::Reflect::get(&self.ethereum, &"enable".into())
            .map(|f| f.is_function())
            .unwrap_or(false);
        if !has_enable {
            return Err(RpcError::unsupported("enable"));
        }
        Self::settle(self.ethereum.enable()).await
    }
}

fn to_js(value: &Value) -> Result<JsValue, RpcError> {
    js_sys::JSON::parse(&value.to_string()).map_err(rpc_error)
}

fn from_js(value: &JsValue) -> Result<Value, RpcError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    let text: String = js_sys::JSON::stringify(value)
        .map_err(rpc_error)?
        .into();
    serde_json::from_str(&text)
        .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, format!("Unreadable provider result: {}", e)))
}

/// Provider errors are `{ code, message, data? }` objects; anything else is internal
fn rpc_error(err: JsValue) -> RpcError {
    let field = |name: &str| js_sys::Reflect::get(&err, &name.into()).ok();

    let code = field("code")
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
        .unwrap_or(codes::INTERNAL_ERROR);
    let message = field("message")
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "unknown provider error".to_string());
    let data = field("data").and_then(|d| from_js(&d).ok()).filter(|d| !d.is_null());

    log::warn!("Provider error {}: {}", code, message);
    RpcError { code, message, data }
}
