use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("editor widget failed to initialize: {0}")]
    EditorInit(String),
    #[error("storage access for `{key}` failed: {message}")]
    Storage { key: String, message: String },
    #[error("runtime message failed: {0}")]
    Channel(String),
    #[error("could not convert value across the JS boundary: {0}")]
    Codec(String),
}

impl From<serde_wasm_bindgen::Error> for PanelError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        PanelError::Codec(err.to_string())
    }
}

pub fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
