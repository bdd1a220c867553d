use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;

use crate::error::{describe_js, PanelError};
use crate::messages::{InboundMessage, OutboundMessage};
use crate::welcome::MessageCatalog;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["browser", "runtime"], js_name = sendMessage, catch)]
    async fn send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["browser", "runtime", "onMessage"], js_name = addListener)]
    fn add_message_listener(listener: &Function);

    #[wasm_bindgen(js_namespace = ["browser", "runtime", "onMessage"], js_name = removeListener)]
    fn remove_message_listener(listener: &Function);

    #[wasm_bindgen(js_namespace = ["browser", "storage", "local"], js_name = get, catch)]
    async fn storage_get(keys: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["browser", "storage", "local"], js_name = remove, catch)]
    async fn storage_remove(keys: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["browser", "i18n"], js_name = getMessage)]
    fn get_message(key: &str, substitutions: &JsValue) -> String;
}

pub async fn send(message: &OutboundMessage) -> Result<(), PanelError> {
    let value = serde_wasm_bindgen::to_value(message)?;
    send_message(value)
        .await
        .map_err(|err| {
            PanelError::Channel(format!("{}: {}", message.action(), describe_js(&err)))
        })?;
    Ok(())
}

pub fn decode_message(value: JsValue) -> Result<InboundMessage, PanelError> {
    Ok(serde_wasm_bindgen::from_value(value)?)
}

pub fn listen(listener: &Closure<dyn FnMut(JsValue)>) {
    add_message_listener(listener.as_ref().unchecked_ref());
}

pub fn unlisten(listener: &Closure<dyn FnMut(JsValue)>) {
    remove_message_listener(listener.as_ref().unchecked_ref());
}

fn storage_error(key: &str, err: &JsValue) -> PanelError {
    PanelError::Storage {
        key: key.to_string(),
        message: describe_js(err),
    }
}

async fn stored_items(key: &str) -> Result<JsValue, PanelError> {
    storage_get(key).await.map_err(|err| storage_error(key, &err))
}

/// Reads a string item; `Ok(None)` when the key is absent.
pub async fn read_string(key: &str) -> Result<Option<String>, PanelError> {
    let items = stored_items(key).await?;
    let value =
        Reflect::get(&items, &JsValue::from_str(key)).map_err(|err| storage_error(key, &err))?;
    if value.is_undefined() {
        return Ok(None);
    }
    value.as_string().map(Some).ok_or_else(|| PanelError::Storage {
        key: key.to_string(),
        message: "stored value is not a string".to_string(),
    })
}

pub async fn contains_key(key: &str) -> Result<bool, PanelError> {
    let items = stored_items(key).await?;
    Reflect::has(&items, &JsValue::from_str(key)).map_err(|err| storage_error(key, &err))
}

pub async fn remove(key: &str) -> Result<(), PanelError> {
    storage_remove(key).await.map_err(|err| storage_error(key, &err))?;
    Ok(())
}

pub struct BrowserCatalog;

impl MessageCatalog for BrowserCatalog {
    fn message(&self, key: &str, substitution: Option<&str>) -> String {
        let substitution = substitution.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
        get_message(key, &substitution)
    }
}
