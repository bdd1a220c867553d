use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::config::PanelConfig;
use crate::error::{describe_js, PanelError};
use crate::sync_core::EditorContent;

#[wasm_bindgen]
extern "C" {
    type ClassicEditor;

    #[wasm_bindgen(js_namespace = ClassicEditor, js_name = create, catch)]
    async fn create_classic_editor(
        element: &HtmlElement,
        config: JsValue,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = getData)]
    fn get_data(this: &ClassicEditor) -> Option<String>;

    #[wasm_bindgen(method, js_name = setData)]
    fn set_data(this: &ClassicEditor, data: &str);

    #[wasm_bindgen(method, getter)]
    fn document(this: &ClassicEditor) -> EditorDocument;

    type EditorDocument;

    #[wasm_bindgen(method)]
    fn on(this: &EditorDocument, event: &str, callback: &js_sys::Function);
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
struct EditorConfig {
    heading: HeadingConfig,
    toolbar: &'static [&'static str],
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
struct HeadingConfig {
    options: &'static [HeadingOption],
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct HeadingOption {
    model_element: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    view_element: Option<&'static str>,
    title: &'static str,
    class: &'static str,
}

const HEADINGS: &[HeadingOption] = &[
    HeadingOption {
        model_element: "paragraph",
        view_element: None,
        title: "P",
        class: "ck-heading_paragraph",
    },
    HeadingOption {
        model_element: "heading3",
        view_element: Some("h3"),
        title: "H3",
        class: "ck-heading_heading3",
    },
    HeadingOption {
        model_element: "heading2",
        view_element: Some("h2"),
        title: "H2",
        class: "ck-heading_heading2",
    },
    HeadingOption {
        model_element: "heading1",
        view_element: Some("h1"),
        title: "H1",
        class: "ck-heading_heading1",
    },
];

const TOOLBAR: &[&str] = &[
    "headings",
    "bold",
    "italic",
    "strike",
    "bulletedList",
    "numberedList",
];

fn editor_config() -> EditorConfig {
    EditorConfig {
        heading: HeadingConfig { options: HEADINGS },
        toolbar: TOOLBAR,
    }
}

pub struct Editor {
    inner: ClassicEditor,
}

impl Editor {
    pub async fn create(element: &HtmlElement) -> Result<Self, PanelError> {
        let config = serde_wasm_bindgen::to_value(&editor_config())?;
        let inner = ClassicEditor::create_classic_editor(element, config)
            .await
            .map_err(|err| PanelError::EditorInit(describe_js(&err)))?;
        Ok(Self {
            inner: inner.unchecked_into(),
        })
    }

    pub fn set_content(&self, html: &str) {
        self.inner.set_data(html);
    }

    pub fn on_change(&self, callback: &Closure<dyn FnMut(JsValue, JsValue)>) {
        self.inner
            .document()
            .on("change", callback.as_ref().unchecked_ref());
    }
}

impl EditorContent for Editor {
    fn content(&self) -> Option<String> {
        self.inner.get_data()
    }
}

pub fn is_focused(config: &PanelConfig) -> bool {
    leptos::prelude::document()
        .query_selector(&config.editable_selector)
        .ok()
        .flatten()
        .is_some_and(|el| el.class_list().contains(&config.focused_class))
}
