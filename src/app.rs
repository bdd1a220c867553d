use leptos::task::spawn_local;

use leptos::prelude::*;
use log::{debug, error, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::config::PanelConfig;
use crate::extension::{self, BrowserCatalog};
use crate::sync_core::{ChangeKind, Coordinator, EditorChange, Effect as SyncEffect};
use crate::welcome::WelcomeDocument;
use crate::widget::{self, Editor};

struct Panel {
    config: PanelConfig,
    coordinator: RefCell<Coordinator>,
    editor: RefCell<Option<Editor>>,
    message_listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
    set_authenticated: WriteSignal<bool>,
}

impl Panel {
    fn new(config: PanelConfig, set_authenticated: WriteSignal<bool>) -> Rc<Self> {
        let welcome = WelcomeDocument::build(&BrowserCatalog);
        Rc::new(Self {
            config,
            coordinator: RefCell::new(Coordinator::new(welcome)),
            editor: RefCell::new(None),
            message_listener: RefCell::new(None),
            set_authenticated,
        })
    }

    async fn attach(self: Rc<Self>, element: HtmlElement) {
        let editor = match Editor::create(&element).await {
            Ok(editor) => editor,
            Err(err) => {
                error!("{err}");
                return;
            }
        };
        if !self.coordinator.borrow().is_mounted() {
            debug!("panel unmounted before the editor was ready");
            return;
        }

        // The widget has no unsubscribe hook: the listener is leaked and
        // only holds a weak reference to the panel.
        let weak: Weak<Panel> = Rc::downgrade(&self);
        let on_change = Closure::<dyn FnMut(JsValue, JsValue)>::new(
            move |_info: JsValue, name: JsValue| {
                if let Some(panel) = weak.upgrade() {
                    let kind = ChangeKind::from_name(&name.as_string().unwrap_or_default());
                    let change = EditorChange::new(widget::is_focused(&panel.config), kind);
                    panel.on_editor_change(change);
                }
            },
        );
        editor.on_change(&on_change);
        on_change.forget();
        *self.editor.borrow_mut() = Some(editor);

        let weak: Weak<Panel> = Rc::downgrade(&self);
        let on_message = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            if let Some(panel) = weak.upgrade() {
                panel.on_runtime_message(value);
            }
        });
        extension::listen(&on_message);
        *self.message_listener.borrow_mut() = Some(on_message);

        let effects = self.coordinator.borrow_mut().start();
        self.dispatch(effects);
    }

    fn unmount(&self) {
        self.coordinator.borrow_mut().unmount();
        if let Some(listener) = self.message_listener.borrow_mut().take() {
            extension::unlisten(&listener);
        }
    }

    fn on_editor_change(self: &Rc<Self>, change: EditorChange) {
        let effects = {
            let editor = self.editor.borrow();
            let Some(editor) = editor.as_ref() else {
                return;
            };
            self.coordinator.borrow_mut().on_editor_change(change, editor)
        };
        self.dispatch(effects);
    }

    fn on_runtime_message(self: &Rc<Self>, value: JsValue) {
        // The channel is shared with the rest of the extension.
        let message = match extension::decode_message(value) {
            Ok(message) => message,
            Err(err) => {
                debug!("ignoring runtime message: {err}");
                return;
            }
        };
        let effects = {
            let editor = self.editor.borrow();
            let Some(editor) = editor.as_ref() else {
                return;
            };
            self.coordinator.borrow_mut().on_message(message, editor)
        };
        self.dispatch(effects);
    }

    // No coordinator borrow may be held here: `SetContent` re-enters
    // `on_editor_change` synchronously.
    fn dispatch(self: &Rc<Self>, effects: Vec<SyncEffect>) {
        let mut deferred = Vec::new();
        for effect in effects {
            match effect {
                SyncEffect::SetContent(html) => {
                    if let Some(editor) = self.editor.borrow().as_ref() {
                        editor.set_content(&html);
                    }
                }
                SyncEffect::ShowAuthenticated(flag) => self.set_authenticated.set(flag),
                effect => deferred.push(effect),
            }
        }
        if deferred.is_empty() {
            return;
        }

        let panel = Rc::clone(self);
        spawn_local(async move {
            for effect in deferred {
                panel.run_deferred(effect).await;
            }
        });
    }

    async fn run_deferred(self: &Rc<Self>, effect: SyncEffect) {
        match effect {
            SyncEffect::ReadLegacyNote => {
                let note = extension::read_string(&self.config.legacy_note_key).await;
                let effects = self.coordinator.borrow_mut().on_legacy_note(note);
                self.dispatch(effects);
            }
            SyncEffect::RemoveLegacyNote => {
                if let Err(err) = extension::remove(&self.config.legacy_note_key).await {
                    warn!("{err}");
                }
            }
            SyncEffect::ReadCredentials => {
                let present = extension::contains_key(&self.config.credentials_key).await;
                let effects = self.coordinator.borrow_mut().on_credentials(present);
                self.dispatch(effects);
            }
            SyncEffect::Send(message) => {
                let result = extension::send(&message).await;
                let effects = self.coordinator.borrow_mut().on_sent(&message, result);
                self.dispatch(effects);
            }
            // Applied synchronously by `dispatch`.
            SyncEffect::SetContent(_) | SyncEffect::ShowAuthenticated(_) => {}
        }
    }
}

#[component]
pub fn App(config: PanelConfig) -> impl IntoView {
    let editor_ref = NodeRef::<leptos::html::Div>::new();
    let (authenticated, set_authenticated) = signal(false);
    let panel = StoredValue::new_local(None::<Rc<Panel>>);

    Effect::new(move |_| {
        let Some(node) = editor_ref.get() else {
            return;
        };
        if panel.with_value(|mounted| mounted.is_some()) {
            return;
        }
        let mounted = Panel::new(config.clone(), set_authenticated);
        panel.set_value(Some(Rc::clone(&mounted)));
        let element: HtmlElement = node.into();
        spawn_local(mounted.attach(element));
    });

    on_cleanup(move || {
        panel.try_with_value(|mounted| {
            if let Some(mounted) = mounted {
                mounted.unmount();
            }
        });
    });

    view! {
        <main class="notes-panel" class:authenticated=move || authenticated.get()>
            <div id="editor" node_ref=editor_ref></div>
        </main>
    }
}
