//! Browser host over `web-sys`.
//!
//! Font-loading support and the document ready state are read through
//! `Reflect` because older engines lack `document.fonts` entirely, and the
//! typed bindings assume it exists.

use std::time::Duration;

use js_sys::{Function, Promise, Reflect};
use tabscore_common::{MusicFontSymbol, ScriptElement};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Document, HtmlElement, HtmlScriptElement, Window, WorkerGlobalScope};

use crate::host::{Callback, Host, HostError, ProbeStyle};

fn dom_err(value: JsValue) -> HostError {
    HostError::Dom(format!("{value:?}"))
}

/// [`Host`] backed by the real `window`/`document`, or a worker global.
pub struct BrowserHost {
    window: Option<Window>,
    document: Option<Document>,
    worker: Option<WorkerGlobalScope>,
}

impl BrowserHost {
    pub fn new() -> Self {
        let worker = js_sys::global().dyn_into::<WorkerGlobalScope>().ok();
        let window = web_sys::window();
        let document = window.as_ref().and_then(Window::document);
        Self {
            window,
            document,
            worker,
        }
    }

    fn font_face_set(&self) -> Option<JsValue> {
        let document = self.document.as_ref()?;
        let fonts = Reflect::get(document, &JsValue::from_str("fonts")).ok()?;
        (fonts.is_object()).then_some(fonts)
    }

    fn set_timeout(&self, callback: &Function, delay_ms: i32) -> Result<i32, JsValue> {
        if let Some(window) = &self.window {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay_ms)
        } else if let Some(worker) = &self.worker {
            worker.set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay_ms)
        } else {
            Err(JsValue::from_str("no timer source"))
        }
    }
}

impl Default for BrowserHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for BrowserHost {
    type Probe = HtmlElement;

    fn is_worker_context(&self) -> bool {
        self.worker.is_some()
    }

    fn has_document(&self) -> bool {
        self.document.is_some()
    }

    fn currently_executing_script(&self) -> Option<ScriptElement> {
        let script = self
            .document
            .as_ref()?
            .current_script()?
            .dyn_into::<HtmlScriptElement>()
            .ok()?;
        Some(ScriptElement::new(script.src()))
    }

    fn query_script(&self, selector: &str) -> Option<ScriptElement> {
        let element = self.document.as_ref()?.query_selector(selector).ok()??;
        let script = element.dyn_into::<HtmlScriptElement>().ok()?;
        Some(ScriptElement::new(script.src()))
    }

    fn capture_stack_trace(&self) -> Option<String> {
        let error = js_sys::Error::new("");
        Reflect::get(&error, &JsValue::from_str("stack"))
            .ok()?
            .as_string()
    }

    fn supports_native_font_load(&self) -> bool {
        self.font_face_set()
            .and_then(|fonts| Reflect::get(&fonts, &JsValue::from_str("load")).ok())
            .is_some_and(|load| load.is_function())
    }

    fn request_font_load(&self, descriptor: &str, on_complete: Callback) {
        let request = || -> Result<Promise, JsValue> {
            let fonts = self
                .font_face_set()
                .ok_or_else(|| JsValue::from_str("document.fonts unavailable"))?;
            let load: Function = Reflect::get(&fonts, &JsValue::from_str("load"))?.dyn_into()?;
            load.call1(&fonts, &JsValue::from_str(descriptor))?
                .dyn_into::<Promise>()
        };
        match request() {
            Ok(promise) => spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(_) => on_complete(),
                    Err(err) => tracing::warn!(?err, "font load request rejected"),
                }
            }),
            Err(err) => tracing::warn!(?err, descriptor, "font load request failed"),
        }
    }

    fn create_probe(
        &self,
        glyph: MusicFontSymbol,
        style: &ProbeStyle,
    ) -> Result<HtmlElement, HostError> {
        let document = self.document.as_ref().ok_or(HostError::NoDocument)?;
        let element = match document.get_element_by_id(&style.element_id) {
            Some(existing) => existing,
            None => {
                let body = document.body().ok_or(HostError::NoDocument)?;
                let element = document.create_element("div").map_err(dom_err)?;
                element.set_id(&style.element_id);
                element.set_class_name(&style.class_name);
                element
                    .set_attribute("style", &style.to_css())
                    .map_err(dom_err)?;
                element.set_inner_html(&glyph.html_entity());
                body.append_child(&element).map_err(dom_err)?;
                element
            }
        };
        element
            .dyn_into::<HtmlElement>()
            .map_err(|_| HostError::Dom("probe is not an HTML element".into()))
    }

    fn measure_width(&self, probe: &HtmlElement) -> f64 {
        f64::from(probe.offset_width())
    }

    fn remove_probe(&self, probe: HtmlElement) {
        probe.remove();
    }

    fn on_document_ready(&self, callback: Callback) {
        let Some(document) = &self.document else {
            tracing::debug!("document-ready listener dropped: no document");
            return;
        };
        let loading = Reflect::get(document, &JsValue::from_str("readyState"))
            .ok()
            .and_then(|state| state.as_string())
            .is_some_and(|state| state == "loading");
        if !loading {
            self.schedule_delayed(callback, Duration::ZERO);
            return;
        }
        let listener = Closure::once_into_js(move || callback());
        if let Err(err) = document
            .add_event_listener_with_callback("DOMContentLoaded", listener.unchecked_ref())
        {
            tracing::warn!(?err, "failed to register DOMContentLoaded listener");
        }
    }

    fn schedule_delayed(&self, callback: Callback, delay: Duration) {
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let handler = Closure::once_into_js(move || callback());
        if let Err(err) = self.set_timeout(handler.unchecked_ref(), delay_ms) {
            tracing::warn!(?err, delay_ms, "failed to schedule timer");
        }
    }

    fn warn(&self, message: &str) {
        web_sys::console::warn_1(&JsValue::from_str(message));
    }
}
