pub mod config;
pub mod embed;
pub mod error;
mod js;
pub mod lifecycle;
pub mod loader;
pub mod paths;
pub mod runtime;
pub mod schedule;
pub mod sizing;
pub mod status;

use js_sys::{Function, Object};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, Window};

use crate::config::{EmbedConfig, embedding_disabled};
use crate::embed::{RuntimeEmbed, StatusCallback};
use crate::error::{EmbedError, js_value_to_string};
use crate::lifecycle::LoadStatus;
use crate::loader::ScriptTagLoader;
use crate::paths::base_path;
use crate::schedule::BrowserScheduler;

pub const CANVAS_ID: &str = "unity-canvas";

thread_local! {
    static PAGE_EMBED: RefCell<Option<RuntimeEmbed>> = const { RefCell::new(None) };
}

fn window() -> Result<Window, EmbedError> {
    web_sys::window().ok_or_else(|| EmbedError::Dom("missing window".into()))
}

pub fn mount_in_page(canvas: HtmlCanvasElement) -> Result<RuntimeEmbed, EmbedError> {
    let win = window()?;
    let document = win
        .document()
        .ok_or_else(|| EmbedError::Dom("missing document".into()))?;

    let config = EmbedConfig::from_element(&canvas);
    let base = base_path(&document);
    let loader = Rc::new(ScriptTagLoader::new(win.clone(), document));
    let scheduler = Rc::new(BrowserScheduler::new(win.clone(), config.fallback_delay_ms));

    RuntimeEmbed::mount(win, canvas, config, base, loader, scheduler)
}

fn status_object(status: &LoadStatus) -> JsValue {
    let obj = Object::new();
    let _ = js::set(&obj, "loading", status.loading);
    let error = status
        .error
        .clone()
        .map(JsValue::from)
        .unwrap_or(JsValue::NULL);
    let _ = js::set(&obj, "error", error);
    obj.into()
}

#[wasm_bindgen]
#[derive(Default)]
pub struct EmbedHandle {
    embed: Option<RuntimeEmbed>,
    on_change: Option<Function>,
}

#[wasm_bindgen]
impl EmbedHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> EmbedHandle {
        EmbedHandle::default()
    }

    pub fn mount(&mut self, canvas: HtmlCanvasElement) -> Result<(), JsValue> {
        self.unmount();
        let embed = mount_in_page(canvas)?;
        if let Some(callback) = &self.on_change {
            embed.on_change(js_status_callback(callback.clone()));
        }
        self.embed = Some(embed);
        Ok(())
    }

    pub fn loading(&self) -> bool {
        self.embed
            .as_ref()
            .map(|embed| embed.status().loading)
            .unwrap_or(true)
    }

    /// `null`, the value the factory rejected with, or an `Error` for other failures.
    pub fn error(&self) -> JsValue {
        self.embed
            .as_ref()
            .and_then(|embed| embed.status().error)
            .map(JsValue::from)
            .unwrap_or(JsValue::NULL)
    }

    pub fn instance(&self) -> JsValue {
        self.embed
            .as_ref()
            .and_then(|embed| embed.instance())
            .map(|instance| instance.handle().clone())
            .unwrap_or(JsValue::NULL)
    }

    /// `callback({ loading, error })` after every transition.
    pub fn set_on_change(&mut self, callback: Function) {
        if let Some(embed) = &self.embed {
            embed.on_change(js_status_callback(callback.clone()));
        }
        self.on_change = Some(callback);
    }

    pub fn unmount(&mut self) {
        if let Some(embed) = self.embed.take() {
            embed.unmount();
        }
    }
}

fn js_status_callback(callback: Function) -> StatusCallback {
    Rc::new(move |status: &LoadStatus| {
        if let Err(err) = callback.call1(&JsValue::NULL, &status_object(status)) {
            log::warn!("status callback threw: {}", js_value_to_string(&err));
        }
    })
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    if let Err(err) = start_impl() {
        let message = format!("fatal: {}", err);

        if let Some(win) = web_sys::window() {
            if let Some(doc) = win.document() {
                if let Some(el) = doc.document_element() {
                    let _ = el.set_attribute("data-render-status", "error");
                }
            }
        }

        web_sys::console::error_1(&JsValue::from_str(&message));
    }
}

fn start_impl() -> Result<(), EmbedError> {
    let win = window()?;
    if embedding_disabled(&win) {
        log::info!("runtime embed disabled via query flag");
        return Ok(());
    }

    let document = win
        .document()
        .ok_or_else(|| EmbedError::Dom("missing document".into()))?;
    let Some(canvas) = document.get_element_by_id(CANVAS_ID) else {
        // Pages without the hero (the legal pages) have nothing to embed.
        return Ok(());
    };
    let canvas = canvas
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| EmbedError::Dom(format!("#{} is not a canvas", CANVAS_ID)))?;

    let embed = mount_in_page(canvas)?;
    PAGE_EMBED.with(|slot| {
        if let Some(previous) = slot.borrow_mut().replace(embed) {
            previous.unmount();
        }
    });
    Ok(())
}
