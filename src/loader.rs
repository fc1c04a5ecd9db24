use js_sys::Function;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlScriptElement, Window};

use crate::error::EmbedError;
use crate::js::js_function;

pub const FACTORY_NAME: &str = "createUnityInstance";

pub type ScriptCallback = Box<dyn FnOnce(Result<(), EmbedError>)>;

pub trait RuntimeLoader {
    fn inject(&self, url: &str, on_settled: ScriptCallback) -> Result<InjectedScript, EmbedError>;

    fn factory(&self) -> Option<Function>;
}

/// Whatever `inject` left in the document. Removing it detaches the element
/// and drops its callbacks; a load still in flight then settles silently.
pub struct InjectedScript {
    remove: Option<Box<dyn FnOnce()>>,
}

impl InjectedScript {
    pub fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for InjectedScript {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

pub struct ScriptTagLoader {
    window: Window,
    document: Document,
}

impl ScriptTagLoader {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }
}

impl RuntimeLoader for ScriptTagLoader {
    fn inject(&self, url: &str, on_settled: ScriptCallback) -> Result<InjectedScript, EmbedError> {
        let script = self
            .document
            .create_element("script")
            .map_err(|err| EmbedError::dom(&err))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| EmbedError::Dom("script element is not an HtmlScriptElement".into()))?;
        script.set_src(url);
        script.set_async(true);

        let slot: Rc<RefCell<Option<ScriptCallback>>> = Rc::new(RefCell::new(Some(on_settled)));

        let slot_load = Rc::clone(&slot);
        let onload = Closure::wrap(Box::new(move || {
            let callback = slot_load.borrow_mut().take();
            if let Some(callback) = callback {
                callback(Ok(()));
            }
        }) as Box<dyn FnMut()>);

        let slot_error = Rc::clone(&slot);
        let failed_url = url.to_string();
        let onerror = Closure::wrap(Box::new(move || {
            let callback = slot_error.borrow_mut().take();
            if let Some(callback) = callback {
                callback(Err(EmbedError::ResourceLoad {
                    url: failed_url.clone(),
                }));
            }
        }) as Box<dyn FnMut()>);

        script.set_onload(Some(onload.as_ref().unchecked_ref()));
        script.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let body = self
            .document
            .body()
            .ok_or_else(|| EmbedError::Dom("document has no body".into()))?;
        body.append_child(&script).map_err(|err| EmbedError::dom(&err))?;

        Ok(InjectedScript::new(move || {
            script.set_onload(None);
            script.set_onerror(None);
            script.remove();
            slot.borrow_mut().take();
            drop(onload);
            drop(onerror);
        }))
    }

    fn factory(&self) -> Option<Function> {
        js_function(&self.window, FACTORY_NAME).ok()
    }
}
