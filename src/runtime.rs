use js_sys::{Function, Object, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use crate::config::EmbedConfig;
use crate::error::{EmbedError, NotifyError, js_value_to_string};
use crate::js::{js_function, set};
use crate::sizing::ResizeListener;

pub const RESIZE_RECEIVER: &str = "WebBridge";
pub const RESIZE_MESSAGE: &str = "OnCanvasResize";
const SEND_MESSAGE: &str = "SendMessage";

#[derive(Clone, Debug)]
pub struct RuntimeInstance {
    handle: JsValue,
}

impl RuntimeInstance {
    pub fn new(handle: JsValue) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &JsValue {
        &self.handle
    }
}

impl ResizeListener for RuntimeInstance {
    fn notify_resize(&self, width: u32, height: u32) -> Result<(), NotifyError> {
        let send = js_function(&self.handle, SEND_MESSAGE)
            .map_err(|_| NotifyError::Unsupported(SEND_MESSAGE))?;
        send.call3(
            &self.handle,
            &JsValue::from_str(RESIZE_RECEIVER),
            &JsValue::from_str(RESIZE_MESSAGE),
            &JsValue::from_str(&resize_payload(width, height)),
        )
        .map(|_| ())
        .map_err(|err| NotifyError::Rejected(js_value_to_string(&err)))
    }
}

pub fn resize_payload(width: u32, height: u32) -> String {
    format!("{},{}", width, height)
}

pub fn build_config_object(config: &EmbedConfig, base: &str) -> Result<JsValue, JsValue> {
    let options = Object::new();
    set(&options, "dataUrl", config.data_url(base))?;
    set(&options, "frameworkUrl", config.framework_url(base))?;
    set(&options, "codeUrl", config.code_url(base))?;
    set(&options, "streamingAssetsUrl", config.streaming_assets())?;
    set(&options, "companyName", config.company_name.as_str())?;
    set(&options, "productName", config.product_name.as_str())?;
    set(&options, "productVersion", config.product_version.as_str())?;

    let background = Object::new();
    set(&background, "r", config.background.r)?;
    set(&background, "g", config.background.g)?;
    set(&background, "b", config.background.b)?;
    set(&background, "a", config.background.a)?;
    set(&options, "backgroundColor", background)?;

    let attrs = Object::new();
    set(&attrs, "alpha", config.context.alpha)?;
    set(&attrs, "antialias", config.context.antialias)?;
    set(&attrs, "preserveDrawingBuffer", config.context.preserve_drawing_buffer)?;
    set(&attrs, "powerPreference", config.context.power_preference)?;
    set(&attrs, "desynchronized", config.context.desynchronized)?;
    set(&options, "webGLContextAttributes", attrs)?;

    Ok(options.into())
}

/// Invokes the factory and waits for the instance. A synchronous throw, a
/// non-promise return or a rejection all map to `Instantiation`.
pub async fn create_instance(
    factory: &Function,
    canvas: &HtmlCanvasElement,
    config: &EmbedConfig,
    base: &str,
) -> Result<RuntimeInstance, EmbedError> {
    let options = build_config_object(config, base).map_err(|err| EmbedError::dom(&err))?;
    let pending = factory
        .call2(&JsValue::UNDEFINED, canvas, &options)
        .map_err(EmbedError::instantiation)?;
    let promise = pending
        .dyn_into::<Promise>()
        .map_err(|returned| EmbedError::Instantiation {
            message: "factory did not return a promise".into(),
            cause: returned,
        })?;
    let handle = JsFuture::from(promise)
        .await
        .map_err(EmbedError::instantiation)?;

    Ok(RuntimeInstance::new(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_comma_joined() {
        assert_eq!(resize_payload(390, 300), "390,300");
        assert_eq!(resize_payload(0, 0), "0,0");
    }
}
