use js_sys::{Function, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::error::js_value_to_string;

pub fn js_function(target: &JsValue, name: &str) -> Result<Function, String> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(|err| js_value_to_string(&err))?
        .dyn_into::<Function>()
        .map_err(|_| format!("{} missing", name))
}

pub fn set(target: &Object, key: &str, value: impl Into<JsValue>) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), &value.into())?;
    Ok(())
}
