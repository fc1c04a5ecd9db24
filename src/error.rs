use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    #[error("Failed to load runtime loader script: {url}")]
    ResourceLoad { url: String },
    #[error("Runtime loader did not install createUnityInstance")]
    MissingFactory,
    #[error("Runtime instantiation failed: {message}")]
    Instantiation { message: String, cause: JsValue },
    #[error("DOM error: {0}")]
    Dom(String),
}

impl EmbedError {
    pub fn dom(err: &JsValue) -> Self {
        Self::Dom(js_value_to_string(err))
    }

    pub fn instantiation(err: JsValue) -> Self {
        Self::Instantiation {
            message: js_value_to_string(&err),
            cause: err,
        }
    }

    // Mirrored into the DOM status attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceLoad { .. } => "resource_load",
            Self::MissingFactory => "missing_factory",
            Self::Instantiation { .. } => "instantiation",
            Self::Dom(_) => "dom",
        }
    }
}

// Rejections compare by message; the JS value itself has no Rust equality.
impl PartialEq for EmbedError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ResourceLoad { url: a }, Self::ResourceLoad { url: b }) => a == b,
            (Self::MissingFactory, Self::MissingFactory) => true,
            (Self::Instantiation { message: a, .. }, Self::Instantiation { message: b, .. }) => {
                a == b
            }
            (Self::Dom(a), Self::Dom(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EmbedError {}

// A factory rejection is handed back to JS as the value it rejected with.
impl From<EmbedError> for JsValue {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Instantiation { cause, .. } => cause,
            other => js_sys::Error::new(&other.to_string()).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("runtime exposes no {0}")]
    Unsupported(&'static str),
    #[error("runtime rejected resize notification: {0}")]
    Rejected(String),
}

pub fn js_value_to_string(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = EmbedError::ResourceLoad {
            url: "/build/Web Build 1.loader.js".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load runtime loader script: /build/Web Build 1.loader.js"
        );
        assert_eq!(err.kind(), "resource_load");
        assert_eq!(EmbedError::MissingFactory.kind(), "missing_factory");
    }
}
