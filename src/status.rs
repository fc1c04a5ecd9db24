use web_sys::{Element, HtmlCanvasElement};

use crate::lifecycle::LoadStatus;

pub const STATUS_ATTR: &str = "data-embed-status";
pub const ERROR_KIND_ATTR: &str = "data-embed-error";
pub const FALLBACK_SELECTOR: &str = "[data-embed-fallback]";
pub const FALLBACK_TEXT: &str = "Failed to load game";

pub fn status_name(status: &LoadStatus) -> &'static str {
    match status {
        LoadStatus { error: Some(_), .. } => "error",
        LoadStatus { loading: true, .. } => "loading",
        LoadStatus { loading: false, .. } => "ready",
    }
}

pub fn reflect_status(container: Option<&Element>, canvas: &HtmlCanvasElement, status: &LoadStatus) {
    let name = status_name(status);
    let failed = status.error.is_some();

    let style = canvas.style();
    // Until the runtime exists the canvas must not swallow wheel/touch scrolling.
    let _ = if status.loading || failed {
        style.set_property("pointer-events", "none")
    } else {
        style.remove_property("pointer-events").map(|_| ())
    };
    let _ = if failed {
        style.set_property("visibility", "hidden")
    } else {
        style.remove_property("visibility").map(|_| ())
    };

    let Some(container) = container else {
        return;
    };
    let _ = container.set_attribute(STATUS_ATTR, name);
    match &status.error {
        Some(err) => {
            let _ = container.set_attribute(ERROR_KIND_ATTR, err.kind());
        }
        None => {
            let _ = container.remove_attribute(ERROR_KIND_ATTR);
        }
    }

    if let Ok(Some(fallback)) = container.query_selector(FALLBACK_SELECTOR) {
        if failed {
            fallback.set_text_content(Some(FALLBACK_TEXT));
            let _ = fallback.remove_attribute("hidden");
        } else {
            let _ = fallback.set_attribute("hidden", "");
        }
    }
}

pub fn clear_status(container: Option<&Element>, canvas: &HtmlCanvasElement) {
    let style = canvas.style();
    let _ = style.remove_property("pointer-events");
    let _ = style.remove_property("visibility");

    let Some(container) = container else {
        return;
    };
    let _ = container.remove_attribute(STATUS_ATTR);
    let _ = container.remove_attribute(ERROR_KIND_ATTR);
    if let Ok(Some(fallback)) = container.query_selector(FALLBACK_SELECTOR) {
        fallback.set_text_content(None);
        let _ = fallback.set_attribute("hidden", "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;

    #[test]
    fn error_wins_over_loading_flag() {
        let status = LoadStatus {
            loading: false,
            error: Some(EmbedError::MissingFactory),
        };
        assert_eq!(status_name(&status), "error");
        assert_eq!(
            status_name(&LoadStatus {
                loading: true,
                error: None
            }),
            "loading"
        );
        assert_eq!(
            status_name(&LoadStatus {
                loading: false,
                error: None
            }),
            "ready"
        );
    }
}
