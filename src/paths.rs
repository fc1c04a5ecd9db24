use web_sys::Document;

const BASE_PATH_ATTR: &str = "data-base-path";
const DEFAULT_BASE_PATH: &str = "/";

/// Deployment root for every asset URL. Set by the page on `<html data-base-path="...">`
/// so the same build can be served from `/` or from a project subpath.
pub fn base_path(document: &Document) -> String {
    document
        .document_element()
        .and_then(|el| el.get_attribute(BASE_PATH_ATTR))
        .filter(|base| !base.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string())
}

pub fn asset_path(base: &str, path: &str) -> String {
    let base = base.trim();
    let path = path.strip_prefix('/').unwrap_or(path);

    if base.is_empty() {
        return format!("{}{}", DEFAULT_BASE_PATH, path);
    }
    if base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
