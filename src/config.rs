use web_sys::{Element, Window};

use crate::paths::asset_path;

pub const DEFAULT_BUILD_NAME: &str = "Web Build 1";
pub const STREAMING_ASSETS_URL: &str = "StreamingAssets";
pub const COMPANY_NAME: &str = "YourCompany";
pub const PRODUCT_NAME: &str = "Clatter";
pub const PRODUCT_VERSION: &str = "1.0";
// Device pixel ratios above this are clamped to bound fill-rate on dense displays.
pub const MAX_PIXEL_RATIO: f64 = 1.5;
pub const IDLE_TIMEOUT_MS: u32 = 2000;
pub const FALLBACK_DELAY_MS: u32 = 100;
// One-shot resync after ready, for containers whose size settles late.
pub const SETTLE_DELAY_MS: u32 = 300;
pub const DISABLE_QUERY_FLAG: &str = "nogame=1";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextAttributes {
    pub alpha: bool,
    pub antialias: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: &'static str,
    pub desynchronized: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        // Transparent page background shows through; no MSAA and low-power GPU.
        Self {
            alpha: true,
            antialias: false,
            preserve_drawing_buffer: false,
            power_preference: "low-power",
            desynchronized: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbedConfig {
    pub build_name: String,
    pub streaming_assets_url: String,
    pub company_name: String,
    pub product_name: String,
    pub product_version: String,
    pub background: Rgba,
    pub context: ContextAttributes,
    pub max_pixel_ratio: f64,
    pub idle_timeout_ms: u32,
    pub fallback_delay_ms: u32,
    pub settle_delay_ms: u32,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            build_name: DEFAULT_BUILD_NAME.to_string(),
            streaming_assets_url: STREAMING_ASSETS_URL.to_string(),
            company_name: COMPANY_NAME.to_string(),
            product_name: PRODUCT_NAME.to_string(),
            product_version: PRODUCT_VERSION.to_string(),
            background: Rgba {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            },
            context: ContextAttributes::default(),
            max_pixel_ratio: MAX_PIXEL_RATIO,
            idle_timeout_ms: IDLE_TIMEOUT_MS,
            fallback_delay_ms: FALLBACK_DELAY_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
        }
    }
}

impl EmbedConfig {
    /// Defaults overridden by `data-build`, `data-product`, `data-company` and
    /// `data-version` on the canvas element.
    pub fn from_element(canvas: &Element) -> Self {
        let mut config = Self::default();
        let attr = |name: &str| {
            canvas
                .get_attribute(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(build) = attr("data-build") {
            config.build_name = build;
        }
        if let Some(product) = attr("data-product") {
            config.product_name = product;
        }
        if let Some(company) = attr("data-company") {
            config.company_name = company;
        }
        if let Some(version) = attr("data-version") {
            config.product_version = version;
        }

        config
    }

    pub fn loader_url(&self, base: &str) -> String {
        self.build_asset(base, "loader.js")
    }

    pub fn data_url(&self, base: &str) -> String {
        self.build_asset(base, "data.unityweb")
    }

    pub fn framework_url(&self, base: &str) -> String {
        self.build_asset(base, "framework.js.unityweb")
    }

    pub fn code_url(&self, base: &str) -> String {
        self.build_asset(base, "wasm.unityweb")
    }

    // Handed to the runtime as written; it resolves this against the page itself.
    pub fn streaming_assets(&self) -> &str {
        &self.streaming_assets_url
    }

    fn build_asset(&self, base: &str, suffix: &str) -> String {
        asset_path(base, &format!("build/{}.{}", self.build_name, suffix))
    }
}

pub fn embedding_disabled(window: &Window) -> bool {
    let search = window.location().search().unwrap_or_default();
    search_disables_embedding(&search)
}

fn search_disables_embedding(search: &str) -> bool {
    search
        .trim_start_matches('?')
        .split('&')
        .any(|pair| pair == DISABLE_QUERY_FLAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_urls_follow_naming_convention() {
        let config = EmbedConfig::default();
        assert_eq!(config.loader_url("/"), "/build/Web Build 1.loader.js");
        assert_eq!(config.data_url("/"), "/build/Web Build 1.data.unityweb");
        assert_eq!(
            config.framework_url("/clatter/"),
            "/clatter/build/Web Build 1.framework.js.unityweb"
        );
        assert_eq!(config.code_url("/clatter"), "/clatter/build/Web Build 1.wasm.unityweb");
    }

    #[test]
    fn streaming_assets_ignores_base_path() {
        let config = EmbedConfig::default();
        assert_eq!(config.streaming_assets(), "StreamingAssets");
    }

    #[test]
    fn defaults_favour_transparency_and_low_power() {
        let config = EmbedConfig::default();
        assert!(config.context.alpha);
        assert!(!config.context.antialias);
        assert!(!config.context.preserve_drawing_buffer);
        assert_eq!(config.context.power_preference, "low-power");
        assert_eq!(config.background.a, 0.0);
        assert_eq!(config.max_pixel_ratio, 1.5);
    }

    #[test]
    fn query_flag_must_match_whole_pair() {
        assert!(search_disables_embedding("?nogame=1"));
        assert!(search_disables_embedding("?utm=x&nogame=1"));
        assert!(!search_disables_embedding("?nogame=10"));
        assert!(!search_disables_embedding(""));
    }
}
