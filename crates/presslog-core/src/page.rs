//! Configuration page served at `GET /`.
//!
//! Embedded in the binary: the device has no room for a separate UI bundle.
//! The page opens the live channel at the configured path, and posts to
//! `/serviceMode` and `/wifiConfig`.

/// Page template. `__LIVE_PATH__` stands for a JS string literal.
pub const PAGE_TEMPLATE: &str = include_str!("../assets/index.html");

const LIVE_PATH_PLACEHOLDER: &str = "__LIVE_PATH__";

pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Render the page for a live channel served at `live_path`.
pub fn render(live_path: &str) -> String {
    let literal = serde_json::Value::from(live_path)
        .to_string()
        .replace("</", "<\\/");
    PAGE_TEMPLATE.replace(LIVE_PATH_PLACEHOLDER, &literal)
}
