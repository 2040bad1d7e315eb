//! 运行时配置
//!
//! 默认值写在常量里，部署时可通过 `<meta name="fleetdesk:*">` 覆盖，
//! 读取来源抽象为 [`ConfigSource`]，便于在测试中替换。

// =========================================================
// 默认值 (Defaults)
// =========================================================

const DEFAULT_APP_NAME: &str = "FleetDesk";
/// 为空表示与前端同源
const DEFAULT_BACKEND_URL: &str = "";
const DEFAULT_BACKEND_KEY: &str = "";
const DEFAULT_PARTIALS_BASE: &str = "partials";
const DEFAULT_CONTENT_ID: &str = "app-content";

/// meta 标签名前缀
pub const META_PREFIX: &str = "fleetdesk:";

/// 配置来源
pub trait ConfigSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// 从 document 的 meta 标签读取配置
pub struct MetaConfig(pub web_sys::Document);

impl ConfigSource for MetaConfig {
    fn var(&self, name: &str) -> Option<String> {
        let selector = format!("meta[name=\"{}{}\"]", META_PREFIX, name);
        self.0
            .query_selector(&selector)
            .ok()
            .flatten()?
            .get_attribute("content")
    }
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub app_name: String,
    pub backend_url: String,
    pub backend_key: String,
    /// 页面片段所在目录（相对路径，不带结尾斜杠）
    pub partials_base: String,
    /// 路由内容区域的元素 ID
    pub content_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_key: DEFAULT_BACKEND_KEY.to_string(),
            partials_base: DEFAULT_PARTIALS_BASE.to_string(),
            content_id: DEFAULT_CONTENT_ID.to_string(),
        }
    }
}

impl AppConfig {
    pub fn new(source: &impl ConfigSource) -> Self {
        let defaults = Self::default();
        let read = |name: &str, fallback: String| {
            source
                .var(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        Self {
            app_name: read("app-name", defaults.app_name),
            backend_url: read("backend-url", defaults.backend_url),
            backend_key: read("backend-key", defaults.backend_key),
            partials_base: read("partials-base", defaults.partials_base)
                .trim_end_matches('/')
                .to_string(),
            content_id: read("content-id", defaults.content_id),
        }
    }

    /// 页面片段的相对路径，如 `partials/start.html`
    pub fn partial_path(&self, key: &str) -> String {
        format!("{}/{}.html", self.partials_base, key)
    }

    /// 错误页的文档标题
    pub fn error_title(&self) -> String {
        format!("Error – {}", self.app_name)
    }

    /// 路由页的文档标题
    pub fn page_title(&self, title: &str) -> String {
        format!("{} – {}", title, self.app_name)
    }
}
