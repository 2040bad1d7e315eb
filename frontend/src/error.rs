use std::fmt;

use wasm_bindgen::JsValue;

use crate::web::HttpError;

// =========================================================
// 错误类型枚举
// =========================================================

/// 错误类型枚举
/// 决定错误码以及错误在界面上的呈现方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorKind {
    /// 路由表中不存在该路由
    UnknownRoute,
    /// 页面片段加载失败（非 2xx 响应）
    TemplateLoad,
    /// 页面模块 destroy() 失败（只记录，不传播）
    PageTeardown,
    /// 页面模块 init() 失败
    PageInit,
    /// DOM 操作失败
    Dom,
    /// 网络请求失败
    Network,
    /// 后端返回错误状态
    Backend,
    /// JSON 解析或序列化错误
    Serialization,
    /// 表单输入不完整
    InvalidInput,
}

impl AppErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppErrorKind::UnknownRoute => "UNKNOWN_ROUTE",
            AppErrorKind::TemplateLoad => "TEMPLATE_LOAD_FAILED",
            AppErrorKind::PageTeardown => "PAGE_TEARDOWN_FAILED",
            AppErrorKind::PageInit => "PAGE_INIT_FAILED",
            AppErrorKind::Dom => "DOM_ERROR",
            AppErrorKind::Network => "NETWORK_ERROR",
            AppErrorKind::Backend => "BACKEND_ERROR",
            AppErrorKind::Serialization => "SERIALIZATION_ERROR",
            AppErrorKind::InvalidInput => "INVALID_INPUT",
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSpan {
    /// 操作名称，如 "router.render", "partials.load"
    pub operation: String,
    /// 额外的细节信息，如路由键、订单 ID
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 前端领域错误
///
/// - kind: 错误类型/语义
/// - message: 错误消息
/// - status: 相关的 HTTP 状态码（片段加载、后端调用）
/// - source: 原始错误（可选，用于错误链）
/// - spans: 结构化的调用追踪栈
#[derive(Debug)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub message: String,
    status: Option<u16>,
    source: Option<Box<dyn std::error::Error + 'static>>,
    spans: Vec<ErrorSpan>,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn unknown_route(key: &str) -> Self {
        Self::new(
            AppErrorKind::UnknownRoute,
            format!("route '{}' is not registered", key),
        )
    }

    pub fn template_load(status: u16, path: &str) -> Self {
        let mut err = Self::new(
            AppErrorKind::TemplateLoad,
            format!("failed to load {} (HTTP {})", path, status),
        );
        err.status = Some(status);
        err
    }

    pub fn page_teardown(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::PageTeardown, message)
    }

    pub fn page_init(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::PageInit, message)
    }

    pub fn dom(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Dom, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Network, message)
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        let mut err = Self::new(AppErrorKind::Backend, message);
        err.status = Some(status);
        err
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Serialization, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InvalidInput, message)
    }

    // --- Context builders (Builder Pattern) ---

    /// 添加操作追踪（无额外细节）
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    /// 设置原始错误源
    pub fn with_source<E: std::error::Error + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    /// 关联的 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }
}

// =========================================================
// Display & Error trait 实现
// =========================================================

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

// =========================================================
// 类型转换实现
// =========================================================

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::ResponseParseFailed(msg) => AppError::serialization(msg),
            other => AppError::network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::serialization(e.to_string()).with_source(e)
    }
}

impl From<JsValue> for AppError {
    fn from(e: JsValue) -> Self {
        let msg = e.as_string().unwrap_or_else(|| format!("{:?}", e));
        AppError::dom(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_load_carries_status() {
        let err = AppError::template_load(404, "partials/planning.html");
        assert_eq!(err.kind, AppErrorKind::TemplateLoad);
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().starts_with("[TEMPLATE_LOAD_FAILED]"));
    }

    #[test]
    fn test_display_includes_trace() {
        let err = AppError::unknown_route("garage")
            .in_op("router.render")
            .in_op_with("router.navigate", "garage");
        assert_eq!(
            err.to_string(),
            "[UNKNOWN_ROUTE] route 'garage' is not registered | trace: router.render -> router.navigate(garage)"
        );
        assert_eq!(err.spans().len(), 2);
    }

    #[test]
    fn test_serde_error_keeps_source() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = AppError::from(parse);
        assert_eq!(err.kind, AppErrorKind::Serialization);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_http_errors_map_to_kinds() {
        let err = AppError::from(HttpError::NetworkError("offline".into()));
        assert_eq!(err.kind, AppErrorKind::Network);
        let err = AppError::from(HttpError::ResponseParseFailed("bad".into()));
        assert_eq!(err.kind, AppErrorKind::Serialization);
    }
}
