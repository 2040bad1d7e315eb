//! HTTP 请求封装模块
//!
//! 使用 `web_sys::fetch` 提供简洁的 HTTP 客户端接口，
//! 页面片段加载与后端调用共用。

use serde::{Serialize, de::DeserializeOwned};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCache, RequestInit, Response};

use fleetdesk_shared::protocol::HttpMethod;

fn method_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Patch => "PATCH",
        HttpMethod::Delete => "DELETE",
    }
}

/// HTTP 错误类型
#[derive(Debug)]
pub enum HttpError {
    /// 请求构建失败
    RequestBuildFailed(String),
    /// 网络请求失败
    NetworkError(String),
    /// 响应解析失败
    ResponseParseFailed(String),
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HttpError::RequestBuildFailed(msg) => write!(f, "request could not be built: {}", msg),
            HttpError::NetworkError(msg) => write!(f, "network error: {}", msg),
            HttpError::ResponseParseFailed(msg) => write!(f, "response could not be read: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// HTTP 响应封装
pub struct HttpResponse {
    inner: Response,
}

impl HttpResponse {
    /// 获取 HTTP 状态码
    pub fn status(&self) -> u16 {
        self.inner.status()
    }

    /// 检查响应是否成功 (2xx)
    pub fn ok(&self) -> bool {
        self.inner.ok()
    }

    /// 获取响应体文本
    pub async fn text(self) -> Result<String, HttpError> {
        let promise = self
            .inner
            .text()
            .map_err(|e| HttpError::ResponseParseFailed(format!("{:?}", e)))?;

        let text = JsFuture::from(promise)
            .await
            .map_err(|e| HttpError::ResponseParseFailed(format!("{:?}", e)))?;

        text.as_string()
            .ok_or_else(|| HttpError::ResponseParseFailed("body is not a string".to_string()))
    }

    /// 解析 JSON 响应体；空响应体按 `null` 处理（如 204）
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let text = self.text().await?;
        parse_json_body(&text)
    }
}

fn parse_json_body<T: DeserializeOwned>(text: &str) -> Result<T, HttpError> {
    let body = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(body).map_err(|e| HttpError::ResponseParseFailed(e.to_string()))
}

/// HTTP 请求构建器
pub struct HttpRequestBuilder {
    url: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    body: Option<String>,
    cache: Option<RequestCache>,
}

impl HttpRequestBuilder {
    fn new(url: String, method: HttpMethod) -> Self {
        Self {
            url,
            method,
            headers: Vec::new(),
            body: None,
            cache: None,
        }
    }

    /// 添加请求头
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// 设置 JSON 请求体
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self, HttpError> {
        let body =
            serde_json::to_string(body).map_err(|e| HttpError::RequestBuildFailed(e.to_string()))?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// 设置请求体
    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// 不读写 HTTP 缓存
    pub fn no_store(mut self) -> Self {
        self.cache = Some(RequestCache::NoStore);
        self
    }

    /// 发送请求
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        let headers = Headers::new().map_err(|e| {
            HttpError::RequestBuildFailed(format!("Headers could not be created: {:?}", e))
        })?;

        for (key, value) in &self.headers {
            headers.set(key, value).map_err(|e| {
                HttpError::RequestBuildFailed(format!("header {} rejected: {:?}", key, e))
            })?;
        }

        let opts = RequestInit::new();
        opts.set_method(method_name(self.method));
        opts.set_headers(&headers.into());
        if let Some(cache) = self.cache {
            opts.set_cache(cache);
        }

        if let Some(body) = &self.body {
            opts.set_body(&JsValue::from_str(body));
        }

        let request = Request::new_with_str_and_init(&self.url, &opts)
            .map_err(|e| HttpError::RequestBuildFailed(format!("{:?}", e)))?;

        let window = web_sys::window()
            .ok_or_else(|| HttpError::NetworkError("window is not available".to_string()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| HttpError::NetworkError(format!("{:?}", e)))?;

        let response: Response = resp_value.dyn_into().map_err(|e| {
            HttpError::ResponseParseFailed(format!("fetch did not return a Response: {:?}", e))
        })?;

        Ok(HttpResponse { inner: response })
    }
}

/// 轻量级 HTTP 客户端
pub struct HttpClient;

impl HttpClient {
    pub fn request(method: HttpMethod, url: &str) -> HttpRequestBuilder {
        HttpRequestBuilder::new(url.to_string(), method)
    }

    /// 创建 GET 请求
    pub fn get(url: &str) -> HttpRequestBuilder {
        Self::request(HttpMethod::Get, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_parses_as_unit() {
        assert!(parse_json_body::<()>("").is_ok());
        let none: Option<u32> = parse_json_body("  ").unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_invalid_body_is_parse_error() {
        let err = parse_json_body::<Vec<u32>>("<html>").unwrap_err();
        assert!(matches!(err, HttpError::ResponseParseFailed(_)));
    }
}
