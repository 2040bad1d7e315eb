//! 后端 API 客户端
//!
//! 认证走 `/auth/v1`，数据走 `/rest/v1`。
//! 所有端点都由共享 crate 中的 [`ApiRequest`] 描述，这里只负责发送。

use fleetdesk_shared::protocol::{
    ApiRequest, DeleteOrderRequest, ListOrdersRequest, ListTrucksRequest, PasswordGrantRequest,
    SignUpRequest, UpdateOrderRequest,
};
use fleetdesk_shared::{
    HEADER_API_KEY, HEADER_PREFER, NewOrder, Order, PREFER_REPRESENTATION, Session, Truck,
    UserMetadata, UserProfile,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::web::HttpClient;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanningApi {
    pub base_url: String,
    pub api_key: String,
    access_token: Option<String>,
}

impl PlanningApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// 携带用户令牌的副本
    pub fn with_token(&self, access_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    // 认证头：未登录时用匿名 key 作为 Bearer
    fn bearer(&self) -> String {
        format!(
            "Bearer {}",
            self.access_token.as_deref().unwrap_or(&self.api_key)
        )
    }

    /// 发送任意端点请求
    pub async fn send<R: ApiRequest>(&self, request: &R) -> AppResult<R::Response> {
        let path = request.path();
        let url = self.url(&path);

        let mut builder = HttpClient::request(R::METHOD, &url)
            .header(HEADER_API_KEY, &self.api_key)
            .header("Authorization", &self.bearer());
        if R::METHOD.has_body() {
            builder = builder
                .header(HEADER_PREFER, PREFER_REPRESENTATION)
                .json(request)?;
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::from(e).in_op_with("api.send", path.clone()))?;

        if !response.ok() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(
                AppError::backend(status, backend_error_message(status, &body))
                    .in_op_with("api.send", path),
            );
        }

        Ok(response.json::<R::Response>().await?)
    }

    // =========================================================
    // 认证
    // =========================================================

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let request = PasswordGrantRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = self.send(&request).await.map_err(|e| e.in_op("sign_in"))?;
        Ok(Session::from(token))
    }

    pub async fn sign_up(&self, email: &str, password: &str, role: &str) -> AppResult<UserProfile> {
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: UserMetadata {
                role: Some(role.to_string()),
            },
        };
        let user = self.send(&request).await.map_err(|e| e.in_op("sign_up"))?;
        Ok(user.into_profile())
    }

    // =========================================================
    // 订单与车辆
    // =========================================================

    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        self.send(&ListOrdersRequest).await
    }

    pub async fn create_order(&self, order: NewOrder) -> AppResult<Order> {
        let rows = self.send(&order).await?;
        first_row(rows, "create_order")
    }

    pub async fn update_order(&self, update: UpdateOrderRequest) -> AppResult<Order> {
        let rows = self.send(&update).await?;
        first_row(rows, "update_order")
    }

    pub async fn delete_order(&self, id: &str) -> AppResult<()> {
        self.send(&DeleteOrderRequest { id: id.to_string() }).await
    }

    pub async fn list_trucks(&self) -> AppResult<Vec<Truck>> {
        self.send(&ListTrucksRequest).await
    }
}

/// `return=representation` 写操作返回受影响的行
fn first_row(rows: Vec<Order>, operation: &str) -> AppResult<Order> {
    rows.into_iter().next().ok_or_else(|| {
        AppError::serialization("backend returned no rows for a write").in_op(operation)
    })
}

/// 后端错误体中可能出现的消息字段
#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// 从错误响应体中提取可读消息，缺省时退回到状态码
fn backend_error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with HTTP {}", status))
}
