use crate::{NewOrder, Order, OrderStatus, TokenResponse, Truck, UserMetadata};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    /// GET/DELETE 请求不携带请求体
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Patch)
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path (or suffix).
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;

    /// 附加在 PATH 之后的查询串（PostgREST 过滤、排序）
    fn query(&self) -> Option<String> {
        None
    }

    /// 完整的请求路径
    fn path(&self) -> String {
        match self.query() {
            Some(q) if !q.is_empty() => {
                let sep = if Self::PATH.contains('?') { '&' } else { '?' };
                format!("{}{}{}", Self::PATH, sep, q)
            }
            _ => Self::PATH.to_string(),
        }
    }
}

// =========================================================
// Auth Requests
// =========================================================

/// Password grant login
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

impl ApiRequest for PasswordGrantRequest {
    type Response = TokenResponse;
    const PATH: &'static str = "/auth/v1/token?grant_type=password";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Create a user account with a role stored in its metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub data: UserMetadata,
}

impl ApiRequest for SignUpRequest {
    type Response = crate::AuthUser;
    const PATH: &'static str = "/auth/v1/signup";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Order Requests
// =========================================================

/// List all orders, earliest pickup first
#[derive(Debug, Serialize, Deserialize)]
pub struct ListOrdersRequest;

impl ApiRequest for ListOrdersRequest {
    type Response = Vec<Order>;
    const PATH: &'static str = "/rest/v1/orders";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Option<String> {
        Some("select=*&order=pickup_date.asc".to_string())
    }
}

impl ApiRequest for NewOrder {
    type Response = Vec<Order>;
    const PATH: &'static str = "/rest/v1/orders";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Partial update of one order.
/// `truck_id: Some(None)` clears the assignment.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(skip)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_id: Option<Option<String>>,
}

impl UpdateOrderRequest {
    pub fn status(id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            status: Some(status),
            truck_id: None,
        }
    }

    pub fn assignment(id: impl Into<String>, truck_id: Option<String>) -> Self {
        let status = if truck_id.is_some() {
            OrderStatus::Planned
        } else {
            OrderStatus::Open
        };
        Self {
            id: id.into(),
            status: Some(status),
            truck_id: Some(truck_id),
        }
    }
}

impl ApiRequest for UpdateOrderRequest {
    type Response = Vec<Order>;
    const PATH: &'static str = "/rest/v1/orders";
    const METHOD: HttpMethod = HttpMethod::Patch;

    fn query(&self) -> Option<String> {
        Some(format!("id=eq.{}", self.id))
    }
}

/// Delete one order
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteOrderRequest {
    pub id: String,
}

impl ApiRequest for DeleteOrderRequest {
    type Response = ();
    const PATH: &'static str = "/rest/v1/orders";
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn query(&self) -> Option<String> {
        Some(format!("id=eq.{}", self.id))
    }
}

// =========================================================
// Truck Requests
// =========================================================

/// List the fleet
#[derive(Debug, Serialize, Deserialize)]
pub struct ListTrucksRequest;

impl ApiRequest for ListTrucksRequest {
    type Response = Vec<Truck>;
    const PATH: &'static str = "/rest/v1/trucks";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Option<String> {
        Some("select=*&order=plate.asc".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_joins_query_with_correct_separator() {
        assert_eq!(
            ListOrdersRequest.path(),
            "/rest/v1/orders?select=*&order=pickup_date.asc"
        );
        let req = PasswordGrantRequest {
            email: "a".into(),
            password: "b".into(),
        };
        assert_eq!(req.path(), "/auth/v1/token?grant_type=password");
        assert_eq!(
            DeleteOrderRequest { id: "o-7".into() }.path(),
            "/rest/v1/orders?id=eq.o-7"
        );
    }

    #[test]
    fn test_unassignment_serializes_null_truck() {
        let body = serde_json::to_string(&UpdateOrderRequest::assignment("o1", None)).unwrap();
        assert_eq!(body, r#"{"status":"open","truck_id":null}"#);

        let body =
            serde_json::to_string(&UpdateOrderRequest::assignment("o1", Some("t1".into())))
                .unwrap();
        assert_eq!(body, r#"{"status":"planned","truck_id":"t1"}"#);
    }

    #[test]
    fn test_status_update_leaves_truck_untouched() {
        let body =
            serde_json::to_string(&UpdateOrderRequest::status("o1", OrderStatus::Delivered))
                .unwrap();
        assert_eq!(body, r#"{"status":"delivered"}"#);
    }

    #[test]
    fn test_methods_with_body() {
        assert!(HttpMethod::Patch.has_body());
        assert!(!HttpMethod::Delete.has_body());
        assert!(!HttpMethod::Get.has_body());
    }
}
