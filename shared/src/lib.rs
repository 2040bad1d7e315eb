use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod board;
pub mod geo;
pub mod protocol;

use geo::LatLng;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_PREFER: &str = "Prefer";
pub const PREFER_REPRESENTATION: &str = "return=representation";

/// 未在用户元数据中声明角色时使用的角色
pub const DEFAULT_ROLE: &str = "viewer";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PLANNER: &str = "planner";

// =========================================================
// 用户与会话 (Users & Sessions)
// =========================================================

/// 已登录用户的身份与角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// 认证服务返回的用户元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// 认证服务中的用户记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.unwrap_or_default(),
            role: self
                .user_metadata
                .role
                .filter(|r| !r.trim().is_empty())
                .map(|r| r.to_lowercase())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        }
    }
}

/// 密码登录成功后的令牌响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub user: AuthUser,
}

/// 内存中的会话（令牌不落盘）
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: UserProfile,
}

impl From<TokenResponse> for Session {
    fn from(res: TokenResponse) -> Self {
        Self {
            access_token: res.access_token,
            user: res.user.into_profile(),
        }
    }
}

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Open,
    Planned,
    InTransit,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Open,
        OrderStatus::Planned,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Planned => "planned",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::Planned => "Planned",
            OrderStatus::InTransit => "In transit",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// 已出发或已送达的订单不能再重新排车
    pub fn is_locked(&self) -> bool {
        matches!(self, OrderStatus::InTransit | OrderStatus::Delivered)
    }
}

/// 新建运输订单的请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: String,
    pub reference: String,
    pub customer: String,
    pub pickup_address: String,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_lng: Option<f64>,
    pub pickup_date: NaiveDate,
    pub weight_kg: u32,
    pub status: OrderStatus,
}

impl NewOrder {
    /// 生成带有客户端 UUID 的新订单
    pub fn with_generated_id(mut self) -> Self {
        self.id = uuid::Uuid::new_v4().to_string();
        self
    }
}

/// 运输订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub reference: String,
    pub customer: String,
    pub pickup_address: String,
    pub delivery_address: String,
    #[serde(default)]
    pub pickup_lat: Option<f64>,
    #[serde(default)]
    pub pickup_lng: Option<f64>,
    #[serde(default)]
    pub delivery_lat: Option<f64>,
    #[serde(default)]
    pub delivery_lng: Option<f64>,
    pub pickup_date: NaiveDate,
    pub weight_kg: u32,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub truck_id: Option<String>,
}

impl Order {
    pub fn pickup_point(&self) -> Option<LatLng> {
        Some(LatLng::new(self.pickup_lat?, self.pickup_lng?))
    }

    pub fn delivery_point(&self) -> Option<LatLng> {
        Some(LatLng::new(self.delivery_lat?, self.delivery_lng?))
    }
}

/// 卡车
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: String,
    pub plate: String,
    #[serde(default)]
    pub driver: Option<String>,
    pub capacity_kg: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_role_when_metadata_missing() {
        let user: AuthUser =
            serde_json::from_str(r#"{"id":"u1","email":"jan@example.com"}"#).unwrap();
        let profile = user.into_profile();
        assert_eq!(profile.role, DEFAULT_ROLE);
        assert_eq!(profile.email, "jan@example.com");
    }

    #[test]
    fn test_profile_role_is_lowercased() {
        let user: AuthUser = serde_json::from_str(
            r#"{"id":"u1","email":null,"user_metadata":{"role":"Planner"}}"#,
        )
        .unwrap();
        assert_eq!(user.into_profile().role, "planner");
    }

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::InTransit).unwrap(),
            "\"in_transit\""
        );
        assert_eq!(OrderStatus::parse("planned"), Some(OrderStatus::Planned));
        assert_eq!(OrderStatus::parse("lost"), None);
        assert!(OrderStatus::Delivered.is_locked());
        assert!(!OrderStatus::Planned.is_locked());
    }

    #[test]
    fn test_order_points_require_both_coordinates() {
        let order: Order = serde_json::from_str(
            r#"{"id":"o1","reference":"R-1","customer":"ACME","pickup_address":"A",
                "delivery_address":"B","pickup_lat":52.1,"pickup_lng":5.1,
                "delivery_lat":51.9,"pickup_date":"2026-10-19","weight_kg":1200}"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.pickup_point(), Some(LatLng::new(52.1, 5.1)));
        assert_eq!(order.delivery_point(), None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let base = NewOrder {
            id: String::new(),
            reference: "R".into(),
            customer: "C".into(),
            pickup_address: "A".into(),
            delivery_address: "B".into(),
            pickup_lat: None,
            pickup_lng: None,
            delivery_lat: None,
            delivery_lng: None,
            pickup_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            weight_kg: 10,
            status: OrderStatus::Open,
        };
        let a = base.clone().with_generated_id();
        let b = base.with_generated_id();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }
}
