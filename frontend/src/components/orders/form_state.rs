//! 订单表单状态
//!
//! 将零散的 signal 整合为 `FormState`，并把输入转换为 [`NewOrder`]。
//! 校验逻辑在不依赖响应式运行时的 [`OrderDraft`] 上完成。

use chrono::NaiveDate;
use fleetdesk_shared::geo::LatLng;
use fleetdesk_shared::{NewOrder, OrderStatus};
use leptos::prelude::*;

/// 表单输入的快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDraft {
    pub reference: String,
    pub customer: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup_lat: String,
    pub pickup_lng: String,
    pub delivery_lat: String,
    pub delivery_lng: String,
    pub pickup_date: String,
    pub weight_kg: String,
}

impl OrderDraft {
    /// 校验必填项并生成带新 id 的订单
    pub fn into_new_order(self) -> Result<NewOrder, String> {
        let required = [
            (&self.reference, "reference"),
            (&self.customer, "customer"),
            (&self.pickup_address, "pickup address"),
            (&self.delivery_address, "delivery address"),
        ];
        if let Some((_, name)) = required.iter().find(|(v, _)| v.trim().is_empty()) {
            return Err(format!("The {} is required", name));
        }

        let pickup_date = NaiveDate::parse_from_str(self.pickup_date.trim(), "%Y-%m-%d")
            .map_err(|_| "The pickup date must be a date (YYYY-MM-DD)".to_string())?;
        let weight_kg = self
            .weight_kg
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| "The weight must be a positive number of kilograms".to_string())?;

        let pickup = parse_point(&self.pickup_lat, &self.pickup_lng, "pickup")?;
        let delivery = parse_point(&self.delivery_lat, &self.delivery_lng, "delivery")?;

        Ok(NewOrder {
            id: String::new(),
            reference: self.reference.trim().to_string(),
            customer: self.customer.trim().to_string(),
            pickup_address: self.pickup_address.trim().to_string(),
            delivery_address: self.delivery_address.trim().to_string(),
            pickup_lat: pickup.map(|p| p.lat),
            pickup_lng: pickup.map(|p| p.lng),
            delivery_lat: delivery.map(|p| p.lat),
            delivery_lng: delivery.map(|p| p.lng),
            pickup_date,
            weight_kg,
            status: OrderStatus::Open,
        }
        .with_generated_id())
    }
}

/// 坐标可选，但纬度与经度必须成对出现
fn parse_point(lat: &str, lng: &str, which: &str) -> Result<Option<LatLng>, String> {
    let (lat, lng) = (lat.trim(), lng.trim());
    if lat.is_empty() && lng.is_empty() {
        return Ok(None);
    }
    let invalid = || format!("The {} coordinates are invalid", which);
    let point = LatLng {
        lat: lat.parse().map_err(|_| invalid())?,
        lng: lng.parse().map_err(|_| invalid())?,
    };
    if !point.is_valid() {
        return Err(invalid());
    }
    Ok(Some(point))
}

/// 表单状态结构体
///
/// 使用 `RwSignal` 因为它实现了 `Copy` trait，适合在闭包间传递。
#[derive(Clone, Copy)]
pub struct FormState {
    pub reference: RwSignal<String>,
    pub customer: RwSignal<String>,
    pub pickup_address: RwSignal<String>,
    pub delivery_address: RwSignal<String>,
    pub pickup_lat: RwSignal<String>,
    pub pickup_lng: RwSignal<String>,
    pub delivery_lat: RwSignal<String>,
    pub delivery_lng: RwSignal<String>,
    pub pickup_date: RwSignal<String>,
    pub weight_kg: RwSignal<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self {
            reference: RwSignal::new(String::new()),
            customer: RwSignal::new(String::new()),
            pickup_address: RwSignal::new(String::new()),
            delivery_address: RwSignal::new(String::new()),
            pickup_lat: RwSignal::new(String::new()),
            pickup_lng: RwSignal::new(String::new()),
            delivery_lat: RwSignal::new(String::new()),
            delivery_lng: RwSignal::new(String::new()),
            pickup_date: RwSignal::new(String::new()),
            weight_kg: RwSignal::new(String::new()),
        }
    }

    fn fields(&self) -> [RwSignal<String>; 10] {
        [
            self.reference,
            self.customer,
            self.pickup_address,
            self.delivery_address,
            self.pickup_lat,
            self.pickup_lng,
            self.delivery_lat,
            self.delivery_lng,
            self.pickup_date,
            self.weight_kg,
        ]
    }

    /// 重置表单到初始状态
    pub fn reset(&self) {
        for field in self.fields() {
            field.set(String::new());
        }
    }

    pub fn draft(&self) -> OrderDraft {
        OrderDraft {
            reference: self.reference.get_untracked(),
            customer: self.customer.get_untracked(),
            pickup_address: self.pickup_address.get_untracked(),
            delivery_address: self.delivery_address.get_untracked(),
            pickup_lat: self.pickup_lat.get_untracked(),
            pickup_lng: self.pickup_lng.get_untracked(),
            delivery_lat: self.delivery_lat.get_untracked(),
            delivery_lng: self.delivery_lng.get_untracked(),
            pickup_date: self.pickup_date.get_untracked(),
            weight_kg: self.weight_kg.get_untracked(),
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft {
            reference: " TO-1042 ".to_string(),
            customer: "Van Dijk Logistics".to_string(),
            pickup_address: "Havenweg 1, Rotterdam".to_string(),
            delivery_address: "Marktplein 5, Utrecht".to_string(),
            pickup_date: "2026-11-02".to_string(),
            weight_kg: "1200".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft_without_coordinates() {
        let order = draft().into_new_order().unwrap();
        assert_eq!(order.reference, "TO-1042");
        assert_eq!(order.weight_kg, 1200);
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.pickup_date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        assert!(order.pickup_lat.is_none() && order.delivery_lng.is_none());
        assert!(!order.id.is_empty());
    }

    #[test]
    fn test_coordinates_are_parsed_in_pairs() {
        let order = OrderDraft {
            pickup_lat: "51.92".to_string(),
            pickup_lng: "4.48".to_string(),
            ..draft()
        }
        .into_new_order()
        .unwrap();
        assert_eq!(order.pickup_lat, Some(51.92));
        assert_eq!(order.pickup_lng, Some(4.48));

        let half = OrderDraft {
            delivery_lat: "52.09".to_string(),
            ..draft()
        };
        assert!(half.into_new_order().unwrap_err().contains("delivery"));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let err = OrderDraft {
            pickup_lat: "91".to_string(),
            pickup_lng: "4.48".to_string(),
            ..draft()
        }
        .into_new_order()
        .unwrap_err();
        assert!(err.contains("pickup"));
    }

    #[test]
    fn test_required_fields() {
        let err = OrderDraft {
            customer: "   ".to_string(),
            ..draft()
        }
        .into_new_order()
        .unwrap_err();
        assert!(err.contains("customer"));
    }

    #[test]
    fn test_weight_and_date_validation() {
        let zero = OrderDraft {
            weight_kg: "0".to_string(),
            ..draft()
        };
        assert!(zero.into_new_order().unwrap_err().contains("weight"));

        let bad_date = OrderDraft {
            pickup_date: "02-11-2026".to_string(),
            ..draft()
        };
        assert!(bad_date.into_new_order().unwrap_err().contains("date"));
    }
}
