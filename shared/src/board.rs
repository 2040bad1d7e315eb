//! 排车看板模型
//!
//! 纯数据层，不依赖 DOM：
//! - 看板由"未分配"泳道和每辆卡车一条泳道组成
//! - 拖拽产生的移动在这里校验（载重、锁定状态），再由页面层持久化

use std::fmt;

use crate::{Order, OrderStatus, Truck};

/// 看板泳道
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lane {
    Unassigned,
    Truck(String),
}

impl Lane {
    /// 拖放时写入 DataTransfer 的标识
    pub fn token(&self) -> String {
        match self {
            Lane::Unassigned => "unassigned".to_string(),
            Lane::Truck(id) => format!("truck:{id}"),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "unassigned" => Some(Lane::Unassigned),
            _ => token
                .strip_prefix("truck:")
                .filter(|id| !id.is_empty())
                .map(|id| Lane::Truck(id.to_string())),
        }
    }

    fn of(order: &Order) -> Self {
        match &order.truck_id {
            Some(id) => Lane::Truck(id.clone()),
            None => Lane::Unassigned,
        }
    }
}

/// 看板操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    UnknownOrder(String),
    UnknownTruck(String),
    /// 订单已出发或已送达
    Locked { reference: String, status: OrderStatus },
    OverCapacity {
        plate: String,
        load_kg: u32,
        capacity_kg: u32,
    },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::UnknownOrder(id) => write!(f, "unknown order {}", id),
            BoardError::UnknownTruck(id) => write!(f, "unknown truck {}", id),
            BoardError::Locked { reference, status } => {
                write!(f, "order {} is {} and can no longer be moved", reference, status.label())
            }
            BoardError::OverCapacity {
                plate,
                load_kg,
                capacity_kg,
            } => write!(
                f,
                "truck {} would carry {} kg, capacity is {} kg",
                plate, load_kg, capacity_kg
            ),
        }
    }
}

impl std::error::Error for BoardError {}

/// 一次成功的移动
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub order_id: String,
    pub from: Lane,
    pub to: Lane,
}

impl Move {
    /// 目标卡车 ID（移回未分配时为 None）
    pub fn truck_id(&self) -> Option<String> {
        match &self.to {
            Lane::Truck(id) => Some(id.clone()),
            Lane::Unassigned => None,
        }
    }
}

/// 泳道的只读视图，供渲染使用
#[derive(Debug, Clone, PartialEq)]
pub struct LaneView {
    pub lane: Lane,
    pub title: String,
    pub orders: Vec<Order>,
    pub load_kg: u32,
    /// 未分配泳道没有载重上限
    pub capacity_kg: Option<u32>,
}

impl LaneView {
    pub fn utilisation_percent(&self) -> Option<u32> {
        let capacity = self.capacity_kg?;
        if capacity == 0 {
            return Some(100);
        }
        Some(((u64::from(self.load_kg) * 100) / u64::from(capacity)) as u32)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningBoard {
    trucks: Vec<Truck>,
    orders: Vec<Order>,
}

impl PlanningBoard {
    /// 分配给未知卡车的订单被视为未分配
    pub fn new(trucks: Vec<Truck>, orders: Vec<Order>) -> Self {
        let orders = orders
            .into_iter()
            .map(|mut order| {
                let known = order
                    .truck_id
                    .as_ref()
                    .is_none_or(|id| trucks.iter().any(|t| &t.id == id));
                if !known {
                    order.truck_id = None;
                }
                order
            })
            .collect();
        Self { trucks, orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    /// 当前分配给某辆卡车的总重量
    pub fn load_of(&self, truck_id: &str) -> u32 {
        self.orders
            .iter()
            .filter(|o| o.truck_id.as_deref() == Some(truck_id))
            .map(|o| o.weight_kg)
            .sum()
    }

    /// 按显示顺序列出所有泳道：未分配在前，卡车按给定顺序
    pub fn lanes(&self) -> Vec<LaneView> {
        let mut lanes = Vec::with_capacity(self.trucks.len() + 1);
        let unassigned: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.truck_id.is_none())
            .cloned()
            .collect();
        lanes.push(LaneView {
            lane: Lane::Unassigned,
            title: "Unassigned".to_string(),
            load_kg: unassigned.iter().map(|o| o.weight_kg).sum(),
            orders: unassigned,
            capacity_kg: None,
        });

        for truck in &self.trucks {
            let orders: Vec<Order> = self
                .orders
                .iter()
                .filter(|o| o.truck_id.as_deref() == Some(truck.id.as_str()))
                .cloned()
                .collect();
            let title = match &truck.driver {
                Some(driver) => format!("{} · {}", truck.plate, driver),
                None => truck.plate.clone(),
            };
            lanes.push(LaneView {
                lane: Lane::Truck(truck.id.clone()),
                title,
                load_kg: orders.iter().map(|o| o.weight_kg).sum(),
                orders,
                capacity_kg: Some(truck.capacity_kg),
            });
        }
        lanes
    }

    /// 将订单移动到目标泳道
    ///
    /// # Returns
    /// - `Ok(None)`: 订单已在目标泳道，无需持久化
    /// - `Ok(Some(Move))`: 移动已应用到本地模型
    pub fn move_order(&mut self, order_id: &str, to: &Lane) -> Result<Option<Move>, BoardError> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| BoardError::UnknownOrder(order_id.to_string()))?;

        let from = Lane::of(&self.orders[index]);
        if &from == to {
            return Ok(None);
        }

        let order = &self.orders[index];
        if order.status.is_locked() {
            return Err(BoardError::Locked {
                reference: order.reference.clone(),
                status: order.status,
            });
        }

        if let Lane::Truck(truck_id) = to {
            let truck = self
                .trucks
                .iter()
                .find(|t| &t.id == truck_id)
                .ok_or_else(|| BoardError::UnknownTruck(truck_id.clone()))?;
            let load_kg = self.load_of(truck_id) + order.weight_kg;
            if load_kg > truck.capacity_kg {
                return Err(BoardError::OverCapacity {
                    plate: truck.plate.clone(),
                    load_kg,
                    capacity_kg: truck.capacity_kg,
                });
            }
        }

        let order = &mut self.orders[index];
        match to {
            Lane::Truck(id) => {
                order.truck_id = Some(id.clone());
                order.status = OrderStatus::Planned;
            }
            Lane::Unassigned => {
                order.truck_id = None;
                order.status = OrderStatus::Open;
            }
        }

        Ok(Some(Move {
            order_id: order_id.to_string(),
            from,
            to: to.clone(),
        }))
    }
}
