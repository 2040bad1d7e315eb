use crate::auth::AuthContext;
use crate::components::{Notice, NoticeBar};
use fleetdesk_shared::Order;
use fleetdesk_shared::geo::{Bounds, LatLng, Viewport};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 一个订单在地图上的投影
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMarker {
    pub reference: String,
    pub pickup: Option<(f64, f64)>,
    pub delivery: Option<(f64, f64)>,
}

/// 投影结果；`skipped` 为没有任何有效坐标的订单数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapLayout {
    pub markers: Vec<OrderMarker>,
    pub skipped: usize,
}

/// 以所有有效坐标的外接矩形为基准投影订单
pub fn layout_orders(orders: &[Order], viewport: &Viewport) -> MapLayout {
    let valid = |p: Option<LatLng>| p.filter(LatLng::is_valid);
    let points: Vec<LatLng> = orders
        .iter()
        .flat_map(|o| [valid(o.pickup_point()), valid(o.delivery_point())])
        .flatten()
        .collect();

    let Some(bounds) = Bounds::from_points(&points) else {
        return MapLayout {
            markers: Vec::new(),
            skipped: orders.len(),
        };
    };

    let mut layout = MapLayout::default();
    for order in orders {
        let pickup = valid(order.pickup_point()).map(|p| viewport.project(&bounds, &p));
        let delivery = valid(order.delivery_point()).map(|p| viewport.project(&bounds, &p));
        if pickup.is_none() && delivery.is_none() {
            layout.skipped += 1;
            continue;
        }
        layout.markers.push(OrderMarker {
            reference: order.reference.clone(),
            pickup,
            delivery,
        });
    }
    layout
}

#[component]
pub fn MapPage(auth: AuthContext) -> impl IntoView {
    let (orders, set_orders) = signal(Vec::<Order>::new());
    let (notice, set_notice) = signal(Notice::None);
    let viewport = Viewport::default();

    let api = auth.client();
    spawn_local(async move {
        match api.list_orders().await {
            Ok(data) => set_orders.set(data),
            Err(e) => {
                log_warn!("[Map] Loading orders failed: {}", e);
                set_notice.set(Some((format!("Loading orders failed: {}", e.message()), true)));
            }
        }
    });

    let layout = Memo::new(move |_| orders.with(|o| layout_orders(o, &viewport)));

    view! {
        <div class="space-y-4">
            <NoticeBar notice=notice set_notice=set_notice />
            <svg
                class="w-full bg-base-200 rounded-box"
                viewBox=format!("0 0 {} {}", viewport.width, viewport.height)
                role="img"
                aria-label="Order map"
            >
                {move || {
                    layout
                        .get()
                        .markers
                        .into_iter()
                        .map(|marker| {
                            let line = match (marker.pickup, marker.delivery) {
                                (Some((x1, y1)), Some((x2, y2))) => Some(view! {
                                    <line x1=x1 y1=y1 x2=x2 y2=y2 class="stroke-base-content/40" stroke-width="1.5" />
                                }),
                                _ => None,
                            };
                            view! {
                                <g class="order-marker" data-order=marker.reference.clone()>
                                    {line}
                                    {marker.pickup.map(|(x, y)| view! {
                                        <circle cx=x cy=y r="5" class="fill-primary" />
                                    })}
                                    {marker.delivery.map(|(x, y)| view! {
                                        <circle cx=x cy=y r="5" class="fill-secondary" />
                                    })}
                                </g>
                            }
                        })
                        .collect_view()
                }}
            </svg>
            <p class="text-sm text-base-content/60">
                {move || match layout.with(|l| l.skipped) {
                    0 => String::new(),
                    n => format!("{} order(s) without coordinates are not shown", n),
                }}
            </p>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fleetdesk_shared::OrderStatus;

    fn order(reference: &str, pickup: Option<(f64, f64)>, delivery: Option<(f64, f64)>) -> Order {
        Order {
            id: reference.to_lowercase(),
            reference: reference.to_string(),
            customer: "Acme".to_string(),
            pickup_address: "A".to_string(),
            delivery_address: "B".to_string(),
            pickup_lat: pickup.map(|p| p.0),
            pickup_lng: pickup.map(|p| p.1),
            delivery_lat: delivery.map(|p| p.0),
            delivery_lng: delivery.map(|p| p.1),
            pickup_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            weight_kg: 100,
            status: OrderStatus::Open,
            truck_id: None,
        }
    }

    #[test]
    fn test_orders_without_coordinates_are_skipped() {
        let orders = [
            order("TO-1", Some((52.0, 4.0)), Some((51.0, 5.0))),
            order("TO-2", None, None),
        ];
        let layout = layout_orders(&orders, &Viewport::default());
        assert_eq!(layout.markers.len(), 1);
        assert_eq!(layout.skipped, 1);
        assert_eq!(layout.markers[0].reference, "TO-1");
    }

    #[test]
    fn test_markers_fall_inside_viewport() {
        let vp = Viewport::default();
        let orders = [
            order("TO-1", Some((53.2, 6.5)), Some((51.4, 3.6))),
            order("TO-2", Some((52.1, 5.1)), None),
        ];
        let layout = layout_orders(&orders, &vp);
        for marker in &layout.markers {
            for (x, y) in marker.pickup.iter().chain(marker.delivery.iter()) {
                assert!(*x >= vp.padding - 1e-9 && *x <= vp.width - vp.padding + 1e-9);
                assert!(*y >= vp.padding - 1e-9 && *y <= vp.height - vp.padding + 1e-9);
            }
        }
        assert!(layout.markers[1].delivery.is_none());
    }

    #[test]
    fn test_invalid_coordinates_do_not_stretch_bounds() {
        let orders = [
            order("TO-1", Some((52.37, 4.89)), Some((95.0, 4.0))),
        ];
        let layout = layout_orders(&orders, &Viewport::default());
        assert_eq!(layout.markers[0].pickup, Some((400.0, 250.0)));
        assert!(layout.markers[0].delivery.is_none());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(layout_orders(&[], &Viewport::default()), MapLayout::default());
    }
}
