use crate::auth::AuthContext;
use crate::components::{Notice, NoticeBar};
use crate::error::AppResult;
use fleetdesk_shared::board::{Lane, LaneView, PlanningBoard};
use fleetdesk_shared::protocol::UpdateOrderRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::DragEvent;

const DRAG_FORMAT: &str = "text/plain";

/// 计划看板：未分配泳道 + 每辆卡车一条泳道
///
/// 移动先在本地模型上校验（载重、锁定），再通过 PATCH 持久化；
/// 持久化失败时重新加载整个看板。
#[component]
pub fn PlanningPage(auth: AuthContext) -> impl IntoView {
    let (board, set_board) = signal(Option::<PlanningBoard>::None);
    let (dragging, set_dragging) = signal(Option::<String>::None);
    let (notice, set_notice) = signal(Notice::None);

    let load_board = move || {
        let api = auth.client();
        spawn_local(async move {
            let result: AppResult<PlanningBoard> = async {
                let trucks = api.list_trucks().await?;
                let orders = api.list_orders().await?;
                Ok(PlanningBoard::new(trucks, orders))
            }
            .await;
            match result {
                Ok(loaded) => set_board.set(Some(loaded)),
                Err(e) => {
                    log_warn!("[Planning] Loading board failed: {}", e);
                    set_notice.set(Some((format!("Loading board failed: {}", e.message()), true)));
                }
            }
        });
    };

    // 初始加载
    load_board();

    let handle_drop = move |order_id: String, lane: Lane| {
        let mut outcome = None;
        set_board.update(|b| {
            if let Some(b) = b {
                outcome = Some(b.move_order(&order_id, &lane));
            }
        });

        match outcome {
            Some(Ok(Some(moved))) => {
                let api = auth.client();
                let update = UpdateOrderRequest::assignment(moved.order_id.clone(), moved.truck_id());
                spawn_local(async move {
                    if let Err(e) = api.update_order(update).await {
                        log_warn!("[Planning] Saving move of {} failed: {}", moved.order_id, e);
                        set_notice.set(Some((format!("Saving the move failed: {}", e.message()), true)));
                        load_board();
                    }
                });
            }
            Some(Err(e)) => set_notice.set(Some((e.to_string(), true))),
            // 同一泳道内拖放或看板尚未加载
            Some(Ok(None)) | None => {}
        }
    };

    let lanes = move || board.with(|b| b.as_ref().map(PlanningBoard::lanes).unwrap_or_default());

    view! {
        <div class="space-y-4">
            <NoticeBar notice=notice set_notice=set_notice />
            <div class="flex justify-end">
                <button class="btn btn-ghost btn-sm" on:click=move |_| load_board()>"Reload"</button>
            </div>
            <Show
                when=move || board.with(Option::is_some)
                fallback=|| view! { <p class="text-base-content/50">"Loading board..."</p> }
            >
                <div class="grid gap-4 md:grid-cols-3 xl:grid-cols-4">
                    {move || {
                        lanes()
                            .into_iter()
                            .map(|lane| view! {
                                <LaneColumn lane=lane set_dragging=set_dragging dragging=dragging on_drop=handle_drop />
                            })
                            .collect_view()
                    }}
                </div>
            </Show>
        </div>
    }
}

#[component]
fn LaneColumn<F>(
    lane: LaneView,
    dragging: ReadSignal<Option<String>>,
    set_dragging: WriteSignal<Option<String>>,
    on_drop: F,
) -> impl IntoView
where
    F: Fn(String, Lane) + Copy + Send + Sync + 'static,
{
    let token = lane.lane.token();
    let drop_token = token.clone();
    let load = match (lane.capacity_kg, lane.utilisation_percent()) {
        (Some(capacity), Some(percent)) => {
            format!("{} / {} kg ({}%)", lane.load_kg, capacity, percent)
        }
        _ => format!("{} kg", lane.load_kg),
    };
    let over_threshold = lane.utilisation_percent().is_some_and(|p| p >= 90);

    let on_lane_drop = move |ev: DragEvent| {
        ev.prevent_default();
        let order_id = ev
            .data_transfer()
            .and_then(|dt| dt.get_data(DRAG_FORMAT).ok())
            .filter(|id| !id.is_empty())
            .or_else(|| dragging.get_untracked());
        set_dragging.set(None);
        if let (Some(order_id), Some(target)) = (order_id, Lane::from_token(&drop_token)) {
            on_drop(order_id, target);
        }
    };

    view! {
        <section
            class="card bg-base-100 shadow lane"
            data-lane=token
            on:dragover=|ev: DragEvent| ev.prevent_default()
            on:drop=on_lane_drop
        >
            <div class="card-body p-4 gap-2">
                <header class="flex items-center justify-between">
                    <h3 class="font-semibold">{lane.title.clone()}</h3>
                    <span class=if over_threshold { "badge badge-warning" } else { "badge" }>{load}</span>
                </header>
                <ul class="space-y-2 min-h-16">
                    {lane
                        .orders
                        .into_iter()
                        .map(|order| {
                            let locked = order.status.is_locked();
                            let drag_id = order.id.clone();
                            view! {
                                <li
                                    class=if locked { "card card-compact bg-base-200 opacity-70" } else { "card card-compact bg-base-200 cursor-move" }
                                    draggable=if locked { "false" } else { "true" }
                                    data-order=order.id.clone()
                                    on:dragstart=move |ev: DragEvent| {
                                        if let Some(dt) = ev.data_transfer() {
                                            let _ = dt.set_data(DRAG_FORMAT, &drag_id);
                                        }
                                        set_dragging.set(Some(drag_id.clone()));
                                    }
                                    on:dragend=move |_| set_dragging.set(None)
                                >
                                    <div class="card-body p-2 text-sm">
                                        <span class="font-mono">{order.reference.clone()}</span>
                                        <span>{order.customer.clone()}</span>
                                        <span class="text-base-content/60">
                                            {format!("{} kg · {}", order.weight_kg, order.status.label())}
                                        </span>
                                    </div>
                                </li>
                            }
                        })
                        .collect_view()}
                </ul>
            </div>
        </section>
    }
}
