mod form_state;

use crate::auth::AuthContext;
use crate::components::{Notice, NoticeBar};
use fleetdesk_shared::protocol::UpdateOrderRequest;
use fleetdesk_shared::{Order, OrderStatus, ROLE_ADMIN, ROLE_PLANNER};
use form_state::FormState;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 运输订单列表与新建表单
#[component]
pub fn OrdersPage(auth: AuthContext) -> impl IntoView {
    let (orders, set_orders) = signal(Vec::<Order>::new());
    let (loading_orders, set_loading_orders) = signal(true);
    let (notice, set_notice) = signal(Notice::None);
    let form = FormState::new();

    // 查看者只能浏览
    let can_edit = move || {
        auth.state.with(|s| {
            s.user()
                .is_some_and(|u| u.role == ROLE_ADMIN || u.role == ROLE_PLANNER)
        })
    };

    let load_orders = move || {
        let api = auth.client();
        set_loading_orders.set(true);
        spawn_local(async move {
            match api.list_orders().await {
                Ok(data) => set_orders.set(data),
                Err(e) => {
                    log_warn!("[Orders] Loading failed: {}", e);
                    set_notice.set(Some((format!("Loading orders failed: {}", e.message()), true)));
                }
            }
            set_loading_orders.set(false);
        });
    };

    // 初始加载
    load_orders();

    let handle_create = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let order = match form.draft().into_new_order() {
            Ok(order) => order,
            Err(msg) => {
                set_notice.set(Some((msg, true)));
                return;
            }
        };
        let api = auth.client();
        spawn_local(async move {
            match api.create_order(order).await {
                Ok(created) => {
                    set_notice.set(Some((format!("Order {} created", created.reference), false)));
                    set_orders.update(|list| {
                        list.push(created);
                        list.sort_by(|a, b| a.pickup_date.cmp(&b.pickup_date));
                    });
                    form.reset();
                }
                Err(e) => {
                    set_notice.set(Some((format!("Creating order failed: {}", e.message()), true)));
                }
            }
        });
    };

    let handle_status = move |id: String, status: OrderStatus| {
        let api = auth.client();
        spawn_local(async move {
            match api.update_order(UpdateOrderRequest::status(id, status)).await {
                Ok(updated) => set_orders.update(|list| replace_order(list, updated)),
                Err(e) => {
                    set_notice.set(Some((format!("Updating status failed: {}", e.message()), true)));
                    load_orders();
                }
            }
        });
    };

    let handle_delete = move |id: String| {
        let api = auth.client();
        spawn_local(async move {
            match api.delete_order(&id).await {
                Ok(()) => {
                    set_notice.set(Some(("Order deleted".to_string(), false)));
                    set_orders.update(|list| list.retain(|o| o.id != id));
                }
                Err(e) => {
                    set_notice.set(Some((format!("Deleting order failed: {}", e.message()), true)));
                }
            }
        });
    };

    let total_orders = move || orders.with(|o| o.len());

    view! {
        <div class="space-y-6">
            <NoticeBar notice=notice set_notice=set_notice />

            <div class="card bg-base-100 shadow-xl">
                <div class="card-body p-0">
                    <div class="flex items-center justify-between p-6 pb-2">
                        <h3 class="card-title">"Transport orders " <span class="badge">{total_orders}</span></h3>
                        <button
                            on:click=move |_| load_orders()
                            disabled=move || loading_orders.get()
                            class="btn btn-ghost btn-sm"
                        >
                            "Refresh"
                        </button>
                    </div>
                    <div class="overflow-x-auto w-full">
                        <table class="table table-zebra w-full">
                            <thead>
                                <tr>
                                    <th>"Reference"</th>
                                    <th>"Customer"</th>
                                    <th class="hidden md:table-cell">"Route"</th>
                                    <th>"Pickup"</th>
                                    <th>"Weight"</th>
                                    <th>"Status"</th>
                                    <th></th>
                                </tr>
                            </thead>
                            <tbody>
                                <Show when=move || total_orders() == 0>
                                    <tr>
                                        <td colspan="7" class="text-center py-8 text-base-content/50">
                                            {move || if loading_orders.get() { "Loading orders..." } else { "No orders yet." }}
                                        </td>
                                    </tr>
                                </Show>
                                <For
                                    each=move || orders.get()
                                    key=|order| (order.id.clone(), order.status)
                                    let:order
                                >
                                    {
                                        let status_id = order.id.clone();
                                        let delete_id = order.id.clone();
                                        let current = order.status;
                                        view! {
                                            <tr>
                                                <td class="font-mono">{order.reference.clone()}</td>
                                                <td>{order.customer.clone()}</td>
                                                <td class="hidden md:table-cell text-sm">
                                                    {format!("{} → {}", order.pickup_address, order.delivery_address)}
                                                </td>
                                                <td>{order.pickup_date.format("%Y-%m-%d").to_string()}</td>
                                                <td>{format!("{} kg", order.weight_kg)}</td>
                                                <td>
                                                    <select
                                                        class="select select-bordered select-sm"
                                                        disabled=move || !can_edit()
                                                        on:change=move |ev| {
                                                            if let Some(status) = OrderStatus::parse(&event_target_value(&ev)) {
                                                                handle_status(status_id.clone(), status);
                                                            }
                                                        }
                                                    >
                                                        {OrderStatus::ALL
                                                            .iter()
                                                            .map(|s| view! {
                                                                <option value=s.as_str() selected=*s == current>{s.label()}</option>
                                                            })
                                                            .collect_view()}
                                                    </select>
                                                </td>
                                                <td>
                                                    <Show when=can_edit>
                                                        {
                                                            let delete_id = delete_id.clone();
                                                            view! {
                                                                <button
                                                                    class="btn btn-ghost btn-xs text-error"
                                                                    on:click=move |_| handle_delete(delete_id.clone())
                                                                >
                                                                    "Delete"
                                                                </button>
                                                            }
                                                        }
                                                    </Show>
                                                </td>
                                            </tr>
                                        }
                                    }
                                </For>
                            </tbody>
                        </table>
                    </div>
                </div>
            </div>

            <Show when=can_edit>
                <div class="card bg-base-100 shadow-xl">
                    <form class="card-body grid md:grid-cols-2 gap-4" on:submit=handle_create>
                        <h3 class="card-title md:col-span-2">"New order"</h3>
                        <TextField label="Reference" value=form.reference />
                        <TextField label="Customer" value=form.customer />
                        <TextField label="Pickup address" value=form.pickup_address />
                        <TextField label="Delivery address" value=form.delivery_address />
                        <TextField label="Pickup latitude" value=form.pickup_lat required=false />
                        <TextField label="Pickup longitude" value=form.pickup_lng required=false />
                        <TextField label="Delivery latitude" value=form.delivery_lat required=false />
                        <TextField label="Delivery longitude" value=form.delivery_lng required=false />
                        <TextField label="Pickup date" value=form.pickup_date input_type="date" />
                        <TextField label="Weight (kg)" value=form.weight_kg input_type="number" />
                        <div class="md:col-span-2 flex justify-end">
                            <button class="btn btn-primary">"Create order"</button>
                        </div>
                    </form>
                </div>
            </Show>
        </div>
    }
}

#[component]
fn TextField(
    label: &'static str,
    value: RwSignal<String>,
    #[prop(default = "text")] input_type: &'static str,
    #[prop(default = true)] required: bool,
) -> impl IntoView {
    view! {
        <label class="form-control">
            <span class="label-text">{label}</span>
            <input
                type=input_type
                class="input input-bordered"
                required=required
                on:input=move |ev| value.set(event_target_value(&ev))
                prop:value=value
            />
        </label>
    }
}

/// 用服务器返回的行替换本地副本
fn replace_order(list: &mut [Order], updated: Order) {
    if let Some(slot) = list.iter_mut().find(|o| o.id == updated.id) {
        *slot = updated;
    }
}
