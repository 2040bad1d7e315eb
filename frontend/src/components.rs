//! UI 组件层
//!
//! 每个带交互的路由对应一个页面模块：路由器加载页面片段后调用 `init`，
//! 页面模块把 Leptos 视图挂载到片段的 `[data-slot]`（或片段根元素）中；
//! 离开路由时 `destroy` 释放视图及其响应式作用域。

pub mod create_user;
pub mod login;
pub mod map;
pub mod orders;
pub mod planning;
pub mod session_badge;

use std::any::Any;
use std::cell::RefCell;

use async_trait::async_trait;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::web::route::{ROUTE_CREATE_USER, ROUTE_LOGIN, ROUTE_MAP, ROUTE_ORDERS, ROUTE_PLANNING};
use crate::web::router::{PageContext, PageModule, PageRegistry};
use create_user::CreateUserPage;
use login::LoginPage;
use map::MapPage;
use orders::OrdersPage;
use planning::PlanningPage;

const SLOT_SELECTOR: &str = "[data-slot]";

/// 已挂载视图的句柄，释放即卸载
#[derive(Default)]
pub struct ViewMount {
    handle: RefCell<Option<Box<dyn Any>>>,
}

impl ViewMount {
    pub fn mount(
        &self,
        root: Option<Element>,
        view: impl FnOnce() -> AnyView + 'static,
    ) -> AppResult<()> {
        let root = root.ok_or_else(|| AppError::dom("page partial has no root element"))?;
        let slot = root.query_selector(SLOT_SELECTOR)?.unwrap_or(root);
        let parent = slot
            .dyn_into::<HtmlElement>()
            .map_err(|_| AppError::dom("page slot is not an HTML element"))?;

        // 先卸载旧视图，防止重复 init 时叠加
        self.unmount();
        let handle = leptos::mount::mount_to(parent, view);
        self.handle.replace(Some(Box::new(handle)));
        Ok(())
    }

    pub fn unmount(&self) {
        drop(self.handle.take());
    }
}

/// 以单个组件为内容的页面模块
pub struct ComponentPage {
    auth: AuthContext,
    render: fn(AuthContext) -> AnyView,
    mount: ViewMount,
}

impl ComponentPage {
    pub fn new(auth: AuthContext, render: fn(AuthContext) -> AnyView) -> Self {
        Self {
            auth,
            render,
            mount: ViewMount::default(),
        }
    }
}

#[async_trait(?Send)]
impl PageModule<Element> for ComponentPage {
    async fn init(&self, ctx: PageContext<Element>) -> AppResult<()> {
        let auth = self.auth;
        let render = self.render;
        self.mount
            .mount(ctx.root, move || render(auth))
            .map_err(|e| e.in_op_with("view.mount", ctx.route.to_string()))
    }

    fn destroy(&self) -> AppResult<()> {
        self.mount.unmount();
        Ok(())
    }
}

/// 注册所有页面模块；`start` 没有模块
pub fn page_registry(auth: AuthContext) -> PageRegistry<Element> {
    PageRegistry::new()
        .register(
            ROUTE_LOGIN,
            ComponentPage::new(auth, |auth| view! { <LoginPage auth=auth /> }.into_any()),
        )
        .register(
            ROUTE_CREATE_USER,
            ComponentPage::new(auth, |auth| {
                view! { <CreateUserPage auth=auth /> }.into_any()
            }),
        )
        .register(
            ROUTE_ORDERS,
            ComponentPage::new(auth, |auth| view! { <OrdersPage auth=auth /> }.into_any()),
        )
        .register(
            ROUTE_PLANNING,
            ComponentPage::new(auth, |auth| {
                view! { <PlanningPage auth=auth /> }.into_any()
            }),
        )
        .register(
            ROUTE_MAP,
            ComponentPage::new(auth, |auth| view! { <MapPage auth=auth /> }.into_any()),
        )
}

/// 通知条：(消息, 是否出错)
pub type Notice = Option<(String, bool)>;

/// 页面顶部的提示条，3 秒后自动消失
#[component]
pub fn NoticeBar(notice: ReadSignal<Notice>, set_notice: WriteSignal<Notice>) -> impl IntoView {
    Effect::new(move |_| {
        if notice.get().is_some() {
            set_timeout(
                move || set_notice.set(None),
                std::time::Duration::from_secs(3),
            );
        }
    });

    view! {
        <Show when=move || notice.get().is_some()>
            <div
                role="alert"
                class=move || {
                    let is_err = notice.get().is_some_and(|(_, is_err)| is_err);
                    if is_err { "alert alert-error text-sm py-2" } else { "alert alert-success text-sm py-2" }
                }
            >
                <span>{move || notice.get().map(|(msg, _)| msg).unwrap_or_default()}</span>
            </div>
        </Show>
    }
}
