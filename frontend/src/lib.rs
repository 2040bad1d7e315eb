//! FleetDesk 前端应用
//!
//! 采用"静态外壳 + 按路由加载页面片段"的架构：
//! - `web::route`: 路由表、别名与访问守卫（领域模型）
//! - `web::router`: 导航引擎（核心）
//! - `web::dom`: 路由端口的浏览器实现
//! - `auth`: 会话状态管理
//! - `components`: 页面模块与 UI 组件

#[macro_use]
mod log;

mod api;
mod auth;
mod components;
mod config;
mod error;
mod serde_helper;
mod web;

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::api::PlanningApi;
use crate::auth::{AuthContext, init_auth};
use crate::components::page_registry;
use crate::components::session_badge::SessionBadge;
use crate::config::{AppConfig, MetaConfig};
use crate::error::{AppError, AppResult};
use crate::web::dom::{self, BrowserHistory, BrowserShell, PartialLoader, install_listeners};
use crate::web::route::app_routes;
use crate::web::router::{Router, RouterPorts};

const SESSION_SLOT_ID: &str = "session-slot";

/// 应用入口：装配认证、路由器与浏览器端口
pub fn start() {
    if let Err(e) = boot() {
        log_error!("[App] Start-up failed: {}", e);
    }
}

fn boot() -> AppResult<()> {
    // 根响应式作用域在整个页面生命周期内存活
    let owner = Owner::new_root(None);
    owner.set();

    let window = dom::window()?;
    let document = dom::document()?;
    let config = AppConfig::new(&MetaConfig(document.clone()));

    // 1. 认证上下文
    let auth = AuthContext::new(PlanningApi::new(
        config.backend_url.as_str(),
        config.backend_key.as_str(),
    ));
    init_auth(&auth);
    // 首次挂载同时初始化 Leptos 的任务执行器，必须先于任何 Effect 与 spawn_local
    mount_session_badge(&document, auth)?;

    // 2. 路由器
    let table = app_routes(&config).map_err(|e| AppError::invalid_input(e.to_string()))?;
    let ports = RouterPorts {
        shell: Rc::new(BrowserShell::new(document, &config.content_id)?),
        history: Rc::new(BrowserHistory::new(window)),
        partials: Rc::new(PartialLoader),
        session: Rc::new(auth),
    };
    let router = Router::new(table, page_registry(auth), ports, &config);
    install_listeners(&router)?;

    // 3. 认证变化交给路由器处理（重定向或原地刷新可见性）
    let auth_router = router.clone();
    auth.on_change(move |_| {
        let router = auth_router.clone();
        spawn_local(async move {
            router.handle_auth_change().await;
        });
    });

    // 4. 首次导航
    spawn_local(async move {
        router.start().await;
    });

    std::mem::forget(owner);
    Ok(())
}

fn mount_session_badge(document: &Document, auth: AuthContext) -> AppResult<()> {
    let slot = match document.get_element_by_id(SESSION_SLOT_ID) {
        Some(slot) => slot,
        None => {
            log_warn!("[App] #{} not found; appending it to <body>.", SESSION_SLOT_ID);
            let slot = document.create_element("div")?;
            slot.set_id(SESSION_SLOT_ID);
            document
                .body()
                .ok_or_else(|| AppError::dom("document has no <body>"))?
                .append_child(&slot)?;
            slot
        }
    };
    let slot = slot
        .dyn_into::<HtmlElement>()
        .map_err(|_| AppError::dom(format!("#{} is not an HTML element", SESSION_SLOT_ID)))?;
    leptos::mount::mount_to(slot, move || view! { <SessionBadge auth=auth /> }).forget();
    Ok(())
}
