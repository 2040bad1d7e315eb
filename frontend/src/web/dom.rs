//! 浏览器端口实现
//!
//! 封装 web_sys 的 DOM、History 与 fetch，
//! 所有对 `document`/`window.history` 的直接操作都集中在此模块。

use async_trait::async_trait;
use fleetdesk_shared::UserProfile;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, HtmlElement, HtmlTemplateElement, MouseEvent, PopStateEvent, Window,
};

use super::HttpClient;
use super::route::{Location, RouteKey};
use super::router::{
    ContentShell, HistoryPort, HistoryState, NavigateOptions, PartialSource, Router,
};
use crate::auth::{auth_marker_allows, roles_allow};
use crate::error::{AppError, AppResult};
use crate::serde_helper;

/// 路由链接上的属性
pub const ROUTE_ATTR: &str = "data-route";
const ROUTE_LINK_SELECTOR: &str = "a[data-route]";
const ACTIVE_CLASS: &str = "active";

pub fn window() -> AppResult<Window> {
    web_sys::window().ok_or_else(|| AppError::dom("window is not available"))
}

pub fn document() -> AppResult<Document> {
    window()?
        .document()
        .ok_or_else(|| AppError::dom("document is not available"))
}

/// 查询全部匹配元素（忽略非元素节点）
pub fn select_all(scope: &Document, selector: &str) -> Vec<Element> {
    let Ok(nodes) = scope.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

// =========================================================
// 内容区域
// =========================================================

pub struct BrowserShell {
    document: Document,
    content: HtmlElement,
}

impl BrowserShell {
    pub fn new(document: Document, content_id: &str) -> AppResult<Self> {
        let content = document
            .get_element_by_id(content_id)
            .ok_or_else(|| AppError::dom(format!("content region #{} not found", content_id)))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| AppError::dom(format!("#{} is not an HTML element", content_id)))?;
        Ok(Self { document, content })
    }
}

impl ContentShell for BrowserShell {
    type Element = Element;

    fn set_busy(&self, busy: bool) {
        let _ = self
            .content
            .set_attribute("aria-busy", if busy { "true" } else { "false" });
    }

    fn mount_partial(&self, markup: &str) -> AppResult<Option<Element>> {
        // <template> 中解析的内容是惰性的：脚本不执行、图片不加载
        let template: HtmlTemplateElement = self
            .document
            .create_element("template")?
            .dyn_into()
            .map_err(|_| AppError::dom("<template> is not supported"))?;
        template.set_inner_html(markup);

        let children = template.content().children();
        let elements: Vec<Element> = (0..children.length())
            .filter_map(|i| children.item(i))
            .collect();

        self.content.set_inner_html("");
        for element in &elements {
            self.content.append_child(element)?;
        }
        Ok(elements.into_iter().next())
    }

    fn show_error(&self, markup: &str) {
        self.content.set_inner_html(markup);
    }

    fn set_title(&self, title: &str) {
        self.document.set_title(title);
    }

    fn mark_active_link(&self, route: &RouteKey) {
        for link in select_all(&self.document, ROUTE_LINK_SELECTOR) {
            let active = link
                .get_attribute(ROUTE_ATTR)
                .is_some_and(|r| r.eq_ignore_ascii_case(route.as_str()));
            let _ = link.class_list().toggle_with_force(ACTIVE_CLASS, active);
            let _ = if active {
                link.set_attribute("aria-current", "page")
            } else {
                link.remove_attribute("aria-current")
            };
        }
    }
}

// =========================================================
// History
// =========================================================

pub struct BrowserHistory {
    window: Window,
}

impl BrowserHistory {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn write(&self, state: &HistoryState, url: &str, replace: bool) {
        let Ok(history) = self.window.history() else {
            return;
        };
        let js_state = match serde_helper::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                log_warn!("[Router] History state could not be serialized: {}", e);
                JsValue::NULL
            }
        };
        let result = if replace {
            history.replace_state_with_url(&js_state, "", Some(url))
        } else {
            history.push_state_with_url(&js_state, "", Some(url))
        };
        if let Err(e) = result {
            log_warn!("[Router] History update for {} failed: {:?}", url, e);
        }
    }
}

impl HistoryPort for BrowserHistory {
    fn push(&self, state: &HistoryState, url: &str) {
        self.write(state, url, false);
    }

    fn replace(&self, state: &HistoryState, url: &str) {
        self.write(state, url, true);
    }

    fn location(&self) -> Location {
        let location = self.window.location();
        Location::new(
            location.pathname().unwrap_or_else(|_| "/".to_string()),
            location.search().unwrap_or_default(),
        )
    }
}

// =========================================================
// 页面片段加载
// =========================================================

/// 通过 fetch 加载页面片段（`cache: no-store`）
pub struct PartialLoader;

#[async_trait(?Send)]
impl PartialSource for PartialLoader {
    async fn load(&self, path: &str) -> AppResult<String> {
        let response = HttpClient::get(path).no_store().send().await?;
        if !response.ok() {
            return Err(AppError::template_load(response.status(), path));
        }
        Ok(response.text().await?)
    }
}

// =========================================================
// 角色可见性
// =========================================================

/// 根据当前用户切换 `[data-roles]` 与 `[data-auth]` 元素的 hidden 属性
pub fn apply_role_visibility(user: Option<&UserProfile>) {
    let Ok(document) = document() else {
        return;
    };
    for element in select_all(&document, "[data-roles]") {
        let roles = element.get_attribute("data-roles").unwrap_or_default();
        set_hidden(&element, !roles_allow(&roles, user));
    }
    for element in select_all(&document, "[data-auth]") {
        let marker = element.get_attribute("data-auth").unwrap_or_default();
        set_hidden(&element, !auth_marker_allows(&marker, user));
    }
}

fn set_hidden(element: &Element, hidden: bool) {
    let _ = element.toggle_attribute_with_force("hidden", hidden);
}

// =========================================================
// 事件监听
// =========================================================

/// 点击事件中决定是否拦截的部分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickInfo {
    pub button: i16,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
    pub default_prevented: bool,
}

impl ClickInfo {
    fn from_event(ev: &MouseEvent) -> Self {
        Self {
            button: ev.button(),
            ctrl: ev.ctrl_key(),
            meta: ev.meta_key(),
            shift: ev.shift_key(),
            alt: ev.alt_key(),
            default_prevented: ev.default_prevented(),
        }
    }

    /// 主键、无修饰键的点击才由路由器接管（修饰键留给"新标签页打开"等浏览器行为）
    pub fn is_plain_primary(&self) -> bool {
        self.button == 0
            && !self.ctrl
            && !self.meta
            && !self.shift
            && !self.alt
            && !self.default_prevented
    }
}

/// 安装链接拦截与 popstate 监听
///
/// 监听器在页面生命周期内一直存在，闭包被泄漏以保持存活。
pub fn install_listeners(router: &Router<Element>) -> AppResult<()> {
    let window = window()?;
    let document = document()?;

    let click_router = router.clone();
    let on_click = Closure::<dyn Fn(MouseEvent)>::new(move |ev: MouseEvent| {
        if !ClickInfo::from_event(&ev).is_plain_primary() {
            return;
        }
        let Some(route) = ev
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest(ROUTE_LINK_SELECTOR).ok().flatten())
            .and_then(|link| link.get_attribute(ROUTE_ATTR))
        else {
            return;
        };
        ev.prevent_default();
        let router = click_router.clone();
        spawn_local(async move {
            router.navigate(&route, NavigateOptions::default()).await;
        });
    });
    document.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    let popstate_router = router.clone();
    let on_popstate = Closure::<dyn Fn(PopStateEvent)>::new(move |ev: PopStateEvent| {
        let state = serde_helper::from_value::<HistoryState>(ev.state()).ok();
        let router = popstate_router.clone();
        spawn_local(async move {
            router.handle_popstate(state).await;
        });
    });
    window.add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref())?;
    on_popstate.forget();

    Ok(())
}
