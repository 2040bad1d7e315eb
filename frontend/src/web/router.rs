//! 路由服务模块 - 核心引擎
//!
//! 实现了"监听 -> 验证 -> 处理 -> 加载"的导航流程：
//! 路由解析、访问守卫、History 同步、页面片段渲染以及页面模块生命周期。
//!
//! 所有浏览器能力都通过端口 trait 注入（[`ContentShell`]、[`HistoryPort`]、
//! [`PartialSource`]、[`SessionSource`]），浏览器实现见 `web::dom`。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use fleetdesk_shared::UserProfile;
use serde::{Deserialize, Serialize};

use super::route::{Access, Location, RouteEntry, RouteKey, RouteTable};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

// =========================================================
// 端口 (Ports)
// =========================================================

/// 路由内容区域
pub trait ContentShell {
    /// 交给页面模块的 DOM 作用域句柄
    type Element: Clone + 'static;

    /// 标记内容区域忙碌（aria-busy）
    fn set_busy(&self, busy: bool);

    /// 将标记解析到分离的片段中，用其顶层元素替换内容区域的子节点
    ///
    /// 返回第一个顶层元素；空片段或纯文本片段返回 `None`。
    fn mount_partial(&self, markup: &str) -> AppResult<Option<Self::Element>>;

    /// 直接写入错误卡片（尽力而为，不会失败）
    fn show_error(&self, markup: &str);

    fn set_title(&self, title: &str);

    /// 只保留一个激活的导航链接
    fn mark_active_link(&self, route: &RouteKey);
}

/// 浏览器 History
pub trait HistoryPort {
    fn push(&self, state: &HistoryState, url: &str);
    fn replace(&self, state: &HistoryState, url: &str);
    fn location(&self) -> Location;
}

/// 页面片段来源（禁用缓存）
#[async_trait(?Send)]
pub trait PartialSource {
    /// 非 2xx 响应返回 `TemplateLoad` 错误并携带状态码
    async fn load(&self, path: &str) -> AppResult<String>;
}

/// 认证协作方
pub trait SessionSource {
    fn current_user(&self) -> Option<UserProfile>;
    /// 在当前 DOM 上重新应用基于角色的可见性规则
    fn apply_role_visibility(&self);
}

// =========================================================
// 页面模块
// =========================================================

/// 路由元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: String,
    pub url_path: String,
    pub template: String,
}

impl From<&RouteEntry> for RouteMeta {
    fn from(entry: &RouteEntry) -> Self {
        Self {
            title: entry.title.clone(),
            url_path: entry.url_path.clone(),
            template: entry.template.clone(),
        }
    }
}

/// 传给 `PageModule::init` 的上下文
pub struct PageContext<E> {
    pub route: RouteKey,
    /// 片段的第一个顶层元素
    pub root: Option<E>,
    pub meta: RouteMeta,
}

/// 页面控制器
///
/// `destroy()` 必须可以在未 `init` 或已经销毁后安全调用。
#[async_trait(?Send)]
pub trait PageModule<E: 'static> {
    async fn init(&self, ctx: PageContext<E>) -> AppResult<()>;
    fn destroy(&self) -> AppResult<()>;
}

/// 路由键到页面模块的映射；未注册是合法状态
pub struct PageRegistry<E: 'static> {
    pages: HashMap<RouteKey, Rc<dyn PageModule<E>>>,
}

impl<E: 'static> Default for PageRegistry<E> {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }
}

impl<E: 'static> PageRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: &str, page: impl PageModule<E> + 'static) -> Self {
        self.pages.insert(RouteKey::new(key), Rc::new(page));
        self
    }

    pub fn get(&self, key: &RouteKey) -> Option<Rc<dyn PageModule<E>>> {
        self.pages.get(key).cloned()
    }
}

// =========================================================
// 导航参数与 History 状态
// =========================================================

/// 写入每个 History 条目的状态对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub route: RouteKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// 替换当前 History 条目而不是压入新条目
    pub replace: bool,
    /// 即使目标就是当前路由也重新渲染
    pub force: bool,
    /// 由浏览器前进/后退触发
    pub from_popstate: bool,
    /// 浏览器已经移动过，不压入新条目
    pub silent: bool,
}

impl NavigateOptions {
    /// 重定向、初始加载与重新加载
    pub fn redirect() -> Self {
        Self {
            replace: true,
            force: true,
            ..Self::default()
        }
    }

    /// 浏览器前进/后退回放
    pub fn popstate() -> Self {
        Self {
            replace: true,
            force: true,
            from_popstate: true,
            silent: true,
        }
    }

    fn replaces_entry(&self) -> bool {
        self.replace || self.silent
    }
}

// =========================================================
// 路由器
// =========================================================

/// 路由器需要的全部端口
pub struct RouterPorts<E: Clone + 'static> {
    pub shell: Rc<dyn ContentShell<Element = E>>,
    pub history: Rc<dyn HistoryPort>,
    pub partials: Rc<dyn PartialSource>,
    pub session: Rc<dyn SessionSource>,
}

struct RouterInner<E: Clone + 'static> {
    table: RouteTable,
    pages: PageRegistry<E>,
    ports: RouterPorts<E>,
    config: AppConfig,
    is_navigating: Cell<bool>,
    current_route: RefCell<Option<RouteKey>>,
    /// 当前激活的页面模块（至多一个）
    controller: RefCell<Option<Rc<dyn PageModule<E>>>>,
}

/// 路由器服务
///
/// 导航状态只由本模块修改；克隆共享同一份状态。
/// 单线程事件循环中使用，任何 RefCell 借用都不会跨越 `.await`。
pub struct Router<E: Clone + 'static> {
    inner: Rc<RouterInner<E>>,
}

impl<E: Clone + 'static> Clone for Router<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// 导航结束时（无论成功失败）复位导航标志
struct NavigatingGuard<'a>(&'a Cell<bool>);

impl Drop for NavigatingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 渲染结束时（无论成功失败）清除忙碌标记
struct BusyGuard<'a, E: Clone + 'static>(&'a dyn ContentShell<Element = E>);

impl<E: Clone + 'static> Drop for BusyGuard<'_, E> {
    fn drop(&mut self) {
        self.0.set_busy(false);
    }
}

impl<E: Clone + 'static> Router<E> {
    pub fn new(
        table: RouteTable,
        pages: PageRegistry<E>,
        ports: RouterPorts<E>,
        config: &AppConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                table,
                pages,
                ports,
                config: config.clone(),
                is_navigating: Cell::new(false),
                current_route: RefCell::new(None),
                controller: RefCell::new(None),
            }),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.inner.table
    }

    pub fn current_route(&self) -> Option<RouteKey> {
        self.inner.current_route.borrow().clone()
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.is_navigating.get()
    }

    pub fn has_active_page(&self) -> bool {
        self.inner.controller.borrow().is_some()
    }

    /// 首次加载：按当前地址导航并替换 History 条目
    pub async fn start(&self) {
        let location = self.inner.ports.history.location();
        let target = self.inner.table.route_from_location(&location);
        self.navigate(target.as_str(), NavigateOptions::redirect()).await;
    }

    /// 强制重新渲染当前路由
    pub async fn reload(&self) {
        let target = self
            .current_route()
            .unwrap_or_else(|| self.inner.table.default_route().clone());
        self.navigate(target.as_str(), NavigateOptions::redirect()).await;
    }

    /// **核心方法：导航与守卫**
    ///
    /// 流程：规范化 -> 守卫(重定向) -> 同路由跳过 -> History -> 渲染
    ///
    /// 已有导航进行中时，新的调用被静默丢弃（不排队）。
    pub async fn navigate(&self, token: &str, options: NavigateOptions) {
        let inner = &self.inner;
        if inner.is_navigating.get() {
            log_info!(
                "[Router] Navigation to '{}' dropped: another navigation is in flight.",
                token
            );
            return;
        }

        let Some((target, options)) = self.resolve_target(token, options) else {
            return;
        };

        if !options.force
            && !options.from_popstate
            && inner.current_route.borrow().as_ref() == Some(&target)
        {
            return;
        }

        inner.is_navigating.set(true);
        let _navigating = NavigatingGuard(&inner.is_navigating);

        self.update_history(&target, options);
        self.render_route(&target).await;
    }

    /// 浏览器前进/后退
    ///
    /// 保存的状态指向未知路由时，不信任它，改为从当前 URL 重新解析。
    pub async fn handle_popstate(&self, state: Option<HistoryState>) {
        let table = &self.inner.table;
        let target = match state {
            Some(state) if table.contains(state.route.as_str()) => state.route,
            _ => table.route_from_location(&self.inner.ports.history.location()),
        };
        self.navigate(target.as_str(), NavigateOptions::popstate()).await;
    }

    /// 认证状态变化
    ///
    /// 当前路由不再允许访问时重定向（已登录用户停留在登录页同样由守卫规则处理），
    /// 否则只在原地重新应用角色可见性，不重新渲染。
    pub async fn handle_auth_change(&self) {
        let Some(current) = self.current_route() else {
            return;
        };
        let user = self.inner.ports.session.current_user();

        match self.inner.table.check_access(&current, user.as_ref()) {
            Access::Redirect(target) => {
                log_info!(
                    "[Router] Auth state changed: '{}' no longer accessible, redirecting to '{}'.",
                    current,
                    target
                );
                self.navigate(target.as_str(), NavigateOptions::redirect()).await;
            }
            Access::Allowed => self.inner.ports.session.apply_role_visibility(),
        }
    }

    // =========================================================
    // 内部流程
    // =========================================================

    /// 规范化并沿重定向链找到最终目标
    ///
    /// 重定向目标与当前候选相同时返回 None（避免死循环）。
    fn resolve_target(
        &self,
        token: &str,
        options: NavigateOptions,
    ) -> Option<(RouteKey, NavigateOptions)> {
        let table = &self.inner.table;
        let user = self.inner.ports.session.current_user();
        let mut candidate = table.normalize(token);
        let mut options = options;

        for _ in 0..=table.len() {
            match table.check_access(&candidate, user.as_ref()) {
                Access::Allowed => return Some((candidate, options)),
                Access::Redirect(next) if next == candidate => {
                    log_warn!(
                        "[Router] Access to '{}' denied and it redirects to itself; ignoring.",
                        candidate
                    );
                    return None;
                }
                Access::Redirect(next) => {
                    log_info!(
                        "[Router] Access to '{}' denied. Redirecting to '{}'.",
                        candidate,
                        next
                    );
                    candidate = next;
                    options = NavigateOptions::redirect();
                }
            }
        }

        log_warn!("[Router] Redirect loop while resolving '{}'.", token);
        None
    }

    fn update_history(&self, target: &RouteKey, options: NavigateOptions) {
        let Some(entry) = self.inner.table.get(target) else {
            return;
        };
        let state = HistoryState {
            route: target.clone(),
        };
        let history = &self.inner.ports.history;
        if options.replaces_entry() {
            history.replace(&state, &entry.url_path);
        } else {
            history.push(&state, &entry.url_path);
        }
    }

    async fn render_route(&self, key: &RouteKey) {
        self.teardown_active_page();

        let shell = self.inner.ports.shell.as_ref();
        shell.set_busy(true);
        let _busy = BusyGuard(shell);

        if let Err(err) = self.render_into_shell(key).await {
            let err = err.in_op_with("router.render", key.as_str());
            log_error!("[Router] {}", err);
            shell.show_error(&error_card(&err));
            shell.set_title(&self.inner.config.error_title());
            *self.inner.current_route.borrow_mut() = Some(key.clone());
            self.inner.controller.borrow_mut().take();
        }
    }

    async fn render_into_shell(&self, key: &RouteKey) -> AppResult<()> {
        let inner = &self.inner;
        let entry = inner
            .table
            .get(key)
            .ok_or_else(|| AppError::unknown_route(key.as_str()))?
            .clone();

        let markup = inner
            .ports
            .partials
            .load(&entry.template)
            .await
            .map_err(|e| e.in_op_with("partials.load", entry.template.as_str()))?;

        let shell = &inner.ports.shell;
        let root = shell.mount_partial(&markup)?;
        shell.set_title(&inner.config.page_title(&entry.title));
        shell.mark_active_link(key);
        inner.ports.session.apply_role_visibility();
        *inner.current_route.borrow_mut() = Some(key.clone());

        let Some(page) = inner.pages.get(key) else {
            inner.controller.borrow_mut().take();
            return Ok(());
        };

        *inner.controller.borrow_mut() = Some(Rc::clone(&page));
        let ctx = PageContext {
            route: key.clone(),
            root,
            meta: RouteMeta::from(&entry),
        };
        if let Err(err) = page.init(ctx).await {
            // 初始化到一半的页面可能已挂载监听，先释放
            if let Err(teardown) = page.destroy() {
                log_warn!("[Router] Cleanup after failed init of '{}': {}", key, teardown);
            }
            return Err(err.in_op_with("page.init", key.as_str()));
        }
        Ok(())
    }

    /// 销毁当前页面模块；失败只记录，从不阻塞导航
    fn teardown_active_page(&self) {
        let previous = self.inner.controller.borrow_mut().take();
        if let Some(page) = previous {
            if let Err(err) = page.destroy() {
                let err = AppError::page_teardown("page destroy() failed")
                    .with_source(err)
                    .in_op("router.teardown");
                log_error!("[Router] {}", err);
            }
        }
    }
}

// =========================================================
// 错误卡片
// =========================================================

/// 转义 HTML 特殊字符
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 渲染失败时写入内容区域的卡片
pub fn error_card(err: &AppError) -> String {
    format!(
        concat!(
            r#"<section class="card error-card" role="alert">"#,
            r#"<h2>This page could not be loaded</h2>"#,
            r#"<p class="error-message">{}</p>"#,
            r#"</section>"#
        ),
        escape_html(&err.to_string())
    )
}

#[cfg(test)]
mod tests;
