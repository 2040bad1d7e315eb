//! 认证模块
//!
//! 管理会话状态，与路由系统解耦。
//! 路由器通过 [`SessionSource`] 读取当前用户，通过 [`AuthContext::on_change`] 得到变化通知。

use fleetdesk_shared::{ROLE_ADMIN, Session, UserProfile};
use leptos::prelude::*;

use crate::api::PlanningApi;
use crate::error::{AppError, AppResult};
use crate::web::LocalStorage;
use crate::web::dom;
use crate::web::router::SessionSource;

const STORAGE_EMAIL_KEY: &str = "fleetdesk_last_email";

/// 认证状态
#[derive(Clone, Default)]
pub struct AuthState {
    /// 匿名 API 客户端（不带用户令牌）
    pub api: PlanningApi,
    /// 当前会话（仅内存）
    pub session: Option<Session>,
    /// 上次登录的邮箱（用于自动填充）
    pub last_email: String,
    /// 是否正在登录
    pub is_loading: bool,
}

impl AuthState {
    pub fn user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// 携带当前令牌的客户端
    pub fn client(&self) -> PlanningApi {
        match &self.session {
            Some(session) => self.api.with_token(&session.access_token),
            None => self.api.clone(),
        }
    }
}

/// 认证上下文
///
/// 包含读写信号，以值传递给各页面模块。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 认证状态（只读）
    pub state: ReadSignal<AuthState>,
    /// 设置认证状态（写入）
    pub set_state: WriteSignal<AuthState>,
}

impl AuthContext {
    pub fn new(api: PlanningApi) -> Self {
        let (state, set_state) = signal(AuthState {
            api,
            ..Default::default()
        });
        Self { state, set_state }
    }

    pub fn client(&self) -> PlanningApi {
        self.state.with_untracked(|s| s.client())
    }

    /// 当前用户的身份或角色变化时调用 `listener`
    ///
    /// 首次运行只记录初始值，不触发回调。
    pub fn on_change(&self, listener: impl Fn(Option<UserProfile>) + 'static) {
        let state = self.state;
        Effect::new(move |prev: Option<Option<UserProfile>>| {
            let user = state.with(|s| s.user().cloned());
            if let Some(prev) = prev
                && prev != user
            {
                listener(user.clone());
            }
            user
        });
    }
}

/// 初始化认证状态
///
/// 从 LocalStorage 加载上次的邮箱（方便用户），令牌从不落盘。
pub fn init_auth(ctx: &AuthContext) {
    ctx.set_state.update(|state| {
        state.is_loading = false;
        if let Some(email) = LocalStorage::get(STORAGE_EMAIL_KEY) {
            state.last_email = email;
        }
    });
}

/// 登录并保存会话 (仅内存)
pub async fn login(ctx: &AuthContext, email: String, password: String) -> AppResult<UserProfile> {
    let email = email.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::invalid_input("e-mail and password are required"));
    }

    let api = ctx.state.with_untracked(|s| s.api.clone());
    ctx.set_state.update(|s| s.is_loading = true);
    let result = api.sign_in(&email, &password).await;
    ctx.set_state.update(|s| s.is_loading = false);

    let session = result?;
    let user = session.user.clone();
    LocalStorage::set(STORAGE_EMAIL_KEY, &email);
    ctx.set_state.update(|state| {
        state.session = Some(session);
        state.last_email = email;
    });
    log_info!("[Auth] Signed in as {} ({})", user.email, user.role);
    Ok(user)
}

/// 注销并清除会话
///
/// 导航由路由器的认证变化监听处理。
pub fn logout(ctx: &AuthContext) {
    ctx.set_state.update(|state| {
        state.session = None;
    });
    log_info!("[Auth] Signed out");
}

/// 管理员创建新用户
pub async fn create_user(
    ctx: &AuthContext,
    email: String,
    password: String,
    role: String,
) -> AppResult<UserProfile> {
    let is_admin = ctx
        .state
        .with_untracked(|s| s.user().is_some_and(|u| u.role == ROLE_ADMIN));
    if !is_admin {
        return Err(AppError::invalid_input("only administrators can create users"));
    }
    let email = email.trim().to_string();
    let role = role.trim().to_lowercase();
    if email.is_empty() || password.is_empty() || role.is_empty() {
        return Err(AppError::invalid_input("e-mail, password and role are required"));
    }

    let profile = ctx.client().sign_up(&email, &password, &role).await?;
    log_info!("[Auth] Created user {} with role {}", profile.email, profile.role);
    Ok(profile)
}

impl SessionSource for AuthContext {
    fn current_user(&self) -> Option<UserProfile> {
        self.state.with_untracked(|s| s.user().cloned())
    }

    fn apply_role_visibility(&self) {
        dom::apply_role_visibility(self.current_user().as_ref());
    }
}

// =========================================================
// 可见性规则
// =========================================================

/// `data-roles="admin planner"`：空列表对所有人可见，否则需要匹配角色
pub fn roles_allow(roles: &str, user: Option<&UserProfile>) -> bool {
    let mut roles = roles
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|r| !r.is_empty())
        .peekable();
    if roles.peek().is_none() {
        return true;
    }
    match user {
        Some(user) => roles.any(|r| r.eq_ignore_ascii_case(&user.role)),
        None => false,
    }
}

/// `data-auth="signed-in" | "signed-out"`；其它取值不做限制
pub fn auth_marker_allows(marker: &str, user: Option<&UserProfile>) -> bool {
    match marker.trim().to_ascii_lowercase().as_str() {
        "signed-in" => user.is_some(),
        "signed-out" => user.is_none(),
        _ => true,
    }
}
