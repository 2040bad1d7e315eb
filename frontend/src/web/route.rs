//! 路由定义模块 - 领域模型
//!
//! 这是纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了路由表、路径别名、路由解析以及访问控制规则。

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display};

use fleetdesk_shared::{ROLE_ADMIN, ROLE_PLANNER, UserProfile};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

// =========================================================
// 路由键与路由条目
// =========================================================

/// 规范化（小写）的路由标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteKey(String);

impl RouteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 路由表中的一条路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub key: RouteKey,
    /// 页面片段的相对路径
    pub template: String,
    pub title: String,
    /// 对外公开的 URL 路径，写入 History
    pub url_path: String,
    pub require_auth: bool,
    /// 允许访问的角色；None 或空集合表示不限角色
    pub roles: Option<BTreeSet<String>>,
}

impl RouteEntry {
    pub fn new(
        key: &str,
        template: impl Into<String>,
        title: impl Into<String>,
        url_path: impl Into<String>,
    ) -> Self {
        Self {
            key: RouteKey::new(key),
            template: template.into(),
            title: title.into(),
            url_path: url_path.into(),
            require_auth: false,
            roles: None,
        }
    }

    pub fn require_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    fn restricted_roles(&self) -> Option<&BTreeSet<String>> {
        self.roles.as_ref().filter(|r| !r.is_empty())
    }
}

/// 路由表构建错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    /// 路由键重复
    DuplicateKey(String),
    /// 路由键不是小写
    NonCanonicalKey(String),
    /// 默认路由或登录路由不在表中
    MissingRoute(String),
    /// 别名指向不存在的路由
    DanglingAlias { alias: String, key: String },
}

impl Display for RouteTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTableError::DuplicateKey(key) => write!(f, "duplicate route key '{}'", key),
            RouteTableError::NonCanonicalKey(key) => {
                write!(f, "route key '{}' must be lowercase", key)
            }
            RouteTableError::MissingRoute(key) => write!(f, "route '{}' is not defined", key),
            RouteTableError::DanglingAlias { alias, key } => {
                write!(f, "alias '{}' points to unknown route '{}'", alias, key)
            }
        }
    }
}

impl std::error::Error for RouteTableError {}

// =========================================================
// 浏览器地址（纯数据）
// =========================================================

/// 当前地址的路径与查询串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// 可带或不带前导 `?`
    pub query: String,
}

impl Location {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    /// 读取查询参数（原样返回，不做解码）
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// 路径的最后一段；`/` 结尾时为空串
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

// =========================================================
// 访问控制结果
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// 拒绝访问，并给出重定向目标
    Redirect(RouteKey),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed)
    }
}

// =========================================================
// 路由表
// =========================================================

/// 路由表：启动时构建，之后只读
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    index: HashMap<RouteKey, usize>,
    aliases: HashMap<String, RouteKey>,
    default_key: RouteKey,
    login_key: RouteKey,
}

/// 路由表构建器
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
    aliases: Vec<(String, String)>,
    default_key: String,
    login_key: String,
}

impl RouteTableBuilder {
    pub fn route(mut self, entry: RouteEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// 登记公开路径别名（区分大小写）
    pub fn alias(mut self, path: &str, key: &str) -> Self {
        self.aliases.push((path.to_string(), key.to_string()));
        self
    }

    pub fn build(self) -> Result<RouteTable, RouteTableError> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            let key = entry.key.as_str();
            if key != key.to_lowercase() {
                return Err(RouteTableError::NonCanonicalKey(key.to_string()));
            }
            if index.insert(entry.key.clone(), i).is_some() {
                return Err(RouteTableError::DuplicateKey(key.to_string()));
            }
        }

        for required in [&self.default_key, &self.login_key] {
            if !index.contains_key(&RouteKey::new(required.as_str())) {
                return Err(RouteTableError::MissingRoute(required.clone()));
            }
        }

        let mut aliases = HashMap::with_capacity(self.aliases.len());
        for (alias, key) in self.aliases {
            let key = RouteKey::new(key);
            if !index.contains_key(&key) {
                return Err(RouteTableError::DanglingAlias {
                    alias,
                    key: key.0,
                });
            }
            aliases.insert(alias, key);
        }

        Ok(RouteTable {
            entries: self.entries,
            index,
            aliases,
            default_key: RouteKey::new(self.default_key),
            login_key: RouteKey::new(self.login_key),
        })
    }
}

impl RouteTable {
    pub fn builder(default_key: &str, login_key: &str) -> RouteTableBuilder {
        RouteTableBuilder {
            entries: Vec::new(),
            aliases: Vec::new(),
            default_key: default_key.to_string(),
            login_key: login_key.to_string(),
        }
    }

    pub fn get(&self, key: &RouteKey) -> Option<&RouteEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// 精确匹配（区分大小写）
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&RouteKey::new(key))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_route(&self) -> &RouteKey {
        &self.default_key
    }

    pub fn login_route(&self) -> &RouteKey {
        &self.login_key
    }

    /// 别名查找，区分大小写
    pub fn alias(&self, path: &str) -> Option<&RouteKey> {
        self.aliases.get(path)
    }

    /// 将任意路由标记规范化为有效路由键
    ///
    /// 只做小写化（不去除空白）；未知标记一律回退到默认路由，从不报错。
    pub fn normalize(&self, token: &str) -> RouteKey {
        let candidate = RouteKey::new(token.to_lowercase());
        if self.index.contains_key(&candidate) {
            candidate
        } else {
            self.default_key.clone()
        }
    }

    /// 从当前地址解析路由
    ///
    /// 1. `?route=<key>` 命名了已知路由时原样使用
    /// 2. 否则取路径最后一段，转小写后查别名表，再规范化
    pub fn route_from_location(&self, location: &Location) -> RouteKey {
        if let Some(route) = location.query_param("route") {
            if self.contains(route) {
                return RouteKey::new(route);
            }
        }

        let segment = location.last_segment().to_lowercase();
        match self.alias(&segment) {
            Some(key) => self.normalize(key.as_str()),
            None => self.normalize(&segment),
        }
    }

    /// **核心守卫逻辑**
    ///
    /// 规则按顺序匹配，先命中者生效：
    /// 1. 需要认证且无用户 → 登录页
    /// 2. 限定角色且（无用户 → 登录页 | 角色不符 → 默认路由）
    /// 3. 登录页且已有用户 → 默认路由
    /// 4. 其他情况放行
    pub fn check_access(&self, key: &RouteKey, user: Option<&UserProfile>) -> Access {
        let Some(entry) = self.get(key) else {
            return Access::Redirect(self.default_key.clone());
        };

        if entry.require_auth && user.is_none() {
            return Access::Redirect(self.login_key.clone());
        }

        if let Some(roles) = entry.restricted_roles() {
            match user {
                None => return Access::Redirect(self.login_key.clone()),
                Some(u) if !roles.contains(&u.role) => {
                    return Access::Redirect(self.default_key.clone());
                }
                Some(_) => {}
            }
        }

        if entry.key == self.login_key && user.is_some() {
            return Access::Redirect(self.default_key.clone());
        }

        Access::Allowed
    }
}

// =========================================================
// 应用路由表
// =========================================================

pub const ROUTE_START: &str = "start";
pub const ROUTE_LOGIN: &str = "login";
pub const ROUTE_CREATE_USER: &str = "create-user";
pub const ROUTE_ORDERS: &str = "orders";
pub const ROUTE_PLANNING: &str = "planning";
pub const ROUTE_MAP: &str = "map";

/// 构建 FleetDesk 的路由表
pub fn app_routes(config: &AppConfig) -> Result<RouteTable, RouteTableError> {
    let entry = |key: &str, title: &str| {
        RouteEntry::new(key, config.partial_path(key), title, format!("/{}", key))
    };

    RouteTable::builder(ROUTE_START, ROUTE_LOGIN)
        .route(entry(ROUTE_START, "Overview").require_auth())
        .route(entry(ROUTE_LOGIN, "Sign in"))
        .route(
            entry(ROUTE_CREATE_USER, "Create user")
                .require_auth()
                .roles(&[ROLE_ADMIN]),
        )
        .route(entry(ROUTE_ORDERS, "Transport orders").require_auth())
        .route(
            entry(ROUTE_PLANNING, "Planning board")
                .require_auth()
                .roles(&[ROLE_ADMIN, ROLE_PLANNER]),
        )
        .route(entry(ROUTE_MAP, "Map").require_auth())
        // 旧版多页站点的文件名
        .alias("", ROUTE_START)
        .alias("index.html", ROUTE_START)
        .alias("start", ROUTE_START)
        .alias("start.html", ROUTE_START)
        .alias("login", ROUTE_LOGIN)
        .alias("login.html", ROUTE_LOGIN)
        .alias("create-user", ROUTE_CREATE_USER)
        .alias("create-user.html", ROUTE_CREATE_USER)
        .alias("gebruiker.html", ROUTE_CREATE_USER)
        .alias("orders", ROUTE_ORDERS)
        .alias("orders.html", ROUTE_ORDERS)
        .alias("orders-overzicht.html", ROUTE_ORDERS)
        .alias("planning", ROUTE_PLANNING)
        .alias("planning.html", ROUTE_PLANNING)
        .alias("vloot.html", ROUTE_PLANNING)
        .alias("map", ROUTE_MAP)
        .alias("map.html", ROUTE_MAP)
        .alias("kaart.html", ROUTE_MAP)
        .build()
}
