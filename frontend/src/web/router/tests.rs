use super::*;
use crate::web::route::{
    ROUTE_LOGIN, ROUTE_MAP, ROUTE_ORDERS, ROUTE_PLANNING, ROUTE_START, app_routes,
};
use std::collections::HashSet;

// =========================================================
// Shared Mock Components
// =========================================================

struct TestContext {
    /// Operation log to verify calling order
    log: RefCell<Vec<String>>,
    user: RefCell<Option<UserProfile>>,
    location: RefCell<Location>,
    /// Partial paths answered with an HTTP error status
    missing_partials: RefCell<HashMap<String, u16>>,
    /// Yield once inside every partial load (lets a second navigation start)
    slow_partials: Cell<bool>,
    busy: Cell<bool>,
    content: RefCell<String>,
    title: RefCell<String>,
    active_link: RefCell<Option<String>>,
    fail_destroy: RefCell<HashSet<String>>,
    fail_init: RefCell<HashSet<String>>,
}

impl TestContext {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            log: RefCell::new(Vec::new()),
            user: RefCell::new(None),
            location: RefCell::new(Location::new("/", "")),
            missing_partials: RefCell::new(HashMap::new()),
            slow_partials: Cell::new(false),
            busy: Cell::new(false),
            content: RefCell::new(String::new()),
            title: RefCell::new(String::new()),
            active_link: RefCell::new(None),
            fail_destroy: RefCell::new(HashSet::new()),
            fail_init: RefCell::new(HashSet::new()),
        })
    }

    fn signed_in(self: &Rc<Self>, role: &str) -> Rc<Self> {
        *self.user.borrow_mut() = Some(UserProfile {
            id: "u1".to_string(),
            email: "user@example.com".to_string(),
            role: role.to_string(),
        });
        Rc::clone(self)
    }

    fn push_log(&self, msg: String) {
        self.log.borrow_mut().push(msg);
    }

    fn log_entries(&self, prefix: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|l| l.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

struct TestPorts {
    ctx: Rc<TestContext>,
}

impl ContentShell for TestPorts {
    type Element = String;

    fn set_busy(&self, busy: bool) {
        self.ctx.push_log(format!("shell:busy:{}", busy));
        self.ctx.busy.set(busy);
    }

    fn mount_partial(&self, markup: &str) -> AppResult<Option<String>> {
        *self.ctx.content.borrow_mut() = markup.to_string();
        // 根元素句柄：第一个标签名
        let root = markup
            .trim_start()
            .strip_prefix('<')
            .and_then(|rest| rest.split(|c: char| c.is_whitespace() || c == '>').next())
            .map(str::to_string);
        Ok(root)
    }

    fn show_error(&self, markup: &str) {
        self.ctx.push_log("shell:error".to_string());
        *self.ctx.content.borrow_mut() = markup.to_string();
    }

    fn set_title(&self, title: &str) {
        *self.ctx.title.borrow_mut() = title.to_string();
    }

    fn mark_active_link(&self, route: &RouteKey) {
        *self.ctx.active_link.borrow_mut() = Some(route.to_string());
    }
}

impl HistoryPort for TestPorts {
    fn push(&self, state: &HistoryState, url: &str) {
        self.ctx.push_log(format!("history:push:{}:{}", state.route, url));
    }

    fn replace(&self, state: &HistoryState, url: &str) {
        self.ctx.push_log(format!("history:replace:{}:{}", state.route, url));
    }

    fn location(&self) -> Location {
        self.ctx.location.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PartialSource for TestPorts {
    async fn load(&self, path: &str) -> AppResult<String> {
        self.ctx.push_log(format!("partial:load:{}", path));
        if self.ctx.slow_partials.get() {
            tokio::task::yield_now().await;
        }
        if let Some(status) = self.ctx.missing_partials.borrow().get(path) {
            return Err(AppError::template_load(*status, path));
        }
        Ok(format!("<section data-page=\"{}\"><h1>{}</h1></section>", path, path))
    }
}

impl SessionSource for TestPorts {
    fn current_user(&self) -> Option<UserProfile> {
        self.ctx.user.borrow().clone()
    }

    fn apply_role_visibility(&self) {
        self.ctx.push_log("session:roles".to_string());
    }
}

struct TestPage {
    name: &'static str,
    ctx: Rc<TestContext>,
}

#[async_trait(?Send)]
impl PageModule<String> for TestPage {
    async fn init(&self, ctx: PageContext<String>) -> AppResult<()> {
        self.ctx.push_log(format!(
            "page:init:{}:{}:{}",
            self.name,
            ctx.root.unwrap_or_default(),
            ctx.meta.title
        ));
        if self.ctx.fail_init.borrow().contains(self.name) {
            return Err(AppError::network("orders <unavailable>"));
        }
        Ok(())
    }

    fn destroy(&self) -> AppResult<()> {
        self.ctx.push_log(format!("page:destroy:{}", self.name));
        if self.ctx.fail_destroy.borrow().contains(self.name) {
            return Err(AppError::dom("listener already detached"));
        }
        Ok(())
    }
}

fn create_router(ctx: &Rc<TestContext>) -> Router<String> {
    create_router_with_config(ctx, &AppConfig::default())
}

fn create_router_with_config(ctx: &Rc<TestContext>, config: &AppConfig) -> Router<String> {
    let ports = Rc::new(TestPorts {
        ctx: Rc::clone(ctx),
    });
    let pages = PageRegistry::new()
        .register(
            ROUTE_ORDERS,
            TestPage {
                name: ROUTE_ORDERS,
                ctx: Rc::clone(ctx),
            },
        )
        .register(
            ROUTE_PLANNING,
            TestPage {
                name: ROUTE_PLANNING,
                ctx: Rc::clone(ctx),
            },
        )
        .register(
            ROUTE_MAP,
            TestPage {
                name: ROUTE_MAP,
                ctx: Rc::clone(ctx),
            },
        );
    Router::new(
        app_routes(config).unwrap(),
        pages,
        RouterPorts {
            shell: ports.clone(),
            history: ports.clone(),
            partials: ports.clone(),
            session: ports,
        },
        config,
    )
}

fn key(k: &str) -> RouteKey {
    RouteKey::new(k)
}

// =========================================================
// 首次加载与基础导航
// =========================================================

#[tokio::test]
async fn test_start_resolves_legacy_path_and_replaces_entry() {
    let ctx = TestContext::new().signed_in("planner");
    *ctx.location.borrow_mut() = Location::new("/VLOOT.html", "");
    let router = create_router(&ctx);

    router.start().await;

    assert_eq!(router.current_route(), Some(key(ROUTE_PLANNING)));
    assert_eq!(
        ctx.log_entries("history:"),
        vec!["history:replace:planning:/planning"]
    );
    assert_eq!(*ctx.title.borrow(), "Planning board – FleetDesk");
    assert_eq!(ctx.active_link.borrow().as_deref(), Some(ROUTE_PLANNING));
    assert_eq!(
        ctx.log_entries("page:"),
        vec!["page:init:planning:section:Planning board"]
    );
    assert!(router.has_active_page());
    assert!(!router.is_navigating());
}

#[tokio::test]
async fn test_render_steps_run_in_order() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);

    router.navigate("orders", NavigateOptions::default()).await;

    assert_eq!(
        *ctx.log.borrow(),
        vec![
            "history:push:orders:/orders",
            "shell:busy:true",
            "partial:load:partials/orders.html",
            "session:roles",
            "page:init:orders:section:Transport orders",
            "shell:busy:false",
        ]
    );
}

#[tokio::test]
async fn test_empty_token_resolves_to_start() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);

    router.navigate("", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_START)));
    // start 没有注册页面模块
    assert!(!router.has_active_page());
}

#[tokio::test]
async fn test_route_tokens_are_case_insensitive() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);

    router.navigate("MAP", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_MAP)));
}

// =========================================================
// 守卫与重定向
// =========================================================

#[tokio::test]
async fn test_anonymous_user_is_redirected_to_login() {
    let ctx = TestContext::new();
    let router = create_router(&ctx);

    router.navigate("orders", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_LOGIN)));
    assert_eq!(
        ctx.log_entries("history:"),
        vec!["history:replace:login:/login"]
    );
    assert!(ctx.log_entries("partial:load:partials/orders").is_empty());
}

#[tokio::test]
async fn test_login_with_session_renders_default_instead() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);

    router.navigate("login", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_START)));
    assert_eq!(
        ctx.log_entries("partial:"),
        vec!["partial:load:partials/start.html"]
    );
}

#[tokio::test]
async fn test_wrong_role_is_redirected_to_default() {
    let ctx = TestContext::new().signed_in("driver");
    let router = create_router(&ctx);

    router.navigate("planning", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_START)));
    assert!(ctx.log_entries("page:init:planning").is_empty());
}

#[tokio::test]
async fn test_redirect_to_itself_does_nothing() {
    let ctx = TestContext::new();
    let config = AppConfig::default();
    let table = RouteTable::builder("home", "login")
        .route(RouteEntry::new("home", "p/home.html", "Home", "/home").require_auth())
        .route(RouteEntry::new("login", "p/login.html", "Login", "/login").require_auth())
        .build()
        .unwrap();
    let ports = Rc::new(TestPorts {
        ctx: Rc::clone(&ctx),
    });
    let router: Router<String> = Router::new(
        table,
        PageRegistry::new(),
        RouterPorts {
            shell: ports.clone(),
            history: ports.clone(),
            partials: ports.clone(),
            session: ports,
        },
        &config,
    );

    router.navigate("home", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), None);
    assert!(ctx.log.borrow().is_empty());
    assert!(!router.is_navigating());
}

// =========================================================
// 同路由与重入
// =========================================================

#[tokio::test]
async fn test_same_route_click_is_skipped_unless_forced() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);
    router.navigate("orders", NavigateOptions::default()).await;
    ctx.clear_log();

    router.navigate("orders", NavigateOptions::default()).await;
    assert!(ctx.log.borrow().is_empty());

    router.reload().await;
    assert_eq!(
        ctx.log_entries("page:"),
        vec![
            "page:destroy:orders",
            "page:init:orders:section:Transport orders"
        ]
    );
    assert_eq!(
        ctx.log_entries("history:"),
        vec!["history:replace:orders:/orders"]
    );
}

#[tokio::test]
async fn test_reentrant_navigation_is_dropped() {
    let ctx = TestContext::new().signed_in("viewer");
    ctx.slow_partials.set(true);
    let router = create_router(&ctx);

    futures::join!(
        router.navigate("orders", NavigateOptions::default()),
        router.navigate("map", NavigateOptions::default()),
    );

    assert_eq!(router.current_route(), Some(key(ROUTE_ORDERS)));
    assert_eq!(
        ctx.log_entries("partial:"),
        vec!["partial:load:partials/orders.html"]
    );
    assert!(!router.is_navigating());

    // 上一次导航结束后可以继续导航
    router.navigate("map", NavigateOptions::default()).await;
    assert_eq!(router.current_route(), Some(key(ROUTE_MAP)));
}

// =========================================================
// 渲染失败
// =========================================================

#[tokio::test]
async fn test_missing_partial_renders_error_card() {
    let ctx = TestContext::new().signed_in("admin");
    ctx.missing_partials
        .borrow_mut()
        .insert("partials/planning.html".to_string(), 404);
    let router = create_router(&ctx);

    router.navigate("planning", NavigateOptions::default()).await;

    let content = ctx.content.borrow().clone();
    assert!(content.contains("error-card"));
    assert!(content.contains("404"));
    assert_eq!(*ctx.title.borrow(), "Error – FleetDesk");
    assert_eq!(router.current_route(), Some(key(ROUTE_PLANNING)));
    assert!(!router.has_active_page());
    assert!(!ctx.busy.get());
    assert!(ctx.log_entries("page:init").is_empty());
}

#[tokio::test]
async fn test_titles_use_configured_app_name() {
    let ctx = TestContext::new().signed_in("admin");
    ctx.missing_partials
        .borrow_mut()
        .insert("partials/map.html".to_string(), 500);
    let config = AppConfig {
        app_name: "Depot West".to_string(),
        ..AppConfig::default()
    };
    let router = create_router_with_config(&ctx, &config);

    router.navigate("orders", NavigateOptions::default()).await;
    assert_eq!(*ctx.title.borrow(), "Transport orders – Depot West");

    router.navigate("map", NavigateOptions::default()).await;
    assert_eq!(*ctx.title.borrow(), "Error – Depot West");
}

#[tokio::test]
async fn test_failed_init_is_cleaned_up() {
    let ctx = TestContext::new().signed_in("viewer");
    ctx.fail_init.borrow_mut().insert(ROUTE_ORDERS.to_string());
    let router = create_router(&ctx);

    router.navigate("orders", NavigateOptions::default()).await;

    assert_eq!(
        ctx.log_entries("page:"),
        vec![
            "page:init:orders:section:Transport orders",
            "page:destroy:orders"
        ]
    );
    assert!(!router.has_active_page());
    assert_eq!(router.current_route(), Some(key(ROUTE_ORDERS)));
    // 错误消息经过转义
    let content = ctx.content.borrow().clone();
    assert!(content.contains("orders &lt;unavailable&gt;"));
    assert!(!content.contains("<unavailable>"));
    assert!(!ctx.busy.get());

    // 再次离开时不会重复销毁
    ctx.clear_log();
    router.navigate("map", NavigateOptions::default()).await;
    assert_eq!(
        ctx.log_entries("page:"),
        vec!["page:init:map:section:Map"]
    );
}

#[tokio::test]
async fn test_teardown_failure_does_not_block_next_render() {
    let ctx = TestContext::new().signed_in("viewer");
    ctx.fail_destroy.borrow_mut().insert(ROUTE_ORDERS.to_string());
    let router = create_router(&ctx);
    router.navigate("orders", NavigateOptions::default()).await;

    router.navigate("map", NavigateOptions::default()).await;

    assert_eq!(router.current_route(), Some(key(ROUTE_MAP)));
    assert_eq!(
        ctx.log_entries("page:"),
        vec![
            "page:init:orders:section:Transport orders",
            "page:destroy:orders",
            "page:init:map:section:Map"
        ]
    );
    assert!(ctx.log_entries("shell:error").is_empty());
}

#[tokio::test]
async fn test_route_without_module_clears_controller() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);
    router.navigate("orders", NavigateOptions::default()).await;

    router.navigate("start", NavigateOptions::default()).await;
    assert!(!router.has_active_page());

    router.navigate("map", NavigateOptions::default()).await;
    assert_eq!(
        ctx.log_entries("page:destroy"),
        vec!["page:destroy:orders"]
    );
}

// =========================================================
// History 回放
// =========================================================

#[tokio::test]
async fn test_popstate_uses_saved_state() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);
    router.navigate("map", NavigateOptions::default()).await;
    ctx.clear_log();

    router
        .handle_popstate(Some(HistoryState {
            route: key(ROUTE_ORDERS),
        }))
        .await;

    assert_eq!(router.current_route(), Some(key(ROUTE_ORDERS)));
    assert_eq!(
        ctx.log_entries("history:"),
        vec!["history:replace:orders:/orders"]
    );
}

#[tokio::test]
async fn test_popstate_with_unknown_state_recomputes_from_url() {
    let ctx = TestContext::new().signed_in("viewer");
    *ctx.location.borrow_mut() = Location::new("/kaart.html", "");
    let router = create_router(&ctx);

    router
        .handle_popstate(Some(HistoryState {
            route: key("garage"),
        }))
        .await;

    assert_eq!(router.current_route(), Some(key(ROUTE_MAP)));
}

#[tokio::test]
async fn test_popstate_to_current_route_rerenders() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);
    router.navigate("map", NavigateOptions::default()).await;
    ctx.clear_log();

    router.handle_popstate(None).await;
    // location 是 "/"，解析为 start
    assert_eq!(router.current_route(), Some(key(ROUTE_START)));

    ctx.clear_log();
    router
        .handle_popstate(Some(HistoryState {
            route: key(ROUTE_START),
        }))
        .await;
    assert_eq!(
        ctx.log_entries("partial:"),
        vec!["partial:load:partials/start.html"]
    );
}

// =========================================================
// 认证状态变化
// =========================================================

#[tokio::test]
async fn test_auth_change_before_first_navigation_is_ignored() {
    let ctx = TestContext::new();
    let router = create_router(&ctx);

    router.handle_auth_change().await;

    assert!(ctx.log.borrow().is_empty());
}

#[tokio::test]
async fn test_sign_out_redirects_to_login() {
    let ctx = TestContext::new().signed_in("viewer");
    let router = create_router(&ctx);
    router.navigate("orders", NavigateOptions::default()).await;

    *ctx.user.borrow_mut() = None;
    router.handle_auth_change().await;

    assert_eq!(router.current_route(), Some(key(ROUTE_LOGIN)));
    assert_eq!(
        ctx.log_entries("page:destroy"),
        vec!["page:destroy:orders"]
    );
}

#[tokio::test]
async fn test_sign_in_leaves_login_page() {
    let ctx = TestContext::new();
    let router = create_router(&ctx);
    router.start().await;
    assert_eq!(router.current_route(), Some(key(ROUTE_LOGIN)));

    ctx.signed_in("viewer");
    router.handle_auth_change().await;

    assert_eq!(router.current_route(), Some(key(ROUTE_START)));
}

#[tokio::test]
async fn test_allowed_route_only_reapplies_visibility() {
    let ctx = TestContext::new().signed_in("admin");
    let router = create_router(&ctx);
    router.navigate("orders", NavigateOptions::default()).await;
    ctx.clear_log();

    ctx.signed_in("viewer");
    router.handle_auth_change().await;

    assert_eq!(*ctx.log.borrow(), vec!["session:roles"]);
    assert_eq!(router.current_route(), Some(key(ROUTE_ORDERS)));
}

#[tokio::test]
async fn test_role_change_redirects_from_restricted_route() {
    let ctx = TestContext::new().signed_in("planner");
    let router = create_router(&ctx);
    router.navigate("planning", NavigateOptions::default()).await;

    ctx.signed_in("driver");
    router.handle_auth_change().await;

    assert_eq!(router.current_route(), Some(key(ROUTE_START)));
}

// =========================================================
// 错误卡片
// =========================================================

#[test]
fn test_escape_html() {
    assert_eq!(
        escape_html(r#"<script>alert("x") & 'y'</script>"#),
        "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
    );
}

#[test]
fn test_error_card_contains_escaped_message() {
    let card = error_card(&AppError::template_load(500, "partials/<x>.html"));
    assert!(card.starts_with("<section"));
    assert!(card.contains("partials/&lt;x&gt;.html"));
    assert!(card.contains("HTTP 500"));
}
