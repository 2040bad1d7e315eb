//! 路由与原生 Web API 封装
//!
//! - `route`: 路由表、解析与守卫（纯逻辑）
//! - `router`: 导航引擎与端口 trait
//! - `dom`: 端口的浏览器实现
//! - `http` / `storage`: fetch 与 LocalStorage 的轻量封装

pub mod dom;
mod http;
pub mod route;
pub mod router;
mod storage;

pub use http::{HttpClient, HttpError};
pub use storage::LocalStorage;
