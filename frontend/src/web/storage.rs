//! LocalStorage 封装模块
//!
//! 使用 `web_sys::Storage` 提供简洁的本地存储接口。
//! 只用于记住非敏感的便利信息（如上次登录的邮箱），令牌不落盘。

/// 本地存储操作封装
///
/// 提供静态方法访问浏览器 LocalStorage API。
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    /// 获取存储的字符串值
    ///
    /// 键不存在、存储不可用（隐私模式）或发生错误时返回 `None`。
    pub fn get(key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    /// 设置存储值，返回是否成功
    pub fn set(key: &str, value: &str) -> bool {
        Self::storage()
            .and_then(|s| s.set_item(key, value).ok())
            .is_some()
    }
}
