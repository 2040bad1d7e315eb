//! JsValue 序列化辅助
//!
//! History 状态对象需要以结构化的 JS 对象写入 `history.pushState`，
//! 而不是 JSON 字符串。

use serde::{Serialize, de::DeserializeOwned};
use wasm_bindgen::JsValue;

/// Error type for serialization/deserialization operations
#[derive(Debug)]
pub enum Error {
    SerdeWasmBindgen(serde_wasm_bindgen::Error),
    /// 值为 null/undefined（例如首个 History 条目）
    Missing,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SerdeWasmBindgen(e) => write!(f, "Serde WASM Bindgen Error: {}", e),
            Error::Missing => write!(f, "value is null or undefined"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        Error::SerdeWasmBindgen(e)
    }
}

/// Serialize a Rust data structure into a plain JS object
pub fn to_value<T: Serialize>(value: &T) -> Result<JsValue, Error> {
    // Plain objects instead of Map so the state survives structured cloning as expected
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(Error::from)
}

/// Deserialize a JsValue into a Rust data structure
pub fn from_value<T: DeserializeOwned>(value: JsValue) -> Result<T, Error> {
    if value.is_null() || value.is_undefined() {
        return Err(Error::Missing);
    }
    serde_wasm_bindgen::from_value(value).map_err(Error::from)
}
