//! 地图投影
//!
//! 将经纬度投影到 SVG 视口坐标（等距圆柱投影，按纬度修正经度比例）。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// 一组坐标的外接矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: LatLng,
    pub max: LatLng,
}

impl Bounds {
    /// 忽略无效坐标；没有有效坐标时返回 None
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.is_valid())
            .fold(None, |acc: Option<Bounds>, p| {
                Some(match acc {
                    None => Bounds { min: *p, max: *p },
                    Some(b) => Bounds {
                        min: LatLng::new(b.min.lat.min(p.lat), b.min.lng.min(p.lng)),
                        max: LatLng::new(b.max.lat.max(p.lat), b.max.lng.max(p.lng)),
                    },
                })
            })
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min.lat + self.max.lat) / 2.0,
            (self.min.lng + self.max.lng) / 2.0,
        )
    }
}

/// SVG 视口
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            padding: 24.0,
        }
    }
}

impl Viewport {
    /// 投影单个点，返回 (x, y)，y 轴向下
    ///
    /// 所有点重合（外接矩形退化）时落在视口中心。
    pub fn project(&self, bounds: &Bounds, point: &LatLng) -> (f64, f64) {
        let inner_w = (self.width - 2.0 * self.padding).max(0.0);
        let inner_h = (self.height - 2.0 * self.padding).max(0.0);

        let lng_scale = bounds.center().lat.to_radians().cos().max(0.01);
        let span_x = (bounds.max.lng - bounds.min.lng) * lng_scale;
        let span_y = bounds.max.lat - bounds.min.lat;

        if span_x <= f64::EPSILON && span_y <= f64::EPSILON {
            return (self.width / 2.0, self.height / 2.0);
        }

        // 两个方向使用同一比例，避免变形；较短的方向居中
        let scale = match (span_x > f64::EPSILON, span_y > f64::EPSILON) {
            (true, true) => (inner_w / span_x).min(inner_h / span_y),
            (true, false) => inner_w / span_x,
            _ => inner_h / span_y,
        };
        let offset_x = (inner_w - span_x * scale) / 2.0;
        let offset_y = (inner_h - span_y * scale) / 2.0;

        let x = self.padding + offset_x + (point.lng - bounds.min.lng) * lng_scale * scale;
        let y = self.padding + offset_y + (bounds.max.lat - point.lat) * scale;
        (x, y)
    }
}
