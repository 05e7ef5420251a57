use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// 用户当前位置，只存在于内存中
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl UserLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FilterError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(FilterError::InvalidLocation(format!("latitude {}", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(FilterError::InvalidLocation(format!("longitude {}", longitude)));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// 经纬度必须同时给出；都没有时视为位置未知
    pub fn from_query(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, FilterError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(FilterError::InvalidLocation(
                "latitude and longitude must be given together".into(),
            )),
        }
    }
}
