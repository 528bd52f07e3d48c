use serde::{Deserialize, Serialize};

/// Metres-to-degrees scale factors `(lon, lat)` at a latitude, from the
/// WGS-72 series expansion.
pub fn coor_scale(lat: f64) -> (f64, f64) {
    let radlat = lat.to_radians();
    let mtodeglon = 1.0
        / (111_412.84 * radlat.cos() - 93.5 * (3.0 * radlat).cos() + 0.118 * (5.0 * radlat).cos()).abs();
    let mtodeglat = 1.0
        / (111_132.92 - 559.82 * (2.0 * radlat).cos() + 1.175 * (4.0 * radlat).cos()
            - 0.0023 * (6.0 * radlat).cos())
        .abs();
    (mtodeglon, mtodeglat)
}

/// Longitude convention applied to every position the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LonFlip {
    /// [-360, 0)
    West,
    /// [-180, 180)
    #[default]
    Centered,
    /// [0, 360)
    East,
}

impl LonFlip {
    pub fn from_code(code: i32) -> Self {
        match code {
            c if c < 0 => LonFlip::West,
            0 => LonFlip::Centered,
            _ => LonFlip::East,
        }
    }

    pub fn apply(self, lon: f64) -> f64 {
        let (low, high) = match self {
            LonFlip::West => (-360.0, 0.0),
            LonFlip::Centered => (-180.0, 180.0),
            LonFlip::East => (0.0, 360.0),
        };
        let mut lon = lon;
        while lon < low {
            lon += 360.0;
        }
        while lon >= high {
            lon -= 360.0;
        }
        lon
    }
}

pub fn normalize_heading(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
