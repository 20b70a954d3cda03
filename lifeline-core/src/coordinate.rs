//! Validated WGS84 coordinates.
//!
//! A [`Coordinate`] always holds finite latitude and longitude values, so any
//! code receiving one can feed it straight into distance computations. The
//! inner representation is a [`geo::Coord`] with `x = longitude` and
//! `y = latitude`.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Point};
use thiserror::Error;

/// Errors raised while building or parsing a [`Coordinate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinate ({latitude}, {longitude}) is not finite")]
    NonFinite {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },
    /// Text did not contain exactly two comma-separated parts.
    #[error("expected \"latitude, longitude\" but found {input:?}")]
    Malformed {
        /// Original input.
        input: String,
    },
    /// One part of the text was not a decimal number.
    #[error("{field} {value:?} is not a decimal number")]
    InvalidNumber {
        /// Which axis failed to parse.
        field: &'static str,
        /// Raw text for that axis.
        value: String,
    },
}

/// A finite latitude/longitude pair in degrees.
///
/// # Examples
///
/// ```
/// use lifeline_core::Coordinate;
///
/// # fn main() -> Result<(), lifeline_core::CoordinateError> {
/// let coordinate = Coordinate::new(51.5, -0.12)?;
/// assert_eq!(coordinate.latitude(), 51.5);
/// assert_eq!(coordinate.longitude(), -0.12);
/// assert!(Coordinate::new(f64::NAN, 0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawCoordinate", into = "RawCoordinate")
)]
pub struct Coordinate {
    location: Coord<f64>,
}

impl Coordinate {
    /// Validate and construct a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::NonFinite`] when either value is NaN or
    /// infinite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            location: Coord {
                x: longitude,
                y: latitude,
            },
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }

    /// The coordinate as a `geo` coordinate (`x = longitude`).
    #[must_use]
    pub const fn as_coord(&self) -> Coord<f64> {
        self.location
    }

    /// Build a coordinate from the decimal strings kept in the donor store.
    ///
    /// Absent fields, unparsable text and non-finite values all collapse to
    /// `None`: a donor without a usable position is simply not locatable.
    ///
    /// ```
    /// use lifeline_core::Coordinate;
    ///
    /// assert!(Coordinate::from_text_fields(Some("12.5"), Some(" 77.6 ")).is_some());
    /// assert!(Coordinate::from_text_fields(Some("12.5"), None).is_none());
    /// assert!(Coordinate::from_text_fields(Some("north"), Some("77.6")).is_none());
    /// assert!(Coordinate::from_text_fields(Some("NaN"), Some("77.6")).is_none());
    /// ```
    #[must_use]
    pub fn from_text_fields(latitude: Option<&str>, longitude: Option<&str>) -> Option<Self> {
        let latitude = parse_axis("latitude", latitude?).ok()?;
        let longitude = parse_axis("longitude", longitude?).ok()?;
        Self::new(latitude, longitude).ok()
    }
}

impl TryFrom<Coord<f64>> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: Coord<f64>) -> Result<Self, Self::Error> {
        Self::new(value.y, value.x)
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(value: Coordinate) -> Self {
        Self::from(value.location)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude(), self.longitude())
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    /// Parse `"latitude, longitude"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [latitude, longitude] = parts.as_slice() else {
            return Err(CoordinateError::Malformed {
                input: s.to_owned(),
            });
        };
        Self::new(
            parse_axis("latitude", latitude)?,
            parse_axis("longitude", longitude)?,
        )
    }
}

fn parse_axis(field: &'static str, raw: &str) -> Result<f64, CoordinateError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CoordinateError::InvalidNumber {
            field,
            value: raw.to_owned(),
        })
}

/// Wire shape used for (de)serialisation.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

#[cfg(feature = "serde")]
impl From<Coordinate> for RawCoordinate {
    fn from(value: Coordinate) -> Self {
        Self {
            latitude: value.latitude(),
            longitude: value.longitude(),
        }
    }
}
