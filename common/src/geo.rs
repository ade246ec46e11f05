//! Geographic coordinates.

use std::str::FromStr;

use derive_more::{Display, Error, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geographic point in the [WGS 84] coordinate system.
///
/// [WGS 84]: https://wikipedia.org/wiki/World_Geodetic_System
#[derive(Clone, Copy, Debug, Display, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[display("{lat},{lng}")]
pub struct GeoPoint {
    /// [`Latitude`] of this [`GeoPoint`].
    pub lat: Latitude,

    /// [`Longitude`] of this [`GeoPoint`].
    pub lng: Longitude,
}

impl GeoPoint {
    /// Mean radius of the Earth, in meters.
    const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    /// Creates a new [`GeoPoint`] if both coordinates are in range.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        Some(Self {
            lat: Latitude::new(lat)?,
            lng: Longitude::new(lng)?,
        })
    }

    /// Returns a web link pointing at this [`GeoPoint`] on a map.
    #[must_use]
    pub fn map_link(&self) -> String {
        format!("https://maps.google.com/?q={},{}", self.lat, self.lng)
    }

    /// Returns the [haversine] distance between this [`GeoPoint`] and the
    /// `other` one, in meters.
    ///
    /// [haversine]: https://wikipedia.org/wiki/Haversine_formula
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) =
            (f64::from(self.lat).to_radians(), f64::from(other.lat).to_radians());
        let d_lat = (f64::from(other.lat) - f64::from(self.lat)).to_radians();
        let d_lng = (f64::from(other.lng) - f64::from(self.lng)).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

        2.0 * a.sqrt().asin() * Self::EARTH_RADIUS_METERS
    }
}

impl FromStr for GeoPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ParseError as E;

        let (lat, lng) = s.split_once(',').ok_or(E::MissingSeparator)?;
        Ok(Self {
            lat: Latitude::new(
                lat.trim().parse().map_err(|_| E::InvalidNumber)?,
            )
            .ok_or(E::OutOfRange)?,
            lng: Longitude::new(
                lng.trim().parse().map_err(|_| E::InvalidNumber)?,
            )
            .ok_or(E::OutOfRange)?,
        })
    }
}

/// Error of parsing a [`GeoPoint`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Coordinates are not separated by a comma.
    #[display("missing `,` separator")]
    MissingSeparator,

    /// Coordinate is not a valid number.
    #[display("coordinate is not a valid number")]
    InvalidNumber,

    /// Coordinate is out of its valid range.
    #[display("coordinate is out of range")]
    OutOfRange,
}

/// Latitude of a [`GeoPoint`], in degrees.
#[derive(Clone, Copy, Debug, Display, Into, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Latitude(f64);

impl Latitude {
    /// Creates a new [`Latitude`] if the given value is in the
    /// `-90.0..=90.0` degrees range.
    #[must_use]
    pub fn new(degrees: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&degrees) && degrees.is_finite())
            .then_some(Self(degrees))
    }
}

/// Longitude of a [`GeoPoint`], in degrees.
#[derive(Clone, Copy, Debug, Display, Into, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Longitude(f64);

impl Longitude {
    /// Creates a new [`Longitude`] if the given value is in the
    /// `-180.0..=180.0` degrees range.
    #[must_use]
    pub fn new(degrees: f64) -> Option<Self> {
        ((-180.0..=180.0).contains(&degrees) && degrees.is_finite())
            .then_some(Self(degrees))
    }
}

#[cfg(test)]
mod spec {
    use super::GeoPoint;

    #[test]
    fn from_str() {
        let point: GeoPoint = "51.5074,-0.1278".parse().unwrap();
        assert_eq!(f64::from(point.lat), 51.5074);
        assert_eq!(f64::from(point.lng), -0.1278);

        assert!("51.5074, -0.1278".parse::<GeoPoint>().is_ok());
        assert!("91.0,0.0".parse::<GeoPoint>().is_err());
        assert!("0.0,181.0".parse::<GeoPoint>().is_err());
        assert!("51.5074".parse::<GeoPoint>().is_err());
        assert!("abc,def".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(GeoPoint::new(90.1, 0.0).is_none());
        assert!(GeoPoint::new(-90.1, 0.0).is_none());
        assert!(GeoPoint::new(0.0, 180.1).is_none());
        assert!(GeoPoint::new(0.0, -180.1).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(90.0, -180.0).is_some());
    }

    #[test]
    fn map_link() {
        let point = GeoPoint::new(48.8584, 2.2945).unwrap();
        assert_eq!(
            point.map_link(),
            "https://maps.google.com/?q=48.8584,2.2945",
        );
    }

    #[test]
    fn distance() {
        let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
        let london = GeoPoint::new(51.5074, -0.1278).unwrap();

        let meters = paris.distance_to(&london);
        assert!((330_000.0..350_000.0).contains(&meters), "{meters}");

        assert!(paris.distance_to(&paris) < f64::EPSILON);
    }
}
