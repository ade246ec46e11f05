//! [Google Places] [`Directory`] implementation.
//!
//! [Google Places]: https://developers.google.com/maps/documentation/places

use common::{
    operations::{By, Select},
    GeoPoint,
};
use derive_more::Debug;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use tracerr::Traced;

use crate::{domain::authority, infra::directory};

use super::Directory;

/// [`Places`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// API key to authenticate with.
    #[debug(skip)]
    pub api_key: SecretString,
}

/// [`Directory`] resolving the nearest police station via the [Google Places]
/// Nearby Search API.
///
/// [Google Places]: https://developers.google.com/maps/documentation/places
#[derive(Clone, Debug)]
pub struct Places {
    /// [`Config`] of this [`Places`] client.
    config: Config,

    /// HTTP client to perform requests with.
    http: reqwest::Client,
}

impl Places {
    /// Creates a new [`Places`] client with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl Directory<Select<By<Option<authority::Contact>, GeoPoint>>> for Places {
    type Ok = Option<authority::Contact>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<authority::Contact>, GeoPoint>>,
    ) -> Result<Self::Ok, Self::Err> {
        let point = by.into_inner();

        let resp = self
            .http
            .get("https://maps.googleapis.com/maps/api/place/nearbysearch/json")
            .query(&[
                ("location", format!("{},{}", point.lat, point.lng)),
                ("rankby", "distance".into()),
                ("type", "police".into()),
                ("key", self.config.api_key.expose_secret().into()),
            ])
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> directory::Error))?
            .json::<Response>()
            .await
            .map_err(tracerr::from_and_wrap!(=> directory::Error))?;

        if resp.status != "OK" && resp.status != "ZERO_RESULTS" {
            return Err(tracerr::new!(directory::Error::BadResponse(
                resp.status,
            )));
        }

        Ok(resp.results.into_iter().next().and_then(|place| {
            let location =
                GeoPoint::new(place.geometry.location.lat, place.geometry.location.lng)?;
            Some(authority::Contact {
                name: authority::Name::new(place.name)?,
                address: place.vicinity.unwrap_or_default(),
                phone: None,
                distance_meters: point.distance_to(&location),
                location,
            })
        }))
    }
}

/// Response of a Nearby Search request.
#[derive(Debug, Deserialize)]
struct Response {
    /// Status code of the response.
    status: String,

    /// Places found, nearest first.
    #[serde(default)]
    results: Vec<Place>,
}

/// Single place of a [`Response`].
#[derive(Debug, Deserialize)]
struct Place {
    /// Name of the place.
    name: String,

    /// Simplified address of the place.
    vicinity: Option<String>,

    /// Geometry of the place.
    geometry: Geometry,
}

/// Geometry of a [`Place`].
#[derive(Debug, Deserialize)]
struct Geometry {
    /// Location of the place.
    location: Location,
}

/// Coordinates of a [`Geometry`].
#[derive(Debug, Deserialize)]
struct Location {
    /// Latitude, in degrees.
    lat: f64,

    /// Longitude, in degrees.
    lng: f64,
}
