//! Error types for `fieldtrack-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("surveyor id must not be empty")]
  EmptySurveyorId,

  #[error("latitude {0} is not a finite number")]
  NonFiniteLatitude(f64),

  #[error("longitude {0} is not a finite number")]
  NonFiniteLongitude(f64),

  #[error("latitude {0} is outside [-90, 90]")]
  LatitudeOutOfRange(f64),

  #[error("longitude {0} is outside [-180, 180]")]
  LongitudeOutOfRange(f64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
