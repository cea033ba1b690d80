//! Ride tickets: the status flow a ticket goes through and the checks at each step.
//!
//! A rider books a ticket (`Pending`). Operations staff send a one-time code to the rider and
//! start the ride once the rider reads it back (`RideStarted`). Ending the ride records remarks
//! and the fare (`Completed`).

pub mod report;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;

use crate::cost_matrix::{CityLocations, CostEntry, DirectedPair, LocationId};
use crate::entities::ride_ticket::TicketStatus;
use crate::utils::validation::FieldErrors;

pub const OTP_DIGITS: usize = 4;
pub const OTP_TTL_MINUTES: i64 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum RideError {
    #[error("Ticket is {current}, it cannot be {action}")]
    InvalidTransition {
        current: TicketStatus,
        action: &'static str,
    },

    #[error("No OTP has been sent for this ticket")]
    OtpNotSent,

    #[error("OTP has expired, request a new one")]
    OtpExpired,

    #[error("Invalid OTP")]
    OtpMismatch,

    #[error("Location does not belong to the ticket's city")]
    LocationNotInCity,

    #[error("Pickup and drop locations must be different")]
    SameLocation,

    #[error("Drop location is required to complete a ride")]
    DropRequired,
}

impl TicketStatus {
    pub fn is_open(self) -> bool {
        self != TicketStatus::Completed
    }

    /// Pending -> RideStarted, after the rider's code checks out.
    pub fn start(self) -> Result<TicketStatus, RideError> {
        match self {
            TicketStatus::Pending => Ok(TicketStatus::RideStarted),
            current => Err(RideError::InvalidTransition {
                current,
                action: "started",
            }),
        }
    }

    /// RideStarted -> Completed.
    pub fn complete(self) -> Result<TicketStatus, RideError> {
        match self {
            TicketStatus::RideStarted => Ok(TicketStatus::Completed),
            current => Err(RideError::InvalidTransition {
                current,
                action: "completed",
            }),
        }
    }

    pub fn can_send_otp(self) -> Result<(), RideError> {
        match self {
            TicketStatus::Pending => Ok(()),
            current => Err(RideError::InvalidTransition {
                current,
                action: "sent an OTP",
            }),
        }
    }
}

/// A one-time code and the moment it stops being accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_otp<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> IssuedOtp {
    let code: String = (0..OTP_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();

    IssuedOtp {
        code,
        expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
    }
}

pub fn check_otp(
    issued: Option<&IssuedOtp>,
    given: &str,
    now: DateTime<Utc>,
) -> Result<(), RideError> {
    let issued = issued.ok_or(RideError::OtpNotSent)?;
    if now > issued.expires_at {
        return Err(RideError::OtpExpired);
    }
    if issued.code != given.trim() {
        return Err(RideError::OtpMismatch);
    }
    Ok(())
}

/// Validate a drop location against the ticket's city and pickup.
pub fn check_drop(
    city: &CityLocations,
    pickup: LocationId,
    drop: LocationId,
) -> Result<LocationId, RideError> {
    if city.location(drop).is_none() {
        return Err(RideError::LocationNotInCity);
    }
    if drop == pickup {
        return Err(RideError::SameLocation);
    }
    Ok(drop)
}

/// A booking checked against its city, with the pickup date settled.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub pickup: LocationId,
    pub drop: Option<LocationId>,
    pub pickup_date: NaiveDate,
}

/// Check a booking request. Errors are keyed by the request's field names.
pub fn check_new_ticket(
    city: &CityLocations,
    pickup: LocationId,
    drop: Option<LocationId>,
    pickup_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NewTicket, FieldErrors> {
    let mut errors = FieldErrors::new();

    if city.location(pickup).is_none() {
        errors.add("pickupLocation", RideError::LocationNotInCity.to_string());
    }
    if let Some(drop) = drop {
        if let Err(e) = check_drop(city, pickup, drop) {
            errors.add("dropLocation", e.to_string());
        }
    }

    let pickup_date = pickup_date.unwrap_or(today);
    if pickup_date < today {
        errors.add("pickupDate", "Pickup date cannot be in the past");
    }

    errors.into_result(NewTicket {
        pickup,
        drop,
        pickup_date,
    })
}

/// Fare for a ride from the city's stored prices, if that pair has one.
pub fn fare(costs: &[CostEntry], pickup: LocationId, drop: LocationId) -> Option<f64> {
    let pair = DirectedPair { pickup, drop };
    costs.iter().find(|c| c.pair == pair).map(|c| c.cost)
}

/// Case-insensitive substring match over the texts shown for a ticket.
pub fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    let needle = match search.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return true,
    };

    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_matrix::LocationRef;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn city() -> CityLocations {
        CityLocations {
            id: 2,
            name: "Chennai".to_string(),
            locations: vec![
                LocationRef { id: 10, name: "Airport".to_string() },
                LocationRef { id: 11, name: "Central".to_string() },
            ],
        }
    }

    #[test]
    fn test_status_flow() {
        let started = TicketStatus::Pending.start().unwrap();
        assert_eq!(started, TicketStatus::RideStarted);
        assert_eq!(started.complete(), Ok(TicketStatus::Completed));

        assert!(TicketStatus::Pending.complete().is_err());
        assert!(TicketStatus::RideStarted.start().is_err());
        assert!(TicketStatus::Completed.can_send_otp().is_err());
        assert!(!TicketStatus::Completed.is_open());
        assert!(TicketStatus::RideStarted.is_open());
    }

    #[test]
    fn test_issued_otp_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();

        let otp = issue_otp(&mut rng, now);

        assert_eq!(otp.code.len(), OTP_DIGITS);
        assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(otp.expires_at - now, Duration::minutes(OTP_TTL_MINUTES));
    }

    #[test]
    fn test_check_otp() {
        let now = Utc::now();
        let otp = IssuedOtp {
            code: "4821".to_string(),
            expires_at: now + Duration::minutes(5),
        };

        assert_eq!(check_otp(Some(&otp), " 4821 ", now), Ok(()));
        assert_eq!(check_otp(Some(&otp), "1234", now), Err(RideError::OtpMismatch));
        assert_eq!(
            check_otp(Some(&otp), "4821", now + Duration::minutes(6)),
            Err(RideError::OtpExpired)
        );
        assert_eq!(check_otp(None, "4821", now), Err(RideError::OtpNotSent));
    }

    #[test]
    fn test_check_drop() {
        assert_eq!(check_drop(&city(), 10, 11), Ok(11));
        assert_eq!(check_drop(&city(), 10, 10), Err(RideError::SameLocation));
        assert_eq!(check_drop(&city(), 10, 99), Err(RideError::LocationNotInCity));
    }

    #[test]
    fn test_check_new_ticket() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();

        let ticket = check_new_ticket(&city(), 10, None, None, today).unwrap();
        assert_eq!(ticket.pickup_date, today);
        assert_eq!(ticket.drop, None);

        let errors = check_new_ticket(
            &city(),
            99,
            Some(99),
            Some(today.pred_opt().unwrap()),
            today,
        )
        .unwrap_err();
        assert!(errors.get("pickupLocation").is_some());
        assert!(errors.get("dropLocation").is_some());
        assert!(errors.get("pickupDate").is_some());

        let errors = check_new_ticket(&city(), 10, Some(10), None, today).unwrap_err();
        assert_eq!(
            errors.get("dropLocation"),
            Some("Pickup and drop locations must be different")
        );
    }

    #[test]
    fn test_fare_follows_direction() {
        let costs = [CostEntry {
            pair: DirectedPair { pickup: 10, drop: 11 },
            cost: 350.0,
        }];

        assert_eq!(fare(&costs, 10, 11), Some(350.0));
        assert_eq!(fare(&costs, 11, 10), None);
    }

    #[test]
    fn test_matches_search() {
        let fields = ["Priya", "Chennai", "Airport"];

        assert!(matches_search(None, &fields));
        assert!(matches_search(Some("  "), &fields));
        assert!(matches_search(Some("chen"), &fields));
        assert!(matches_search(Some("AIR"), &fields));
        assert!(!matches_search(Some("Madurai"), &fields));
    }
}
