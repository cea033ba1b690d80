//! Ride figures for the dashboard.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entities::ride_ticket::TicketStatus;
use crate::utils::validation::FieldErrors;

pub const DATE_RANGE_INVALID: &str = "End date is required and cannot be before start date";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilter {
    pub city_id: Option<i32>,
    pub location_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub status: Option<TicketStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DashboardFilter {
    /// A start date needs an end date on or after it. An end date alone is accepted.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match (self.start_date, self.end_date) {
            (Some(_), None) => errors.add("endDate", DATE_RANGE_INVALID),
            (Some(start), Some(end)) if end < start => errors.add("endDate", DATE_RANGE_INVALID),
            _ => {}
        }
        errors.into_result(())
    }

    pub fn matches(&self, ride: &RideFacts) -> bool {
        self.city_id.is_none_or(|id| ride.city_id == id)
            && self.location_id.is_none_or(|id| ride.pickup_location_id == id)
            && self.vendor_id.is_none_or(|id| ride.vendor_id == Some(id))
            && self.status.is_none_or(|s| ride.status == s)
            && self.start_date.is_none_or(|d| ride.pickup_date >= d)
            && self.end_date.is_none_or(|d| ride.pickup_date <= d)
    }
}

/// The parts of a ticket the dashboard groups by, with names already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RideFacts {
    pub city_id: i32,
    pub city_name: String,
    pub pickup_location_id: i32,
    pub pickup_location_name: String,
    pub vendor_id: Option<i32>,
    pub status: TicketStatus,
    pub pickup_date: NaiveDate,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityCount {
    pub city_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    pub location_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    pub ride_ticket_count: u64,
    pub rides_by_cities: Vec<CityCount>,
    pub rides_by_location: Vec<LocationCount>,
    /// City name -> sum of recorded fares.
    pub city_cost_map: BTreeMap<String, f64>,
}

/// Count and total the rides that pass `filter`. Groups are sorted by count, busiest first.
pub fn summarize(filter: &DashboardFilter, rides: &[RideFacts]) -> RideStats {
    let mut by_city: BTreeMap<&str, u64> = BTreeMap::new();
    let mut by_location: BTreeMap<&str, u64> = BTreeMap::new();
    let mut stats = RideStats::default();

    for ride in rides.iter().filter(|r| filter.matches(r)) {
        stats.ride_ticket_count += 1;
        *by_city.entry(&ride.city_name).or_default() += 1;
        *by_location.entry(&ride.pickup_location_name).or_default() += 1;
        if let Some(cost) = ride.cost {
            *stats.city_cost_map.entry(ride.city_name.clone()).or_default() += cost;
        }
    }

    stats.rides_by_cities = by_city
        .into_iter()
        .map(|(name, count)| CityCount { city_name: name.to_string(), count })
        .collect();
    stats.rides_by_cities.sort_by(|a, b| b.count.cmp(&a.count));

    stats.rides_by_location = by_location
        .into_iter()
        .map(|(name, count)| LocationCount { location_name: name.to_string(), count })
        .collect();
    stats.rides_by_location.sort_by(|a, b| b.count.cmp(&a.count));

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn ride(
        city: (i32, &str),
        pickup: (i32, &str),
        vendor: Option<i32>,
        status: TicketStatus,
        day: u32,
        cost: Option<f64>,
    ) -> RideFacts {
        RideFacts {
            city_id: city.0,
            city_name: city.1.to_string(),
            pickup_location_id: pickup.0,
            pickup_location_name: pickup.1.to_string(),
            vendor_id: vendor,
            status,
            pickup_date: date(day),
            cost,
        }
    }

    fn rides() -> Vec<RideFacts> {
        vec![
            ride((1, "Chennai"), (10, "Airport"), Some(3), TicketStatus::Completed, 2, Some(350.0)),
            ride((1, "Chennai"), (11, "Central"), Some(3), TicketStatus::Completed, 5, Some(120.0)),
            ride((1, "Chennai"), (10, "Airport"), None, TicketStatus::Pending, 9, None),
            ride((2, "Cuddalore"), (20, "Bus Stand"), Some(4), TicketStatus::RideStarted, 5, None),
        ]
    }

    #[test]
    fn test_unfiltered_summary() {
        let stats = summarize(&DashboardFilter::default(), &rides());

        assert_eq!(stats.ride_ticket_count, 4);
        assert_eq!(
            stats.rides_by_cities[0],
            CityCount { city_name: "Chennai".to_string(), count: 3 }
        );
        assert_eq!(
            stats.rides_by_location[0],
            LocationCount { location_name: "Airport".to_string(), count: 2 }
        );
        assert_eq!(stats.city_cost_map.get("Chennai"), Some(&470.0));
        assert_eq!(stats.city_cost_map.get("Cuddalore"), None);
    }

    #[test]
    fn test_filters_combine() {
        let filter = DashboardFilter {
            city_id: Some(1),
            vendor_id: Some(3),
            start_date: Some(date(3)),
            end_date: Some(date(30)),
            ..Default::default()
        };

        let stats = summarize(&filter, &rides());

        assert_eq!(stats.ride_ticket_count, 1);
        assert_eq!(stats.rides_by_location[0].location_name, "Central");
    }

    #[test]
    fn test_status_and_location_filters() {
        let by_status = DashboardFilter {
            status: Some(TicketStatus::Completed),
            ..Default::default()
        };
        assert_eq!(summarize(&by_status, &rides()).ride_ticket_count, 2);

        let by_location = DashboardFilter {
            location_id: Some(10),
            ..Default::default()
        };
        assert_eq!(summarize(&by_location, &rides()).ride_ticket_count, 2);
    }

    #[test]
    fn test_date_range_validation() {
        let open_ended = DashboardFilter {
            start_date: Some(date(5)),
            ..Default::default()
        };
        assert_eq!(
            open_ended.validate().unwrap_err().get("endDate"),
            Some(DATE_RANGE_INVALID)
        );

        let reversed = DashboardFilter {
            start_date: Some(date(5)),
            end_date: Some(date(4)),
            ..Default::default()
        };
        assert!(reversed.validate().is_err());

        let same_day = DashboardFilter {
            start_date: Some(date(5)),
            end_date: Some(date(5)),
            ..Default::default()
        };
        assert!(same_day.validate().is_ok());
        assert_eq!(summarize(&same_day, &rides()).ride_ticket_count, 2);
    }

    #[test]
    fn test_filter_reads_camel_case_query() {
        let filter: DashboardFilter = serde_json::from_value(serde_json::json!({
            "cityId": 1,
            "status": "Ride Started",
            "startDate": "2025-11-01",
            "endDate": "2025-11-30"
        }))
        .unwrap();

        assert_eq!(filter.city_id, Some(1));
        assert_eq!(filter.status, Some(TicketStatus::RideStarted));
        assert_eq!(filter.end_date, Some(date(30)));
    }
}
