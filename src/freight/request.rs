use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::config::constant::{
    BROKER_CURRENCY, DELIVERY_DAY_OFFSET, PICKUP_DAY_OFFSET, WINDOW_END_HOUR, WINDOW_START_HOUR,
};
use crate::domain::Address;

/// City and postal code pulled out of a free-form address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
    pub city: String,
    pub postal_code: String,
}

fn find_postal_code(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    bytes
        .windows(6)
        .position(|w| {
            w[0].is_ascii_digit()
                && w[1].is_ascii_digit()
                && w[2] == b'-'
                && w[3].is_ascii_digit()
                && w[4].is_ascii_digit()
                && w[5].is_ascii_digit()
        })
        .map(|start| &text[start..start + 6])
}

/// Split `street, [zip] city, country` style addresses.
///
/// The city is the second-to-last comma part. A `NN-NNN` postal code found
/// anywhere wins and is stripped from the city, otherwise the third-to-last
/// part is taken as the postal code.
pub fn parse_address(address: &str) -> ParsedAddress {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    let count = parts.len();

    let mut city = if count >= 2 {
        parts[count - 2].to_string()
    } else {
        String::new()
    };

    let postal_code = match find_postal_code(address) {
        Some(zip) => {
            city = city.replace(zip, "").trim().to_string();
            zip.to_string()
        }
        None if count >= 3 => parts[count - 3].to_string(),
        None => String::new(),
    };

    ParsedAddress { city, postal_code }
}

/// An [`Address`] with city and postal code filled in from its text.
pub fn locate(text: &str) -> Address {
    let parsed = parse_address(text);
    Address::new(text).with_locality(parsed.city, parsed.postal_code)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timespan {
    pub begin: String,
    pub end: String,
}

fn utc_stamp<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> String {
    let utc = tz
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local));
    utc.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

fn window_on<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> Timespan {
    let start = NaiveTime::from_hms_opt(WINDOW_START_HOUR, 0, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(WINDOW_END_HOUR, 0, 0).unwrap_or_default();
    Timespan {
        begin: utc_stamp(tz, day.and_time(start)),
        end: utc_stamp(tz, day.and_time(end)),
    }
}

/// Pickup tomorrow and delivery the day after, both 08:00-16:00 local time.
pub fn time_windows<Tz: TimeZone>(tz: &Tz, today: NaiveDate) -> (Timespan, Timespan) {
    (
        window_on(tz, today + Duration::days(PICKUP_DAY_OFFSET)),
        window_on(tz, today + Duration::days(DELIVERY_DAY_OFFSET)),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Load {
    pub amount: u32,
    pub length: f64,
    pub width: f64,
    pub name: String,
    pub type_of_load: String,
    /// Tons.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub loads: Vec<Load>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceAddress {
    pub locality: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpotCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub address: PlaceAddress,
    pub coordinates: SpotCoordinates,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotKind {
    Loading,
    Unloading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spot {
    pub operations: Vec<Operation>,
    pub place: Place,
    pub timespans: Timespan,
    #[serde(rename = "type")]
    pub kind: SpotKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRequirements {
    pub capacity: u32,
    pub gps: bool,
    pub other_requirements: Vec<String>,
    pub required_truck_bodies: Vec<String>,
    pub required_ways_of_loading: Vec<String>,
    pub vehicle_size_id: String,
    pub transport_type: String,
}

/// Body of a price prediction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRequest {
    pub company_id: u64,
    pub user_id: u64,
    /// Meters.
    pub distance: f64,
    pub currency: String,
    /// Loading meters.
    pub length: f64,
    pub spots: Vec<Spot>,
    pub vehicle_requirements: VehicleRequirements,
}

/// Everything needed to assemble a [`QuoteRequest`].
#[derive(Debug, Clone)]
pub struct RequestParts<'a> {
    pub company_id: u64,
    pub user_id: u64,
    pub distance_km: f64,
    pub load_meters: f64,
    pub origin: &'a Address,
    pub destination: &'a Address,
    pub country: &'a str,
    pub windows: (Timespan, Timespan),
    pub load: Load,
    pub vehicle: VehicleRequirements,
}

fn place(address: &Address, country: &str) -> Place {
    let (locality, postal_code) = match (&address.city, &address.postal_code) {
        (Some(city), Some(postal_code)) => (city.clone(), postal_code.clone()),
        (city, postal_code) => {
            let parsed = parse_address(&address.text);
            (
                city.clone().unwrap_or(parsed.city),
                postal_code.clone().unwrap_or(parsed.postal_code),
            )
        }
    };
    let coordinates = address
        .coordinates
        .map(|c| SpotCoordinates {
            latitude: c.lat,
            longitude: c.lng,
        })
        .unwrap_or(SpotCoordinates {
            latitude: 0.0,
            longitude: 0.0,
        });

    Place {
        address: PlaceAddress {
            locality,
            postal_code,
        },
        coordinates,
        country: country.to_string(),
    }
}

impl QuoteRequest {
    pub fn build(parts: RequestParts<'_>) -> Self {
        let (pickup, delivery) = parts.windows;
        let operation = Operation {
            loads: vec![parts.load],
        };

        let spots = vec![
            Spot {
                operations: vec![operation.clone()],
                place: place(parts.origin, parts.country),
                timespans: pickup,
                kind: SpotKind::Loading,
            },
            Spot {
                operations: vec![operation],
                place: place(parts.destination, parts.country),
                timespans: delivery,
                kind: SpotKind::Unloading,
            },
        ];

        Self {
            company_id: parts.company_id,
            user_id: parts.user_id,
            distance: parts.distance_km * 1000.0,
            currency: BROKER_CURRENCY.to_string(),
            length: parts.load_meters,
            spots,
            vehicle_requirements: parts.vehicle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    use crate::domain::Coordinates;

    #[test]
    fn parses_polish_address_with_zip_in_city_part() {
        let parsed = parse_address("ul. Polna 1, 00-950 Warszawa, PL");
        assert_eq!(parsed.city, "Warszawa");
        assert_eq!(parsed.postal_code, "00-950");
    }

    #[test]
    fn locate_fills_city_and_postal_code() {
        let address = locate("ul. Polna 1, 00-950 Warszawa, PL");
        assert_eq!(address.text, "ul. Polna 1, 00-950 Warszawa, PL");
        assert_eq!(address.city.as_deref(), Some("Warszawa"));
        assert_eq!(address.postal_code.as_deref(), Some("00-950"));
        assert_eq!(address.coordinates, None);
    }

    #[test]
    fn falls_back_to_third_to_last_part() {
        let parsed = parse_address("Main St 5, 10115, Berlin, DE");
        assert_eq!(parsed.city, "Berlin");
        assert_eq!(parsed.postal_code, "10115");
    }

    #[test]
    fn short_addresses_yield_empty_parts() {
        assert_eq!(parse_address("Poznan"), ParsedAddress::default());
        let parsed = parse_address("Poznan, PL");
        assert_eq!(parsed.city, "Poznan");
        assert_eq!(parsed.postal_code, "");
    }

    #[test]
    fn windows_are_next_two_days_in_utc() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (pickup, delivery) = time_windows(&Utc, today);
        assert_eq!(pickup.begin, "2024-03-11T08:00:00.000Z");
        assert_eq!(pickup.end, "2024-03-11T16:00:00.000Z");
        assert_eq!(delivery.begin, "2024-03-12T08:00:00.000Z");

        let warsaw = FixedOffset::east_opt(3600).unwrap();
        let (pickup, _) = time_windows(&warsaw, today);
        assert_eq!(pickup.begin, "2024-03-11T07:00:00.000Z");
    }

    #[test]
    fn builds_wire_payload() {
        let origin = Address::new("Magazynowa 3, 62-080 Tarnowo Podgorne, PL")
            .with_coordinates(Coordinates { lat: 52.46, lng: 16.68 });
        let destination = Address::new("ul. Polna 1, 00-950 Warszawa, PL");
        let windows = time_windows(&Utc, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let request = QuoteRequest::build(RequestParts {
            company_id: 1001,
            user_id: 2002,
            distance_km: 312.5,
            load_meters: 1.2,
            origin: &origin,
            destination: &destination,
            country: "PL",
            windows,
            load: Load {
                amount: 3,
                length: 1.2,
                width: 0.8,
                name: "Goods (120 m2)".into(),
                type_of_load: "2_europalette".into(),
                weight: 3.0,
            },
            vehicle: VehicleRequirements {
                capacity: 3,
                gps: true,
                other_requirements: vec![],
                required_truck_bodies: vec!["curtainsider".into()],
                required_ways_of_loading: vec![],
                vehicle_size_id: "3_lorry".into(),
                transport_type: "ftl".into(),
            },
        });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["distance"], json!(312500.0));
        assert_eq!(value["currency"], "EUR");
        assert_eq!(value["spots"][0]["type"], "loading");
        assert_eq!(value["spots"][1]["type"], "unloading");
        assert_eq!(value["spots"][0]["place"]["address"]["postal_code"], "62-080");
        assert_eq!(value["spots"][0]["place"]["coordinates"]["latitude"], json!(52.46));
        assert_eq!(value["spots"][1]["place"]["address"]["locality"], "Warszawa");
        assert_eq!(value["spots"][1]["place"]["coordinates"]["latitude"], json!(0.0));
        assert_eq!(value["spots"][1]["operations"][0]["loads"][0]["amount"], 3);
        assert_eq!(value["vehicle_requirements"]["vehicle_size_id"], "3_lorry");
        assert_eq!(value["vehicle_requirements"]["gps"], true);
    }
}
