//! OJP trip response decoding.
//!
//! Walks the response with a streaming reader and keeps, per `TripResult`,
//! the total duration, the modes used and the stop names passed. The
//! fastest trip wins.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::error::RoutingError;

const NO_TRIP_FOUND: &str = "TRIP_NOTRIPFOUND";
const ORIGIN_DESTINATION_IDENTICAL: &str = "TRIP_ORIGINDESTINATIONIDENTICAL";

/// A decoded trip: what the routing API says the fastest option costs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripResponse {
    pub duration_secs: f64,
    pub used_modes: Vec<String>,
    pub station_names: Vec<String>,
}

#[derive(Debug, Default)]
struct TripAccumulator {
    total: Option<f64>,
    leg_sum: f64,
    modes: Vec<String>,
    stations: Vec<String>,
}

impl TripAccumulator {
    fn duration(&self) -> f64 {
        self.total.unwrap_or(self.leg_sum)
    }

    fn into_response(self) -> TripResponse {
        TripResponse {
            duration_secs: self.duration(),
            used_modes: self.modes,
            station_names: self.stations,
        }
    }
}

fn push_unique(into: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !into.iter().any(|s| s == item) {
        into.push(item.to_string());
    }
}

/// Decode an OJP trip response body.
///
/// # Errors
///
/// - `NoTripFound` when the API reports `TRIP_NOTRIPFOUND` or returns no trip.
/// - `Xml` when the body is not a well-formed OJP service delivery.
///
/// `TRIP_ORIGINDESTINATIONIDENTICAL` decodes to a zero-duration trip.
pub fn decode_trip_response(body: &str) -> Result<TripResponse, RoutingError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut trips: Vec<TripAccumulator> = Vec::new();
    let mut current: Option<TripAccumulator> = None;
    let mut errors: Vec<String> = Vec::new();
    let mut saw_delivery = false;

    loop {
        let event = reader.read_event().map_err(|e| RoutingError::Xml {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "ServiceDelivery" => saw_delivery = true,
                    "TripResult" => current = Some(TripAccumulator::default()),
                    _ => {}
                }
                path.push(name);
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"TripResult" {
                    if let Some(trip) = current.take() {
                        trips.push(trip);
                    }
                }
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                let Some(tag) = path.last().map(String::as_str) else {
                    continue;
                };
                let parent = path.len().checked_sub(2).map(|i| path[i].as_str());

                if tag == "ErrorText" {
                    errors.push(text.to_string());
                    continue;
                }
                let Some(trip) = current.as_mut() else {
                    continue;
                };
                match (parent, tag) {
                    (Some("Trip"), "Duration") => trip.total = parse_iso_duration(text),
                    (_, "Duration") if path.iter().any(|p| p == "TripLeg") => {
                        trip.leg_sum += parse_iso_duration(text).unwrap_or(0.0);
                    }
                    (_, "IndividualMode") | (_, "PtMode") => push_unique(&mut trip.modes, text),
                    (Some("StopPointName"), "Text") => push_unique(&mut trip.stations, text),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if errors.iter().any(|e| e == ORIGIN_DESTINATION_IDENTICAL) {
        return Ok(TripResponse::default());
    }
    if errors.iter().any(|e| e == NO_TRIP_FOUND) {
        return Err(RoutingError::NoTripFound);
    }
    if !saw_delivery {
        return Err(RoutingError::Xml {
            message: "no service delivery in response".to_string(),
            body: Some(body.chars().take(500).collect()),
        });
    }

    trips
        .into_iter()
        .min_by(|a, b| a.duration().total_cmp(&b.duration()))
        .map(TripAccumulator::into_response)
        .ok_or(RoutingError::NoTripFound)
}

/// Parse an ISO-8601 duration such as `PT1H20M` or `P1DT30S` into seconds.
///
/// Returns `None` for anything that is not a day/time duration.
pub fn parse_iso_duration(s: &str) -> Option<f64> {
    let rest = s.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    if date.is_empty() && time.is_none_or(str::is_empty) {
        return None;
    }

    let mut secs = 0.0;
    secs += parse_components(date, &[('D', 86_400.0)])?;
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        secs += parse_components(time, &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)])?;
    }
    Some(secs)
}

/// Sum `number unit` pairs, requiring the units in the given order.
fn parse_components(s: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut next_unit = 0;

    for c in s.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let offset = units[next_unit..].iter().position(|(u, _)| *u == c)?;
        let (_, scale) = units[next_unit + offset];
        let value: f64 = number.parse().ok()?;
        total += value * scale;
        number.clear();
        next_unit += offset + 1;
    }

    number.is_empty().then_some(total)
}
