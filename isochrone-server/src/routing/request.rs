//! OJP trip request construction.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use geo::Point;

use crate::domain::Mode;

/// Requestor reference sent with every request.
const REQUESTOR_REF: &str = "isochrone-server";

/// When the trip must happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeConstraint {
    /// Arrive at the destination no later than this.
    ArriveBy(DateTime<Utc>),
    /// Leave the origin no earlier than this.
    DepartAt(DateTime<Utc>),
}

/// One trip to route.
#[derive(Debug, Clone, PartialEq)]
pub struct TripQuery {
    pub origin: Point<f64>,
    pub destination: Point<f64>,
    pub mode: Mode,
    pub time: TimeConstraint,
    pub requested_at: DateTime<Utc>,
    pub num_results: u8,
}

impl TripQuery {
    pub fn new(
        origin: Point<f64>,
        destination: Point<f64>,
        mode: Mode,
        time: TimeConstraint,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            origin,
            destination,
            mode,
            time,
            requested_at,
            num_results: 1,
        }
    }

    /// Render as an OJP 2020 `OJPTripRequest` document.
    ///
    /// The individual transport mode is the vehicle routed on the main leg.
    /// Shared-vehicle modes are requested through an `Extension` block.
    pub fn to_xml(&self) -> String {
        let ts = format_time(self.requested_at);
        let (dep, arr) = match self.time {
            TimeConstraint::DepartAt(t) => (Some(format_time(t)), None),
            TimeConstraint::ArriveBy(t) => (None, Some(format_time(t))),
        };

        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<OJP xmlns="http://www.siri.org.uk/siri" xmlns:ojp="http://www.vdv.de/ojp" version="1.0">"#,
        );
        let _ = write!(
            xml,
            "<OJPRequest><ServiceRequest>\
             <RequestTimestamp>{ts}</RequestTimestamp>\
             <RequestorRef>{REQUESTOR_REF}</RequestorRef>\
             <ojp:OJPTripRequest>\
             <RequestTimestamp>{ts}</RequestTimestamp>"
        );
        write_place(&mut xml, "Origin", self.origin, dep.as_deref());
        write_place(&mut xml, "Destination", self.destination, arr.as_deref());
        let _ = write!(
            xml,
            "<ojp:Params>\
             <ojp:NumberOfResults>{}</ojp:NumberOfResults>\
             <ojp:IncludeTrackSections>false</ojp:IncludeTrackSections>\
             <ojp:IncludeLegProjection>false</ojp:IncludeLegProjection>\
             <ojp:IncludeTurnDescription>false</ojp:IncludeTurnDescription>\
             <ojp:IncludeIntermediateStops>false</ojp:IncludeIntermediateStops>\
             <ojp:UseRealtimeData>explanatory</ojp:UseRealtimeData>",
            self.num_results
        );
        xml.push_str(&mode_xml(self.mode));
        xml.push_str("</ojp:Params></ojp:OJPTripRequest></ServiceRequest></OJPRequest></OJP>");
        xml
    }
}

fn write_place(xml: &mut String, tag: &str, p: Point<f64>, time: Option<&str>) {
    let _ = write!(
        xml,
        "<ojp:{tag}><ojp:PlaceRef>\
         <ojp:GeoPosition><Longitude>{:.6}</Longitude><Latitude>{:.6}</Latitude></ojp:GeoPosition>\
         <ojp:LocationName><ojp:Text>{tag}</ojp:Text></ojp:LocationName>\
         </ojp:PlaceRef>",
        p.x(),
        p.y()
    );
    if let Some(t) = time {
        let _ = write!(xml, "<ojp:DepArrTime>{t}</ojp:DepArrTime>");
    }
    let _ = write!(xml, "</ojp:{tag}>");
}

/// Mode block for the request parameters.
fn mode_xml(mode: Mode) -> String {
    let inner = format!(
        "<ojp:ItModesToCover>{}</ojp:ItModesToCover>",
        mode.vehicle().as_str()
    );
    if mode.is_rental() {
        format!("<ojp:Extension>{inner}</ojp:Extension>")
    } else {
        inner
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(mode: Mode, time: TimeConstraint) -> TripQuery {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();
        TripQuery::new(
            Point::new(8.5402, 47.3782),
            Point::new(8.5605, 47.3901),
            mode,
            time,
            now,
        )
    }

    #[test]
    fn arrive_by_sits_on_destination() {
        let arr = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        let xml = query(Mode::Walk, TimeConstraint::ArriveBy(arr)).to_xml();

        assert!(xml.contains("<RequestTimestamp>2025-03-15T09:00:00Z</RequestTimestamp>"));
        let dest = xml.find("<ojp:Destination>").unwrap();
        let time = xml.find("<ojp:DepArrTime>2025-03-15T10:00:00Z").unwrap();
        assert!(time > dest);
        assert!(xml.contains("<Longitude>8.540200</Longitude>"));
        assert!(xml.contains("<ojp:ItModesToCover>walk</ojp:ItModesToCover>"));
    }

    #[test]
    fn rental_modes_use_extension() {
        let dep = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        let xml = query(Mode::CarSharing, TimeConstraint::DepartAt(dep)).to_xml();
        assert!(xml.contains(
            "<ojp:Extension><ojp:ItModesToCover>self-drive-car</ojp:ItModesToCover></ojp:Extension>"
        ));

        let origin = xml.find("<ojp:Origin>").unwrap();
        let dest = xml.find("<ojp:Destination>").unwrap();
        let time = xml.find("<ojp:DepArrTime>").unwrap();
        assert!(origin < time && time < dest);
    }

    #[test]
    fn request_is_well_formed() {
        let dep = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        let xml = query(Mode::Cycle, TimeConstraint::DepartAt(dep)).to_xml();
        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut depth = 0i32;
        loop {
            match reader.read_event().unwrap() {
                quick_xml::events::Event::Start(_) => depth += 1,
                quick_xml::events::Event::End(_) => depth -= 1,
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(depth, 0);
    }
}
