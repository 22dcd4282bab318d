//! Kathmandu valley road segments and signalised junctions.

use crate::models::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub name: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
}

impl Road {
    pub fn new(name: &str, start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            start: GeoPoint::new(start.0, start.1),
            end: GeoPoint::new(end.0, end.1),
        }
    }

    /// Linear interpolation between the endpoints; `t` = 0 is the start.
    pub fn point_at(&self, t: f64) -> GeoPoint {
        GeoPoint::new(
            self.start.lat + t * (self.end.lat - self.start.lat),
            self.start.lng + t * (self.end.lng - self.start.lng),
        )
    }

    /// Bearing of end-minus-start in degrees, normalised to [0, 360).
    pub fn heading(&self) -> f64 {
        let dlat = self.end.lat - self.start.lat;
        let dlng = self.end.lng - self.start.lng;
        dlng.atan2(dlat).to_degrees().rem_euclid(360.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSite {
    pub name: &'static str,
    pub position: GeoPoint,
}

pub fn default_roads() -> Vec<Road> {
    vec![
        Road::new("Ring Road North", (27.7300, 85.3100), (27.7300, 85.3400)),
        Road::new("Ring Road South", (27.6900, 85.3100), (27.6900, 85.3400)),
        Road::new("Ring Road East", (27.6950, 85.3450), (27.7300, 85.3450)),
        Road::new("Ring Road West", (27.6950, 85.2850), (27.7300, 85.2850)),
        Road::new("Durbar Marg", (27.7120, 85.3140), (27.7200, 85.3200)),
        Road::new("Kantipath", (27.7050, 85.3150), (27.7200, 85.3150)),
        Road::new("Maharajgunj", (27.7250, 85.3250), (27.7350, 85.3350)),
        Road::new("Balaju", (27.7250, 85.3050), (27.7350, 85.3100)),
        Road::new("Kalanki", (27.6950, 85.2800), (27.7050, 85.3000)),
        Road::new("Koteshwor", (27.6750, 85.3400), (27.6900, 85.3500)),
        Road::new("New Baneshwor", (27.6900, 85.3300), (27.7000, 85.3400)),
        Road::new("Thamel", (27.7150, 85.3100), (27.7220, 85.3150)),
        Road::new("Lazimpat", (27.7200, 85.3200), (27.7280, 85.3250)),
        Road::new("Patan Dhoka", (27.6750, 85.3200), (27.6850, 85.3280)),
        Road::new("Satdobato", (27.6600, 85.3250), (27.6750, 85.3300)),
        Road::new("Chabahil", (27.7180, 85.3400), (27.7250, 85.3480)),
    ]
}

pub const SIGNAL_SITES: [SignalSite; 10] = [
    SignalSite { name: "Kalanki Chowk", position: GeoPoint::new(27.6934, 85.2815) },
    SignalSite { name: "Koteshwor Chowk", position: GeoPoint::new(27.6790, 85.3490) },
    SignalSite { name: "Maharajgunj Chowk", position: GeoPoint::new(27.7268, 85.3275) },
    SignalSite { name: "Thapathali", position: GeoPoint::new(27.6950, 85.3200) },
    SignalSite { name: "Baneshwor Chowk", position: GeoPoint::new(27.6930, 85.3370) },
    SignalSite { name: "Chabahil Chowk", position: GeoPoint::new(27.7195, 85.3425) },
    SignalSite { name: "Balaju Chowk", position: GeoPoint::new(27.7275, 85.3070) },
    SignalSite { name: "Thamel Chowk", position: GeoPoint::new(27.7160, 85.3120) },
    SignalSite { name: "Satdobato Chowk", position: GeoPoint::new(27.6650, 85.3260) },
    SignalSite { name: "Patan Gate", position: GeoPoint::new(27.6780, 85.3230) },
];
