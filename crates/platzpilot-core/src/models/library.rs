use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Weekly opening-hours table.
///
/// Each day holds a list of `(open, close)` pairs in `"HH:MM"` format,
/// in the order the server reports them. An empty list means the location
/// is closed that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(rename = "Monday", default)]
    pub monday: Vec<(String, String)>,
    #[serde(rename = "Tuesday", default)]
    pub tuesday: Vec<(String, String)>,
    #[serde(rename = "Wednesday", default)]
    pub wednesday: Vec<(String, String)>,
    #[serde(rename = "Thursday", default)]
    pub thursday: Vec<(String, String)>,
    #[serde(rename = "Friday", default)]
    pub friday: Vec<(String, String)>,
    #[serde(rename = "Saturday", default)]
    pub saturday: Vec<(String, String)>,
    #[serde(rename = "Sunday", default)]
    pub sunday: Vec<(String, String)>,
}

impl OpeningHours {
    /// Intervals for the given weekday.
    pub fn for_weekday(&self, weekday: Weekday) -> &[(String, String)] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }
}

/// One library location as reported by the server.
///
/// There is no surrogate id: `(long_name, geo_coordinates)` together act as
/// the natural key for favoriting and deduplication. The coordinate pair is
/// kept as the opaque string the server sends, since it is only ever compared
/// for equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub long_name: String,
    pub url: Option<String>,
    pub building: Option<String>,
    pub level: Option<String>,
    pub room: Option<String>,
    pub geo_coordinates: String,
    pub available_seats: u32,
    pub opening_hours: OpeningHours,
    #[serde(default)]
    pub sub_locations: Vec<String>,
    /// Free seats right now. The server does not guarantee this stays at or
    /// below `available_seats`; consumers must tolerate over-capacity values.
    pub free_seats_currently: u32,
    /// Short-horizon seat-count predictions, if the server provides them.
    #[serde(default)]
    pub predictions: Vec<f64>,
    #[serde(default)]
    pub is_closed: bool,
}

impl Library {
    /// Whether two records refer to the same physical location.
    pub fn same_location(&self, other: &Library) -> bool {
        self.long_name == other.long_name && self.geo_coordinates == other.geo_coordinates
    }
}
