//! Human-readable labels for Waze alert types and subtypes.
//!
//! Source: Waze for Cities partner documentation, "Traffic alerts" data
//! elements.

/// Label for an alert type (`ACCIDENT`, `HAZARD`, ...).
pub fn alert_type_label(alert_type: &str) -> Option<&'static str> {
    let label = match alert_type {
        "ACCIDENT" => "Accident",
        "JAM" => "Traffic Jam",
        "WEATHERHAZARD" => "Weather Hazard",
        "HAZARD" => "Hazard",
        "MISC" => "Miscellaneous",
        "CONSTRUCTION" => "Construction",
        "ROAD_CLOSED" => "Road Closed",
        _ => return None,
    };
    Some(label)
}

/// Label for an alert subtype (`HAZARD_ON_ROAD_POT_HOLE`, ...).
pub fn alert_subtype_label(subtype: &str) -> Option<&'static str> {
    let label = match subtype {
        "ACCIDENT_MINOR" => "Minor Accident",
        "ACCIDENT_MAJOR" => "Major Accident",
        "JAM_MODERATE_TRAFFIC" => "Moderate Traffic",
        "JAM_HEAVY_TRAFFIC" => "Heavy Traffic",
        "JAM_STAND_STILL_TRAFFIC" => "Standstill Traffic",
        "JAM_LIGHT_TRAFFIC" => "Light Traffic",
        "HAZARD_ON_ROAD" => "Hazard on Road",
        "HAZARD_ON_SHOULDER" => "Hazard on Shoulder",
        "HAZARD_WEATHER" => "Weather Hazard",
        "HAZARD_ON_ROAD_POT_HOLE" => "Pothole",
        "HAZARD_ON_ROAD_OBJECT" => "Object on Road",
        "HAZARD_ON_ROAD_ROAD_KILL" => "Roadkill",
        "HAZARD_ON_SHOULDER_CAR_STOPPED" => "Car Stopped on Shoulder",
        "HAZARD_ON_SHOULDER_ANIMALS" => "Animals on Shoulder",
        "HAZARD_ON_SHOULDER_MISSING_SIGN" => "Missing Sign on Shoulder",
        "HAZARD_WEATHER_FOG" => "Fog",
        "HAZARD_WEATHER_HAIL" => "Hail",
        "HAZARD_WEATHER_HEAVY_RAIN" => "Heavy Rain",
        "HAZARD_WEATHER_HEAVY_SNOW" => "Heavy Snow",
        "HAZARD_WEATHER_FLOOD" => "Flood",
        "HAZARD_WEATHER_MONSOON" => "Monsoon",
        "HAZARD_WEATHER_TORNADO" => "Tornado",
        "HAZARD_WEATHER_HEAT_WAVE" => "Heat Wave",
        "HAZARD_WEATHER_HURRICANE" => "Hurricane",
        "HAZARD_WEATHER_FREEZING_RAIN" => "Freezing Rain",
        "HAZARD_ON_ROAD_LANE_CLOSED" => "Lane Closed",
        "HAZARD_ON_ROAD_OIL" => "Oil on Road",
        "HAZARD_ON_ROAD_ICE" => "Ice on Road",
        "HAZARD_ON_ROAD_CONSTRUCTION" => "Construction on Road",
        "HAZARD_ON_ROAD_CAR_STOPPED" => "Car Stopped on Road",
        "HAZARD_ON_ROAD_TRAFFIC_LIGHT_FAULT" => "Traffic Light Fault",
        "ROAD_CLOSED_HAZARD" => "Road Closed due to Hazard",
        "ROAD_CLOSED_CONSTRUCTION" => "Road Closed due to Construction",
        "ROAD_CLOSED_EVENT" => "Road Closed due to Event",
        _ => return None,
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_have_labels() {
        assert_eq!(alert_type_label("ACCIDENT"), Some("Accident"));
        assert_eq!(alert_type_label("ROAD_CLOSED"), Some("Road Closed"));
        assert_eq!(alert_type_label("WEATHERHAZARD"), Some("Weather Hazard"));
    }

    #[test]
    fn known_subtypes_have_labels() {
        assert_eq!(alert_subtype_label("HAZARD_ON_ROAD_POT_HOLE"), Some("Pothole"));
        assert_eq!(
            alert_subtype_label("ROAD_CLOSED_EVENT"),
            Some("Road Closed due to Event")
        );
    }

    #[test]
    fn lookups_are_case_sensitive() {
        assert_eq!(alert_type_label("accident"), None);
        assert_eq!(alert_subtype_label("hazard_on_road"), None);
    }

    #[test]
    fn unknown_tokens_have_no_label() {
        assert_eq!(alert_type_label("POLICE"), None);
        assert_eq!(alert_subtype_label("POLICE_HIDING"), None);
        assert_eq!(alert_type_label(""), None);
    }
}
