// parameter validation, every raw option collapses into a range-safe Parameters value

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::errors::EngineError;

/// A raw option value as it arrives from a form, a file or the command line
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl RawValue {
    /// Maps a JSON value onto a raw option
    /// # Returns `None` for nulls, arrays and objects, which count as missing
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number),
            serde_json::Value::String(s) => Some(RawValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(RawValue::Text(b.to_string())),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

// lowercase and drop separators so "N-S", "n_s" and "N S" compare equal
fn option_key(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '/'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Grid orientation for the rectangular road families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreferredAxis {
    #[default]
    Auto,
    NorthSouth,
    EastWest,
    NortheastSouthwest,
    NorthwestSoutheast,
}

impl PreferredAxis {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "auto" | "automatic" => Some(Self::Auto),
            "ns" | "northsouth" => Some(Self::NorthSouth),
            "ew" | "eastwest" => Some(Self::EastWest),
            "nesw" | "northeastsouthwest" => Some(Self::NortheastSouthwest),
            "nwse" | "northwestsoutheast" => Some(Self::NorthwestSoutheast),
            _ => None,
        }
    }

    /// Fixed grid angle in radians, `None` when the axis follows the parcel
    pub fn angle(self) -> Option<f64> {
        use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
        match self {
            Self::Auto => None,
            Self::NorthSouth => Some(0.0),
            Self::EastWest => Some(FRAC_PI_2),
            Self::NortheastSouthwest => Some(FRAC_PI_4),
            Self::NorthwestSoutheast => Some(3.0 * FRAC_PI_4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeTolerance {
    Low,
    Medium,
    #[default]
    High,
}

impl ShapeTolerance {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CreativeFreedom {
    Conservative,
    #[default]
    Moderate,
    Creative,
    Maximum,
}

impl CreativeFreedom {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "conservative" => Some(Self::Conservative),
            "moderate" => Some(Self::Moderate),
            "creative" => Some(Self::Creative),
            "maximum" | "max" => Some(Self::Maximum),
            _ => None,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Self::Conservative => 0.2,
            Self::Moderate => 0.4,
            Self::Creative => 0.7,
            Self::Maximum => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LotDensity {
    Low,
    Medium,
    #[default]
    High,
    Maximum,
}

impl LotDensity {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "maximum" | "max" => Some(Self::Maximum),
            _ => None,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Self::Low => 0.6,
            Self::Medium => 0.8,
            Self::High => 1.0,
            Self::Maximum => 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CornerStrategy {
    #[default]
    Auto,
    WiderFrontage,
    NarrowerFrontage,
    LargerArea,
}

impl CornerStrategy {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "auto" | "automatic" => Some(Self::Auto),
            "widerfrontage" | "wider" => Some(Self::WiderFrontage),
            "narrowerfrontage" | "narrower" => Some(Self::NarrowerFrontage),
            "largerarea" | "larger" => Some(Self::LargerArea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoadShapeMode {
    #[default]
    Rectangular,
    Varied,
    Experimental,
    FullyFree,
}

impl RoadShapeMode {
    fn parse(text: &str) -> Option<Self> {
        match option_key(text).as_str() {
            "rectangular" => Some(Self::Rectangular),
            "varied" => Some(Self::Varied),
            "experimental" => Some(Self::Experimental),
            "fullyfree" | "free" => Some(Self::FullyFree),
            _ => None,
        }
    }
}

/// Range and default of one numeric option
#[derive(Debug, Clone, Copy)]
pub struct NumericRange {
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    const fn new(default: f64, min: f64, max: f64) -> Self {
        Self { default, min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

// name, default, lower bound, upper bound
pub const NUMERIC_OPTIONS: [(&str, NumericRange); 15] = [
    ("road_width", NumericRange::new(ROAD_WIDTH, 1.0, 50.0)),
    ("sidewalk_width", NumericRange::new(SIDEWALK_WIDTH, 0.0, 20.0)),
    ("max_block_depth", NumericRange::new(MAX_BLOCK_DEPTH, 10.0, 500.0)),
    ("min_lot_area", NumericRange::new(MIN_LOT_AREA, 50.0, 5000.0)),
    ("max_lot_area", NumericRange::new(MAX_LOT_AREA, 50.0, 50000.0)),
    ("preferred_lot_area", NumericRange::new(PREFERRED_LOT_AREA, 50.0, 50000.0)),
    ("min_lot_frontage", NumericRange::new(MIN_LOT_FRONTAGE, 3.0, 100.0)),
    ("max_lot_frontage", NumericRange::new(MAX_LOT_FRONTAGE, 3.0, 100.0)),
    ("preferred_lot_frontage", NumericRange::new(PREFERRED_LOT_FRONTAGE, 3.0, 100.0)),
    ("default_lot_width", NumericRange::new(DEFAULT_LOT_WIDTH, 5.0, 100.0)),
    ("default_lot_depth", NumericRange::new(DEFAULT_LOT_DEPTH, 10.0, 200.0)),
    ("min_lot_depth", NumericRange::new(MIN_LOT_DEPTH, 5.0, 200.0)),
    ("max_lot_depth", NumericRange::new(MAX_LOT_DEPTH, 5.0, 200.0)),
    ("green_area_pct", NumericRange::new(GREEN_AREA_PCT, 0.0, 100.0)),
    ("institutional_area_pct", NumericRange::new(INSTITUTIONAL_AREA_PCT, 0.0, 100.0)),
];

pub const ENUM_OPTIONS: [&str; 6] = [
    "preferred_axis",
    "shape_tolerance",
    "creative_freedom",
    "lot_density",
    "corner_strategy",
    "road_shape_mode",
];

/// Validated subdivision parameters, every numeric field finite and within range
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub road_width: f64,
    pub sidewalk_width: f64,
    pub max_block_depth: f64,
    pub preferred_axis: PreferredAxis,
    pub min_lot_area: f64,
    pub max_lot_area: f64,
    pub preferred_lot_area: f64,
    pub min_lot_frontage: f64,
    pub max_lot_frontage: f64,
    pub preferred_lot_frontage: f64,
    pub default_lot_width: f64,
    pub default_lot_depth: f64,
    pub min_lot_depth: f64,
    pub max_lot_depth: f64,
    pub green_area_pct: f64,
    pub institutional_area_pct: f64,
    pub shape_tolerance: ShapeTolerance,
    pub creative_freedom: CreativeFreedom,
    pub lot_density: LotDensity,
    pub corner_strategy: CornerStrategy,
    pub road_shape_mode: RoadShapeMode,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            road_width: ROAD_WIDTH,
            sidewalk_width: SIDEWALK_WIDTH,
            max_block_depth: MAX_BLOCK_DEPTH,
            preferred_axis: PreferredAxis::default(),
            min_lot_area: MIN_LOT_AREA,
            max_lot_area: MAX_LOT_AREA,
            preferred_lot_area: PREFERRED_LOT_AREA,
            min_lot_frontage: MIN_LOT_FRONTAGE,
            max_lot_frontage: MAX_LOT_FRONTAGE,
            preferred_lot_frontage: PREFERRED_LOT_FRONTAGE,
            default_lot_width: DEFAULT_LOT_WIDTH,
            default_lot_depth: DEFAULT_LOT_DEPTH,
            min_lot_depth: MIN_LOT_DEPTH,
            max_lot_depth: MAX_LOT_DEPTH,
            green_area_pct: GREEN_AREA_PCT,
            institutional_area_pct: INSTITUTIONAL_AREA_PCT,
            shape_tolerance: ShapeTolerance::default(),
            creative_freedom: CreativeFreedom::default(),
            lot_density: LotDensity::default(),
            corner_strategy: CornerStrategy::default(),
            road_shape_mode: RoadShapeMode::default(),
        }
    }
}

impl Parameters {
    fn numeric_mut(&mut self, name: &str) -> Option<&mut f64> {
        let field = match name {
            "road_width" => &mut self.road_width,
            "sidewalk_width" => &mut self.sidewalk_width,
            "max_block_depth" => &mut self.max_block_depth,
            "min_lot_area" => &mut self.min_lot_area,
            "max_lot_area" => &mut self.max_lot_area,
            "preferred_lot_area" => &mut self.preferred_lot_area,
            "min_lot_frontage" => &mut self.min_lot_frontage,
            "max_lot_frontage" => &mut self.max_lot_frontage,
            "preferred_lot_frontage" => &mut self.preferred_lot_frontage,
            "default_lot_width" => &mut self.default_lot_width,
            "default_lot_depth" => &mut self.default_lot_depth,
            "min_lot_depth" => &mut self.min_lot_depth,
            "max_lot_depth" => &mut self.max_lot_depth,
            "green_area_pct" => &mut self.green_area_pct,
            "institutional_area_pct" => &mut self.institutional_area_pct,
            _ => return None,
        };
        Some(field)
    }

    /// Half of the full street reservation, used as the perimeter offset
    pub fn street_offset(&self) -> f64 {
        (self.road_width + 2.0 * self.sidewalk_width) / 2.0
    }

    /// (frontage, depth) pair used for corner lots
    pub fn corner_dimensions(&self) -> (f64, f64) {
        match self.corner_strategy {
            CornerStrategy::Auto => (self.preferred_lot_frontage, self.default_lot_depth),
            CornerStrategy::WiderFrontage => (self.max_lot_frontage, self.min_lot_depth),
            CornerStrategy::NarrowerFrontage => (self.min_lot_frontage, self.max_lot_depth),
            CornerStrategy::LargerArea => (self.preferred_lot_frontage, self.max_lot_depth),
        }
    }

    /// Mean depth (area over frontage) a residual lot needs, relaxed by the shape tolerance
    pub fn min_residual_depth(&self) -> f64 {
        self.min_lot_depth * (1.0 - self.shape_tolerance.factor())
    }

    /// Depth border lots try first
    pub fn preferred_lot_depth(&self) -> f64 {
        self.default_lot_depth
            .clamp(self.min_lot_depth, self.max_lot_depth)
    }

    // keep min <= preferred <= max for the three lot triples
    fn reconcile(&mut self) {
        self.max_lot_area = self.max_lot_area.max(self.min_lot_area);
        self.preferred_lot_area = self
            .preferred_lot_area
            .clamp(self.min_lot_area, self.max_lot_area);
        self.max_lot_frontage = self.max_lot_frontage.max(self.min_lot_frontage);
        self.preferred_lot_frontage = self
            .preferred_lot_frontage
            .clamp(self.min_lot_frontage, self.max_lot_frontage);
        self.max_lot_depth = self.max_lot_depth.max(self.min_lot_depth);
    }
}

// parse a number the way a form user would type it, comma or dot decimal
fn parse_number(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse::<f64>().ok()
}

/// Validates raw options without reporting, the engine path
///
/// # Returns
/// A fully populated Parameters value; never fails
pub fn validate(raw: &HashMap<String, RawValue>) -> Parameters {
    validate_reporting(raw).0
}

/// Validates raw options and reports unparseable values, the interactive path
///
/// # Returns
/// The validated Parameters and one `InvalidParameter` per value that fell back to its default
/// because it could not be understood. NaN, infinities and out-of-range numbers are corrected silently.
pub fn validate_reporting(raw: &HashMap<String, RawValue>) -> (Parameters, Vec<EngineError>) {
    let mut params = Parameters::default();
    let mut reports = Vec::new();

    for (name, range) in NUMERIC_OPTIONS.iter() {
        let Some(value) = raw.get(*name) else {
            continue;
        };

        let number = match value {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(text) => {
                let parsed = parse_number(text);
                if parsed.is_none() {
                    reports.push(EngineError::InvalidParameter {
                        name: name.to_string(),
                        value: value.describe(),
                        reason: "not a number".to_string(),
                    });
                }
                parsed
            }
        };

        let resolved = match number {
            Some(n) if n.is_finite() => range.clamp(n),
            _ => range.default,
        };

        if let Some(field) = params.numeric_mut(name) {
            *field = resolved;
        }
    }

    for name in ENUM_OPTIONS {
        let Some(value) = raw.get(name) else {
            continue;
        };

        let text = match value {
            RawValue::Text(text) => text.as_str(),
            RawValue::Number(_) => {
                reports.push(EngineError::InvalidParameter {
                    name: name.to_string(),
                    value: value.describe(),
                    reason: "expected an option name".to_string(),
                });
                continue;
            }
        };

        let accepted = match name {
            "preferred_axis" => PreferredAxis::parse(text).map(|v| params.preferred_axis = v),
            "shape_tolerance" => ShapeTolerance::parse(text).map(|v| params.shape_tolerance = v),
            "creative_freedom" => CreativeFreedom::parse(text).map(|v| params.creative_freedom = v),
            "lot_density" => LotDensity::parse(text).map(|v| params.lot_density = v),
            "corner_strategy" => CornerStrategy::parse(text).map(|v| params.corner_strategy = v),
            "road_shape_mode" => RoadShapeMode::parse(text).map(|v| params.road_shape_mode = v),
            _ => None,
        };

        if accepted.is_none() {
            reports.push(EngineError::InvalidParameter {
                name: name.to_string(),
                value: value.describe(),
                reason: "unknown option".to_string(),
            });
        }
    }

    params.reconcile();
    (params, reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, RawValue)]) -> HashMap<String, RawValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_options_take_defaults() {
        let params = validate(&HashMap::new());
        assert_eq!(params, Parameters::default());
        assert_eq!(params.road_width, 8.0);
        assert_eq!(params.sidewalk_width, 2.0);
        assert_eq!(params.road_shape_mode, RoadShapeMode::Rectangular);
    }

    #[test]
    fn nan_and_infinity_fall_back_silently() {
        let (params, reports) = validate_reporting(&raw(&[
            ("road_width", RawValue::Number(f64::NAN)),
            ("min_lot_area", RawValue::Number(f64::INFINITY)),
        ]));
        assert_eq!(params.road_width, 8.0);
        assert_eq!(params.min_lot_area, 200.0);
        assert!(reports.is_empty());
    }

    #[test]
    fn comma_decimal_is_accepted() {
        let params = validate(&raw(&[("road_width", "10,5".into())]));
        assert_eq!(params.road_width, 10.5);
    }

    #[test]
    fn unparseable_text_is_reported_and_defaulted() {
        let (params, reports) = validate_reporting(&raw(&[("sidewalk_width", "wide".into())]));
        assert_eq!(params.sidewalk_width, 2.0);
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            &reports[0],
            EngineError::InvalidParameter { name, .. } if name == "sidewalk_width"
        ));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let params = validate(&raw(&[
            ("road_width", RawValue::Number(-4.0)),
            ("max_block_depth", RawValue::Number(10_000.0)),
            ("green_area_pct", RawValue::Number(-1.0)),
        ]));
        assert_eq!(params.road_width, 1.0);
        assert_eq!(params.max_block_depth, 500.0);
        assert_eq!(params.green_area_pct, 0.0);
    }

    #[test]
    fn every_numeric_field_stays_finite_and_in_range() {
        let garbage: HashMap<String, RawValue> = NUMERIC_OPTIONS
            .iter()
            .map(|(name, _)| (name.to_string(), RawValue::Number(f64::NEG_INFINITY)))
            .collect();
        let mut params = validate(&garbage);
        for (name, range) in NUMERIC_OPTIONS.iter() {
            let value = *params.numeric_mut(name).unwrap();
            assert!(value.is_finite(), "{name}");
            assert!(value >= range.min && value <= range.max, "{name} = {value}");
        }
        assert!(params.road_width >= 0.1);
    }

    #[test]
    fn enum_names_are_forgiving() {
        let params = validate(&raw(&[
            ("preferred_axis", "n-s".into()),
            ("corner_strategy", "Wider Frontage".into()),
            ("road_shape_mode", "fully_free".into()),
            ("lot_density", "MAXIMUM".into()),
        ]));
        assert_eq!(params.preferred_axis, PreferredAxis::NorthSouth);
        assert_eq!(params.corner_strategy, CornerStrategy::WiderFrontage);
        assert_eq!(params.road_shape_mode, RoadShapeMode::FullyFree);
        assert_eq!(params.lot_density.factor(), 1.3);
    }

    #[test]
    fn wrong_type_for_enum_is_reported() {
        let (params, reports) = validate_reporting(&raw(&[
            ("creative_freedom", RawValue::Number(3.0)),
            ("shape_tolerance", "sideways".into()),
        ]));
        assert_eq!(params.creative_freedom, CreativeFreedom::Moderate);
        assert_eq!(params.shape_tolerance, ShapeTolerance::High);
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn unknown_options_are_ignored() {
        let (params, reports) = validate_reporting(&raw(&[("lamp_posts", "many".into())]));
        assert_eq!(params, Parameters::default());
        assert!(reports.is_empty());
    }

    #[test]
    fn lot_triples_are_reconciled() {
        let params = validate(&raw(&[
            ("min_lot_frontage", RawValue::Number(30.0)),
            ("min_lot_depth", RawValue::Number(50.0)),
        ]));
        assert_eq!(params.max_lot_frontage, 30.0);
        assert_eq!(params.preferred_lot_frontage, 30.0);
        assert_eq!(params.max_lot_depth, 50.0);
        assert_eq!(params.preferred_lot_depth(), 50.0);
    }

    #[test]
    fn corner_dimensions_follow_strategy() {
        let mut params = Parameters::default();
        assert_eq!(params.corner_dimensions(), (12.0, 30.0));
        params.corner_strategy = CornerStrategy::WiderFrontage;
        assert_eq!(params.corner_dimensions(), (20.0, 15.0));
        params.corner_strategy = CornerStrategy::NarrowerFrontage;
        assert_eq!(params.corner_dimensions(), (8.0, 40.0));
        params.corner_strategy = CornerStrategy::LargerArea;
        assert_eq!(params.corner_dimensions(), (12.0, 40.0));
    }

    #[test]
    fn json_values_map_to_raw_options() {
        let value: serde_json::Value = serde_json::json!({"a": 2.5, "b": "E-W", "c": null});
        assert_eq!(RawValue::from_json(&value["a"]), Some(RawValue::Number(2.5)));
        assert_eq!(RawValue::from_json(&value["b"]), Some(RawValue::Text("E-W".into())));
        assert_eq!(RawValue::from_json(&value["c"]), None);
    }
}
