// green and institutional reserves
// sources in priority order: unused space, undersized blocks, perimeter fringe

use geo::{Area, MultiPolygon, Polygon};
use serde::Serialize;

use super::lots::Lot;
use super::poly::utils::{components, subtract, union_all};
use super::roads::Streets;
use crate::config::{FRINGE_MIN_AREA, GREEN_AREA_CAP_PCT, INSTITUTIONAL_AREA_CAP_PCT, UNUSED_SPACE_MIN_AREA};
use crate::systems::params::Parameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonKind {
    Green,
    Institutional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaSource {
    UnusedSpace,
    UndersizedBlock,
    Fringe,
}

#[derive(Debug, Clone)]
pub struct CommonArea {
    pub polygon: Polygon<f64>,
    pub area: f64,
    pub kind: CommonKind,
    pub source: AreaSource,
}

// requested areas and what has been handed out so far
#[derive(Debug, Clone, Copy)]
struct Quotas {
    green_target: f64,
    institutional_target: f64,
    green: f64,
    institutional: f64,
}

impl Quotas {
    fn new(total_area: f64, params: &Parameters) -> Self {
        let green_pct = params.green_area_pct.min(GREEN_AREA_CAP_PCT);
        let institutional_pct = params.institutional_area_pct.min(INSTITUTIONAL_AREA_CAP_PCT);
        Self {
            green_target: total_area * green_pct / 100.0,
            institutional_target: total_area * institutional_pct / 100.0,
            green: 0.0,
            institutional: 0.0,
        }
    }

    fn green_open(&self) -> bool {
        self.green < self.green_target
    }

    fn institutional_open(&self) -> bool {
        self.institutional < self.institutional_target
    }

    fn any_open(&self) -> bool {
        self.green_open() || self.institutional_open()
    }

    // parks first, then institutional, remainder back to green
    fn pick(&self) -> CommonKind {
        if !self.green_open() && self.institutional_open() {
            CommonKind::Institutional
        } else {
            CommonKind::Green
        }
    }

    fn record(&mut self, kind: CommonKind, area: f64) {
        match kind {
            CommonKind::Green => self.green += area,
            CommonKind::Institutional => self.institutional += area,
        }
    }
}

fn largest_first(parts: Vec<Polygon<f64>>) -> Vec<(Polygon<f64>, f64)> {
    let mut sized: Vec<_> = parts
        .into_iter()
        .map(|p| {
            let area = p.unsigned_area();
            (p, area)
        })
        .collect();
    sized.sort_by(|a, b| b.1.total_cmp(&a.1));
    sized
}

/// Assigns common areas from space no lot or street uses
///
/// # Returns
/// Green and institutional parcels, disjoint from lots, streets and each other
pub fn allocate(
    perimeter: &Polygon<f64>,
    internal: &Polygon<f64>,
    streets: &Streets,
    lots: &[Lot],
    undersized: Vec<Polygon<f64>>,
    params: &Parameters,
) -> Vec<CommonArea> {
    let mut quotas = Quotas::new(perimeter.unsigned_area(), params);
    let mut areas = Vec::new();

    // step 1: internal space claimed by nothing, only while a quota is open
    let taken = union_all(
        lots.iter()
            .map(|lot| lot.polygon.clone())
            .chain(streets.corridor().0.iter().cloned())
            .chain(undersized.iter().cloned()),
    );
    let unused = subtract(&MultiPolygon::new(vec![internal.clone()]), &taken);

    for (polygon, area) in largest_first(components(unused, UNUSED_SPACE_MIN_AREA)) {
        if !quotas.any_open() {
            break;
        }
        let kind = quotas.pick();
        quotas.record(kind, area);
        areas.push(CommonArea {
            polygon,
            area,
            kind,
            source: AreaSource::UnusedSpace,
        });
    }

    // step 2: undersized blocks are always reserved, the remainder going green
    for (polygon, area) in largest_first(undersized) {
        let kind = quotas.pick();
        quotas.record(kind, area);
        areas.push(CommonArea {
            polygon,
            area,
            kind,
            source: AreaSource::UndersizedBlock,
        });
    }

    // step 3: the outer ring left by the perimeter offset, only while a quota is open
    let outside = subtract(
        &MultiPolygon::new(vec![perimeter.clone()]),
        &MultiPolygon::new(vec![internal.clone()]),
    );
    let fringe = subtract(&outside, streets.corridor());

    for (polygon, area) in largest_first(components(fringe, FRINGE_MIN_AREA)) {
        if !quotas.any_open() {
            break;
        }
        let kind = quotas.pick();
        quotas.record(kind, area);
        areas.push(CommonArea {
            polygon,
            area,
            kind,
            source: AreaSource::Fringe,
        });
    }

    areas
}
