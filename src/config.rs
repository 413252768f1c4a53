// Configuration file, all measurements in drawing units (1 unit = 1 meter)
// This controls the default parameter settings and the engine thresholds

// Street parameters (meters)
pub const ROAD_WIDTH: f64 = 8.0;            // Carriageway width
pub const SIDEWALK_WIDTH: f64 = 2.0;        // Sidewalk width on each side of a road
pub const MAX_BLOCK_DEPTH: f64 = 80.0;      // Spacing target between parallel roads

// Lot parameters (from the municipal planning defaults)
pub const MIN_LOT_AREA: f64 = 200.0;        // Minimum lot area (m2)
pub const MAX_LOT_AREA: f64 = 600.0;        // Maximum lot area (m2)
pub const PREFERRED_LOT_AREA: f64 = 300.0;  // Preferred lot area (m2)
pub const MIN_LOT_FRONTAGE: f64 = 8.0;
pub const MAX_LOT_FRONTAGE: f64 = 20.0;
pub const PREFERRED_LOT_FRONTAGE: f64 = 12.0;
pub const DEFAULT_LOT_WIDTH: f64 = 12.0;
pub const DEFAULT_LOT_DEPTH: f64 = 30.0;
pub const MIN_LOT_DEPTH: f64 = 15.0;
pub const MAX_LOT_DEPTH: f64 = 40.0;

// Common area targets (percent of total perimeter area)
pub const GREEN_AREA_PCT: f64 = 15.0;
pub const INSTITUTIONAL_AREA_PCT: f64 = 5.0;
pub const GREEN_AREA_CAP_PCT: f64 = 50.0;
pub const INSTITUTIONAL_AREA_CAP_PCT: f64 = 30.0;

// Perimeter normalization
pub const VERTEX_MERGE_DISTANCE: f64 = 1e-9;  // consecutive vertices closer than this are duplicates
pub const MIN_POLYGON_AREA: f64 = 1e-9;       // anything below is a degenerate ring
pub const OFFSET_RETRY_FACTORS: [f64; 6] = [1.0, 0.8, 0.6, 0.4, 0.2, 0.1];
pub const DISC_SEGMENTS: usize = 16;          // round joins are approximated by this many sides

// Road generation
pub const ROAD_LINE_EXTENSION: f64 = 10.0;    // grid lines overshoot the bounding box by this much
pub const RING_SEGMENTS: usize = 32;          // concentric roads are drawn as this many sides
pub const MIN_ROAD_LENGTH: f64 = 1e-6;
pub const SLIVER_AREA: f64 = 1e-6;            // boolean residue below this is not a polygon
pub const RANDOM_CHORD_THRESHOLD: f64 = 0.7;  // creative freedom above this enables random chords

// Block and lot thresholds (multiples of min_lot_area)
pub const BLOCK_AREA_FACTOR: f64 = 3.0;        // smallest block worth subdividing
pub const SINGLE_LOT_FACTOR: f64 = 2.0;        // below this a block is one lot or nothing
pub const TERMINAL_PART_FACTOR: f64 = 3.0;     // bisection stops below this
pub const UNDERSIZED_BLOCK_FACTOR: f64 = 4.0;  // lotless blocks below this feed the allocator
pub const TRIANGLE_GROUP_TOLERANCE: f64 = 0.8; // merged triangles may fall this short of min area
pub const MAX_TRIANGULATION_VERTICES: usize = 6;
pub const UNDERSIZED_MIN_AREA: f64 = 1.0;

// Geometry tolerances
pub const BLOCK_ACCESS_TOLERANCE: f64 = 2.0;  // block counts as reachable within this distance
pub const FRONTAGE_TOLERANCE: f64 = 5.0;      // lot edge counts as frontage within this distance
pub const CORNER_ANGLE_MAX: f64 = 150.0;      // degrees, vertices below this are corners
pub const CORNER_LOT_ANGLE_MAX: f64 = 120.0;  // degrees, only sharper corners get a corner lot
pub const BORDER_DEPTH_FACTORS: [f64; 4] = [1.0, 0.8, 0.6, 1.2];

// Common area filters (m2)
pub const UNUSED_SPACE_MIN_AREA: f64 = 50.0;
pub const FRINGE_MIN_AREA: f64 = 100.0;

// Subdivision parameters
pub const MAX_RECURSION_DEPTH: usize = 12;
