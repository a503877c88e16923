// Fixed constants. Anything a player might want to tune lives in `params::SimParams` instead.

// Simulation
pub const FIXED_DT: f32 = 1.0 / 60.0;
pub const DEFAULT_SEED: u64 = 42;

// Spatial index cell scales
pub const CREATURE_CELL_SCALE: f32 = 10.0;
pub const FOOD_CELL_SCALE: f32 = 10.0;
pub const PLANT_CELL_SCALE: f32 = 10.0;

// Neighbour lookups never use a smaller radius than this, so contact works even with no vision.
pub const MIN_QUERY_RADIUS: f32 = 10.0;
// Food closer than this to a plant blocks new growth on that plant.
pub const PLANT_OCCUPIED_RADIUS: f32 = 0.1;

// Sensors
pub const NUM_SENSORS: usize = 5;
pub const SENSOR_FOV: f32 = std::f32::consts::PI;
pub const SENSOR_OCCLUSION_MARGIN: f32 = 0.5;
pub const WALL_SAMPLES_PER_UNIT: f32 = 2.0;

// Contact
pub const MOUTH_CONE_DOT: f32 = 0.9;
pub const WALL_PROBE_RADIUS: i32 = 2;

// Brain IO: food, animal and wall sensors, depth fraction, outward alignment, bias.
pub const BRAIN_INPUTS: usize = NUM_SENSORS * 3 + 3;
pub const BRAIN_OUTPUTS: usize = 3;
pub const MUTATION_SUB_TRIALS: usize = 4;
pub const SYNAPSE_GROWTH_ATTEMPTS: usize = 5;
pub const INITIAL_SYNAPSES: usize = 3;

// Reproduction
pub const REPRODUCTION_ENERGY_FRACTION: f32 = 0.8;
pub const OFFSPRING_ENERGY_FRACTION: f32 = 0.79;
pub const REPRODUCTION_INTERVAL: f32 = 5.0;

// Creature defaults
pub const MIN_BODY_TRAIT: f32 = 0.1;
pub const SPAWN_AREA_FRACTION: f32 = 0.25;

// Food scatter
pub const SCATTER_RICH_CHANCE: f64 = 0.1;
pub const SCATTER_RICH_MULT: f32 = 10.0;

// Terrain noise
pub const TERRAIN_NOISE_SCALE: f64 = 25.0;
pub const PLANT_NOISE_SCALE: f64 = 100.0;
pub const SOLID_RING_WIDTH: f32 = 2.0;

// Persistence
pub const DATA_DIR: &str = "data";
pub const PARAMS_FILE: &str = "data/simulation_params.json";
pub const AUTOSAVE_FILE: &str = "data/terrarium_autosave.bin";
pub const SNAPSHOT_FILE: &str = "data/terrarium_save.bin";
pub const AUTOSAVE_INTERVAL: f64 = 300.0; // 5 minutes

// Stats
pub const STATS_SAMPLE_INTERVAL: u32 = 10;
pub const STATS_LOG_INTERVAL: u64 = 600;

// Camera
pub const CAMERA_ZOOM_MIN: f32 = 0.5;
pub const CAMERA_ZOOM_MAX: f32 = 40.0;
pub const CAMERA_PAN_SPEED: f32 = 600.0;
pub const CAMERA_ZOOM_SPEED: f32 = 0.1;
pub const CAMERA_SMOOTH_SPEED: f32 = 8.0;
pub const CAMERA_INITIAL_ZOOM: f32 = 4.0;
