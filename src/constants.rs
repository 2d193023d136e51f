pub const SCREEN_WIDTH_PX: u32 = 600;
pub const SCREEN_HEIGHT_PX: u32 = 400;
pub const CELL_SIZE_PX: u32 = 20;

pub const GRID_WIDTH: i32 = (SCREEN_WIDTH_PX / CELL_SIZE_PX) as i32;
pub const GRID_HEIGHT: i32 = (SCREEN_HEIGHT_PX / CELL_SIZE_PX) as i32;

pub const TICK_RATE: u32 = 10;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const OBSTACLE_INTERVAL_MS: u64 = 2_000;
pub const FOOD_REWARD: u32 = 5;
pub const OBSTACLE_PENALTY: u32 = 3;

/// Random probes before the spawner falls back to scanning every free cell.
pub const SPAWN_SAMPLE_ATTEMPTS: usize = 24;

pub const DEFAULT_HIGH_SCORE_PATH: &str = "highscore.txt";
pub const HIGH_SCORE_PATH_ENV: &str = "AUTOSNAKE_HIGHSCORE_PATH";

pub fn tick_ms_for_rate(tick_rate: u32) -> u64 {
    if tick_rate == 0 {
        return TICK_MS;
    }
    (1000 / tick_rate as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_matches_screen_geometry() {
        assert_eq!(GRID_WIDTH, 30);
        assert_eq!(GRID_HEIGHT, 20);
        assert_eq!(TICK_MS, 100);
    }

    #[test]
    fn tick_ms_for_rate_guards_degenerate_rates() {
        assert_eq!(tick_ms_for_rate(10), 100);
        assert_eq!(tick_ms_for_rate(0), TICK_MS);
        assert_eq!(tick_ms_for_rate(5_000), 1);
    }
}
