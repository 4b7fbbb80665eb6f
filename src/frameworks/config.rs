use std::{env, time::Duration};

// Runtime/server configuration read from the environment (.env is loaded first).

pub const DEFAULT_ROSTER: [&str; 5] = ["Artemis", "Titanic", "Enterprise", "Firefly", "Nebukadnezar"];

// Messages buffered per client before updates for that client are dropped.
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

pub fn http_port() -> u16 {
    env::var("VESSEL_SYNC_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Fleet registered at startup, from `VESSEL_ROSTER` (comma separated).
pub fn vessel_roster() -> Vec<String> {
    env::var("VESSEL_ROSTER")
        .ok()
        .map(|value| parse_roster(&value))
        .filter(|roster| !roster.is_empty())
        .unwrap_or_else(|| DEFAULT_ROSTER.iter().map(|n| n.to_string()).collect())
}

pub fn broadcast_tick() -> Duration {
    let millis = env::var("BROADCAST_TICK_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .unwrap_or(100);
    Duration::from_millis(millis)
}

pub fn parse_roster(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
