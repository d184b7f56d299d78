use std::path::PathBuf;

use chrono::NaiveTime;

use crate::engine::SlotCatalog;

/// Runtime settings, read from `COURTBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// First bookable hour of the day (0-23), UTC like every reservation time.
    pub open_hour: u32,
    /// Hour the facility closes (1-24). 24 means midnight.
    pub close_hour: u32,
    pub slot_minutes: u32,
    /// WAL appends after which the compactor rewrites the log.
    pub compact_threshold: u64,
    /// Seconds between completion sweeps.
    pub sweep_secs: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            open_hour: 12,
            close_hour: 20,
            slot_minutes: 60,
            compact_threshold: 1000,
            sweep_secs: 60,
            metrics_port: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Absent or unparseable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_dir: std::env::var("COURTBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            open_hour: env_parse("COURTBOOK_OPEN_HOUR").unwrap_or(d.open_hour),
            close_hour: env_parse("COURTBOOK_CLOSE_HOUR").unwrap_or(d.close_hour),
            slot_minutes: env_parse("COURTBOOK_SLOT_MINUTES").unwrap_or(d.slot_minutes),
            compact_threshold: env_parse("COURTBOOK_COMPACT_THRESHOLD")
                .unwrap_or(d.compact_threshold),
            sweep_secs: env_parse("COURTBOOK_SWEEP_SECS").unwrap_or(d.sweep_secs),
            metrics_port: env_parse("COURTBOOK_METRICS_PORT"),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }

    /// The operating window as a slot catalog. The window must be non-empty
    /// and divide evenly into slots.
    pub fn slot_catalog(&self) -> Result<SlotCatalog, String> {
        if self.open_hour >= self.close_hour || self.close_hour > 24 {
            return Err(format!(
                "invalid operating window {}:00-{}:00",
                self.open_hour, self.close_hour
            ));
        }
        let window = (self.close_hour - self.open_hour) * 60;
        if self.slot_minutes == 0 || window % self.slot_minutes != 0 {
            return Err(format!(
                "slot length {} min does not divide the {window} min operating window",
                self.slot_minutes
            ));
        }
        let open = NaiveTime::from_hms_opt(self.open_hour, 0, 0)
            .ok_or_else(|| format!("invalid open hour {}", self.open_hour))?;
        SlotCatalog::new(open, window / self.slot_minutes, self.slot_minutes)
    }
}
