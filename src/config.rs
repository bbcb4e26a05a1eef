// config.rs
const DEFAULT_SYNC_INTERVAL_HOURS: u64 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id: String,
    pub credentials_path: String,
    pub sync_interval_hours: u64,
}

impl Config {
    pub fn init() -> Config {
        let spreadsheet_id = std::env::var("SPREADSHEET_ID").expect("SPREADSHEET_ID must be set");
        let credentials_path = std::env::var("GOOGLE_CREDENTIALS_PATH")
            .unwrap_or_else(|_| "credentials.json".to_string());
        let sync_interval_hours =
            parse_sync_interval_hours(std::env::var("SYNC_INTERVAL_HOURS").ok());

        Config {
            spreadsheet_id,
            credentials_path,
            sync_interval_hours,
        }
    }
}

/// A zero interval would make the periodic timer unusable, so zero falls
/// back to the default exactly like unset or unparseable input.
fn parse_sync_interval_hours(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&hours| hours > 0)
        .unwrap_or(DEFAULT_SYNC_INTERVAL_HOURS)
}
