use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CliniDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default address for the HTTP API.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8420";

/// Get the application data directory
/// ~/CliniDesk/ on all platforms (kept user-visible so clinics can back it up)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join("CliniDesk")
}

/// Path of the clinic database file.
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinidesk.db")
}

/// Bind address from `CLINIDESK_ADDR`, falling back to the default.
pub fn bind_addr() -> SocketAddr {
    std::env::var("CLINIDESK_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8420)))
        })
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinidesk=info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("CliniDesk"));
    }

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("clinidesk.db"));
    }

    #[test]
    fn default_bind_addr_parses() {
        let addr: SocketAddr = DEFAULT_BIND_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8420);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
