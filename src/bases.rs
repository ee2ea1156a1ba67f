//! Base names of the scraper application's requests.
//!
//! Each constant is registered with an operation; the watcher for it reacts
//! to `<BASE>_REQUESTED`.

/// Starts a scrape session.
pub const START_SCRAPE: &str = "START_SCRAPE";

/// Stops the running scrape session.
pub const STOP_SCRAPE: &str = "STOP_SCRAPE";

/// Polls progress of the running scrape session.
pub const POLL_PROGRESS: &str = "POLL_PROGRESS";

/// Fetches one scraped file by id.
pub const FETCH_FILE: &str = "FETCH_FILE";

/// Fetches the list of scraped files.
pub const FETCH_FILES_LIST: &str = "FETCH_FILES_LIST";

/// All application base names.
pub const ALL: [&str; 5] = [
    START_SCRAPE,
    STOP_SCRAPE,
    POLL_PROGRESS,
    FETCH_FILE,
    FETCH_FILES_LIST,
];
