//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Hostwatch database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Seed URLs whose pages were crawled
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    creation_time TEXT NOT NULL,
    modification_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_urls_creation_time ON urls(creation_time);

-- Observed (domain, ip) pairs with their running counter
CREATE TABLE IF NOT EXISTS domain_ip (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL CHECK (domain <> ''),
    ip TEXT NOT NULL CHECK (ip <> ''),
    counter INTEGER NOT NULL CHECK (counter >= 1),
    UNIQUE(domain, ip)
);

CREATE INDEX IF NOT EXISTS idx_domain_ip_counter ON domain_ip(counter);

-- Which seed URLs linked to which (domain, ip) pair
CREATE TABLE IF NOT EXISTS domain_ip_urls (
    domain_ip_id INTEGER NOT NULL REFERENCES domain_ip(id) ON DELETE CASCADE,
    url_id INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    PRIMARY KEY (domain_ip_id, url_id)
);

CREATE INDEX IF NOT EXISTS idx_domain_ip_urls_url ON domain_ip_urls(url_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
