//! Android WebView cookie store (`webview.db`).

use serde::{Deserialize, Serialize};

use crate::coerce::{EpochKind, Timestamp};
use crate::container::Row;
use crate::event::EventData;
use crate::plugin::{Mediator, PluginDescriptor, RowError, RowHandler, SqlitePlugin};

const NAME: &str = "android_webview";
const PARSE_COOKIE_ROW: &str = "parse_cookie_row";

/// When a cookie stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiration {
    /// Session cookie or no expiry recorded.
    Never,
    At(Timestamp),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebViewCookieEvent {
    pub cookie_name: Option<String>,
    pub data: Option<String>,
    pub expiration_time: Expiration,
    /// Cookie domain with any leading dot removed.
    pub host: Option<String>,
    pub path: Option<String>,
    pub secure: Option<bool>,
    pub url: Option<String>,
    /// `_id` of the cookie row.
    pub offset: Option<i64>,
    pub query: String,
}

impl EventData for WebViewCookieEvent {
    const DATA_TYPE: &'static str = "android:webview:cookie";
}

pub struct AndroidWebViewPlugin {
    descriptor: PluginDescriptor,
}

impl AndroidWebViewPlugin {
    pub fn new() -> Self {
        let descriptor = PluginDescriptor::new(NAME, "Android WebView SQLite database file")
            .require("android_metadata", Vec::<String>::new())
            .require(
                "cookies",
                ["_id", "name", "value", "domain", "expires", "path", "secure"],
            )
            .query(
                "SELECT _id, name, value, domain, expires, path, secure FROM cookies",
                PARSE_COOKIE_ROW,
            )
            .schema([
                ("android_metadata", "CREATE TABLE android_metadata (locale TEXT)"),
                (
                    "cookies",
                    "CREATE TABLE cookies (_id INTEGER PRIMARY KEY, name TEXT, value TEXT, \
                     domain TEXT, path TEXT, expires INTEGER, secure INTEGER)",
                ),
                (
                    "formdata",
                    "CREATE TABLE formdata (_id INTEGER PRIMARY KEY, urlid INTEGER, name TEXT, \
                     value TEXT, UNIQUE (urlid, name, value) ON CONFLICT IGNORE)",
                ),
                ("formurl", "CREATE TABLE formurl (_id INTEGER PRIMARY KEY, url TEXT)"),
                (
                    "httpauth",
                    "CREATE TABLE httpauth (_id INTEGER PRIMARY KEY, host TEXT, realm TEXT, \
                     username TEXT, password TEXT, UNIQUE (host, realm) ON CONFLICT REPLACE)",
                ),
                (
                    "password",
                    "CREATE TABLE password (_id INTEGER PRIMARY KEY, host TEXT, username TEXT, \
                     password TEXT, UNIQUE (host, username) ON CONFLICT REPLACE)",
                ),
            ]);
        Self { descriptor }
    }

    fn parse_cookie_row(
        &self,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        // 0 and NULL both mean the cookie never expires.
        let expiration_time = match row.get_integer("expires")? {
            None | Some(0) => Expiration::Never,
            Some(_) => row
                .get_date_time("expires", EpochKind::PosixMillis)?
                .map_or(Expiration::Never, Expiration::At),
        };

        let host = row
            .get_string("domain")?
            .map(|d| d.strip_prefix('.').map(str::to_string).unwrap_or(d));
        let path = row.get_string("path")?;
        let secure = row.get_bool("secure")?;
        let url = cookie_url(secure, host.as_deref(), path.as_deref());

        let event = WebViewCookieEvent {
            cookie_name: row.get_string("name")?,
            data: row.get_string("value")?,
            expiration_time,
            host,
            path,
            secure,
            url,
            offset: row.get_integer("_id")?,
            query: query.to_string(),
        };
        mediator.produce(row, &event)
    }
}

/// URL the cookie applies to. Needs both host and path.
fn cookie_url(secure: Option<bool>, host: Option<&str>, path: Option<&str>) -> Option<String> {
    let scheme = if secure == Some(true) { "https" } else { "http" };
    Some(format!("{scheme}://{}{}", host?, path?))
}

impl Default for AndroidWebViewPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RowHandler for AndroidWebViewPlugin {
    fn handles(&self, handler: &str) -> bool {
        handler == PARSE_COOKIE_ROW
    }

    fn handle_row(
        &self,
        handler: &str,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        match handler {
            PARSE_COOKIE_ROW => self.parse_cookie_row(query, row, mediator),
            other => Err(RowError::Handler(format!("unknown handler '{other}'"))),
        }
    }
}

impl SqlitePlugin for AndroidWebViewPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SqliteContainer;
    use crate::dispatch::{CancellationToken, DispatchOptions, QueryDispatcher};
    use crate::sink::MemorySink;
    use rusqlite::Connection;

    fn webview_db() -> SqliteContainer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE android_metadata (locale TEXT);
             CREATE TABLE cookies (_id INTEGER PRIMARY KEY, name TEXT, value TEXT, \
                 domain TEXT, path TEXT, expires INTEGER, secure INTEGER);
             INSERT INTO cookies VALUES (1, 'SID', 'abc', '.example.com', '/', 1457771210000, 1);
             INSERT INTO cookies VALUES (2, 'pref', 'x', 'example.org', '/app', 0, 0);
             INSERT INTO cookies VALUES (3, 'tmp', 'y', 'example.net', NULL, NULL, NULL);",
        )
        .unwrap();
        SqliteContainer::from_connection(conn, "webview.db")
    }

    fn run() -> Vec<WebViewCookieEvent> {
        let plugin = AndroidWebViewPlugin::new();
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();
        QueryDispatcher::new(&webview_db(), &sink, DispatchOptions::default(), &cancel)
            .run(&plugin)
            .unwrap();
        sink.records_of(WebViewCookieEvent::DATA_TYPE)
            .iter()
            .map(|r| r.decode().unwrap().unwrap())
            .collect()
    }

    #[test]
    fn test_secure_cookie() {
        let events = run();
        assert_eq!(events.len(), 3);
        let sid = &events[0];
        assert_eq!(sid.host.as_deref(), Some("example.com"));
        assert_eq!(sid.url.as_deref(), Some("https://example.com/"));
        assert_eq!(sid.offset, Some(1));
        match sid.expiration_time {
            Expiration::At(t) => assert_eq!(t.posix_seconds(), 1_457_771_210),
            Expiration::Never => panic!("expected an expiry"),
        }
        assert!(sid.query.starts_with("SELECT _id"));
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let events = run();
        assert_eq!(events[1].expiration_time, Expiration::Never);
        assert_eq!(events[1].url.as_deref(), Some("http://example.org/app"));
    }

    #[test]
    fn test_nulls_stay_absent() {
        let events = run();
        let tmp = &events[2];
        assert_eq!(tmp.expiration_time, Expiration::Never);
        assert_eq!(tmp.secure, None);
        assert_eq!(tmp.path, None);
        assert_eq!(tmp.url, None);
    }

    #[test]
    fn test_cookie_url() {
        assert_eq!(
            cookie_url(Some(true), Some("a.com"), Some("/x")).as_deref(),
            Some("https://a.com/x")
        );
        assert_eq!(cookie_url(None, Some("a.com"), Some("/")).as_deref(), Some("http://a.com/"));
        assert_eq!(cookie_url(Some(true), None, Some("/")), None);
    }
}
