//! Twitter for Android (`<user id>-*.db`): searches, statuses and contacts.
//! All timestamps are Java time (milliseconds since 1970).

use serde::{Deserialize, Serialize};

use crate::coerce::{EpochKind, Timestamp};
use crate::container::Row;
use crate::event::EventData;
use crate::plugin::{Mediator, PluginDescriptor, RowError, RowHandler, SqlitePlugin};

const NAME: &str = "twitter_android";
const PARSE_SEARCH_ROW: &str = "parse_search_row";
const PARSE_STATUS_ROW: &str = "parse_status_row";
const PARSE_CONTACT_ROW: &str = "parse_contact_row";

const SEARCH_QUERY: &str = "SELECT name, query, time FROM search_queries";

const STATUS_QUERY: &str = "SELECT statuses._id AS _id, statuses.author_id AS author_id, \
     users.username AS username, statuses.content AS content, \
     statuses.created AS time, statuses.favorited AS favorited, \
     statuses.retweeted AS retweeted FROM statuses LEFT JOIN users ON \
     statuses.author_id = users.user_id";

const CONTACT_QUERY: &str = "SELECT _id, user_id, username, name, profile_created, description, \
     web_url, location, followers, friends, statuses, image_url, updated, \
     friendship_time FROM users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterSearchEvent {
    pub creation_time: Option<Timestamp>,
    pub name: Option<String>,
    pub search_query: Option<String>,
    pub query: String,
}

impl EventData for TwitterSearchEvent {
    const DATA_TYPE: &'static str = "android:twitter:search";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterStatusEvent {
    pub author_identifier: Option<i64>,
    pub content: Option<String>,
    pub creation_time: Option<Timestamp>,
    pub favorited: Option<i64>,
    pub identifier: Option<i64>,
    pub retweeted: Option<i64>,
    /// Author's handle. Absent when the author is not in `users`.
    pub username: Option<String>,
    pub query: String,
}

impl EventData for TwitterStatusEvent {
    const DATA_TYPE: &'static str = "android:twitter:status";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterContactEvent {
    pub creation_time: Option<Timestamp>,
    pub description: Option<String>,
    pub followers: Option<i64>,
    pub friends: Option<i64>,
    pub friendship_time: Option<Timestamp>,
    pub identifier: Option<i64>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub modification_time: Option<Timestamp>,
    pub name: Option<String>,
    pub statuses: Option<i64>,
    pub user_identifier: Option<i64>,
    pub username: Option<String>,
    pub web_url: Option<String>,
    pub query: String,
}

impl EventData for TwitterContactEvent {
    const DATA_TYPE: &'static str = "android:twitter:contact";
}

fn java_time(row: &Row, field: &str) -> Result<Option<Timestamp>, RowError> {
    Ok(row.get_date_time(field, EpochKind::PosixMillis)?)
}

pub struct TwitterAndroidPlugin {
    descriptor: PluginDescriptor,
}

impl TwitterAndroidPlugin {
    pub fn new() -> Self {
        let descriptor = PluginDescriptor::new(NAME, "Twitter on Android SQLite database file")
            .require("search_queries", ["name", "query", "time"])
            .require(
                "statuses",
                ["_id", "author_id", "content", "created", "favorited", "retweeted"],
            )
            .require(
                "users",
                [
                    "username",
                    "user_id",
                    "_id",
                    "name",
                    "profile_created",
                    "description",
                    "web_url",
                    "location",
                    "followers",
                    "friends",
                    "statuses",
                    "image_url",
                    "updated",
                    "friendship_time",
                ],
            )
            .query(SEARCH_QUERY, PARSE_SEARCH_ROW)
            .query(STATUS_QUERY, PARSE_STATUS_ROW)
            .query(CONTACT_QUERY, PARSE_CONTACT_ROW)
            // Only the tables the queries read; the app has many more.
            .schema([
                (
                    "search_queries",
                    "CREATE TABLE search_queries (_id INTEGER PRIMARY KEY,type INT,name TEXT \
                     NOT NULL,query TEXT NOT NULL,query_id INT,time INT,latitude REAL,longitude \
                     REAL,radius REAL,location TEXT,pc BLOB,cluster_titles BLOB)",
                ),
                (
                    "statuses",
                    "CREATE TABLE statuses (_id INTEGER PRIMARY KEY,status_id INT UNIQUE NOT \
                     NULL,author_id INT,content TEXT,source TEXT,created INT,in_r_user_id \
                     INT,in_r_status_id INT,favorited INT,latitude TEXT,longitude TEXT,place_data \
                     BLOB,entities TEXT,retweet_count INT,r_content TEXT,cards BLOB,flags \
                     INT,favorite_count INT,lang TEXT,supplemental_language TEXT,view_count \
                     INT,quoted_tweet_data BLOB,quoted_tweet_id INT,retweeted INT)",
                ),
                (
                    "users",
                    "CREATE TABLE users (_id INTEGER PRIMARY KEY,user_id INT UNIQUE NOT \
                     NULL,username TEXT,name TEXT,description TEXT,web_url TEXT,bg_color \
                     INT,location TEXT,structured_location BLOB,user_flags INT,followers \
                     INT,fast_followers INT DEFAULT 0,friends INT,statuses INT,profile_created \
                     INT,image_url TEXT,hash INT,updated INT,friendship INT,friendship_time \
                     INT,favorites INT DEFAULT 0,header_url TEXT,description_entities \
                     BLOB,url_entities BLOB,media_count INT,extended_profile_fields \
                     BLOB,pinned_tweet_id INT,link_color INT,advertiser_type \
                     TEXT,business_profile_state TEXT)",
                ),
            ]);
        Self { descriptor }
    }

    fn parse_search_row(
        &self,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        let event = TwitterSearchEvent {
            creation_time: java_time(row, "time")?,
            name: row.get_string("name")?,
            search_query: row.get_string("query")?,
            query: query.to_string(),
        };
        mediator.produce(row, &event)
    }

    fn parse_status_row(
        &self,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        let event = TwitterStatusEvent {
            author_identifier: row.get_integer("author_id")?,
            content: row.get_string("content")?,
            creation_time: java_time(row, "time")?,
            favorited: row.get_integer("favorited")?,
            identifier: row.get_integer("_id")?,
            retweeted: row.get_integer("retweeted")?,
            username: row.get_string("username")?,
            query: query.to_string(),
        };
        mediator.produce(row, &event)
    }

    fn parse_contact_row(
        &self,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        let event = TwitterContactEvent {
            creation_time: java_time(row, "profile_created")?,
            description: row.get_string("description")?,
            followers: row.get_integer("followers")?,
            friends: row.get_integer("friends")?,
            friendship_time: java_time(row, "friendship_time")?,
            identifier: row.get_integer("_id")?,
            image_url: row.get_string("image_url")?,
            location: row.get_string("location")?,
            modification_time: java_time(row, "updated")?,
            name: row.get_string("name")?,
            statuses: row.get_integer("statuses")?,
            user_identifier: row.get_integer("user_id")?,
            username: row.get_string("username")?,
            web_url: row.get_string("web_url")?,
            query: query.to_string(),
        };
        mediator.produce(row, &event)
    }
}

impl Default for TwitterAndroidPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RowHandler for TwitterAndroidPlugin {
    fn handles(&self, handler: &str) -> bool {
        matches!(
            handler,
            PARSE_SEARCH_ROW | PARSE_STATUS_ROW | PARSE_CONTACT_ROW
        )
    }

    fn handle_row(
        &self,
        handler: &str,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        match handler {
            PARSE_SEARCH_ROW => self.parse_search_row(query, row, mediator),
            PARSE_STATUS_ROW => self.parse_status_row(query, row, mediator),
            PARSE_CONTACT_ROW => self.parse_contact_row(query, row, mediator),
            other => Err(RowError::Handler(format!("unknown handler '{other}'"))),
        }
    }
}

impl SqlitePlugin for TwitterAndroidPlugin {
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

    fn twitter_db() -> SqliteContainer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE search_queries (_id INTEGER PRIMARY KEY, name TEXT, query TEXT, time INT);
             CREATE TABLE statuses (_id INTEGER PRIMARY KEY, author_id INT, content TEXT, \
                 created INT, favorited INT, retweeted INT);
             CREATE TABLE users (_id INTEGER PRIMARY KEY, user_id INT, username TEXT, name TEXT, \
                 profile_created INT, description TEXT, web_url TEXT, location TEXT, \
                 followers INT, friends INT, statuses INT, image_url TEXT, updated INT, \
                 friendship_time INT);
             INSERT INTO search_queries VALUES (1, 'rust', 'rust lang', 1457771210000);
             INSERT INTO users VALUES (1, 42, 'ferris', 'Ferris', 1300000000000, 'crab', \
                 NULL, 'sea', 10, 5, 100, NULL, 1457771210000, NULL);
             INSERT INTO statuses VALUES (1, 42, 'hello', 1457771210000, 0, 1);
             INSERT INTO statuses VALUES (2, 7, 'orphan', 1457771211000, 1, 0);",
        )
        .unwrap();
        SqliteContainer::from_connection(conn, "twitter.db")
    }

    fn run() -> MemorySink {
        let plugin = TwitterAndroidPlugin::new();
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();
        let report = QueryDispatcher::new(&twitter_db(), &sink, DispatchOptions::default(), &cancel)
            .run(&plugin)
            .unwrap();
        assert!(report.is_clean());
        sink
    }

    #[test]
    fn test_search() {
        let sink = run();
        let searches = sink.records_of(TwitterSearchEvent::DATA_TYPE);
        assert_eq!(searches.len(), 1);
        let event: TwitterSearchEvent = searches[0].decode().unwrap().unwrap();
        assert_eq!(event.search_query.as_deref(), Some("rust lang"));
        assert_eq!(event.creation_time.unwrap().posix_seconds(), 1_457_771_210);
        assert_eq!(event.query, SEARCH_QUERY);
    }

    #[test]
    fn test_status_left_join() {
        let sink = run();
        let statuses: Vec<TwitterStatusEvent> = sink
            .records_of(TwitterStatusEvent::DATA_TYPE)
            .iter()
            .map(|r| r.decode().unwrap().unwrap())
            .collect();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].username.as_deref(), Some("ferris"));
        assert_eq!(statuses[0].retweeted, Some(1));
        assert_eq!(statuses[1].username, None);
        assert_eq!(statuses[1].author_identifier, Some(7));
    }

    #[test]
    fn test_contact() {
        let sink = run();
        let contacts = sink.records_of(TwitterContactEvent::DATA_TYPE);
        assert_eq!(contacts.len(), 1);
        let event: TwitterContactEvent = contacts[0].decode().unwrap().unwrap();
        assert_eq!(event.user_identifier, Some(42));
        assert_eq!(event.friendship_time, None);
        assert_eq!(event.web_url, None);
        assert_eq!(event.creation_time.unwrap().posix_seconds(), 1_300_000_000);
    }

    #[test]
    fn test_query_hashes_distinguish_queries() {
        let sink = run();
        let records = sink.records();
        let search_hash = records[0].query_hash();
        assert!(records[1..].iter().all(|r| r.query_hash() != search_hash));
    }
}
