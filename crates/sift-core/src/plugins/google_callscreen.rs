//! Google CallScreen transcripts (`Transcript` table of the Android Phone
//! app's call screening database).

use serde::{Deserialize, Serialize};

use crate::coerce::{EpochKind, Timestamp};
use crate::container::Row;
use crate::event::EventData;
use crate::plugin::{Mediator, PluginDescriptor, RowError, RowHandler, SqlitePlugin};

const NAME: &str = "google_callscreen";
const PARSE_CALLS_ROW: &str = "parse_calls_row";

/// One screened call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallScreenEvent {
    /// Transcript text.
    pub conversation: Option<String>,
    pub audio_recording_file_path: Option<String>,
    pub start_time: Option<Timestamp>,
}

impl EventData for CallScreenEvent {
    const DATA_TYPE: &'static str = "android:google:callscreen";
}

/// The JSON document stored in `Transcript.conversation`.
#[derive(Debug, Deserialize)]
struct ConversationPayload {
    convo_text: Option<String>,
}

pub struct GoogleCallScreenPlugin {
    descriptor: PluginDescriptor,
}

impl GoogleCallScreenPlugin {
    pub fn new() -> Self {
        let descriptor = PluginDescriptor::new(NAME, "Google CallScreen database file")
            .require("Transcript", ["id", "conversation", "audioRecordingFilePath"])
            .query(
                "SELECT id AS timestamp, conversation, audioRecordingFilePath FROM Transcript",
                PARSE_CALLS_ROW,
            )
            .schema([
                (
                    "Transcript",
                    "CREATE TABLE Transcript (id TEXT NOT NULL, conversation BLOB, \
                     audioRecordingFilePath TEXT, isRated INTEGER NOT NULL, \
                     revelioCallType INTEGER, lastModifiedMillis INTEGER NOT NULL, \
                     callScreenFeedbackData BLOB, PRIMARY KEY(id))",
                ),
                ("android_metadata", "CREATE TABLE android_metadata (locale TEXT)"),
                (
                    "room_master_table",
                    "CREATE TABLE room_master_table (id INTEGER PRIMARY KEY,identity_hash TEXT)",
                ),
            ]);
        Self { descriptor }
    }

    /// The transcript id doubles as the call's POSIX start time.
    fn parse_calls_row(&self, row: &Row, mediator: &Mediator<'_>) -> Result<(), RowError> {
        let payload: Option<ConversationPayload> = row.get_json("conversation")?;
        let event = CallScreenEvent {
            conversation: payload.and_then(|p| p.convo_text),
            audio_recording_file_path: row.get_string("audioRecordingFilePath")?,
            start_time: row.get_date_time("timestamp", EpochKind::Posix)?,
        };
        mediator.produce(row, &event)
    }
}

impl Default for GoogleCallScreenPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RowHandler for GoogleCallScreenPlugin {
    fn handles(&self, handler: &str) -> bool {
        handler == PARSE_CALLS_ROW
    }

    fn handle_row(
        &self,
        handler: &str,
        _query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        match handler {
            PARSE_CALLS_ROW => self.parse_calls_row(row, mediator),
            other => Err(RowError::Handler(format!("unknown handler '{other}'"))),
        }
    }
}

impl SqlitePlugin for GoogleCallScreenPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}
