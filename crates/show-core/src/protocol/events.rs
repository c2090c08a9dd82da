//! Named events exchanged between the client and the controller.
//!
//! | Event                | Direction               | Arguments        |
//! |----------------------|-------------------------|------------------|
//! | `listScenes`         | client → controller, ack | none            |
//! | `loadScene`          | client → controller, ack | `sceneId`       |
//! | `playScene`          | client → controller      | `sceneId`       |
//! | `showMedia`          | controller → client      | `{mediaObject}` |
//! | `mediaTransitioning` | client → controller      | `mediaObjectId` |
//! | `mediaDone`          | client → controller      | `mediaObjectId` |

use std::fmt;

/// Which side originates an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the client.
    Outbound,
    /// Pushed by the controller.
    Inbound,
}

/// Every event name the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    ListScenes,
    LoadScene,
    PlayScene,
    ShowMedia,
    MediaTransitioning,
    MediaDone,
}

impl EventName {
    /// All known events, in protocol order.
    pub const ALL: [EventName; 6] = [
        EventName::ListScenes,
        EventName::LoadScene,
        EventName::PlayScene,
        EventName::ShowMedia,
        EventName::MediaTransitioning,
        EventName::MediaDone,
    ];

    /// The name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::ListScenes => "listScenes",
            EventName::LoadScene => "loadScene",
            EventName::PlayScene => "playScene",
            EventName::ShowMedia => "showMedia",
            EventName::MediaTransitioning => "mediaTransitioning",
            EventName::MediaDone => "mediaDone",
        }
    }

    /// Looks up a wire name.  Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    /// Which side sends this event.
    pub fn direction(self) -> Direction {
        match self {
            EventName::ShowMedia => Direction::Inbound,
            _ => Direction::Outbound,
        }
    }

    /// `true` for the outbound requests whose reply arrives as an ack.
    pub fn expects_ack(self) -> bool {
        matches!(self, EventName::ListScenes | EventName::LoadScene)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
