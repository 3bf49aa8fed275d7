//! Client events and actions.

use murmur_proto::{ClientMessage, ServerMessage};

use crate::{
    connection::ConnectionState, registrar::RegistrationState, timeline::TimelineEntry,
};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting transport lifecycle (opened, closed, failed)
/// - Firing reconnect timers it was asked to arm
/// - Forwarding decoded server frames in arrival order
/// - Forwarding user intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Start (or resume) connecting.
    Connect,

    /// Transport opened with an identifier known out of band.
    ///
    /// Transports that receive the `connect` handshake as a frame can forward
    /// it as `Inbound` instead.
    TransportOpened {
        /// Identifier assigned by the server.
        client_id: String,
    },

    /// Transport closed.
    TransportClosed {
        /// Close reason.
        reason: String,
    },

    /// Transport could not be opened.
    TransportFailed {
        /// Failure cause.
        cause: String,
    },

    /// A timer armed by `ScheduleReconnect` fired.
    ReconnectDue,

    /// Decoded frame from the server.
    Inbound(ServerMessage),

    /// User submitted a display name.
    SubmitName(String),

    /// User submitted chat text.
    SendMessage(String),

    /// Tear the client down.
    Shutdown,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the transport.
    OpenTransport,

    /// Close the transport.
    CloseTransport,

    /// Send a frame to the server.
    Send(ClientMessage),

    /// Arm a timer and feed `ReconnectDue` when it fires.
    ScheduleReconnect {
        /// 1-based reconnect attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: std::time::Duration,
    },

    /// Disarm the reconnect timer.
    CancelReconnect,

    /// Connection state changed.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
    },

    /// Registration state changed.
    RegistrationChanged(RegistrationState),

    /// Entry appended to the timeline.
    TimelineAppended(TimelineEntry),

    /// User-visible notice.
    Notice(String),
}
