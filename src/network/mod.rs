//! Network Layer
//!
//! Everything that talks to the matchmaking platform: the transport seam,
//! the lifecycle controller driving it, and the service task that
//! serializes access to the controller.

pub mod auth;
pub mod lifecycle;
pub mod loopback;
pub mod protocol;
pub mod service;
pub mod transport;

pub use auth::{player_id_for, LocalPlayer};
pub use lifecycle::{
    ControllerConfig, LifecycleState, MatchController, MatchError, TransportErrorPolicy,
};
pub use loopback::{LoopbackTransport, TransportCall, TransportOp};
pub use protocol::{MatchRequest, PlatformNotification, TurnTimeout};
pub use service::{MatchHandle, MatchService, ServiceError};
pub use transport::{MatchTransport, TransportError};
