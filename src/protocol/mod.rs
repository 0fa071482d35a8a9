//! Wire contract shared by the host and the render surface.
//!
//! - `snapshot` - `Locator` and `DocumentSnapshot`
//! - `message` - tagged message enums for both directions
//! - `payload` - data URI encoding of resource bytes

pub mod message;
pub mod payload;
pub mod snapshot;

pub use message::{HostMessage, RequestId, SurfaceMessage};
pub use payload::{PayloadError, Resource, decode_data_uri, encode_data_uri};
pub use snapshot::{DocumentSnapshot, Locator};
