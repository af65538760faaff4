//! The room HTTP contract consumed by the room controller.
//!
//! [`RoomService`] is the seam between the lifecycle logic and the backend.
//! `ApiClient` (feature `transport-http`) implements it over HTTP; tests
//! substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{CreateRoomRequest, Room, RoomId};

/// Room operations of the game API.
///
/// Every method surfaces application-level rejections (wrong password, not
/// allowed to start) as [`OceanSaverError::Http`](crate::error::OceanSaverError::Http).
#[async_trait]
pub trait RoomService: Send + Sync + 'static {
    /// `GET /games/rooms`
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// `POST /games/rooms`
    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room>;

    /// `GET /games/rooms/{id}`
    async fn get_room(&self, room_id: RoomId) -> Result<Room>;

    /// `PATCH /games/rooms/{id}`; `password` is sent as `null` for public rooms.
    ///
    /// The response body is not interpreted; fetch the room afterwards to see
    /// the new membership.
    async fn join_room(&self, room_id: RoomId, password: Option<&str>) -> Result<()>;

    /// `PATCH /games/{id}`. Any success status (including `204`) counts as accepted.
    async fn start_game(&self, room_id: RoomId) -> Result<()>;
}
