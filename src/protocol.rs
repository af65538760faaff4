//! Wire types for the Ocean Saver game API.
//!
//! Field names follow the server's camelCase JSON. A few server quirks are
//! absorbed here so callers never see them:
//!
//! - rooms are identified by `roomId`, but some endpoints send `id`
//! - score entries label their team with `name` or `teamName`
//! - a score entry without `score` counts as zero

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Numeric room identifier.
pub type RoomId = u64;

/// Numeric trash submission identifier.
pub type TrashId = u64;

// ── Teams ───────────────────────────────────────────────────────────

/// One of the two battle sides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TeamLabel {
    /// Team "A".
    A,
    /// Team "B".
    B,
}

impl TeamLabel {
    /// Both labels in display order.
    pub const ALL: [TeamLabel; 2] = [TeamLabel::A, TeamLabel::B];

    /// Wire representation (`"A"` or `"B"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Exact, case-sensitive match against a wire label.
    pub fn from_wire(label: &str) -> Option<Self> {
        match label {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            _ => None,
        }
    }
}

impl fmt::Display for TeamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A team inside a room. Owned by its [`Room`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Optional backend identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Team label.
    pub team_name: TeamLabel,
    /// Maximum number of members.
    pub max_members: u32,
    /// Member nicknames in join order.
    #[serde(default)]
    pub users: Vec<String>,
}

impl Team {
    /// Returns `true` when no further member can join.
    pub fn is_full(&self) -> bool {
        self.users.len() >= self.max_members as usize
    }

    /// Returns `true` if `nickname` is a member of this team.
    pub fn contains(&self, nickname: &str) -> bool {
        self.users.iter().any(|u| u == nickname)
    }
}

// ── Rooms ───────────────────────────────────────────────────────────

/// A battle room as returned by `GET /games/rooms/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RoomWire")]
pub struct Room {
    /// Room identifier (`roomId`, or `id` on older endpoints).
    pub room_id: RoomId,
    /// Display title.
    pub title: String,
    /// Whether joining requires a password.
    #[serde(default)]
    pub is_private: bool,
    /// Nickname of the host.
    pub host_name: String,
    /// The two teams, in display order.
    #[serde(default)]
    pub teams: Vec<Team>,
}

/// Room as it arrives on the wire. Builds may send `roomId`, `id`, or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomWire {
    #[serde(default)]
    room_id: Option<RoomId>,
    #[serde(default)]
    id: Option<RoomId>,
    title: String,
    #[serde(default)]
    is_private: bool,
    host_name: String,
    #[serde(default)]
    teams: Vec<Team>,
}

impl TryFrom<RoomWire> for Room {
    type Error = String;

    fn try_from(wire: RoomWire) -> Result<Self, Self::Error> {
        let room_id = wire
            .room_id
            .or(wire.id)
            .ok_or_else(|| "missing field `roomId`".to_string())?;
        Ok(Self {
            room_id,
            title: wire.title,
            is_private: wire.is_private,
            host_name: wire.host_name,
            teams: wire.teams,
        })
    }
}

impl Room {
    /// Returns the team with the given label.
    pub fn team(&self, label: TeamLabel) -> Option<&Team> {
        self.teams.iter().find(|t| t.team_name == label)
    }

    /// Returns `true` if `nickname` hosts this room.
    pub fn is_host(&self, nickname: &str) -> bool {
        self.host_name == nickname
    }

    /// Returns the label of the team `nickname` belongs to, if any.
    pub fn team_of(&self, nickname: &str) -> Option<TeamLabel> {
        self.teams
            .iter()
            .find(|t| t.contains(nickname))
            .map(|t| t.team_name)
    }

    /// Total members across both teams.
    pub fn member_count(&self) -> usize {
        self.teams.iter().map(|t| t.users.len()).sum()
    }

    /// Returns `true` when every team is full.
    pub fn is_full(&self) -> bool {
        !self.teams.is_empty() && self.teams.iter().all(Team::is_full)
    }

    /// Checks the membership invariants: no team over capacity and no user in
    /// more than one slot.
    pub fn is_consistent(&self) -> bool {
        let within_capacity = self
            .teams
            .iter()
            .all(|t| t.users.len() <= t.max_members as usize);
        let mut seen = std::collections::HashSet::new();
        let unique = self
            .teams
            .iter()
            .flat_map(|t| t.users.iter())
            .all(|u| seen.insert(u.as_str()));
        within_capacity && unique
    }
}

/// Body of `POST /games/rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Room title.
    pub title: String,
    /// Whether the room requires a password.
    pub is_private: bool,
    /// Password for private rooms, `null` for public ones.
    pub password: Option<String>,
}

impl CreateRoomRequest {
    /// A public room with the given title.
    pub fn public(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_private: false,
            password: None,
        }
    }

    /// A password-protected room.
    pub fn private(title: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_private: true,
            password: Some(password.into()),
        }
    }
}

/// Body of `PATCH /games/rooms/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    /// Password for private rooms.
    pub password: Option<String>,
}

// ── Score stream ────────────────────────────────────────────────────

/// One `(team, score)` entry of a score update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    /// Team label as sent by the stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alternate label field used by some server builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// Current score; absent means zero.
    #[serde(default)]
    pub score: i64,
}

impl TeamScore {
    /// Entry labelled via `name`.
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: Some(name.into()),
            team_name: None,
            score,
        }
    }

    /// Read one entry of a `teams` array, tolerating loose server output.
    ///
    /// Non-string labels are treated as absent. The score is taken as an
    /// integer, then as a truncated float; anything else counts as zero.
    /// Returns `None` only when the entry is not an object or carries no
    /// string label at all.
    pub fn from_entry(entry: &serde_json::Value) -> Option<Self> {
        let fields = entry.as_object()?;
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        };
        let name = text("name");
        let team_name = text("teamName");
        if name.is_none() && team_name.is_none() {
            return None;
        }
        let score = fields
            .get("score")
            .and_then(|s| s.as_i64().or_else(|| s.as_f64().map(|f| f as i64)))
            .unwrap_or(0);
        Some(Self {
            name,
            team_name,
            score,
        })
    }

    /// The wire label, preferring `name` over `teamName`.
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.team_name.as_deref())
    }

    /// The team this entry refers to: the first of `name` and `teamName`
    /// that is exactly `"A"` or `"B"`.
    pub fn team(&self) -> Option<TeamLabel> {
        self.name
            .as_deref()
            .and_then(TeamLabel::from_wire)
            .or_else(|| self.team_name.as_deref().and_then(TeamLabel::from_wire))
    }
}

/// Payload of a `data:` frame on `/games/{id}/subscribe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    /// Per-team scores carried by this message.
    pub teams: Vec<TeamScore>,
}

impl ScoreUpdate {
    /// Interpret a decoded stream payload as a score update.
    ///
    /// Each `teams` entry is read on its own, so one unusable entry never
    /// costs its siblings. Returns `None` when the payload has no `teams`
    /// array.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let entries = payload.get("teams")?.as_array()?;
        let mut teams = Vec::with_capacity(entries.len());
        for entry in entries {
            match TeamScore::from_entry(entry) {
                Some(score) => teams.push(score),
                None => tracing::debug!("skipping unusable score entry: {entry}"),
            }
        }
        Some(Self { teams })
    }
}

// ── Trash submissions ───────────────────────────────────────────────

/// Verification status of a trash submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Certification {
    /// Awaiting review.
    Pending,
    /// Approved.
    Confirmed,
    /// Rejected.
    Rejected,
}

/// A trash submission as returned by `GET /trashes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashItem {
    /// Submission identifier.
    pub trash_id: TrashId,
    /// First (collection) photo.
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Location of the first photo, `"lat,lon"`.
    pub location: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Second (recycling) photo, once submitted.
    #[serde(rename = "secondImageURL", default)]
    pub second_image_url: Option<String>,
    /// Location of the second photo.
    #[serde(default)]
    pub second_location: Option<String>,
    /// Review status; `null` before the recycle step.
    #[serde(default)]
    pub certified: Option<Certification>,
}

/// Result of a trash or recycle upload. The server may answer with an empty body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashReceipt {
    /// Identifier assigned to the submission (`trashId`, or `id`).
    #[serde(default, alias = "id")]
    pub trash_id: Option<TrashId>,
}

// ── Users ───────────────────────────────────────────────────────────

/// The signed-in account as returned by `GET /users`.
///
/// `nickname` is the identity rooms refer to (`hostName`, team members).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Display name, unique per account.
    pub nickname: String,
    /// Account e-mail, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Points earned from verified submissions.
    #[serde(default)]
    pub total_point: i64,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    /// Account e-mail.
    pub email: String,
    /// Requested nickname.
    pub nickname: String,
    /// Account password.
    pub password: String,
}

/// One row of `GET /users/rank/{n}`, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// Player nickname.
    pub nickname: String,
    /// Accumulated score.
    #[serde(default)]
    pub total_score: i64,
    /// 1-based position, when the server sends it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

// ── Experiences and coupons ─────────────────────────────────────────

/// Experience identifier. The server has sent both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExperienceId {
    /// Numeric id.
    Number(u64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ExperienceId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

/// A partner store's offer, redeemable with points (`GET /experiences`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    /// Offer identifier.
    pub id: ExperienceId,
    /// Store name.
    pub business_name: String,
    /// Store owner.
    pub owner_name: String,
    /// Street address.
    pub location: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Price in points.
    pub price: i64,
    /// Offer title, e.g. a discount.
    pub experience_name: String,
    /// Optional cover image.
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body of `POST /experiences` (store registration by an owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRegistrationRequest {
    /// Store name.
    pub business_name: String,
    /// Owner name.
    pub owner_name: String,
    /// Business registration number.
    pub business_registration_number: String,
    /// Street address.
    pub location: String,
    /// Free-form description.
    pub description: String,
}

/// Result of a store registration. The server may answer with an empty body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Identifier of the created experience, when returned.
    #[serde(default)]
    pub id: Option<ExperienceId>,
}

/// Body of `POST /experiences/{id}/coupons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRequest {
    /// Coupon title.
    pub name: String,
}

/// A coupon in the user's wallet (`GET /users/coupon`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Coupon identifier.
    pub id: u64,
    /// Offer title.
    pub experience_name: String,
    /// Issuing store.
    pub business_name: String,
    /// Expiry date (ISO 8601), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    /// Whether the coupon was redeemed.
    #[serde(default)]
    pub is_used: bool,
}

// ── Recycling guide ─────────────────────────────────────────────────

/// Body of `POST /recycle/guide`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleGuideRequest {
    /// What the user wants to throw away, e.g. `"PET bottle"`.
    pub trash_name: String,
    /// Where, as free text (local rules differ by district).
    pub location: String,
}

/// Disposal instructions returned by `POST /recycle/guide`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleGuide {
    /// Normalized item name.
    pub trash_type: String,
    /// Recycling category.
    pub category: String,
    /// How to prepare and separate the item.
    pub how_to_separate: String,
    /// Where to drop it off.
    pub where_to_dispose: String,
    /// Anything else worth knowing.
    #[serde(default)]
    pub additional_tips: String,
}

// ── Auth ────────────────────────────────────────────────────────────

/// Body of `POST /auth`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account e-mail.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Long-lived refresh token.
    pub refresh_token: String,
}

/// Response of `POST /auth` and `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, when the server rotates it.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_accepts_legacy_id_field() {
        let room: Room = serde_json::from_value(json!({
            "id": 9,
            "title": "beach",
            "isPrivate": true,
            "hostName": "alice",
            "teams": []
        }))
        .unwrap();
        assert_eq!(room.room_id, 9);
        assert!(room.is_private);
    }

    #[test]
    fn team_label_match_is_exact() {
        assert_eq!(TeamLabel::from_wire("A"), Some(TeamLabel::A));
        assert_eq!(TeamLabel::from_wire("a"), None);
        assert_eq!(TeamLabel::from_wire("A "), None);
    }

    #[test]
    fn score_entry_falls_back_to_team_name() {
        let entry = TeamScore::from_entry(&json!({ "name": "B", "teamName": "A", "score": 3 }))
            .unwrap();
        assert_eq!(entry.team(), Some(TeamLabel::B));

        let entry = TeamScore::from_entry(&json!({ "name": "X", "teamName": "A", "score": 3 }))
            .unwrap();
        assert_eq!(entry.team(), Some(TeamLabel::A));
        assert_eq!(entry.label(), Some("X"));

        let entry = TeamScore::from_entry(&json!({ "teamName": "A" })).unwrap();
        assert_eq!(entry.team(), Some(TeamLabel::A));
        assert_eq!(entry.score, 0);
    }

    #[test]
    fn score_entry_reads_loose_scores() {
        let score = |v: serde_json::Value| {
            TeamScore::from_entry(&json!({ "name": "A", "score": v }))
                .unwrap()
                .score
        };
        assert_eq!(score(json!(7)), 7);
        assert_eq!(score(json!(7.9)), 7);
        assert_eq!(score(json!(null)), 0);
        assert_eq!(score(json!("7")), 0);
    }

    #[test]
    fn score_entry_needs_a_string_label() {
        assert!(TeamScore::from_entry(&json!({ "name": 3, "score": 1 })).is_none());
        assert!(TeamScore::from_entry(&json!({ "score": 1 })).is_none());
        assert!(TeamScore::from_entry(&json!("A")).is_none());
    }

    #[test]
    fn room_prefers_room_id_when_both_ids_are_sent() {
        let room: Room = serde_json::from_value(json!({
            "roomId": 42,
            "id": 7,
            "title": "t",
            "isPrivate": false,
            "hostName": "alice",
            "teams": []
        }))
        .unwrap();
        assert_eq!(room.room_id, 42);

        let missing = serde_json::from_value::<Room>(json!({ "title": "t", "hostName": "h" }));
        assert!(missing.is_err());
    }

    #[test]
    fn score_update_requires_teams_array() {
        assert!(ScoreUpdate::from_payload(&json!({ "teams": "nope" })).is_none());
        assert!(ScoreUpdate::from_payload(&json!({ "type": "ping" })).is_none());
        let update = ScoreUpdate::from_payload(&json!({ "teams": [] })).unwrap();
        assert!(update.teams.is_empty());
    }

    #[test]
    fn membership_invariants() {
        let mut room = Room {
            room_id: 1,
            title: "t".into(),
            is_private: false,
            host_name: "alice".into(),
            teams: vec![
                Team {
                    id: None,
                    team_name: TeamLabel::A,
                    max_members: 1,
                    users: vec!["alice".into()],
                },
                Team {
                    id: None,
                    team_name: TeamLabel::B,
                    max_members: 1,
                    users: vec![],
                },
            ],
        };
        assert!(room.is_consistent());
        assert!(!room.is_full());
        assert_eq!(room.team_of("alice"), Some(TeamLabel::A));

        room.teams[1].users.push("alice".into());
        assert!(!room.is_consistent());
    }

    #[test]
    fn trash_item_uses_server_field_names() {
        let item: TrashItem = serde_json::from_value(json!({
            "trashId": 5,
            "imageURL": "https://img/1.png",
            "location": "35.1,129.1",
            "createdAt": "2026-01-01T00:00:00Z",
            "secondImageURL": null,
            "secondLocation": null,
            "certified": "pending"
        }))
        .unwrap();
        assert_eq!(item.certified, Some(Certification::Pending));
        assert!(item.second_image_url.is_none());
    }
}
