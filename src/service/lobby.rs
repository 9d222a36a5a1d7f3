//! 大廳：主機公告與加入請求
//!
//! 只定義邊界上的 JSON 格式與簡單的主機清單；對局核心只從這裡拿到底注
//! （目標分數）與對手座位，不知道網路的存在。

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::game::{ANNOUNCE_STALE_SECS, LOBBY_SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("malformed lobby message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Waiting,
    Playing,
}

/// 主機定期廣播的公告
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAnnouncement {
    pub schema_version: u16,
    pub name: String,
    pub host_address: String,
    pub status: HostStatus,
    pub password_required: bool,
    /// 底注，即目標分數
    pub bet: i64,
}

impl HostAnnouncement {
    pub fn new(name: impl Into<String>, host_address: impl Into<String>, bet: i64, password_required: bool) -> Self {
        Self {
            schema_version: LOBBY_SCHEMA_VERSION,
            name: name.into(),
            host_address: host_address.into(),
            status: HostStatus::Waiting,
            password_required,
            bet,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub schema_version: u16,
    pub joiner_address: String,
    pub joiner_name: String,
    #[serde(default)]
    pub password: String,
}

impl JoinRequest {
    pub fn new(joiner_address: impl Into<String>, joiner_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            schema_version: LOBBY_SCHEMA_VERSION,
            joiner_address: joiner_address.into(),
            joiner_name: joiner_name.into(),
            password: password.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Confirmed,
    WrongPassword,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub schema_version: u16,
    pub status: JoinStatus,
    pub host_name: String,
    pub host_address: String,
    pub bet: i64,
}

/// 所有大廳訊息都帶版本欄位
pub trait Versioned {
    fn schema_version(&self) -> u16;
}

impl Versioned for HostAnnouncement {
    fn schema_version(&self) -> u16 {
        self.schema_version
    }
}

impl Versioned for JoinRequest {
    fn schema_version(&self) -> u16 {
        self.schema_version
    }
}

impl Versioned for JoinResponse {
    fn schema_version(&self) -> u16 {
        self.schema_version
    }
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, LobbyError> {
    Ok(serde_json::to_string(message)?)
}

/// 解析並檢查版本
pub fn decode<T>(raw: &str) -> Result<T, LobbyError>
where
    T: for<'de> Deserialize<'de> + Versioned,
{
    let message: T = serde_json::from_str(raw)?;
    let found = message.schema_version();
    if found != LOBBY_SCHEMA_VERSION {
        return Err(LobbyError::UnsupportedVersion {
            found,
            expected: LOBBY_SCHEMA_VERSION,
        });
    }
    Ok(message)
}

pub fn decode_announcement(raw: &str) -> Result<HostAnnouncement, LobbyError> {
    decode(raw)
}

pub fn decode_join_request(raw: &str) -> Result<JoinRequest, LobbyError> {
    decode(raw)
}

pub fn decode_join_response(raw: &str) -> Result<JoinResponse, LobbyError> {
    decode(raw)
}

// ============================================================================
// 主機清單
// ============================================================================

#[derive(Clone, Debug)]
struct Listing {
    announcement: HostAnnouncement,
    last_seen: Instant,
}

/// 已發現的主機，以主機位址為鍵
pub struct Lobby {
    hosts: DashMap<String, Listing>,
    stale_after: Duration,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(Duration::from_secs(ANNOUNCE_STALE_SECS))
    }
}

impl Lobby {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            hosts: DashMap::new(),
            stale_after,
        }
    }

    /// 收到公告；同一位址的新公告覆蓋舊的
    pub fn observe(&self, announcement: HostAnnouncement) {
        self.observe_at(announcement, Instant::now());
    }

    pub fn observe_at(&self, announcement: HostAnnouncement, now: Instant) {
        debug!(host = %announcement.host_address, bet = announcement.bet, "host announced");
        self.hosts.insert(
            announcement.host_address.clone(),
            Listing {
                announcement,
                last_seen: now,
            },
        );
    }

    /// 解析原始訊息後加入清單；格式錯誤的公告被忽略並回報
    pub fn observe_raw(&self, raw: &str) -> Result<(), LobbyError> {
        match decode_announcement(raw) {
            Ok(announcement) => {
                self.observe(announcement);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "ignoring lobby announcement");
                Err(err)
            }
        }
    }

    pub fn get(&self, host_address: &str) -> Option<HostAnnouncement> {
        self.hosts.get(host_address).map(|entry| entry.announcement.clone())
    }

    /// 等待中的主機，依名稱排序
    pub fn open_hosts(&self) -> Vec<HostAnnouncement> {
        let mut hosts: Vec<HostAnnouncement> = self
            .hosts
            .iter()
            .filter(|entry| entry.announcement.status == HostStatus::Waiting)
            .map(|entry| entry.announcement.clone())
            .collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.host_address.cmp(&b.host_address)));
        hosts
    }

    /// 移除太久沒有公告的主機，回傳移除數量
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.hosts.len();
        let stale_after = self.stale_after;
        self.hosts
            .retain(|_, listing| now.saturating_duration_since(listing.last_seen) <= stale_after);
        before - self.hosts.len()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

// ============================================================================
// 加入請求
// ============================================================================

/// 主機端回答加入請求
pub struct JoinGate {
    announcement: HostAnnouncement,
    password: Option<String>,
}

impl JoinGate {
    pub fn new(announcement: HostAnnouncement, password: Option<String>) -> Self {
        let mut announcement = announcement;
        announcement.password_required = password.is_some();
        Self { announcement, password }
    }

    pub fn announcement(&self) -> &HostAnnouncement {
        &self.announcement
    }

    pub fn answer(&self, request: &JoinRequest) -> JoinResponse {
        let status = match &self.password {
            Some(expected) if *expected != request.password => {
                warn!(joiner = %request.joiner_name, "join rejected: wrong password");
                JoinStatus::WrongPassword
            }
            _ => JoinStatus::Confirmed,
        };
        JoinResponse {
            schema_version: LOBBY_SCHEMA_VERSION,
            status,
            host_name: self.announcement.name.clone(),
            host_address: self.announcement.host_address.clone(),
            bet: self.announcement.bet,
        }
    }
}

// ============================================================================
// 單元測試
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Stake;

    fn announcement(name: &str, address: &str) -> HostAnnouncement {
        HostAnnouncement::new(name, address, Stake::Knight.target_score(), false)
    }

    #[test]
    fn test_announcement_wire_shape() {
        let raw = encode(&announcement("alice", "10.0.0.2:9000")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["bet"], 4000);
        assert_eq!(value["password_required"], false);
    }

    #[test]
    fn test_decode_rejects_other_versions() {
        let raw = r#"{"schema_version":2,"joiner_address":"a","joiner_name":"b","password":""}"#;
        assert!(matches!(
            decode_join_request(raw),
            Err(LobbyError::UnsupportedVersion { found: 2, expected: 1 })
        ));
        assert!(matches!(decode_join_request("{"), Err(LobbyError::Malformed(_))));
    }

    #[test]
    fn test_missing_password_defaults_to_empty() {
        let raw = r#"{"schema_version":1,"joiner_address":"a","joiner_name":"b"}"#;
        assert_eq!(decode_join_request(raw).unwrap().password, "");
    }

    #[test]
    fn test_lobby_replaces_and_prunes() {
        let lobby = Lobby::new(Duration::from_secs(10));
        let start = Instant::now();
        lobby.observe_at(announcement("bob", "10.0.0.3:9000"), start);
        lobby.observe_at(announcement("alice", "10.0.0.2:9000"), start);

        let mut playing = announcement("bob", "10.0.0.3:9000");
        playing.status = HostStatus::Playing;
        lobby.observe_at(playing, start + Duration::from_secs(8));

        assert_eq!(lobby.len(), 2);
        let open = lobby.open_hosts();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].name, "alice");

        assert_eq!(lobby.prune(start + Duration::from_secs(15)), 1);
        assert!(lobby.get("10.0.0.2:9000").is_none());
        assert!(lobby.get("10.0.0.3:9000").is_some());
    }

    #[test]
    fn test_observe_raw_ignores_garbage() {
        let lobby = Lobby::default();
        assert!(lobby.observe_raw("not json").is_err());
        assert!(lobby.is_empty());

        let raw = encode(&announcement("carol", "10.0.0.4:9000")).unwrap();
        lobby.observe_raw(&raw).unwrap();
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn test_join_gate_checks_password() {
        let gate = JoinGate::new(announcement("alice", "10.0.0.2:9000"), Some("secret".to_string()));
        assert!(gate.announcement().password_required);

        let wrong = gate.answer(&JoinRequest::new("10.0.0.9", "mallory", "guess"));
        assert_eq!(wrong.status, JoinStatus::WrongPassword);

        let ok = gate.answer(&JoinRequest::new("10.0.0.9", "dave", "secret"));
        assert_eq!(ok.status, JoinStatus::Confirmed);
        assert_eq!(ok.bet, 4000);
        assert_eq!(ok.host_name, "alice");

        let open = JoinGate::new(announcement("erin", "10.0.0.5:9000"), None);
        assert_eq!(open.answer(&JoinRequest::new("x", "y", "")).status, JoinStatus::Confirmed);
    }
}
