//! Per-viewer filtering of game state.
//!
//! Agents never see hidden state directly. For each request the game asks
//! the [`VisibilityFilter`] for a packet, which contains only what the
//! receiving agent is entitled to know:
//!
//! | fact | who sees it |
//! |---|---|
//! | day, own role, status map, remaining talk | everyone |
//! | yesterday's executed / attacked agent | everyone |
//! | yesterday's divination | the seer |
//! | yesterday's medium judgement | the medium |
//! | yesterday's votes | everyone, if votes are visible |
//! | yesterday's attack votes | werewolves, if votes are visible |
//! | fellow werewolves, whispers, remaining whispers | werewolves |
//!
//! Talk and whisper transcripts are sent as deltas. A per-agent cursor
//! remembers how much of today's transcript the agent has received; it
//! advances only when that transcript is actually sent and is reset by the
//! initialize notices.

use std::collections::BTreeMap;

use werewolf_types::{AgentIdx, Info, Packet, Request, Role, Settings, Talk};

use crate::snapshot::DaySnapshot;

/// The state a packet is built from.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    /// Every seat's role.
    pub roles: &'a BTreeMap<AgentIdx, Role>,
    /// Today's snapshot.
    pub today: &'a DaySnapshot,
    /// Yesterday's snapshot, absent on day 0.
    pub yesterday: Option<&'a DaySnapshot>,
    /// Session settings.
    pub settings: &'a Settings,
}

impl ViewContext<'_> {
    fn is_werewolf(&self, agent: AgentIdx) -> bool {
        self.roles.get(&agent).is_some_and(|r| r.is_werewolf())
    }
}

/// Build the [`Info`] one viewer is allowed to see.
pub fn build_info(viewer: AgentIdx, ctx: &ViewContext<'_>) -> Info {
    let wolf = ctx.is_werewolf(viewer);
    let own_role = ctx.roles.get(&viewer).copied();

    let mut info = Info {
        day: ctx.today.day,
        agent: Some(viewer),
        status_map: ctx.today.status.clone(),
        remain_talk_map: ctx.today.remain_talk.clone(),
        ..Info::default()
    };

    if let Some(role) = own_role {
        info.role_map.insert(viewer, role);
    }

    if let Some(yesterday) = ctx.yesterday {
        if own_role == Some(Role::Medium) {
            info.medium_result = yesterday.medium;
        }
        if own_role == Some(Role::Seer) {
            info.divine_result = yesterday.divine;
        }
        info.executed_agent = yesterday.executed;
        info.attacked_agent = yesterday.attacked;
        if ctx.settings.is_vote_visible {
            info.vote_list.clone_from(&yesterday.votes);
            if wolf {
                info.attack_vote_list.clone_from(&yesterday.attack_votes);
            }
        }
    }

    if wolf {
        info.role_map.extend(
            ctx.roles
                .iter()
                .filter(|(_, role)| role.is_werewolf())
                .map(|(a, r)| (*a, *r)),
        );
        info.remain_whisper_map = ctx.today.remain_whisper.clone();
    }

    info
}

/// Per-agent delivery cursors into today's transcripts.
#[derive(Debug, Clone, Default)]
pub struct HistoryCursors {
    talk: BTreeMap<AgentIdx, usize>,
    whisper: BTreeMap<AgentIdx, usize>,
}

impl HistoryCursors {
    /// Forget what `viewer` has received.
    pub fn reset(&mut self, viewer: AgentIdx) {
        self.talk.remove(&viewer);
        self.whisper.remove(&viewer);
    }

    /// Talk lines `viewer` has not received yet. Advances the cursor.
    pub fn take_talk(&mut self, viewer: AgentIdx, lines: &[Talk]) -> Vec<Talk> {
        take_delta(&mut self.talk, viewer, lines)
    }

    /// Whisper lines `viewer` has not received yet. Advances the cursor.
    pub fn take_whisper(&mut self, viewer: AgentIdx, lines: &[Talk]) -> Vec<Talk> {
        take_delta(&mut self.whisper, viewer, lines)
    }
}

fn take_delta(cursors: &mut BTreeMap<AgentIdx, usize>, viewer: AgentIdx, lines: &[Talk]) -> Vec<Talk> {
    let start = cursors.insert(viewer, lines.len()).unwrap_or(0);
    lines.get(start..).unwrap_or(&[]).to_vec()
}

/// Builds packets for each request kind, tracking transcript delivery.
#[derive(Debug, Clone, Default)]
pub struct VisibilityFilter {
    cursors: HistoryCursors,
}

impl VisibilityFilter {
    /// A filter with no deliveries recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the packet for `request` addressed to `viewer`.
    ///
    /// - `NAME`: request only.
    /// - `INITIALIZE`, `DAILY_INITIALIZE`: info and settings; resets cursors.
    /// - `VOTE`, `DIVINE`, `GUARD`: info.
    /// - `TALK`: info and the talk delta.
    /// - `WHISPER`, `ATTACK`: info and the whisper delta.
    /// - `DAILY_FINISH`: info, the talk delta and, for werewolves, the
    ///   whisper delta.
    /// - `FINISH`: info revealing every role.
    pub fn packet(&mut self, request: Request, viewer: AgentIdx, ctx: &ViewContext<'_>) -> Packet {
        let mut packet = Packet::bare(request);
        if request == Request::Name {
            return packet;
        }

        let mut info = build_info(viewer, ctx);
        match request {
            Request::Initialize | Request::DailyInitialize => {
                self.cursors.reset(viewer);
                packet.setting = Some(ctx.settings.clone());
            }
            Request::Talk => {
                packet.talk_history = Some(self.cursors.take_talk(viewer, &ctx.today.talks));
            }
            Request::Whisper | Request::Attack => {
                packet.whisper_history =
                    Some(self.cursors.take_whisper(viewer, &ctx.today.whispers));
            }
            Request::DailyFinish => {
                packet.talk_history = Some(self.cursors.take_talk(viewer, &ctx.today.talks));
                if ctx.is_werewolf(viewer) {
                    packet.whisper_history =
                        Some(self.cursors.take_whisper(viewer, &ctx.today.whispers));
                }
            }
            Request::Finish => {
                info.role_map = ctx.roles.clone();
            }
            Request::Name | Request::Vote | Request::Divine | Request::Guard => {}
        }
        packet.info = Some(info);
        packet
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use werewolf_types::{Judge, Species, Vote};

    use super::*;
    use crate::config::GameConfig;

    const WOLF_A: AgentIdx = AgentIdx(1);
    const WOLF_B: AgentIdx = AgentIdx(2);
    const SEER: AgentIdx = AgentIdx(3);
    const VILLAGER: AgentIdx = AgentIdx(4);
    const MEDIUM: AgentIdx = AgentIdx(5);

    fn roles() -> BTreeMap<AgentIdx, Role> {
        BTreeMap::from([
            (WOLF_A, Role::Werewolf),
            (WOLF_B, Role::Werewolf),
            (SEER, Role::Seer),
            (VILLAGER, Role::Villager),
            (MEDIUM, Role::Medium),
        ])
    }

    fn settings(vote_visible: bool) -> Settings {
        let mut settings = GameConfig::default().to_settings().unwrap();
        settings.is_vote_visible = vote_visible;
        settings
    }

    fn line(idx: u32, agent: AgentIdx, text: &str) -> Talk {
        Talk {
            idx,
            day: 1,
            turn: 0,
            agent,
            text: text.to_owned(),
        }
    }

    fn yesterday() -> DaySnapshot {
        let mut day = DaySnapshot::initial(roles().into_keys());
        day.votes.push(Vote {
            day: 0,
            agent: SEER,
            target: WOLF_A,
        });
        day.attack_votes.push(Vote {
            day: 0,
            agent: WOLF_A,
            target: VILLAGER,
        });
        day.divine = Some(Judge {
            day: 0,
            agent: SEER,
            target: WOLF_B,
            result: Species::Werewolf,
        });
        day.medium = Some(Judge {
            day: 0,
            agent: MEDIUM,
            target: VILLAGER,
            result: Species::Human,
        });
        day.executed = Some(VILLAGER);
        day
    }

    #[test]
    fn villager_sees_no_secrets() {
        let roles = roles();
        let before = yesterday();
        let mut today = before.next_day();
        today.whispers.push(line(0, WOLF_A, "bite the seer"));
        let settings = settings(true);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: Some(&before),
            settings: &settings,
        };

        let info = build_info(VILLAGER, &ctx);
        assert_eq!(info.role_map.len(), 1);
        assert!(info.attack_vote_list.is_empty());
        assert!(info.divine_result.is_none());
        assert!(info.medium_result.is_none());
        assert!(info.remain_whisper_map.is_empty());
        assert_eq!(info.vote_list.len(), 1);
        assert_eq!(info.executed_agent, Some(VILLAGER));

        let mut filter = VisibilityFilter::new();
        let packet = filter.packet(Request::DailyFinish, VILLAGER, &ctx);
        assert!(packet.whisper_history.is_none());
    }

    #[test]
    fn werewolf_sees_the_pack() {
        let roles = roles();
        let before = yesterday();
        let today = before.next_day();
        let settings = settings(true);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: Some(&before),
            settings: &settings,
        };

        let info = build_info(WOLF_A, &ctx);
        assert_eq!(info.role_map.get(&WOLF_B), Some(&Role::Werewolf));
        assert!(!info.role_map.contains_key(&SEER));
        assert_eq!(info.attack_vote_list.len(), 1);
    }

    #[test]
    fn hidden_votes_stay_hidden() {
        let roles = roles();
        let before = yesterday();
        let today = before.next_day();
        let settings = settings(false);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: Some(&before),
            settings: &settings,
        };
        let info = build_info(WOLF_A, &ctx);
        assert!(info.vote_list.is_empty());
        assert!(info.attack_vote_list.is_empty());
    }

    #[test]
    fn judges_go_to_their_roles_only() {
        let roles = roles();
        let before = yesterday();
        let today = before.next_day();
        let settings = settings(false);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: Some(&before),
            settings: &settings,
        };
        assert!(build_info(SEER, &ctx).divine_result.is_some());
        assert!(build_info(SEER, &ctx).medium_result.is_none());
        assert!(build_info(MEDIUM, &ctx).medium_result.is_some());
        assert!(build_info(MEDIUM, &ctx).divine_result.is_none());
    }

    #[test]
    fn talk_history_is_sent_as_delta() {
        let roles = roles();
        let mut today = DaySnapshot::initial(roles.keys().copied());
        let settings = settings(false);
        let mut filter = VisibilityFilter::new();

        today.talks.push(line(0, SEER, "hello"));
        today.talks.push(line(1, WOLF_A, "hi"));
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: None,
            settings: &settings,
        };
        let first = filter.packet(Request::Talk, VILLAGER, &ctx);
        assert_eq!(first.talk_history.unwrap().len(), 2);

        today.talks.push(line(2, MEDIUM, "I am the medium"));
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: None,
            settings: &settings,
        };
        let second = filter.packet(Request::Talk, VILLAGER, &ctx);
        let delta = second.talk_history.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].idx, 2);

        let reset = filter.packet(Request::DailyInitialize, VILLAGER, &ctx);
        assert!(reset.setting.is_some());
        let again = filter.packet(Request::Talk, VILLAGER, &ctx);
        assert_eq!(again.talk_history.unwrap().len(), 3);
    }

    #[test]
    fn talk_does_not_consume_whispers() {
        let roles = roles();
        let mut today = DaySnapshot::initial(roles.keys().copied());
        today.whispers.push(line(0, WOLF_B, "tonight"));
        let settings = settings(false);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: None,
            settings: &settings,
        };
        let mut filter = VisibilityFilter::new();
        let talk = filter.packet(Request::Talk, WOLF_A, &ctx);
        assert!(talk.whisper_history.is_none());
        let attack = filter.packet(Request::Attack, WOLF_A, &ctx);
        assert_eq!(attack.whisper_history.unwrap().len(), 1);
    }

    #[test]
    fn finish_reveals_every_role() {
        let roles = roles();
        let today = DaySnapshot::initial(roles.keys().copied());
        let settings = settings(false);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: None,
            settings: &settings,
        };
        let packet = VisibilityFilter::new().packet(Request::Finish, VILLAGER, &ctx);
        assert_eq!(packet.info.unwrap().role_map, roles);
    }

    #[test]
    fn name_packet_is_bare() {
        let roles = roles();
        let today = DaySnapshot::initial(roles.keys().copied());
        let settings = settings(false);
        let ctx = ViewContext {
            roles: &roles,
            today: &today,
            yesterday: None,
            settings: &settings,
        };
        let packet = VisibilityFilter::new().packet(Request::Name, SEER, &ctx);
        assert_eq!(packet, Packet::bare(Request::Name));
    }
}
