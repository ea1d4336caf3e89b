//! Turn scheduler for talk and whisper phases.
//!
//! A phase runs in rounds. Each round asks every speaker with quota left
//! for one line, in an order shuffled once per phase. Every line is
//! recorded with the next transcript index and costs one unit of quota.
//! The phase ends after the configured number of rounds, or earlier once a
//! round produces nothing but `Over`.
//!
//! Passing is tracked per speaker. `ForceSkip` is stored as `Skip`, and a
//! failed request counts as `Skip` too. Each `Skip` extends the speaker's
//! streak; reaching the skip limit turns the line into `Over`, which ends
//! the speaker's participation. A real utterance resets the streak.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use werewolf_types::{AgentIdx, Request, Role, Talk, sentinel};

use crate::game::Game;
use crate::link::LinkError;
use crate::transport::Transport;

/// Which transcript a phase writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Public talk among the living.
    Talk,
    /// Night whisper among the living werewolves.
    Whisper,
}

impl Channel {
    /// The request asking for one line on this channel.
    pub const fn request(self) -> Request {
        match self {
            Self::Talk => Request::Talk,
            Self::Whisper => Request::Whisper,
        }
    }
}

/// Normalize one reply and update the speaker's skip streak.
///
/// Returns the text to record.
pub fn settle_utterance(reply: Result<String, LinkError>, streak: &mut u32, max_skip: u32) -> String {
    let mut text = reply.unwrap_or_else(|_| sentinel::SKIP.to_owned());
    if text == sentinel::FORCE_SKIP {
        text = sentinel::SKIP.to_owned();
    }
    if text == sentinel::SKIP {
        *streak = streak.saturating_add(1);
        if *streak >= max_skip {
            text = sentinel::OVER.to_owned();
        }
    } else if text != sentinel::OVER {
        *streak = 0;
    }
    text
}

impl<T: Transport> Game<T> {
    /// Run one talk or whisper phase on today's transcript.
    pub(crate) async fn run_communication(&mut self, channel: Channel) {
        let mut speakers = match channel {
            Channel::Talk => self.alive_with(|_| true),
            Channel::Whisper => self.alive_with(Role::is_werewolf),
        };
        if channel == Channel::Whisper && speakers.len() < 2 {
            debug!(game_id = %self.id, speakers = speakers.len(), "not enough werewolves to whisper");
            return;
        }

        let (per_agent, max_turn) = match channel {
            Channel::Talk => (self.settings.max_talk, self.settings.max_talk_turn),
            Channel::Whisper => (self.settings.max_whisper, self.settings.max_whisper_turn),
        };
        let quota: BTreeMap<AgentIdx, u32> = self
            .roles
            .keys()
            .map(|a| (*a, if speakers.contains(a) { per_agent } else { 0 }))
            .collect();
        *self.remaining_mut(channel) = quota;

        speakers.shuffle(&mut self.rng);
        info!(game_id = %self.id, day = self.today.day, ?channel, order = ?speakers, "speech phase starting");

        let request = channel.request();
        let day = self.today.day;
        let max_skip = self.settings.max_skip;
        let mut streaks: BTreeMap<AgentIdx, u32> = BTreeMap::new();

        for turn in 0..max_turn {
            let mut produced = false;
            for &speaker in &speakers {
                if self.remaining_mut(channel).get(&speaker).copied().unwrap_or(0) == 0 {
                    continue;
                }
                let reply = self.request(speaker, request).await;
                if let Err(error) = &reply {
                    warn!(game_id = %self.id, agent = %speaker, %error, "no line, recording Skip");
                }
                let text = settle_utterance(reply, streaks.entry(speaker).or_default(), max_skip);

                let over = text == sentinel::OVER;
                if let Some(left) = self.remaining_mut(channel).get_mut(&speaker) {
                    *left = if over { 0 } else { left.saturating_sub(1) };
                }
                produced |= !over;

                let transcript = self.transcript_mut(channel);
                let idx = u32::try_from(transcript.len()).unwrap_or(u32::MAX);
                debug!(agent = %speaker, idx, turn, text = %text, "line recorded");
                transcript.push(Talk {
                    idx,
                    day,
                    turn,
                    agent: speaker,
                    text,
                });
            }
            if !produced {
                break;
            }
        }

        for left in self.remaining_mut(channel).values_mut() {
            *left = 0;
        }
    }

    fn remaining_mut(&mut self, channel: Channel) -> &mut BTreeMap<AgentIdx, u32> {
        match channel {
            Channel::Talk => &mut self.today.remain_talk,
            Channel::Whisper => &mut self.today.remain_whisper,
        }
    }

    fn transcript_mut(&mut self, channel: Channel) -> &mut Vec<Talk> {
        match channel {
            Channel::Talk => &mut self.today.talks,
            Channel::Whisper => &mut self.today.whispers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Result<String, LinkError> {
        Err(LinkError::Timeout {
            agent: AgentIdx::new(1),
        })
    }

    #[test]
    fn skip_becomes_over_exactly_at_limit() {
        let mut streak = 0;
        assert_eq!(settle_utterance(Ok("Skip".into()), &mut streak, 3), "Skip");
        assert_eq!(settle_utterance(Ok("Skip".into()), &mut streak, 3), "Skip");
        assert_eq!(settle_utterance(Ok("Skip".into()), &mut streak, 3), "Over");
        assert_eq!(streak, 3);
    }

    #[test]
    fn force_skip_and_failures_count_as_skip() {
        let mut streak = 0;
        assert_eq!(settle_utterance(Ok("ForceSkip".into()), &mut streak, 3), "Skip");
        assert_eq!(settle_utterance(timeout(), &mut streak, 3), "Skip");
        assert_eq!(streak, 2);
        assert_eq!(settle_utterance(timeout(), &mut streak, 3), "Over");
    }

    #[test]
    fn real_line_resets_streak() {
        let mut streak = 0;
        settle_utterance(Ok("Skip".into()), &mut streak, 3);
        settle_utterance(Ok("Skip".into()), &mut streak, 3);
        assert_eq!(settle_utterance(Ok("I suspect Agent[03]".into()), &mut streak, 3), "I suspect Agent[03]");
        assert_eq!(streak, 0);
        assert_eq!(settle_utterance(Ok("Skip".into()), &mut streak, 3), "Skip");
    }

    #[test]
    fn over_leaves_streak_alone() {
        let mut streak = 1;
        assert_eq!(settle_utterance(Ok("Over".into()), &mut streak, 3), "Over");
        assert_eq!(streak, 1);
    }
}
