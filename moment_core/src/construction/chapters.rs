//! Chapters - early back-and-forth stretches wrapped into one moment.

use serde::{Deserialize, Serialize};
use sport_rules::PlayIndex;
use tracing::debug;

use crate::kind::MomentType;
use crate::moment::{ChapterInfo, Moment, MomentId, Reason};
use crate::stream::PlayStream;

/// When consecutive early moments become a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterConfig {
    /// Regulation progress a chapter must end before.
    pub max_progress: f64,
    pub min_moments: usize,
    pub min_plays: usize,
    pub max_plays: usize,
    pub min_lead_changes: u32,
    pub min_ties: u32,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            max_progress: 0.5,
            min_moments: 2,
            min_plays: 8,
            max_plays: 40,
            min_lead_changes: 2,
            min_ties: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: MomentId,
    pub start_play: PlayIndex,
    pub end_play: PlayIndex,
    pub members: Vec<MomentId>,
    pub lead_changes: u32,
    pub ties: u32,
    pub importance: f64,
}

fn is_absorbable(moment: &Moment, stream: &PlayStream, config: &ChapterConfig) -> bool {
    let absorbable_type = match moment.moment_type {
        MomentType::Flip
        | MomentType::Tie
        | MomentType::Neutral
        | MomentType::LeadBuild
        | MomentType::Cut => true,
        MomentType::ClosingControl
        | MomentType::HighImpact
        | MomentType::MomentumShift
        | MomentType::QuarterRecap
        | MomentType::HalftimeRecap
        | MomentType::RegulationRecap
        | MomentType::FinalRecap => false,
    };
    let early = moment.end_progress < config.max_progress
        && !stream.sport().is_overtime(moment.end_period);
    absorbable_type && early && !moment.is_chapter()
}

/// Wrap qualifying stretches of early moments into NEUTRAL chapters.
///
/// From each starting moment the longest qualifying stretch wins.
pub fn form_chapters(
    moments: Vec<Moment>,
    stream: &PlayStream,
    config: &ChapterConfig,
) -> (Vec<Moment>, Vec<ChapterRecord>) {
    let mut out = Vec::with_capacity(moments.len());
    let mut records = Vec::new();
    let mut i = 0;

    while i < moments.len() {
        if !is_absorbable(&moments[i], stream, config) {
            out.push(moments[i].clone());
            i += 1;
            continue;
        }

        let mut best: Option<(usize, u32, u32)> = None;
        let mut j = i;
        while j < moments.len() && is_absorbable(&moments[j], stream, config) {
            let positions = stream.positions(moments[i].start_play, moments[j].end_play);
            if positions.len() > config.max_plays {
                break;
            }
            if j + 1 - i >= config.min_moments && positions.len() >= config.min_plays {
                let (changes, ties) = stream.lead_changes(positions);
                if changes >= config.min_lead_changes || ties >= config.min_ties {
                    best = Some((j, changes, ties));
                }
            }
            j += 1;
        }

        match best {
            Some((end, changes, ties)) => {
                let chapter = build_chapter(&moments[i..=end], changes, ties, stream);
                debug!(
                    chapter = %chapter.id,
                    members = end + 1 - i,
                    lead_changes = changes,
                    ties,
                    "chapter formed"
                );
                records.push(ChapterRecord {
                    id: chapter.id,
                    start_play: chapter.start_play,
                    end_play: chapter.end_play,
                    members: moments[i..=end].iter().map(|m| m.id).collect(),
                    lead_changes: changes,
                    ties,
                    importance: chapter.importance,
                });
                out.push(chapter);
                i = end + 1;
            }
            None => {
                out.push(moments[i].clone());
                i += 1;
            }
        }
    }

    (out, records)
}

fn build_chapter(members: &[Moment], lead_changes: u32, ties: u32, stream: &PlayStream) -> Moment {
    let start = members[0].start_play;
    let end = members[members.len() - 1].end_play;
    let mut chapter =
        Moment::from_range(stream, start, end, MomentType::Neutral, Reason::new("chapter"));

    for member in members {
        chapter.importance = chapter.importance.max(member.importance);
        chapter.key_play_ids.extend(member.key_play_ids.iter().copied());
        if let Some(run) = &member.run_info {
            chapter.key_play_ids.extend(run.scoring_plays.iter().copied());
        }
        chapter.absorbed.extend(member.absorbed.iter().copied());
        chapter.absorbed.push(member.id);
    }
    chapter.chapter = Some(ChapterInfo {
        members: members.len(),
        lead_changes,
        ties,
    });
    chapter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGame;
    use sport_rules::{Sport, SportConfig};

    fn back_and_forth(game: ScriptedGame) -> ScriptedGame {
        game.home(2).away(2).home(2).away(3).home(2).idle(7)
    }

    fn moments(stream: &PlayStream) -> Vec<Moment> {
        let mut moments = vec![
            Moment::from_range(stream, 0, 2, MomentType::Neutral, Reason::new("game_start")),
            Moment::from_range(stream, 3, 3, MomentType::Flip, Reason::new("flip")),
            Moment::from_range(stream, 4, 11, MomentType::Flip, Reason::new("flip")),
        ];
        moments[1].importance = 3.5;
        moments[2].importance = 2.0;
        moments
    }

    #[test]
    fn test_early_volatility_becomes_chapter() {
        let stream = back_and_forth(ScriptedGame::new()).build_stream();

        let (out, records) = form_chapters(moments(&stream), &stream, &ChapterConfig::default());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].moment_type, MomentType::Neutral);
        assert_eq!(out[0].importance, 3.5);
        assert_eq!(out[0].absorbed.len(), 3);
        let info = out[0].chapter.as_ref().unwrap();
        assert_eq!((info.members, info.lead_changes, info.ties), (3, 2, 1));
        assert_eq!(records[0].members.len(), 3);
    }

    #[test]
    fn test_no_chapter_after_halftime() {
        let stream = back_and_forth(ScriptedGame::new().at(3, 720)).build_stream();

        let (out, records) = form_chapters(moments(&stream), &stream, &ChapterConfig::default());

        assert_eq!(out.len(), 3);
        assert!(records.is_empty());
    }

    #[test]
    fn test_quiet_stretch_is_not_a_chapter() {
        let stream = ScriptedGame::new().home(2).home(2).idle(10).build_stream();
        let moments = vec![
            Moment::from_range(&stream, 0, 1, MomentType::LeadBuild, Reason::new("tier_up")),
            Moment::from_range(&stream, 2, 11, MomentType::Neutral, Reason::new("test")),
        ];

        let (out, _) = form_chapters(moments, &stream, &ChapterConfig::default());

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| !m.is_chapter()));
    }

    #[test]
    fn test_no_chapter_in_second_half_of_two_half_sport() {
        let ncaab = SportConfig::preset(Sport::Ncaab);
        let config = ChapterConfig::default();
        let first = back_and_forth(ScriptedGame::new().at(1, 1200)).build_stream_with(&ncaab);
        let second = back_and_forth(ScriptedGame::new().at(2, 1200)).build_stream_with(&ncaab);

        let (_, early) = form_chapters(moments(&first), &first, &config);
        let (_, late) = form_chapters(moments(&second), &second, &config);

        assert_eq!(early.len(), 1);
        assert!(late.is_empty());
    }
}
