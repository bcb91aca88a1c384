//! Period recaps, built alongside the narrative list.

use sport_rules::{PlayIndex, TeamSide};
use tracing::debug;

use crate::kind::MomentType;
use crate::moment::{Moment, MomentId, Reason, RecapContext};
use crate::stream::PlayStream;

/// Which recap closes a period.
pub fn recap_type(period: u8, last_period: u8, regulation_periods: u8) -> MomentType {
    if period == last_period {
        MomentType::FinalRecap
    } else if period == regulation_periods && last_period > regulation_periods {
        MomentType::RegulationRecap
    } else if regulation_periods % 2 == 0 && period == regulation_periods / 2 {
        MomentType::HalftimeRecap
    } else {
        MomentType::QuarterRecap
    }
}

/// One recap per period present in the stream.
///
/// Recap ids live in their own namespace so they never collide with a
/// narrative moment spanning the same plays.
pub fn build_recaps(moments: &[Moment], stream: &PlayStream) -> Vec<Moment> {
    let last_period = stream.plays().last().map_or(0, |play| play.period);
    let regulation = stream.sport().regulation_periods;
    let namespace = format!("{}:recap", stream.context().game_id);

    let mut periods: Vec<(u8, PlayIndex, PlayIndex)> = Vec::new();
    for play in stream.plays() {
        match periods.last_mut() {
            Some((period, _, end)) if *period == play.period => *end = play.index,
            _ => periods.push((play.period, play.index, play.index)),
        }
    }

    periods
        .into_iter()
        .map(|(period, start, end)| {
            let moment_type = recap_type(period, last_period, regulation);
            let mut recap =
                Moment::from_range(stream, start, end, moment_type, Reason::new("period_end"));
            recap.id = MomentId::derive(&namespace, start, end);

            let positions = stream.positions(start, end);
            let (lead_changes, ties) = stream.lead_changes(positions.clone());
            let largest_lead = positions
                .map(|pos| stream.state(pos))
                .filter_map(|state| state.leader.side().map(|side| (side, state.margin)))
                .fold(None, |best: Option<(TeamSide, u32)>, (side, margin)| match best {
                    Some((_, top)) if top >= margin => best,
                    _ => Some((side, margin)),
                });

            recap.recap = Some(RecapContext {
                period,
                score: recap.score_after,
                lead_changes,
                ties,
                largest_lead,
                moment_ids: moments
                    .iter()
                    .filter(|m| m.start_play <= end && m.end_play >= start)
                    .map(|m| m.id)
                    .collect(),
            });
            debug!(period, recap = %recap.id, "{} built", moment_type);
            recap
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGame;

    #[test]
    fn test_recap_types() {
        assert_eq!(recap_type(1, 4, 4), MomentType::QuarterRecap);
        assert_eq!(recap_type(2, 4, 4), MomentType::HalftimeRecap);
        assert_eq!(recap_type(4, 5, 4), MomentType::RegulationRecap);
        assert_eq!(recap_type(5, 5, 4), MomentType::FinalRecap);
        assert_eq!(recap_type(1, 3, 3), MomentType::QuarterRecap);
    }

    #[test]
    fn test_one_recap_per_period() {
        let stream = ScriptedGame::new()
            .home(3)
            .away(5)
            .idle(34)
            .home(4)
            .build_stream();
        let narrative = vec![Moment::from_range(
            &stream,
            0,
            36,
            MomentType::Neutral,
            Reason::new("game_start"),
        )];

        let recaps = build_recaps(&narrative, &stream);

        assert_eq!(recaps.len(), 2);
        assert_eq!(recaps[0].moment_type, MomentType::QuarterRecap);
        assert_eq!(recaps[1].moment_type, MomentType::FinalRecap);
        assert_ne!(recaps[0].id, MomentId::derive("game-0001", 0, 35));

        let context = recaps[0].recap.as_ref().unwrap();
        assert_eq!(context.lead_changes, 1);
        assert_eq!(context.largest_lead, Some((TeamSide::Home, 3)));
        assert_eq!(context.moment_ids, vec![narrative[0].id]);
        assert_eq!(recaps[1].recap.as_ref().unwrap().score.home, 7);
    }
}
