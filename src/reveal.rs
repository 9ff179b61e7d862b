//! Presenting a finished round
//!
//! Every team's picture is composed and posted to the group chat one after
//! another, with a pause in between so people can look at each one.

use web_time::Duration;

use crate::{
    compose::{self, Composer},
    game::Message,
    session::{ChatId, Target, Transport},
    teams::Team,
};

/// Announces the end of a round and posts every team's composed picture
///
/// A picture that fails to compose is logged and skipped; the remaining
/// teams are still shown.
///
/// # Returns
///
/// The number of pictures posted
pub fn reveal_round<C: Composer, T: Transport>(
    chat: ChatId,
    round: usize,
    teams: &[Team],
    composer: &C,
    transport: &T,
    pause: Duration,
) -> usize {
    transport.send_message(Target::Chat(chat), &Message::RevealStart { round });

    for player in teams.iter().flat_map(Team::players) {
        transport.send_message(
            Target::Player(player.id()),
            &Message::RoundFinished { round },
        );
    }

    let mut posted = 0;
    for team in teams {
        let composed = compose::layers_of(team.scenario())
            .and_then(|(backdrop, layers)| composer.compose(&backdrop, &layers));

        match composed {
            Ok(image) => {
                transport.send_image(
                    Target::Chat(chat),
                    &image,
                    &Message::TeamSubmission {
                        team: team.name().to_owned(),
                    },
                );
                posted += 1;
                transport.pause(pause);
            }
            Err(error) => {
                tracing::warn!(%chat, round, team = team.name(), %error, "failed to compose picture");
            }
        }
    }

    transport.send_message(Target::Chat(chat), &Message::AllRevealed);

    posted
}
