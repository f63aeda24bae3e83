//! Sound cues and music driven by simulation events

use bevy::prelude::*;

use cluck_climb::game::events::{GameEventData, MusicTrack};

use super::{MusicPlayer, SimEvent};

/// Track currently looping, if any
#[derive(Resource, Default)]
pub struct CurrentTrack(pub Option<MusicTrack>);

fn start_track(
    commands: &mut Commands,
    asset_server: &AssetServer,
    current: &mut CurrentTrack,
    playing: &Query<Entity, With<MusicPlayer>>,
    track: MusicTrack,
) {
    if current.0 == Some(track) {
        return;
    }
    for entity in playing.iter() {
        commands.entity(entity).despawn();
    }
    commands.spawn((
        AudioPlayer::new(asset_server.load(format!("music/{}.ogg", track.id()))),
        PlaybackSettings::LOOP,
        MusicPlayer,
    ));
    current.0 = Some(track);
}

/// Play one-shot cues and switch music tracks.
pub fn play_cues(
    mut commands: Commands,
    mut events: EventReader<SimEvent>,
    asset_server: Res<AssetServer>,
    mut current: ResMut<CurrentTrack>,
    playing: Query<Entity, With<MusicPlayer>>,
) {
    // The lobby loop plays from the first frame
    if current.0.is_none() {
        start_track(&mut commands, &asset_server, &mut current, &playing, MusicTrack::Menu);
    }

    for SimEvent(event) in events.read() {
        match &event.data {
            GameEventData::Sound(cue) => {
                commands.spawn((
                    AudioPlayer::new(asset_server.load(format!("audio/{}.ogg", cue.id()))),
                    PlaybackSettings::DESPAWN,
                ));
            }
            GameEventData::Music(track) => {
                start_track(&mut commands, &asset_server, &mut current, &playing, *track);
            }
            _ => {}
        }
    }
}
