//! Audio policy — AgentCue → AudioRequest
//!
//! Контроллер сообщает только "что произошло" (CueKind). Как это звучит —
//! данные AgentAudio: набор клипов, random/sequential выбор, once/looping.
//! Сам плеер живёт снаружи и читает Events<AudioRequest>.
//!
//! Pitch chain: подряд идущие one-shot звуки повышают pitch на step (до max),
//! через reset_after секунд тишины pitch возвращается к base. Смена состояния
//! цепочку не рвёт (Interrupt), сбрасывает только Silence.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, AgentCue, CueKind};
use crate::schedule::{TaskKey, TaskScheduler};
use crate::{DeterministicRng, SimulationSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipSelection {
    #[default]
    Random,
    /// По порядку, с паузой interval между клипами (через TaskScheduler)
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Once,
    /// Random: loop одного клипа в плеере; Sequential: набор повторяется по кругу
    Looping,
}

/// Набор клипов для одного CueKind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSet {
    pub clips: Vec<String>,
    pub selection: ClipSelection,
    pub playback: Playback,
    /// Пауза между клипами в Sequential (секунды)
    pub interval: f32,
}

impl ClipSet {
    pub fn random(clips: &[&str]) -> Self {
        Self {
            clips: clips.iter().map(|clip| clip.to_string()).collect(),
            ..default()
        }
    }

    pub fn sequential(clips: &[&str], interval: f32) -> Self {
        Self {
            clips: clips.iter().map(|clip| clip.to_string()).collect(),
            selection: ClipSelection::Sequential,
            interval,
            ..default()
        }
    }

    pub fn looping(mut self) -> Self {
        self.playback = Playback::Looping;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchChain {
    pub base: f32,
    pub step: f32,
    pub max: f32,
    /// Секунды тишины до сброса
    pub reset_after: f32,
    #[serde(skip)]
    current: Option<f32>,
}

impl Default for PitchChain {
    fn default() -> Self {
        Self {
            base: 1.0,
            step: 0.05,
            max: 1.3,
            reset_after: 1.5,
            current: None,
        }
    }
}

impl PitchChain {
    /// Pitch для следующего one-shot (и сдвиг цепочки)
    pub fn next_pitch(&mut self) -> f32 {
        let pitch = match self.current {
            None => self.base,
            Some(current) => (current + self.step).min(self.max),
        };
        self.current = Some(pitch);
        pitch
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Звуковая политика агента
#[derive(Component, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentAudio {
    pub spotted: Option<ClipSet>,
    pub chase: Option<ClipSet>,
    pub attack: Option<ClipSet>,
    pub flee: Option<ClipSet>,
    pub pitch: PitchChain,
    /// Клип, который сейчас крутится в плеере как loop
    #[serde(skip)]
    pub looping: Option<String>,
}

impl AgentAudio {
    pub fn clip_set(&self, kind: CueKind) -> Option<&ClipSet> {
        match kind {
            CueKind::Spotted => self.spotted.as_ref(),
            CueKind::Chase => self.chase.as_ref(),
            CueKind::Attack => self.attack.as_ref(),
            CueKind::Flee => self.flee.as_ref(),
            CueKind::Interrupt | CueKind::Silence => None,
        }
    }
}

/// Команда внешнему аудио-плееру
#[derive(Event, Debug, Clone, PartialEq)]
pub enum AudioRequest {
    PlayOnce { agent: Entity, clip: String, pitch: f32 },
    PlayLooping { agent: Entity, clip: String },
    StopLooping { agent: Entity },
}

/// Payload задач TaskScheduler для аудио
#[derive(Debug, Clone, PartialEq)]
pub enum AudioTask {
    /// Сыграть клип `index` набора `cue`
    SequenceStep { cue: CueKind, index: usize },
    ResetPitch,
}

pub type AudioScheduler = TaskScheduler<AudioTask>;

/// Audio Plugin (SimulationSet::Notify)
///
/// 1. play_agent_cues — AgentCue → AudioRequest / задачи
/// 2. run_audio_tasks — сработавшие задачи (sequence, pitch reset)
pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioScheduler>()
            .add_event::<AudioRequest>()
            .add_systems(
                FixedUpdate,
                (play_agent_cues, run_audio_tasks)
                    .chain()
                    .in_set(SimulationSet::Notify),
            );
    }
}

/// Система: AgentCue → AudioRequest
pub fn play_agent_cues(
    mut cues: EventReader<AgentCue>,
    mut agents: Query<&mut AgentAudio, With<Agent>>,
    mut scheduler: ResMut<AudioScheduler>,
    mut rng: ResMut<DeterministicRng>,
    mut requests: EventWriter<AudioRequest>,
) {
    for cue in cues.read() {
        let agent = cue.agent;

        match cue.kind {
            CueKind::Interrupt => {
                scheduler.cancel(agent, TaskKey::Sequence);
                if let Ok(mut audio) = agents.get_mut(agent) {
                    stop_looping(agent, &mut audio, &mut requests);
                }
                continue;
            }
            CueKind::Silence => {
                scheduler.cancel_agent(agent);
                if let Ok(mut audio) = agents.get_mut(agent) {
                    audio.pitch.reset();
                    stop_looping(agent, &mut audio, &mut requests);
                }
                continue;
            }
            _ => {}
        }

        let Ok(mut audio) = agents.get_mut(agent) else {
            crate::log_warning(&format!("🔇 {:?} has no AgentAudio, cue {:?} skipped", agent, cue.kind));
            continue;
        };

        let Some(set) = audio.clip_set(cue.kind).filter(|set| !set.clips.is_empty()).cloned() else {
            continue;
        };

        match set.selection {
            ClipSelection::Random => {
                let index = rng.rng.gen_range(0..set.clips.len());
                let clip = set.clips[index].clone();
                match set.playback {
                    Playback::Once => play_once(agent, clip, &mut audio, &mut scheduler, &mut requests),
                    Playback::Looping => {
                        audio.looping = Some(clip.clone());
                        requests.write(AudioRequest::PlayLooping { agent, clip });
                    }
                }
            }
            ClipSelection::Sequential => {
                play_sequence_step(agent, cue.kind, 0, &set, &mut audio, &mut scheduler, &mut requests);
            }
        }
    }
}

/// Система: сработавшие аудио-задачи
pub fn run_audio_tasks(
    time: Res<Time<Fixed>>,
    mut agents: Query<&mut AgentAudio>,
    mut scheduler: ResMut<AudioScheduler>,
    mut requests: EventWriter<AudioRequest>,
) {
    for task in scheduler.tick(time.delta_secs()) {
        let Ok(mut audio) = agents.get_mut(task.agent) else {
            continue;
        };

        match task.action {
            AudioTask::ResetPitch => audio.pitch.reset(),
            AudioTask::SequenceStep { cue, index } => {
                let Some(set) = audio.clip_set(cue).cloned() else {
                    continue;
                };
                play_sequence_step(task.agent, cue, index, &set, &mut audio, &mut scheduler, &mut requests);
            }
        }
    }
}

fn stop_looping(agent: Entity, audio: &mut AgentAudio, requests: &mut EventWriter<AudioRequest>) {
    if audio.looping.take().is_some() {
        requests.write(AudioRequest::StopLooping { agent });
    }
}

fn play_once(
    agent: Entity,
    clip: String,
    audio: &mut AgentAudio,
    scheduler: &mut AudioScheduler,
    requests: &mut EventWriter<AudioRequest>,
) {
    let pitch = audio.pitch.next_pitch();
    requests.write(AudioRequest::PlayOnce { agent, clip, pitch });
    scheduler.schedule(agent, TaskKey::PitchReset, audio.pitch.reset_after, AudioTask::ResetPitch);
}

fn play_sequence_step(
    agent: Entity,
    cue: CueKind,
    index: usize,
    set: &ClipSet,
    audio: &mut AgentAudio,
    scheduler: &mut AudioScheduler,
    requests: &mut EventWriter<AudioRequest>,
) {
    let Some(clip) = set.clips.get(index).cloned() else {
        return;
    };
    play_once(agent, clip, audio, scheduler, requests);

    let next = index + 1;
    let next = match set.playback {
        Playback::Looping => Some(next % set.clips.len()),
        Playback::Once => (next < set.clips.len()).then_some(next),
    };

    if let Some(next) = next {
        scheduler.schedule(
            agent,
            TaskKey::Sequence,
            set.interval,
            AudioTask::SequenceStep { cue, index: next },
        );
    }
}
