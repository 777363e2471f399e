//! The orchestra as a typed signal graph.
//!
//! A [`Patch`] lists numbered stages and the weighted sends between them. It
//! is plain data (serde round-trips it) and is checked and ordered once by
//! [`Patch::schedule`]; the engine only ever sees the resulting [`Schedule`].
//!
//! ```text
//!   voices (2..=199) ──┬──► 200 chorus ──┬──► 210 reverb ──► 220 master
//!                      │                 └──────────────────►
//!                      ├──────────────────► 210
//!                      └───────────────────────────────────► 220
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    config::OrchestraConfig,
    mixer::{BusId, SendId, CHORUS_BUS, MASTER_BUS, REVERB_BUS},
    voices,
};

#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("stage {0} is declared twice")]
    DuplicateStage(u32),
    #[error("send from stage {0}, which does not exist")]
    UnknownSource(u32),
    #[error("{from} targets {to}, which no effect owns")]
    UnknownBus { from: SendId, to: BusId },
    #[error("{from} targets {to}, which belongs to a voice")]
    SendIntoVoice { from: SendId, to: BusId },
    #[error("send from the master stage {0}; the master must be last")]
    MasterNotLast(u32),
    #[error("patch needs exactly one master stage, found {0}")]
    MasterCount(usize),
    #[error("bus effects feed back into each other: {0:?}")]
    FeedbackCycle(Vec<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Voice,
    Chorus,
    Reverb,
    Master,
}

impl StageKind {
    /// Whether the stage owns an input bus other stages can send into.
    pub fn has_bus(self) -> bool {
        !matches!(self, StageKind::Voice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: u32,
    pub kind: StageKind,
    pub name: String,
}

/// A weighted edge from a stage into a bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendRoute {
    pub from: SendId,
    pub to: BusId,
    pub gain: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub stages: Vec<Stage>,
    pub sends: Vec<SendRoute>,
}

impl Patch {
    /// Every instrument, the three effects, and the configured send levels.
    pub fn orchestra(config: &OrchestraConfig) -> Self {
        let mut patch = Self::default();

        for def in voices::all() {
            patch.stage(def.id, StageKind::Voice, def.name);
            if let Some(levels) = config.sends_for(def.id) {
                for (bus, gain) in levels.routes() {
                    patch.send(def.send_id(), bus, gain);
                }
            }
        }

        patch.stage(CHORUS_BUS.0, StageKind::Chorus, "chorus");
        patch.stage(REVERB_BUS.0, StageKind::Reverb, "reverb");
        patch.stage(MASTER_BUS.0, StageKind::Master, "master");

        let matrix = &config.matrix;
        patch.send(CHORUS_BUS.into(), REVERB_BUS, matrix.chorus_to_reverb);
        patch.send(CHORUS_BUS.into(), MASTER_BUS, matrix.chorus_to_master);
        patch.send(REVERB_BUS.into(), MASTER_BUS, matrix.reverb_to_master);

        patch
    }

    pub fn stage(&mut self, id: u32, kind: StageKind, name: impl Into<String>) -> &mut Self {
        self.stages.push(Stage {
            id,
            kind,
            name: name.into(),
        });
        self
    }

    pub fn send(&mut self, from: SendId, to: BusId, gain: f32) -> &mut Self {
        self.sends.push(SendRoute { from, to, gain });
        self
    }

    /// Check the graph and order the bus effects so every effect runs after
    /// everything that sends into it.
    pub fn schedule(&self) -> Result<Schedule, PatchError> {
        let mut kinds = BTreeMap::new();
        for stage in &self.stages {
            if kinds.insert(stage.id, stage).is_some() {
                return Err(PatchError::DuplicateStage(stage.id));
            }
        }

        let masters: Vec<&Stage> = self
            .stages
            .iter()
            .filter(|s| s.kind == StageKind::Master)
            .collect();
        let master = match masters.as_slice() {
            [master] => *master,
            other => return Err(PatchError::MasterCount(other.len())),
        };

        // edges between bus effects, for ordering
        let mut edges: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for route in &self.sends {
            let Some(source) = kinds.get(&route.from.0) else {
                return Err(PatchError::UnknownSource(route.from.0));
            };
            match kinds.get(&route.to.0) {
                None => {
                    return Err(PatchError::UnknownBus {
                        from: route.from,
                        to: route.to,
                    })
                }
                Some(target) if !target.kind.has_bus() => {
                    return Err(PatchError::SendIntoVoice {
                        from: route.from,
                        to: route.to,
                    })
                }
                Some(_) => {}
            }
            if source.kind == StageKind::Master {
                return Err(PatchError::MasterNotLast(source.id));
            }
            if source.kind.has_bus() {
                edges.entry(source.id).or_default().insert(route.to.0);
            }
        }

        let effects: BTreeSet<u32> = self
            .stages
            .iter()
            .filter(|s| s.kind.has_bus() && s.kind != StageKind::Master)
            .map(|s| s.id)
            .collect();

        // Kahn's algorithm, lowest id first among the ready stages
        let mut incoming: BTreeMap<u32, usize> = effects.iter().map(|&id| (id, 0)).collect();
        for targets in edges.values() {
            for target in targets {
                if let Some(count) = incoming.get_mut(target) {
                    *count += 1;
                }
            }
        }
        let mut ready: BTreeSet<u32> = incoming
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(effects.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for target in edges.get(&id).into_iter().flatten() {
                if let Some(count) = incoming.get_mut(target) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*target);
                    }
                }
            }
        }
        if order.len() < effects.len() {
            let stuck = incoming
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(id, _)| id)
                .collect();
            return Err(PatchError::FeedbackCycle(stuck));
        }

        let schedule = Schedule {
            voices: self
                .stages
                .iter()
                .filter(|s| s.kind == StageKind::Voice)
                .map(|s| s.id)
                .collect(),
            effects: order
                .into_iter()
                .filter_map(|id| kinds.get(&id))
                .map(|stage| ScheduledEffect {
                    bus: BusId(stage.id),
                    kind: stage.kind,
                    targets: edges
                        .get(&stage.id)
                        .map(|t| t.iter().copied().map(BusId).collect())
                        .unwrap_or_default(),
                })
                .collect(),
            master: BusId(master.id),
            sends: self.sends.clone(),
        };
        debug!(
            effects = schedule.effects.len(),
            sends = schedule.sends.len(),
            "patch scheduled"
        );
        Ok(schedule)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEffect {
    pub bus: BusId,
    pub kind: StageKind,
    pub targets: Vec<BusId>,
}

/// A checked patch: effects in run order, master last.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    voices: Vec<u32>,
    effects: Vec<ScheduledEffect>,
    master: BusId,
    sends: Vec<SendRoute>,
}

impl Schedule {
    pub fn orchestra(config: &OrchestraConfig) -> Result<Self, PatchError> {
        Patch::orchestra(config).schedule()
    }

    pub fn voices(&self) -> &[u32] {
        &self.voices
    }

    pub fn effects(&self) -> &[ScheduledEffect] {
        &self.effects
    }

    pub fn master(&self) -> BusId {
        self.master
    }

    pub fn sends(&self) -> &[SendRoute] {
        &self.sends
    }

    /// Every bus in the patch, in run order.
    pub fn busses(&self) -> impl Iterator<Item = BusId> + '_ {
        self.effects
            .iter()
            .map(|e| e.bus)
            .chain(std::iter::once(self.master))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "voices:")?;
        for &id in &self.voices {
            let name = voices::lookup(id).map_or("?", |def| def.name);
            writeln!(f, "  {id:>3} {name}")?;
        }
        writeln!(f, "run order:")?;
        for effect in &self.effects {
            writeln!(f, "  {:>3} {:?}", effect.bus.0, effect.kind)?;
        }
        writeln!(f, "  {:>3} Master", self.master.0)?;
        writeln!(f, "sends:")?;
        for route in &self.sends {
            writeln!(
                f,
                "  {:>3} -> {:>3}  {:.3}",
                route.from.0, route.to.0, route.gain
            )?;
        }
        Ok(())
    }
}
