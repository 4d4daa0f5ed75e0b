// orbital/wormhole.rs
//
// Distance regimes around a wormhole body, measured in capture radii:
//
//   d <= capture            exit immediately
//   d <= capture * pull     scripted spiral-in, exit when the pull times out
//   d <= capture * escape   velocity toward the body, feedback grows
//   beyond                  nothing; feedback relaxes

use glam::Vec3;

use crate::api::config::WormholeTuning;
use crate::api::types::{Pose, SceneId};
use crate::core::math::{rotate_about_pivot, smooth_toward};
use crate::core::time::Deadline;
use crate::orbital::body::OrbitalBody;
use crate::scene::outbox::ExitRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WormholePhase {
    Approach,
    Pull,
    Capture,
}

/// Live contact with one wormhole.
#[derive(Debug, Clone, PartialEq)]
pub struct WormholeEncounter {
    pub body: String,
    pub target: SceneId,
    pub pose: Option<Pose>,
    pub phase: WormholePhase,
    /// Seconds spent in the pull phase.
    pub pull_time: f32,
    pull_deadline: Option<Deadline>,
}

/// What the attractor wants done this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WormholeOutcome {
    /// Velocity to impose on whatever the player is flying.
    pub velocity: Option<Vec3>,
    pub exit: Option<ExitRequest>,
}

#[derive(Debug, Clone)]
pub struct WormholeAttractor {
    tuning: WormholeTuning,
    encounter: Option<WormholeEncounter>,
    feedback: f32,
}

impl WormholeAttractor {
    pub fn new(tuning: WormholeTuning) -> Self {
        Self {
            tuning,
            encounter: None,
            feedback: 0.0,
        }
    }

    pub fn pull_radius(&self, capture: f32) -> f32 {
        capture * self.tuning.pull_ratio
    }

    pub fn escape_radius(&self, capture: f32) -> f32 {
        capture * self.tuning.escape_ratio
    }

    pub fn encounter(&self) -> Option<&WormholeEncounter> {
        self.encounter.as_ref()
    }

    /// Ambient shake intensity in [0, 1].
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn update(&mut self, bodies: &[OrbitalBody], player: Vec3, dt: f32, now: f64) -> WormholeOutcome {
        let wormholes = || {
            bodies
                .iter()
                .filter(|b| b.is_wormhole())
                .filter_map(|b| b.exit().map(|exit| (b, exit)))
        };

        // capture beats everything, first body wins
        for (body, exit) in wormholes() {
            if body.position().distance(player) <= exit.radius {
                log::info!("wormhole `{}` captured the player", body.name);
                self.encounter = None;
                self.feedback = 1.0;
                return WormholeOutcome {
                    velocity: None,
                    exit: Some(ExitRequest::new(exit.scene.clone(), exit.pose, body.name.clone())),
                };
            }
        }

        // a pull in progress runs to completion
        if let Some(encounter) = self.encounter.as_mut().filter(|e| e.phase == WormholePhase::Pull) {
            let Some(body) = bodies.iter().find(|b| b.name == encounter.body) else {
                log::warn!("wormhole `{}` vanished mid-pull", encounter.body);
                self.encounter = None;
                return WormholeOutcome::default();
            };
            encounter.pull_time += dt;
            self.feedback = 1.0;
            if encounter.pull_deadline.is_some_and(|d| d.expired(now)) {
                let exit = ExitRequest::new(encounter.target.clone(), encounter.pose, encounter.body.clone());
                encounter.phase = WormholePhase::Capture;
                self.encounter = None;
                return WormholeOutcome {
                    velocity: None,
                    exit: Some(exit),
                };
            }
            return WormholeOutcome {
                velocity: Some(self.spiral_velocity(body.position(), player, dt)),
                exit: None,
            };
        }

        for (body, exit) in wormholes() {
            let distance = body.position().distance(player);
            let pull = self.pull_radius(exit.radius);
            if distance <= pull {
                log::info!("wormhole `{}` pull started", body.name);
                self.encounter = Some(WormholeEncounter {
                    body: body.name.clone(),
                    target: exit.scene.clone(),
                    pose: exit.pose,
                    phase: WormholePhase::Pull,
                    pull_time: 0.0,
                    pull_deadline: Some(Deadline::after(now, self.tuning.pull_duration)),
                });
                self.feedback = 1.0;
                return WormholeOutcome {
                    velocity: Some(self.spiral_velocity(body.position(), player, dt)),
                    exit: None,
                };
            }
        }

        for (body, exit) in wormholes() {
            let distance = body.position().distance(player);
            let pull = self.pull_radius(exit.radius);
            let escape = self.escape_radius(exit.radius);
            if distance <= escape {
                let span = (escape - pull).max(f32::EPSILON);
                self.feedback = ((escape - distance) / span).clamp(0.0, 1.0);
                let same = self.encounter.as_ref().is_some_and(|e| e.body == body.name);
                if !same {
                    self.encounter = Some(WormholeEncounter {
                        body: body.name.clone(),
                        target: exit.scene.clone(),
                        pose: exit.pose,
                        phase: WormholePhase::Approach,
                        pull_time: 0.0,
                        pull_deadline: None,
                    });
                }
                let toward = (body.position() - player).normalize_or_zero();
                return WormholeOutcome {
                    velocity: Some(toward * self.tuning.approach_speed),
                    exit: None,
                };
            }
        }

        // out of range of everything
        self.encounter = None;
        self.feedback = smooth_toward(self.feedback, 0.0, self.tuning.feedback_relax, dt);
        if self.feedback < 1e-3 {
            self.feedback = 0.0;
        }
        WormholeOutcome::default()
    }

    /// Velocity toward a target point that circles the wormhole and tightens.
    fn spiral_velocity(&self, center: Vec3, player: Vec3, dt: f32) -> Vec3 {
        let swung = rotate_about_pivot(player, center, Vec3::Z, self.tuning.spiral_rate * dt.max(1e-3));
        let shrink = (1.0 - self.tuning.spiral_inward * dt.max(1e-3)).clamp(0.0, 1.0);
        let target = center + (swung - center) * shrink;
        (target - player).normalize_or_zero() * self.tuning.spiral_speed
    }
}
