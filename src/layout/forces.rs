use glam::Vec3;

use super::engine::{Body, Spring};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub charge_max_distance: f32,
    pub collide_padding: f32,
    pub collide_strength: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            link_distance: 30.0,
            charge_strength: -100.0,
            charge_max_distance: 200.0,
            collide_padding: 2.0,
            collide_strength: 1.0,
        }
    }
}

/// Direction used when two bodies coincide, so coincident pairs still separate.
fn coincident_direction(from: usize, to: usize, planar: bool) -> Vec3 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    let tilt = if planar {
        0.0
    } else {
        ((from as f32) * 0.318_31 + 0.25).sin() * 0.5
    };
    Vec3::new(angle.cos(), angle.sin(), tilt).normalize() * 1e-3
}

pub(super) fn apply_links(bodies: &mut [Body], springs: &[Spring], params: &ForceParams, alpha: f32, planar: bool) {
    for spring in springs {
        let (source, target) = (spring.source, spring.target);
        let mut delta = (bodies[target].position + bodies[target].velocity)
            - (bodies[source].position + bodies[source].velocity);
        if delta.length_squared() <= f32::EPSILON {
            delta = coincident_direction(source, target, planar);
        }

        let distance = delta.length();
        let stretch = (distance - params.link_distance) / distance * alpha * spring.strength;
        let correction = delta * stretch;

        bodies[target].velocity -= correction * spring.bias;
        bodies[source].velocity += correction * (1.0 - spring.bias);
    }
}

pub(super) fn apply_charge(bodies: &mut [Body], params: &ForceParams, alpha: f32, planar: bool) {
    let max_distance_sq = params.charge_max_distance * params.charge_max_distance;
    let count = bodies.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let mut delta = bodies[j].position - bodies[i].position;
            let mut distance_sq = delta.length_squared();
            if distance_sq >= max_distance_sq {
                continue;
            }
            if distance_sq <= f32::EPSILON {
                delta = coincident_direction(i, j, planar);
                distance_sq = delta.length_squared();
            }
            if distance_sq < 1.0 {
                distance_sq = distance_sq.sqrt();
            }

            let push = delta * (params.charge_strength * alpha / distance_sq);
            bodies[i].velocity += push;
            bodies[j].velocity -= push;
        }
    }
}

pub(super) fn apply_centering(bodies: &mut [Body]) {
    if bodies.is_empty() {
        return;
    }

    let mut centroid = Vec3::ZERO;
    for body in bodies.iter() {
        centroid += body.position;
    }
    centroid /= bodies.len() as f32;

    if centroid.length_squared() > 0.000_001 {
        for body in bodies.iter_mut() {
            body.position -= centroid;
        }
    }
}

pub(super) fn apply_collisions(bodies: &mut [Body], params: &ForceParams, planar: bool) {
    let count = bodies.len();

    for i in 0..count {
        let radius_i = bodies[i].radius + params.collide_padding;
        let radius_i_sq = radius_i * radius_i;

        for j in (i + 1)..count {
            let radius_j = bodies[j].radius + params.collide_padding;
            let min_distance = radius_i + radius_j;

            let mut delta = (bodies[i].position + bodies[i].velocity)
                - (bodies[j].position + bodies[j].velocity);
            let mut distance_sq = delta.length_squared();
            if distance_sq >= min_distance * min_distance {
                continue;
            }
            if distance_sq <= f32::EPSILON {
                delta = coincident_direction(i, j, planar);
                distance_sq = delta.length_squared();
            }

            let distance = distance_sq.sqrt();
            let overlap = (min_distance - distance) / distance * params.collide_strength;
            let push = delta * overlap;
            let radius_j_sq = radius_j * radius_j;
            let share = radius_j_sq / (radius_i_sq + radius_j_sq);

            bodies[i].velocity += push * share;
            bodies[j].velocity -= push * (1.0 - share);
        }
    }
}
