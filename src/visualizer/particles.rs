use rand::Rng;

/// Mean bar level above which a frame emits a particle.
pub const EMIT_THRESHOLD: f32 = 15.0;
/// The ten most recent particles plus the one just emitted.
pub const MAX_PARTICLES: usize = 11;
const FADE: f32 = 0.98;
const MIN_OPACITY: f32 = 0.1;

/// A dot on the 0-100 particle canvas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub opacity: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Particle {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.random_range(0.0..100.0),
            y: rng.random_range(0.0..100.0),
            size: rng.random_range(1.0..4.0),
            opacity: rng.random_range(0.2..1.0),
            vx: rng.random_range(-1.0..1.0),
            vy: rng.random_range(-1.0..1.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Emit one particle if `mean_level` is loud enough. Returns whether one was added.
    pub fn maybe_emit<R: Rng + ?Sized>(&mut self, mean_level: f32, rng: &mut R) -> bool {
        if mean_level <= EMIT_THRESHOLD {
            return false;
        }
        let keep = MAX_PARTICLES - 1;
        if self.particles.len() > keep {
            let excess = self.particles.len() - keep;
            self.particles.drain(..excess);
        }
        self.particles.push(Particle::random(rng));
        true
    }

    /// Move and fade every particle, dropping the ones that faded out.
    /// Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        if self.particles.is_empty() {
            return false;
        }
        for p in &mut self.particles {
            p.x += p.vx;
            p.y += p.vy;
            p.opacity *= FADE;
        }
        self.particles.retain(|p| p.opacity > MIN_OPACITY);
        true
    }
}
