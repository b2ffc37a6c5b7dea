use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::VisualizerSettings;

use super::particles::{EMIT_THRESHOLD, MAX_PARTICLES, Particle, ParticleField};
use super::projection::{bands, bar_levels, mean, waveform};
use super::publish::SnapshotPublisher;
use super::schedule::PeriodicTask;
use super::*;

/// A fixed spectrum, returned on every read.
struct Constant(Vec<u8>);

impl FrequencySource for Constant {
    fn frequency_data(&mut self) -> Vec<u8> {
        self.0.clone()
    }
}

/// Counts reads so tests can tell whether a frame ran.
struct Counting {
    reads: usize,
}

impl FrequencySource for Counting {
    fn frequency_data(&mut self) -> Vec<u8> {
        self.reads += 1;
        vec![0; 64]
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn sampler() -> Sampler {
    Sampler::with_rng(&VisualizerSettings::default(), StdRng::seed_from_u64(7))
}

#[test]
fn projections_stay_within_zero_to_hundred() {
    let data: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
    let bars = bar_levels(&data);
    let wave = waveform(&data);

    assert_eq!(bars.len(), BAR_COUNT);
    assert_eq!(wave.len(), WAVEFORM_POINTS);
    for v in bars.iter().chain(wave.iter()).chain(bands(&bars).iter()) {
        assert!((0.0..=100.0).contains(v), "{v} out of range");
    }

    let full = bar_levels(&[255; 64]);
    assert!(full.iter().all(|&v| (v - 100.0).abs() < 1e-4));
}

#[test]
fn waveform_reuses_the_frequency_bins() {
    let data: Vec<u8> = (0..64).map(|i| i as u8).collect();
    let bars = bar_levels(&data);
    let wave = waveform(&data);
    assert_eq!(&wave[..BAR_COUNT], &bars[..]);
}

#[test]
fn short_spectra_are_zero_padded() {
    let bars = bar_levels(&[255; 4]);
    assert_eq!(bars.len(), BAR_COUNT);
    assert!(bars[4..].iter().all(|&v| v == 0.0));
}

#[test]
fn bands_average_six_six_six_six_eight() {
    let mut bars = vec![0.0; BAR_COUNT];
    bars[..6].fill(60.0);
    bars[6..12].fill(30.0);
    bars[24..].fill(80.0);

    let b = bands(&bars);
    assert_eq!(b, [60.0, 30.0, 0.0, 0.0, 80.0]);
    assert_eq!(BAND_LABELS[0], "Bass");
    assert_eq!(BAND_LABELS[4], "Treble");
}

#[test]
fn mean_of_nothing_is_zero() {
    assert_eq!(mean(&[]), 0.0);
    assert_eq!(mean(&[10.0, 20.0]), 15.0);
}

#[test]
fn particles_only_emit_above_threshold() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut field = ParticleField::default();

    assert!(!field.maybe_emit(EMIT_THRESHOLD, &mut rng));
    assert!(field.particles().is_empty());
    assert!(field.maybe_emit(EMIT_THRESHOLD + 0.1, &mut rng));
    assert_eq!(field.particles().len(), 1);
}

#[test]
fn random_particles_respect_their_ranges() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let p = Particle::random(&mut rng);
        assert!((0.0..100.0).contains(&p.x));
        assert!((0.0..100.0).contains(&p.y));
        assert!((1.0..4.0).contains(&p.size));
        assert!((0.2..1.0).contains(&p.opacity));
        assert!((-1.0..1.0).contains(&p.vx));
        assert!((-1.0..1.0).contains(&p.vy));
    }
}

#[test]
fn particle_count_never_exceeds_cap_and_oldest_go_first() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut field = ParticleField::default();

    for _ in 0..MAX_PARTICLES {
        field.maybe_emit(50.0, &mut rng);
    }
    let second = field.particles()[1];
    for _ in 0..20 {
        field.maybe_emit(50.0, &mut rng);
        assert!(field.particles().len() <= MAX_PARTICLES);
    }
    assert_eq!(field.particles().len(), MAX_PARTICLES);
    assert!(!field.particles().contains(&second));
}

#[test]
fn ticks_move_fade_and_eventually_remove() {
    let mut field = ParticleField::default();
    let mut rng = StdRng::seed_from_u64(9);
    field.maybe_emit(50.0, &mut rng);
    let before = field.particles()[0];

    assert!(field.tick());
    let after = field.particles()[0];
    assert!((after.x - (before.x + before.vx)).abs() < 1e-5);
    assert!((after.y - (before.y + before.vy)).abs() < 1e-5);
    assert!((after.opacity - before.opacity * 0.98).abs() < 1e-6);

    // 0.98^n * 1.0 drops to 0.1 after ~114 ticks at most.
    for _ in 0..200 {
        field.tick();
        assert!(field.particles().iter().all(|p| p.opacity > 0.1));
    }
    assert!(field.particles().is_empty());
    assert!(!field.tick());
}

#[test]
fn periodic_task_fires_immediately_then_on_interval() {
    let t0 = Instant::now();
    let mut task = PeriodicTask::new(ms(16));
    assert!(!task.poll(t0));

    task.start(t0);
    assert!(task.poll(t0));
    assert!(!task.poll(t0 + ms(10)));
    assert_eq!(task.time_until_next(t0 + ms(10)), Some(ms(6)));
    assert!(task.poll(t0 + ms(16)));

    // A long stall yields one run, not a burst.
    assert!(task.poll(t0 + ms(500)));
    assert!(!task.poll(t0 + ms(501)));

    task.stop();
    assert!(!task.poll(t0 + ms(10_000)));
    assert_eq!(task.time_until_next(t0), None);
}

#[test]
fn inactive_sampler_never_reads_the_analyser() {
    let mut s = sampler();
    let rx = s.subscribe();
    let mut source = Counting { reads: 0 };
    let t0 = Instant::now();

    s.advance(t0, &mut source);
    s.advance(t0 + ms(100), &mut source);
    assert_eq!(source.reads, 0);

    s.set_active(true, t0 + ms(100));
    assert!(s.advance(t0 + ms(100), &mut source));
    assert_eq!(source.reads, 1);

    s.set_active(false, t0 + ms(101));
    s.advance(t0 + ms(200), &mut source);
    s.advance(t0 + ms(300), &mut source);
    assert_eq!(source.reads, 1);
    let last = rx.try_iter().last().unwrap();
    assert!(!last.active);
}

#[test]
fn five_loud_frames_add_exactly_five_particles() {
    let mut s = sampler();
    let rx = s.subscribe();
    // 51 / 255 * 100 = 20, above the emission threshold.
    let mut source = Constant(vec![51; 64]);
    let t0 = Instant::now();
    s.set_active(true, t0);

    for i in 0..5 {
        s.advance(t0 + ms(16 * i), &mut source);
    }
    let last = rx.try_iter().last().unwrap();
    assert_eq!(last.particles.len(), 5);
    assert!(last.bars.iter().all(|&v| (v - 20.0).abs() < 1e-4));
}

#[test]
fn quiet_frames_emit_nothing() {
    let mut s = sampler();
    let rx = s.subscribe();
    let mut source = Constant(vec![20; 64]);
    let t0 = Instant::now();
    s.set_active(true, t0);

    for i in 0..10 {
        s.advance(t0 + ms(16 * i), &mut source);
    }
    assert!(rx.try_iter().all(|snapshot| snapshot.particles.is_empty()));
}

#[test]
fn subscribers_receive_snapshots_and_dropped_ones_are_pruned() {
    let mut s = sampler();
    let rx = s.subscribe();
    let gone = s.subscribe();
    drop(gone);

    let mut source = Constant(vec![255; 64]);
    let t0 = Instant::now();
    s.set_active(true, t0);
    assert!(s.advance(t0, &mut source));

    let snapshot = rx.try_recv().unwrap();
    assert!(snapshot.active);
    assert_eq!(snapshot.bars.len(), BAR_COUNT);
    assert_eq!(snapshot.bands.len(), 5);

    s.shutdown();
    s.set_active(true, t0 + ms(1_000));
    assert!(!s.advance(t0 + ms(1_000), &mut source));
    assert!(rx.try_recv().is_err());
}

#[test]
fn publisher_prunes_closed_receivers() {
    let mut publisher = SnapshotPublisher::default();
    let keep = publisher.subscribe();
    let dropped = publisher.subscribe();
    drop(dropped);

    publisher.publish(&std::sync::Arc::new(VisualSnapshot::default()));
    assert_eq!(publisher.subscriber_count(), 1);
    assert!(keep.try_recv().is_ok());
}
