use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

const SPARKS: [char; 5] = ['★', '☆', '✦', '✧', '•'];
const CHEERS: [&str; 4] = ["好棒！", "真厲害！", "太棒了！", "你做到了！"];
const GRAVITY: f64 = 12.0;
const STEP: f64 = 0.1;

/// One piece of the star burst shown with the reward modal
#[derive(Debug, Clone)]
pub struct Spark {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Letters of the cheer settle on their target and stay put
    pub anchored: bool,
    pub target_x: f64,
    pub target_y: f64,
}

impl Spark {
    fn loose<R: Rng + ?Sized>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-4.0..4.0),
            vel_y: rng.gen_range(-5.0..-1.5),
            symbol: *SPARKS.choose(rng).unwrap_or(&'★'),
            color_index: rng.gen_range(0..6),
            age: 0.0,
            max_age: rng.gen_range(1.5..3.0),
            anchored: false,
            target_x: x,
            target_y: y,
        }
    }

    fn letter(from: (f64, f64), to: (f64, f64), symbol: char, color_index: usize) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: 0.0,
            vel_y: 0.0,
            symbol,
            color_index,
            age: 0.0,
            max_age: f64::INFINITY,
            anchored: true,
            target_x: to.0,
            target_y: to.1,
        }
    }

    fn update(&mut self, dt: f64) -> bool {
        if self.anchored {
            let dist = ((self.target_x - self.x).powi(2) + (self.target_y - self.y).powi(2)).sqrt();
            if dist > 0.5 {
                let k = (3.0 * dt).min(1.0);
                self.x += (self.target_x - self.x) * k;
                self.y += (self.target_y - self.y) * k;
            } else {
                self.x = self.target_x;
                self.y = self.target_y;
            }
        } else {
            self.x += self.vel_x * dt;
            self.y += self.vel_y * dt;
            self.vel_y += GRAVITY * dt;
        }
        self.age += dt;
        self.age < self.max_age
    }
}

/// Star burst played while the reward modal is up. Loose sparks fall away;
/// the cheer stays until the modal is dismissed.
#[derive(Debug, Default)]
pub struct RewardBurst {
    pub sparks: Vec<Spark>,
    pub cheer: &'static str,
    active: bool,
    last_update: Option<Duration>,
    width: f64,
    height: f64,
}

impl RewardBurst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start<R: Rng + ?Sized>(&mut self, width: u16, height: u16, rng: &mut R) {
        self.sparks.clear();
        self.active = true;
        self.last_update = None;
        self.width = width as f64;
        self.height = height as f64;
        self.cheer = CHEERS.choose(rng).copied().unwrap_or(CHEERS[0]);

        let cx = self.width / 2.0;
        let cy = self.height / 2.0;

        // Wide glyphs take two cells.
        let letters: Vec<char> = self.cheer.chars().collect();
        let span = (letters.len() as f64 - 1.0) * 2.0;
        for (i, ch) in letters.into_iter().enumerate() {
            let to = (cx - span / 2.0 + i as f64 * 2.0, cy - 1.0);
            let from = (cx + rng.gen_range(-8.0..8.0), cy + rng.gen_range(-4.0..4.0));
            self.sparks.push(Spark::letter(from, to, ch, i % 6));
        }
        for _ in 0..30 {
            let (dx, dy) = (rng.gen_range(-12.0..12.0), rng.gen_range(-5.0..5.0));
            self.sparks.push(Spark::loose(cx + dx, cy + dy, rng));
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.sparks.clear();
    }

    /// Advances the animation to `now` in fixed steps.
    pub fn update(&mut self, now: Duration) {
        if !self.active {
            return;
        }
        let Some(last) = self.last_update else {
            self.last_update = Some(now);
            return;
        };
        let steps = (now.saturating_sub(last).as_secs_f64() / STEP).floor() as u32;
        if steps == 0 {
            return;
        }
        self.last_update = Some(last + Duration::from_secs_f64(steps as f64 * STEP));

        let (width, height) = (self.width, self.height);
        for _ in 0..steps {
            self.sparks.retain_mut(|s| {
                let alive = s.update(STEP);
                let off_screen = !s.anchored && (s.y > height + 3.0 || s.x < -3.0 || s.x > width + 3.0);
                alive && !off_screen
            });
        }
    }
}
