use crate::{Axis, BoundaryPolicy, Error, PhysicsOptions, Result, Vec2};

/// Fixed integration step used while settling, independent of the caller's frame rate.
pub const BASE_STEP: f32 = 1.0 / 60.0;

// Caps catch-up work after a stall to one second of sub-steps.
const MAX_CATCH_UP: f32 = 1.0;
// Inertia stops below this speed (px/s, scaled by pixels_per_point).
const MIN_VELOCITY: f32 = 5.0;
// The spring snaps onto the bound once within this distance (px, scaled by pixels_per_point).
const SNAP_DISTANCE: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysicsState {
    #[default]
    Idle,
    /// A pointer is down and drives the offset.
    Tracking,
    /// Inertia and/or spring-back are running; call [`ScrollPhysics::settle`] every frame.
    Settling,
}

/// Touch/drag scroll physics: elastic boundaries, inertial deceleration, spring-back.
///
/// Independent of the virtualization layer. Feed it pointer samples and frame ticks, read
/// [`Self::offset`] back and hand it to the controller.
#[derive(Clone, Debug)]
pub struct ScrollPhysics {
    options: PhysicsOptions,
    state: PhysicsState,
    offset: Vec2,
    velocity: Vec2,
    spring_velocity: Vec2,
    low: Vec2,
    high: Vec2,

    start_offset: Vec2,
    start_pointer: Vec2,
    last_sample_ms: u64,
    last_tick_ms: u64,
    accumulator: f32,
}

impl Default for ScrollPhysics {
    fn default() -> Self {
        Self::new(PhysicsOptions::default())
    }
}

impl ScrollPhysics {
    pub fn new(options: PhysicsOptions) -> Self {
        Self {
            options: options.sanitized(),
            state: PhysicsState::Idle,
            offset: Vec2::ZERO,
            velocity: Vec2::ZERO,
            spring_velocity: Vec2::ZERO,
            low: Vec2::ZERO,
            high: Vec2::ZERO,
            start_offset: Vec2::ZERO,
            start_pointer: Vec2::ZERO,
            last_sample_ms: 0,
            last_tick_ms: 0,
            accumulator: 0.0,
        }
    }

    pub fn options(&self) -> &PhysicsOptions {
        &self.options
    }

    /// Out-of-range values are pulled back into range.
    pub fn set_options(&mut self, options: PhysicsOptions) {
        self.options = options.sanitized();
    }

    pub fn state(&self) -> PhysicsState {
        self.state
    }

    pub fn is_settling(&self) -> bool {
        self.state == PhysicsState::Settling
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn low(&self) -> Vec2 {
        self.low
    }

    pub fn high(&self) -> Vec2 {
        self.high
    }

    /// Sets the scroll limits. Rejects `low > high` on either axis.
    pub fn set_limits(&mut self, low: Vec2, high: Vec2) -> Result<()> {
        for axis in Axis::BOTH {
            let (lo, hi) = (low.get(axis), high.get(axis));
            if !(lo <= hi) {
                return Err(Error::InvertedLimits {
                    axis,
                    low: lo,
                    high: hi,
                });
            }
        }
        self.apply_limits(low, high);
        Ok(())
    }

    /// Like [`Self::set_limits`], but swaps inverted pairs instead of failing. Non-finite
    /// limits become zero.
    pub fn fit_limits(&mut self, mut low: Vec2, mut high: Vec2) {
        for axis in Axis::BOTH {
            let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
            let (lo, hi) = (finite(low.get(axis)), finite(high.get(axis)));
            low.set(axis, lo);
            high.set(axis, hi);
            if lo > hi {
                lwarn!(%axis, low = lo, high = hi, "fit_limits: swapping inverted limits");
                low.set(axis, hi);
                high.set(axis, lo);
            }
        }
        self.apply_limits(low, high);
    }

    /// Whether the offset lies outside the limits on any axis.
    pub fn is_out_of_bounds(&self) -> bool {
        Axis::BOTH.into_iter().any(|axis| {
            let v = self.offset.get(axis);
            v < self.low.get(axis) || v > self.high.get(axis)
        })
    }

    /// Jumps to `offset` (clamped unless unrestricted) and stops any motion.
    pub fn set_offset(&mut self, offset: Vec2) {
        if !offset.is_finite() {
            lwarn!("set_offset: ignoring non-finite offset");
            return;
        }
        self.stop();
        self.offset = self.clamp_unless_unrestricted(offset);
    }

    /// Moves the content by `delta` without disturbing a running gesture or settle.
    ///
    /// Used when rows above the viewport change height: the drag keeps its grab point and
    /// velocity is preserved. No clamping is applied.
    pub fn shift_offset(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        self.offset += delta;
        self.start_offset += delta;
    }

    /// Scrolls by `delta` with hard clamping (wheel, keyboard). Cancels settling and tracking.
    pub fn scroll_by(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        let target = self.offset + delta;
        self.set_offset(target);
    }

    pub fn pointer_down(&mut self, pointer: Vec2, now_ms: u64) {
        if !pointer.is_finite() {
            return;
        }
        ltrace!(from = ?self.state, "physics: tracking");
        self.state = PhysicsState::Tracking;
        self.velocity = Vec2::ZERO;
        self.spring_velocity = Vec2::ZERO;
        self.accumulator = 0.0;
        self.start_pointer = pointer;
        self.last_sample_ms = now_ms;
        self.start_offset = self.offset;
        if self.options.boundary == BoundaryPolicy::Elastic {
            // Grabbing content that is still overscrolled resumes from the equivalent raw
            // displacement so it does not jump.
            for axis in Axis::BOTH {
                let v = self.offset.get(axis);
                let (lo, hi) = (self.low.get(axis), self.high.get(axis));
                let width = self.options.elastic_width;
                let raw = if v < lo {
                    lo - unrubber(lo - v, width)
                } else if v > hi {
                    hi + unrubber(v - hi, width)
                } else {
                    v
                };
                self.start_offset.set(axis, raw);
            }
        }
    }

    /// Follows the pointer. Ignored unless tracking.
    pub fn pointer_move(&mut self, pointer: Vec2, now_ms: u64) {
        if self.state != PhysicsState::Tracking || !pointer.is_finite() {
            return;
        }
        let candidate = self.start_offset - (pointer - self.start_pointer);
        let mut next = Vec2::ZERO;
        for axis in Axis::BOTH {
            next.set(axis, self.apply_boundary(axis, candidate.get(axis)));
        }

        let elapsed_ms = now_ms.saturating_sub(self.last_sample_ms);
        if elapsed_ms > 0 {
            self.decay_stale_velocity(elapsed_ms);
            let dt = elapsed_ms as f32 / 1000.0;
            let instant = (next - self.offset) * (1.0 / dt);
            let k = self.smoothing_factor(dt);
            self.velocity += (instant - self.velocity) * k;
            self.last_sample_ms = now_ms;
        }
        self.offset = next;
    }

    /// Ends the gesture. Starts settling when there is velocity to spend or overscroll to undo.
    pub fn pointer_up(&mut self, now_ms: u64) {
        if self.state != PhysicsState::Tracking {
            return;
        }
        self.decay_stale_velocity(now_ms.saturating_sub(self.last_sample_ms));
        let threshold = self.min_velocity();
        for axis in Axis::BOTH {
            if !self.options.inertia || self.velocity.get(axis).abs() < threshold {
                self.velocity.set(axis, 0.0);
            }
        }
        self.begin_settling(now_ms);
    }

    /// Aborts the gesture without inertia. Overscroll still springs back.
    pub fn pointer_cancel(&mut self, now_ms: u64) {
        if self.state != PhysicsState::Tracking {
            return;
        }
        self.velocity = Vec2::ZERO;
        self.begin_settling(now_ms);
    }

    /// Stops all motion immediately, leaving the offset where it is.
    pub fn stop(&mut self) {
        self.state = PhysicsState::Idle;
        self.velocity = Vec2::ZERO;
        self.spring_velocity = Vec2::ZERO;
        self.accumulator = 0.0;
    }

    /// Advances settling to `now_ms`. Returns whether another tick is needed.
    ///
    /// Time is consumed in fixed [`BASE_STEP`] sub-steps; the fractional remainder is carried to
    /// the next call, so the trajectory depends on elapsed time only, not on how it was sliced
    /// into frames.
    pub fn settle(&mut self, now_ms: u64) -> bool {
        if self.state != PhysicsState::Settling {
            return false;
        }
        let elapsed = now_ms.saturating_sub(self.last_tick_ms) as f32 / 1000.0;
        self.last_tick_ms = now_ms;
        self.accumulator = (self.accumulator + elapsed).min(MAX_CATCH_UP);

        while self.accumulator >= BASE_STEP {
            self.accumulator -= BASE_STEP;
            self.step(BASE_STEP);
            if self.at_rest() {
                ltrace!(x = self.offset.x, y = self.offset.y, "physics: settled");
                self.stop();
                return false;
            }
        }
        true
    }

    fn begin_settling(&mut self, now_ms: u64) {
        let elastic_overscroll =
            self.options.boundary == BoundaryPolicy::Elastic && self.is_out_of_bounds();
        if elastic_overscroll || self.velocity != Vec2::ZERO {
            ltrace!(
                vx = self.velocity.x,
                vy = self.velocity.y,
                overscroll = elastic_overscroll,
                "physics: settling"
            );
            self.state = PhysicsState::Settling;
            self.spring_velocity = Vec2::ZERO;
            self.accumulator = 0.0;
            self.last_tick_ms = now_ms;
        } else {
            self.stop();
        }
    }

    fn step(&mut self, h: f32) {
        let snap = SNAP_DISTANCE * self.options.pixels_per_point;
        let min_velocity = self.min_velocity();

        for axis in Axis::BOTH {
            let (lo, hi) = (self.low.get(axis), self.high.get(axis));
            let mut off = self.offset.get(axis);
            let mut vel = self.velocity.get(axis);
            let mut spring = self.spring_velocity.get(axis);

            let outside = off < lo || off > hi;
            if self.options.boundary == BoundaryPolicy::Elastic && outside {
                let target = off.clamp(lo, hi);
                if vel != 0.0 {
                    // Hand remaining momentum to the spring.
                    spring += vel;
                    vel = 0.0;
                }
                off = smooth_damp(off, target, &mut spring, self.options.elasticity, h);
                if (off - target).abs() <= snap {
                    off = target;
                    spring = 0.0;
                }
            } else if vel != 0.0 {
                vel *= self.options.deceleration_rate.powf(h);
                off += vel * h;
                if vel.abs() < min_velocity {
                    vel = 0.0;
                }
                if self.options.boundary == BoundaryPolicy::Clamped && (off < lo || off > hi) {
                    off = off.clamp(lo, hi);
                    vel = 0.0;
                }
            } else {
                spring = 0.0;
            }

            self.offset.set(axis, off);
            self.velocity.set(axis, vel);
            self.spring_velocity.set(axis, spring);
        }
    }

    fn at_rest(&self) -> bool {
        let resting = self.velocity == Vec2::ZERO && self.spring_velocity == Vec2::ZERO;
        let in_bounds =
            self.options.boundary != BoundaryPolicy::Elastic || !self.is_out_of_bounds();
        resting && in_bounds
    }

    fn apply_boundary(&self, axis: Axis, candidate: f32) -> f32 {
        let (lo, hi) = (self.low.get(axis), self.high.get(axis));
        match self.options.boundary {
            BoundaryPolicy::Unrestricted => candidate,
            BoundaryPolicy::Clamped => candidate.clamp(lo, hi),
            BoundaryPolicy::Elastic => {
                let width = self.options.elastic_width;
                if candidate < lo {
                    lo - rubber(lo - candidate, width)
                } else if candidate > hi {
                    hi + rubber(candidate - hi, width)
                } else {
                    candidate
                }
            }
        }
    }

    fn apply_limits(&mut self, low: Vec2, high: Vec2) {
        self.low = low;
        self.high = high;
        // A resting offset follows the limits (content shrank under it); a moving one is left
        // to the gesture or the spring.
        if self.state == PhysicsState::Idle {
            self.offset = self.clamp_unless_unrestricted(self.offset);
        }
    }

    fn clamp_unless_unrestricted(&self, offset: Vec2) -> Vec2 {
        if self.options.boundary == BoundaryPolicy::Unrestricted {
            return offset;
        }
        Vec2::new(
            offset.x.clamp(self.low.x, self.high.x),
            offset.y.clamp(self.low.y, self.high.y),
        )
    }

    fn decay_stale_velocity(&mut self, gap_ms: u64) {
        let max_gap = self.options.max_sample_gap_ms;
        if gap_ms <= max_gap {
            return;
        }
        let stale = (gap_ms - max_gap) as f32 / 1000.0;
        let smoothing = self.options.velocity_smoothing.max(1.0);
        self.velocity = self.velocity * (-stale * smoothing).exp();
    }

    fn smoothing_factor(&self, dt: f32) -> f32 {
        let smoothing = self.options.velocity_smoothing;
        if smoothing <= 0.0 {
            return 1.0;
        }
        (dt * smoothing).min(1.0)
    }

    fn min_velocity(&self) -> f32 {
        MIN_VELOCITY * self.options.pixels_per_point
    }
}

/// Displayed overscroll for a raw overscroll `d`: grows without bound in `d` but never past
/// `scale`.
fn rubber(d: f32, scale: f32) -> f32 {
    scale * (1.0 - 1.0 / (d / scale + 1.0))
}

fn unrubber(displayed: f32, scale: f32) -> f32 {
    let ratio = (displayed / scale).min(0.999);
    scale * (1.0 / (1.0 - ratio) - 1.0)
}

/// Critically damped spring toward `target` (game-programming-gems formulation).
///
/// Never overshoots the target.
fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}
