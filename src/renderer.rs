use crate::error::{ArithmeticError, LocationError, RenderError};
use crate::math::{Perturbation, Reference, SeriesApproximation};
use crate::util::colouring::{colour_for, Colour, Palette};
use crate::util::complex_arbitrary::digits_for_scale;
use crate::util::grid::{interpolate, IterationGrid};
use crate::util::image::DrawSurface;
use crate::util::location::Location;
use crate::util::progress::{ProgressCounters, Stats};
use crate::util::recalculate::RecalculateFlags;
use crate::util::{ComplexExtended, FloatExtended};

use atomic_counter::AtomicCounter;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pixel spacing of the first, coarsest refinement pass.
pub const INITIAL_STEP: usize = 32;

/// Scale factor of a single zoom in or out at a pixel.
pub const ZOOM_FACTOR: f64 = 4.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
}

struct RenderState {
    location: Location,
    flags: RecalculateFlags,
    reference: Arc<Reference>,
    series: Arc<SeriesApproximation>,
}

// Everything the background render thread needs
struct Shared {
    image_width: usize,
    image_height: usize,
    approximation_order: usize,
    state: Mutex<RenderState>,
    grid: IterationGrid,
    counters: ProgressCounters,
    pool: ThreadPool,
    drawing: AtomicBool,
    complete: AtomicBool,
}

struct ActiveRender {
    stop_flag: Arc<AtomicBool>,
    handle: JoinHandle<RenderOutcome>,
}

/// Per frame values shared by the passes.
struct Frame<'a> {
    perturbation: Perturbation<'a>,
    scale: FloatExtended,
    maximum_iteration: usize,
    surface: &'a dyn DrawSurface,
    palette: &'a dyn Palette,
    stop_flag: &'a AtomicBool,
}

impl<'a> Frame<'a> {
    #[inline]
    fn colour(&self, iteration: usize) -> Colour {
        colour_for(self.palette, iteration, self.maximum_iteration)
    }

    #[inline]
    fn stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

/// Owns the view, the cached orbit and series, and the iteration grid of one image.
///
/// At most one render runs at a time; every view change cancels it first.
pub struct FractalRenderer {
    shared: Arc<Shared>,
    active: Option<ActiveRender>,
}

impl FractalRenderer {
    pub fn new(image_width: usize, image_height: usize, location: Location, approximation_order: usize) -> Result<Self, RenderError> {
        FractalRenderer::with_threads(image_width, image_height, location, approximation_order, 0)
    }

    /// A thread count of 1 renders single threaded, 0 uses one worker per core.
    pub fn with_threads(image_width: usize, image_height: usize, location: Location, approximation_order: usize, threads: usize) -> Result<Self, RenderError> {
        if image_width == 0 || image_height == 0 {
            return Err(RenderError::Dimensions(image_width, image_height));
        }

        if location.maximum_iteration == 0 {
            return Err(LocationError::Iterations(0).into());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("render-worker-{}", index))
            .build()?;

        debug!("worker pool with {} threads", pool.current_num_threads());

        let state = RenderState {
            reference: Arc::new(Reference::new(location.maximum_iteration, location.center.digits())),
            series: Arc::new(SeriesApproximation::new(approximation_order)),
            flags: RecalculateFlags::all(),
            location,
        };

        Ok(FractalRenderer {
            shared: Arc::new(Shared {
                image_width,
                image_height,
                approximation_order,
                state: Mutex::new(state),
                grid: IterationGrid::new(image_width, image_height),
                counters: ProgressCounters::new(image_width * image_height),
                pool,
                drawing: AtomicBool::new(false),
                complete: AtomicBool::new(false),
            }),
            active: None,
        })
    }

    #[inline]
    pub fn image_width(&self) -> usize {
        self.shared.image_width
    }

    #[inline]
    pub fn image_height(&self) -> usize {
        self.shared.image_height
    }

    pub fn location(&self) -> Location {
        self.shared.state.lock().location.clone()
    }

    pub fn flags(&self) -> RecalculateFlags {
        self.shared.state.lock().flags
    }

    pub fn stats(&self) -> Stats {
        self.shared.counters.snapshot()
    }

    pub fn grid(&self) -> &IterationGrid {
        &self.shared.grid
    }

    /// True from the start of a render until it completes or is cancelled.
    pub fn is_drawing(&self) -> bool {
        self.shared.drawing.load(Ordering::SeqCst)
    }

    /// True only once the latest render has finished every pass.
    pub fn is_complete(&self) -> bool {
        self.shared.complete.load(Ordering::SeqCst)
    }

    /// Offset of a pixel from the view centre.
    pub fn get_deep_delta(&self, x: usize, y: usize) -> ComplexExtended {
        let scale = self.shared.state.lock().location.scale;
        self.shared.pixel_delta(x, y, scale)
    }

    pub fn pan(&mut self, x: usize, y: usize) {
        self.recentre(x, y, 1.0);
        debug!("panned to pixel ({}, {})", x, y);
    }

    pub fn zoom_in_at(&mut self, x: usize, y: usize) {
        self.recentre(x, y, 1.0 / ZOOM_FACTOR);
    }

    pub fn zoom_out_at(&mut self, x: usize, y: usize) {
        self.recentre(x, y, ZOOM_FACTOR);
    }

    /// Multiplies the scale about the current centre.
    pub fn zoom_by(&mut self, factor: f64) -> Result<(), ArithmeticError> {
        let factor = FloatExtended::from_f64(factor)?;

        if factor <= FloatExtended::ZERO {
            return Err(ArithmeticError::DomainError(factor.to_string()));
        }

        self.cancel();

        let mut state = self.shared.state.lock();
        state.location.scale *= factor;

        let digits = digits_for_scale(state.location.scale);
        state.location.center.set_digits(digits);
        state.flags.zoom();

        Ok(())
    }

    pub fn goto_location(&mut self, location: Location) {
        self.cancel();

        let mut state = self.shared.state.lock();
        state.location = location;
        state.flags.jump();
    }

    pub fn set_maximum_iteration(&mut self, maximum_iteration: usize) {
        self.cancel();

        let maximum_iteration = maximum_iteration.max(1);
        let mut state = self.shared.state.lock();

        let previous = state.location.maximum_iteration;
        state.flags.change_maximum_iteration(previous, maximum_iteration);
        state.location.maximum_iteration = maximum_iteration;
    }

    /// Only the colours change: the next render redraws the grid as is.
    pub fn recolour(&mut self) {
        self.cancel();
        self.shared.state.lock().flags.recolour();
    }

    // The delta is taken at the old scale, then added at the new precision
    fn recentre(&mut self, x: usize, y: usize, scale_factor: f64) {
        self.cancel();

        let mut state = self.shared.state.lock();
        let delta = self.shared.pixel_delta(x, y, state.location.scale);

        state.location.scale *= scale_factor;

        let digits = digits_for_scale(state.location.scale);
        state.location.center.set_digits(digits);
        state.location.center = state.location.center.add_extended(delta);

        if scale_factor == 1.0 {
            state.flags.pan();
        } else {
            state.flags.zoom();
        }
    }

    /// Renders on the calling thread, blocking until every pass is done.
    pub fn render(&mut self, surface: &dyn DrawSurface, palette: &dyn Palette) -> RenderOutcome {
        self.cancel();

        let stop_flag = AtomicBool::new(false);
        self.shared.render(&stop_flag, surface, palette)
    }

    /// Renders on a background thread; `on_complete` runs there when it finishes or is cancelled.
    pub fn start_render<F>(&mut self, surface: Arc<dyn DrawSurface>, palette: Arc<dyn Palette>, on_complete: F) -> Result<(), RenderError>
        where F: FnOnce(RenderOutcome) + Send + 'static {
        self.cancel();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop_flag = stop_flag.clone();
        let shared = self.shared.clone();

        self.shared.complete.store(false, Ordering::SeqCst);
        self.shared.drawing.store(true, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name("render".to_owned())
            .spawn(move || {
                let outcome = shared.render(&thread_stop_flag, surface.as_ref(), palette.as_ref());
                on_complete(outcome);
                outcome
            });

        match spawned {
            Ok(handle) => {
                self.active = Some(ActiveRender {
                    stop_flag,
                    handle
                });
                Ok(())
            }
            Err(error) => {
                self.shared.drawing.store(false, Ordering::SeqCst);
                Err(error.into())
            }
        }
    }

    /// Blocks until the background render ends, returning how it ended.
    pub fn wait(&mut self) -> Option<RenderOutcome> {
        let active = self.active.take()?;
        self.join(active)
    }

    /// Stops the background render. No counter or grid cell changes after this returns.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop_flag.store(true, Ordering::SeqCst);

            if let Some(outcome) = self.join(active) {
                debug!("render stopped: {:?}", outcome);
            }
        }
    }

    fn join(&self, active: ActiveRender) -> Option<RenderOutcome> {
        match active.handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!("render thread panicked");
                self.shared.drawing.store(false, Ordering::SeqCst);
                None
            }
        }
    }
}

impl Drop for FractalRenderer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Shared {
    fn pixel_delta(&self, x: usize, y: usize, scale: FloatExtended) -> ComplexExtended {
        let step = 1.0 / self.image_width.min(self.image_height) as f64;

        ComplexExtended::new(
            scale * ((x as f64 - self.image_width as f64 / 2.0) * step),
            scale * ((self.image_height as f64 / 2.0 - y as f64) * step)
        )
    }

    fn corner_probes(&self, scale: FloatExtended) -> Vec<ComplexExtended> {
        let right = self.image_width - 1;
        let bottom = self.image_height - 1;

        vec![
            self.pixel_delta(0, 0, scale),
            self.pixel_delta(right, 0, scale),
            self.pixel_delta(0, bottom, scale),
            self.pixel_delta(right, bottom, scale),
        ]
    }

    fn render(&self, stop_flag: &AtomicBool, surface: &dyn DrawSurface, palette: &dyn Palette) -> RenderOutcome {
        self.complete.store(false, Ordering::SeqCst);
        self.drawing.store(true, Ordering::SeqCst);

        let outcome = self.render_frame(stop_flag, surface, palette);

        if outcome == RenderOutcome::Completed {
            self.complete.store(true, Ordering::SeqCst);
        }

        self.drawing.store(false, Ordering::SeqCst);
        outcome
    }

    fn render_frame(&self, stop_flag: &AtomicBool, surface: &dyn DrawSurface, palette: &dyn Palette) -> RenderOutcome {
        let frame_time = Instant::now();
        self.counters.reset();

        let (location, flags) = {
            let mut state = self.state.lock();

            if state.flags.grid {
                self.grid.clear();
                state.flags.grid = false;
            }

            (state.location.clone(), state.flags)
        };

        let reference = match self.prepare_reference(&location, flags.reference, stop_flag) {
            Some(reference) => reference,
            None => return RenderOutcome::Cancelled,
        };

        let series = match self.prepare_series(&location, &reference, flags.approximation, stop_flag) {
            Some(series) => series,
            None => return RenderOutcome::Cancelled,
        };

        let frame = Frame {
            perturbation: Perturbation::new(&reference, &series, location.maximum_iteration, location.scale),
            scale: location.scale,
            maximum_iteration: location.maximum_iteration,
            surface,
            palette,
            stop_flag,
        };

        if frame.perturbation.uses_extended() {
            debug!("extended range iteration at scale {}", location.scale);
        }

        let time = Instant::now();

        if !self.refine_all(&frame) {
            return RenderOutcome::Cancelled;
        }

        info!("{:<14}{:>6} ms (evaluated {})", "Refinement", time.elapsed().as_millis(), self.counters.evaluated.get());

        let time = Instant::now();

        if !self.guess_columns(&frame) || !self.guess_rows(&frame) {
            return RenderOutcome::Cancelled;
        }

        info!("{:<14}{:>6} ms (guessed {})", "Guessing", time.elapsed().as_millis(), self.counters.guessed.get());

        let time = Instant::now();

        if !self.colourise(&frame) {
            return RenderOutcome::Cancelled;
        }

        info!("{:<14}{:>6} ms", "Colouring", time.elapsed().as_millis());
        info!("{:<14}{:>6} ms", "Total", frame_time.elapsed().as_millis());

        RenderOutcome::Completed
    }

    fn prepare_reference(&self, location: &Location, dirty: bool, stop_flag: &AtomicBool) -> Option<Arc<Reference>> {
        if !dirty {
            let reference = self.state.lock().reference.clone();
            self.counters.set_reference(reference.len());
            return Some(reference);
        }

        let time = Instant::now();

        let mut reference = Reference::new(location.maximum_iteration, location.center.digits());

        if !reference.run(&location.center, &self.counters, stop_flag) {
            return None;
        }

        info!("{:<14}{:>6} ms (precision {}, iterations {})", "Reference", time.elapsed().as_millis(), reference.digits, reference.len());

        let reference = Arc::new(reference);

        let mut state = self.state.lock();
        state.reference = reference.clone();
        state.flags.reference = false;

        Some(reference)
    }

    fn prepare_series(&self, location: &Location, reference: &Reference, dirty: bool, stop_flag: &AtomicBool) -> Option<Arc<SeriesApproximation>> {
        if !dirty {
            let series = self.state.lock().series.clone();
            self.counters.approximation.add(series.valid_iterations);
            return Some(series);
        }

        let time = Instant::now();

        let probes = self.corner_probes(location.scale);
        let mut series = SeriesApproximation::new(self.approximation_order);

        if !series.run(reference, &probes, &self.counters, stop_flag) {
            return None;
        }

        info!("{:<14}{:>6} ms", "Approximation", time.elapsed().as_millis());
        debug!("{:<16}{:>6} (order {})", "Skipped", series.valid_iterations, series.order);

        let series = Arc::new(series);

        let mut state = self.state.lock();
        state.series = series.clone();
        state.flags.approximation = false;

        Some(series)
    }

    /// The grid value of a pixel, iterating it if it is not known yet.
    fn resolve(&self, frame: &Frame, x: usize, y: usize) -> usize {
        if self.grid.is_known(x, y) {
            return self.grid.get(x, y);
        }

        let value = frame.perturbation.evaluate(self.pixel_delta(x, y, frame.scale));

        self.grid.set(x, y, value);
        self.counters.evaluated.inc();
        value
    }

    /// Like `resolve`, but takes the neighbours' value when they agree.
    fn guess(&self, frame: &Frame, x: usize, y: usize, neighbours: Option<(usize, usize)>) -> usize {
        if self.grid.is_known(x, y) {
            return self.grid.get(x, y);
        }

        match neighbours.and_then(|(first, second)| interpolate(first, second)) {
            Some(value) => {
                self.grid.set(x, y, value);
                self.counters.guessed.inc();
                value
            }
            None => self.resolve(frame, x, y),
        }
    }

    fn refine_all(&self, frame: &Frame) -> bool {
        let mut step = INITIAL_STEP;

        if !self.refine(frame, 0, 0, step, step, step, step) {
            return false;
        }

        while step > 2 {
            let half = step / 2;

            if !self.refine(frame, half, 0, step, step, half, step)
                || !self.refine(frame, 0, half, half, step, half, half) {
                return false;
            }

            step = half;
        }

        true
    }

    // Resolves every (x_offset + i * x_step, y_offset + j * y_step) and fills the block below and right of it
    #[allow(clippy::too_many_arguments)]
    fn refine(&self, frame: &Frame, x_offset: usize, y_offset: usize, x_step: usize, y_step: usize, block_width: usize, block_height: usize) -> bool {
        let rows = (y_offset..self.image_height).step_by(y_step).collect::<Vec<usize>>();

        self.pool.install(|| {
            rows.into_par_iter().for_each(|y| {
                for x in (x_offset..self.image_width).step_by(x_step) {
                    if frame.stopped() {
                        return;
                    }

                    let value = self.resolve(frame, x, y);
                    frame.surface.draw_block(x, y, block_width, block_height, frame.colour(value));
                }
            });
        });

        !frame.stopped()
    }

    // Odd columns of even rows, from their left and right neighbours
    fn guess_columns(&self, frame: &Frame) -> bool {
        let rows = (0..self.image_height).step_by(2).collect::<Vec<usize>>();

        self.pool.install(|| {
            rows.into_par_iter().for_each(|y| {
                for x in (1..self.image_width).step_by(2) {
                    if frame.stopped() {
                        return;
                    }

                    let neighbours = if x + 1 < self.image_width {
                        Some((self.grid.get(x - 1, y), self.grid.get(x + 1, y)))
                    } else {
                        None
                    };

                    let value = self.guess(frame, x, y, neighbours);
                    frame.surface.draw_block(x, y, 1, 2, frame.colour(value));
                }
            });
        });

        !frame.stopped()
    }

    // Every pixel of the odd rows, from the rows above and below
    fn guess_rows(&self, frame: &Frame) -> bool {
        let rows = (1..self.image_height).step_by(2).collect::<Vec<usize>>();

        self.pool.install(|| {
            rows.into_par_iter().for_each(|y| {
                for x in 0..self.image_width {
                    if frame.stopped() {
                        return;
                    }

                    let neighbours = if y + 1 < self.image_height {
                        Some((self.grid.get(x, y - 1), self.grid.get(x, y + 1)))
                    } else {
                        None
                    };

                    let value = self.guess(frame, x, y, neighbours);
                    frame.surface.draw(x, y, frame.colour(value));
                }
            });
        });

        !frame.stopped()
    }

    fn colourise(&self, frame: &Frame) -> bool {
        self.pool.install(|| {
            (0..self.image_height).into_par_iter().for_each(|y| {
                for x in 0..self.image_width {
                    if frame.stopped() {
                        return;
                    }

                    frame.surface.draw(x, y, frame.colour(self.grid.get(x, y)));
                }
            });
        });

        !frame.stopped()
    }
}
