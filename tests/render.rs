use deep_zoom::util::colouring::Colour;
use deep_zoom::util::image::Image;
use deep_zoom::util::HighPrecisionComplex;
use deep_zoom::{FractalRenderer, Location, RenderOutcome};

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn grey(iteration: usize) -> Colour {
    let value = (iteration % 256) as u8;
    Colour::new(value, value, value)
}

/// Plain iteration of z = z^2 + c at a precision well beyond the view's.
///
/// Also reports whether the count sits on a level set edge, where |z|^2 passes within 0.1% of 4.
fn oracle(c: &HighPrecisionComplex, maximum_iteration: usize) -> (usize, bool) {
    let mut z = HighPrecisionComplex::zero(c.digits());
    let mut previous = 0.0;

    for iteration in 1..=maximum_iteration {
        z.square_add_mut(c);
        let norm = z.to_fixed().norm_sqr();

        if norm > 4.0 {
            return (iteration, norm < 4.004 || previous > 3.996);
        }

        previous = norm;
    }

    (maximum_iteration, previous > 3.996)
}

/// Renders the view and checks every directly evaluated pixel against the oracle.
///
/// Counts must match exactly, except on a level set edge where they may differ by one.
fn assert_matches_oracle(real: &str, imaginary: &str, scale: &str, size: usize, maximum_iteration: usize) {
    let location = Location::new(real, imaginary, scale, maximum_iteration).unwrap();
    let mut renderer = FractalRenderer::new(size, size, location.clone(), 6).unwrap();
    let image = Image::new(size, size);

    assert_eq!(renderer.render(&image, &grey), RenderOutcome::Completed);

    let mut center = location.center.clone();
    center.set_digits(location.center.digits() + 40);

    let mut total = 0;
    let mut on_edge = 0;

    // even cells are always iterated by the refinement passes, never guessed
    for y in (0..size).step_by(2) {
        for x in (0..size).step_by(2) {
            let c = center.add_extended(renderer.get_deep_delta(x, y));
            let value = renderer.grid().get(x, y);
            let (expected, edge) = oracle(&c, maximum_iteration);

            total += 1;

            if edge {
                on_edge += 1;
                assert!((value as i64 - expected as i64).abs() <= 1, "pixel ({}, {}): {} against {}", x, y, value, expected);
            } else {
                assert_eq!(value, expected, "pixel ({}, {})", x, y);
            }
        }
    }

    assert!(on_edge * 10 <= total, "{} of {} pixels on a level set edge", on_edge, total);
}

#[test]
fn end_to_end_small_image() {
    let location = Location::new("0", "0", "4", 256).unwrap();
    let mut renderer = FractalRenderer::new(64, 64, location, 6).unwrap();
    let image = Image::new(64, 64);

    assert_eq!(renderer.render(&image, &grey), RenderOutcome::Completed);
    assert!(renderer.is_complete());
    assert!(!renderer.is_drawing());

    // centre pixel is the origin
    assert_eq!(renderer.grid().get(32, 32), 256);
    assert_eq!(image.pixel(32, 32), Colour::BLACK);

    // top right pixel sits at (1.9375, 2)
    let corner = renderer.grid().get(63, 0);
    assert!(corner >= 1 && corner <= 5);
    assert_eq!(image.pixel(63, 0), grey(corner));

    let stats = renderer.stats();
    assert_eq!(stats.total, 64 * 64);
    assert_eq!(stats.resolved(), 64 * 64);
    assert_eq!(stats.reference, 256);
    assert_eq!(renderer.grid().unknown_count(), 0);
}

#[test]
fn shallow_view_matches_oracle() {
    assert_matches_oracle("-0.5", "0", "4", 64, 300);
}

#[test]
fn deep_view_matches_oracle() {
    assert_matches_oracle("0", "1", "1e-25", 32, 1000);
}

#[test]
fn extended_range_view_matches_oracle() {
    assert_matches_oracle("0", "1", "1e-320", 16, 2000);
}

#[test]
fn zero_iteration_limit_is_rejected() {
    assert!(Location::new("0", "0", "4", 0).is_err());
}

#[test]
fn single_threaded_render_completes() {
    let location = Location::new("0", "0", "4", 128).unwrap();
    let mut renderer = FractalRenderer::with_threads(32, 32, location, 6, 1).unwrap();
    let image = Image::new(32, 32);

    assert_eq!(renderer.render(&image, &grey), RenderOutcome::Completed);
    assert_eq!(renderer.grid().unknown_count(), 0);
    assert_eq!(renderer.grid().get(16, 16), 128);
}

#[test]
fn zooming_in_keeps_rendering() {
    let location = Location::new("-0.75", "0.1", "4", 500).unwrap();
    let mut renderer = FractalRenderer::new(32, 32, location, 6).unwrap();
    let image = Image::new(32, 32);

    for _ in 0..5 {
        renderer.zoom_in_at(16, 16);
        assert_eq!(renderer.render(&image, &grey), RenderOutcome::Completed);
        assert_eq!(renderer.grid().unknown_count(), 0);
    }

    let scale = renderer.location().scale;
    assert_eq!(scale.exponent, -3);
    assert!((scale.mantissa - 3.90625).abs() < 1e-12);
}

#[test]
fn location_round_trips_through_renderer() {
    let location = Location::new("-1.25", "0.0625", "2.5e-12", 1000).unwrap();
    let mut renderer = FractalRenderer::new(16, 16, Location::new("0", "0", "4", 100).unwrap(), 6).unwrap();

    renderer.goto_location(location.clone());

    let saved = renderer.location().to_toml();
    assert_eq!(Location::from_toml(&saved).unwrap(), location);
}

#[test]
fn background_render_completes() {
    let location = Location::new("0", "0", "4", 128).unwrap();
    let mut renderer = FractalRenderer::new(48, 32, location, 6).unwrap();
    let image = Arc::new(Image::new(48, 32));

    let (sender, receiver) = mpsc::channel();

    renderer.start_render(image.clone(), Arc::new(grey), move |outcome| {
        sender.send(outcome).unwrap();
    }).unwrap();

    assert_eq!(renderer.wait(), Some(RenderOutcome::Completed));
    assert_eq!(receiver.recv().unwrap(), RenderOutcome::Completed);
    assert!(renderer.is_complete());
    assert!(!renderer.is_drawing());
    assert_eq!(renderer.stats().resolved(), 48 * 32);
}

#[test]
fn cancelling_stops_all_progress() {
    // a long orbit with many bounded pixels keeps the render busy for seconds
    let location = Location::new("0", "0", "4", 300_000).unwrap();
    let mut renderer = FractalRenderer::new(128, 128, location, 6).unwrap();
    let image = Arc::new(Image::new(128, 128));

    let (sender, receiver) = mpsc::channel();

    renderer.start_render(image, Arc::new(grey), move |outcome| {
        sender.send(outcome).unwrap();
    }).unwrap();

    assert!(renderer.is_drawing());
    thread::sleep(Duration::from_millis(300));

    renderer.cancel();

    assert!(!renderer.is_drawing());
    assert!(!renderer.is_complete());
    assert_eq!(receiver.recv().unwrap(), RenderOutcome::Cancelled);

    let stats = renderer.stats();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(renderer.stats(), stats);
    assert!(renderer.grid().unknown_count() > 0);
}

#[test]
fn new_render_cancels_previous() {
    let location = Location::new("0", "0", "4", 300_000).unwrap();
    let mut renderer = FractalRenderer::new(128, 128, location, 6).unwrap();
    let image = Arc::new(Image::new(128, 128));

    let (sender, receiver) = mpsc::channel();
    let first = sender.clone();

    renderer.start_render(image.clone(), Arc::new(grey), move |outcome| {
        first.send(("first", outcome)).unwrap();
    }).unwrap();

    thread::sleep(Duration::from_millis(50));

    renderer.set_maximum_iteration(64);
    renderer.start_render(image, Arc::new(grey), move |outcome| {
        sender.send(("second", outcome)).unwrap();
    }).unwrap();

    assert_eq!(renderer.wait(), Some(RenderOutcome::Completed));
    assert_eq!(receiver.recv().unwrap(), ("first", RenderOutcome::Cancelled));
    assert_eq!(receiver.recv().unwrap(), ("second", RenderOutcome::Completed));
}
