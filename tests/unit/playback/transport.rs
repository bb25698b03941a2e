use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn stepped_only_advances_while_playing() {
    let mut t = SteppedTransport::new(10.0, fps30());
    t.on_host_frame();
    assert_eq!(t.current_time(), 0.0);
    t.play().unwrap();
    t.on_host_frame();
    t.on_host_frame();
    assert_eq!(t.ticks(), 2);
    t.pause();
    t.on_host_frame();
    assert_eq!(t.ticks(), 2);
    assert!(!t.is_playing());
}

#[test]
fn stepped_reaches_duration_exactly() {
    let mut t = SteppedTransport::new(10.0, fps30());
    t.play().unwrap();
    for _ in 0..299 {
        t.on_host_frame();
    }
    assert!(t.current_time() < 10.0);
    assert!(!t.has_ended());
    t.on_host_frame();
    assert_eq!(t.current_time(), 10.0);
    assert!(t.has_ended());
    assert!(!t.is_playing());
}

#[test]
fn looping_stepped_wraps() {
    let mut t = SteppedTransport::new(1.0, Fps::new(4, 1).unwrap()).looping(true);
    t.play().unwrap();
    for _ in 0..5 {
        t.on_host_frame();
    }
    assert_eq!(t.current_time(), 0.25);
    assert!(!t.has_ended());
    assert!(t.is_playing());
}

#[test]
fn rewind_and_replay_after_end_start_from_zero() {
    let mut t = SteppedTransport::new(0.5, Fps::new(4, 1).unwrap());
    t.play().unwrap();
    t.on_host_frame();
    t.on_host_frame();
    assert!(t.has_ended());
    t.play().unwrap();
    assert_eq!(t.current_time(), 0.0);
    t.on_host_frame();
    t.rewind();
    assert_eq!(t.current_time(), 0.0);
    assert!(t.is_playing());
}

#[test]
fn wall_transport_pause_freezes_time() {
    let mut t = WallTransport::new(60.0);
    assert_eq!(t.current_time(), 0.0);
    t.play().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    t.pause();
    let frozen = t.current_time();
    assert!(frozen > 0.0);
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(t.current_time(), frozen);
    t.pause();
    t.rewind();
    assert_eq!(t.current_time(), 0.0);
}

#[test]
fn zero_length_wall_track_has_ended() {
    let t = WallTransport::new(0.0);
    assert!(t.has_ended());
    assert_eq!(t.current_time(), 0.0);
    assert_eq!(WallTransport::new(f64::NAN).duration(), 0.0);
}

#[test]
fn offline_pacer_steps_every_transport() {
    let mut a = SteppedTransport::new(10.0, fps30());
    let mut b = SteppedTransport::new(10.0, fps30()).looping(true);
    a.play().unwrap();
    b.play().unwrap();
    let mut pacer = FramePacer::new(Pacing::Offline, fps30());
    for _ in 0..3 {
        pacer.next_frame(&mut [&mut a, &mut b]);
    }
    assert_eq!(a.ticks(), 3);
    assert_eq!(b.ticks(), 3);
}

#[test]
fn realtime_pacer_waits_a_frame_period() {
    let fps = Fps::new(50, 1).unwrap();
    let mut pacer = FramePacer::new(Pacing::Realtime, fps);
    let start = Instant::now();
    for _ in 0..3 {
        pacer.next_frame(&mut []);
    }
    assert!(start.elapsed() >= Duration::from_millis(55));
}
