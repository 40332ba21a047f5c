use super::*;
use crate::alarm::AlarmContext;

/// Chip-state stand-in that records its own clock stamps.
#[derive(Debug, Default)]
struct Stamps {
    event_clock: Clock,
    seen: Vec<Clock>, // amounts reported to subscribers
}

#[test]
fn below_threshold_is_a_no_op() {
    let mut domain = ClockDomain::new("main");
    let mut guard = ClockGuard::<Stamps>::new(1000);
    let mut stamps = Stamps::default();
    domain.advance(999);
    assert_eq!(guard.prevent_overflow(&mut domain, &mut stamps), 0);
    assert_eq!(domain.clock(), 999);
    assert!(stamps.seen.is_empty());
}

#[test]
fn rebase_amount_is_a_granularity_multiple() {
    let mut domain = ClockDomain::new("main");
    let mut guard = ClockGuard::<Stamps>::new(1000);
    guard.set_granularity(64);
    let mut stamps = Stamps::default();
    domain.advance(1005);

    let amount = guard.prevent_overflow(&mut domain, &mut stamps);
    assert!(amount > 0);
    assert_eq!(amount % 64, 0);
    assert_eq!(domain.clock(), 1005 - amount);
    // Phase within the granularity period is preserved
    assert_eq!((1005 - amount) % 64, 1005 % 64);
}

#[test]
fn subscribers_run_in_registration_order_with_exact_amount() {
    let mut domain = ClockDomain::new("main");
    let mut guard = ClockGuard::<Stamps>::new(500);
    guard.add_callback(Box::new(|s: &mut Stamps, amount| s.seen.push(amount)));
    guard.add_callback(Box::new(|s: &mut Stamps, amount| s.seen.push(amount + 1)));
    let mut stamps = Stamps::default();
    domain.advance(500);

    let amount = guard.prevent_overflow(&mut domain, &mut stamps);
    assert_eq!(stamps.seen, vec![amount, amount + 1]);
}

#[test]
fn time_until_next_event_survives_rebase() {
    let mut domain = ClockDomain::new("main");
    let mut guard = ClockGuard::<Stamps>::new(1000);
    guard.set_granularity(10);
    guard.add_callback(Box::new(|s: &mut Stamps, amount| s.event_clock -= amount));

    let mut alarms = AlarmContext::<Stamps>::new("main");
    let a = alarms.new_alarm("a", Box::new(|_, _, _| {}));
    let b = alarms.new_alarm("b", Box::new(|_, _, _| {}));

    let mut stamps = Stamps::default();
    domain.advance(1200);
    alarms.set(a, domain.clock() + 50);
    alarms.set(b, domain.clock() + 470);
    stamps.event_clock = domain.clock() + 333;

    let until_a = alarms.pending_clock(a).unwrap() - domain.clock();
    let until_b = alarms.pending_clock(b).unwrap() - domain.clock();
    let until_event = stamps.event_clock - domain.clock();

    let amount = guard.prevent_overflow(&mut domain, &mut stamps);
    assert!(amount > 0);
    alarms.rebase(amount);

    assert_eq!(alarms.pending_clock(a).unwrap() - domain.clock(), until_a);
    assert_eq!(alarms.pending_clock(b).unwrap() - domain.clock(), until_b);
    assert_eq!(stamps.event_clock - domain.clock(), until_event);
}

#[test]
fn guard_trips_again_after_reaccumulation() {
    let mut domain = ClockDomain::new("main");
    let mut guard = ClockGuard::<Stamps>::new(100);
    let mut stamps = Stamps::default();

    domain.advance(150);
    // 150 - headroom(50), granularity 1
    let first = guard.prevent_overflow(&mut domain, &mut stamps);
    assert_eq!(first, 100);
    assert_eq!(domain.clock(), 50);
    assert_eq!(guard.prevent_overflow(&mut domain, &mut stamps), 0);

    domain.advance(60);
    let second = guard.prevent_overflow(&mut domain, &mut stamps);
    assert_eq!(second, 60);
    assert_eq!(domain.clock(), 50);
}
