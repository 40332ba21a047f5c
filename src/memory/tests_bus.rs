use super::*;
use crate::timer::{ctrl, reg, IntervalTimer};

fn board() -> (Bus, AlarmContext<Bus>) {
    let mut bus = Bus::new(0xDC00, 0xDD00, 26);
    let mut alarms = AlarmContext::new("test");
    let timer_alarm = IntervalTimer::install(&mut alarms);
    bus.timer.attach(timer_alarm);
    (bus, alarms)
}

#[test]
fn ram_reads_back_writes() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0x0000, 0x0FFF, PageTarget::Ram);
    bus.write(0x0123, 0xAB, 0, &mut alarms);
    assert_eq!(bus.read(0x0123, 0, &mut alarms), 0xAB);
}

#[test]
fn rom_serves_its_image_and_ignores_writes() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0xE000, 0xFFFF, PageTarget::Rom);
    bus.attach_rom(0xE000, &[0x11, 0x22, 0x33]);

    assert_eq!(bus.read(0xE000, 0, &mut alarms), 0x11);
    assert_eq!(bus.read(0xE002, 0, &mut alarms), 0x33);

    bus.write(0xE000, 0x99, 0, &mut alarms);
    assert_eq!(bus.read(0xE000, 0, &mut alarms), 0x11);
}

#[test]
fn reads_past_the_rom_image_float() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0xE000, 0xFFFF, PageTarget::Rom);
    bus.attach_rom(0xE000, &[0x11]);

    // The latch holds the last value that crossed the bus
    bus.write(0x0000, 0x5A, 0, &mut alarms); // open page: latch only
    assert_eq!(bus.read(0xE100, 0, &mut alarms), 0x5A);
}

#[test]
fn open_bus_returns_the_last_driven_value() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0x0000, 0x00FF, PageTarget::Ram);

    bus.write(0x0010, 0x77, 0, &mut alarms);
    assert_eq!(bus.read(0x8000, 0, &mut alarms), 0x77);

    // A read refreshes the latch too
    bus.write(0x0011, 0x42, 0, &mut alarms);
    bus.read(0x0010, 0, &mut alarms); // drives 0x77 onto the bus again
    assert_eq!(bus.read(0x8000, 0, &mut alarms), 0x77);
}

#[test]
#[should_panic]
fn unaligned_region_is_rejected() {
    let (mut bus, _alarms) = board();
    bus.map_region(0x0010, 0x01FF, PageTarget::Ram);
}

#[test]
#[should_panic]
fn inverted_region_is_rejected() {
    let (mut bus, _alarms) = board();
    bus.map_region(0x0200, 0x00FF, PageTarget::Ram);
}

#[test]
fn io_page_routes_timer_registers() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0xDC00, 0xDCFF, PageTarget::Io);

    bus.write(0xDC00 + reg::LATCH_LO, 50, 0, &mut alarms);
    bus.write(0xDC00 + reg::LATCH_HI, 0, 0, &mut alarms);
    bus.write(
        0xDC00 + reg::CONTROL,
        ctrl::START | ctrl::IRQ_ENABLE,
        0,
        &mut alarms,
    );
    assert!(bus.timer.running());
    assert_eq!(alarms.next_pending_clock(), 51);

    // Fire, then acknowledge through the mapped status register
    alarms.dispatch(&mut bus, 51);
    assert!(bus.irq.irq_line());
    assert_eq!(bus.read(0xDC00 + reg::STATUS, 51, &mut alarms), 1);
    assert!(!bus.irq.irq_line());
    assert_eq!(bus.read(0xDC00 + reg::STATUS, 51, &mut alarms), 0);
}

#[test]
fn unassigned_io_addresses_float() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0xDC00, 0xDCFF, PageTarget::Io);
    bus.write(0x0000, 0x3C, 0, &mut alarms); // open page: latch only
    assert_eq!(bus.read(0xDC80, 0, &mut alarms), 0x3C);
}

#[test]
fn remapping_a_page_changes_its_target() {
    let (mut bus, mut alarms) = board();
    bus.map_region(0x1000, 0x1FFF, PageTarget::Ram);
    bus.write(0x1800, 0x66, 0, &mut alarms);
    assert_eq!(bus.read(0x1800, 0, &mut alarms), 0x66);

    bus.map_region(0x1800, 0x18FF, PageTarget::OpenBus);
    bus.write(0x0000, 0x01, 0, &mut alarms);
    assert_eq!(bus.read(0x1800, 0, &mut alarms), 0x01);
    // Pages around the remapped one are untouched
    bus.write(0x1700, 0x67, 0, &mut alarms);
    assert_eq!(bus.read(0x1700, 0, &mut alarms), 0x67);
}
