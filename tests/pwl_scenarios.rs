mod common;

use qpwl::pwl::{build_evaluator, Segment, SegmentTable, Strategy};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn three_segment_table() -> SegmentTable {
    SegmentTable::new(vec![
        Segment::new(i32::MIN, 1, i16::MIN),
        Segment::new(0, 2, 0),
        Segment::new(1000, 1, 2000),
    ])
    .unwrap()
}

#[test]
fn three_segment_scenario() {
    let table = three_segment_table();
    let ev = build_evaluator(&table, Strategy::Auto).unwrap();
    assert!(!ev.is_lookup(), "three segments stay on binary search");
    let mut sat = 0u32;
    assert_eq!(ev.evaluate(5, &mut sat), 10);
    assert_eq!(ev.evaluate(999, &mut sat), 1998);
    assert_eq!(ev.evaluate(1000, &mut sat), 2000);
    assert_eq!(sat, 0);
    assert_eq!(ev.evaluate(2_000_000_000, &mut sat), i16::MAX);
    assert_eq!(sat, 1);
    // left boundary itself is flat, not saturation
    assert_eq!(ev.evaluate(i32::MIN, &mut sat), i16::MIN);
    assert_eq!(sat, 1);
}

#[test]
fn three_segment_table_minus_five_follows_segment_zero_and_clamps() {
    // -5 is right of the i32::MIN breakpoint: (2^31 - 5) * 1 - 32768 overflows
    // i16, so the value clamps and counts rather than reading -10
    let table = three_segment_table();
    for strategy in [Strategy::Auto, Strategy::ForceBinary, Strategy::ForceLookup] {
        let ev = build_evaluator(&table, strategy).unwrap();
        let mut sat = 0u32;
        assert_eq!(ev.evaluate(-5, &mut sat), i16::MAX, "{:?}", strategy);
        assert_eq!(sat, 1);
        assert_eq!(common::reference_eval(table.segments(), -5), (i16::MAX, true));
    }
}

#[test]
fn scaled_first_segment_extends_flat_region() {
    // the flat region ends at the packed x_base; the slope still runs from the
    // masked breakpoint
    for code in 1..=3u8 {
        let table = SegmentTable::new(vec![
            Segment::with_scale(-1024, code, i16::MAX, -77),
            Segment::new(0, 1, 0),
            Segment::new(64, 1, 0),
            Segment::new(128, 1, 0),
        ])
        .unwrap();
        let after = -1024 + code as i32 + 1;
        let expected_after = ((((code as i64) + 1) * i16::MAX as i64) >> (8 * code as u32)) - 77;
        for strategy in [Strategy::Auto, Strategy::ForceBinary, Strategy::ForceLookup] {
            let ev = build_evaluator(&table, strategy).unwrap();
            let mut sat = 0;
            for x in -1024..after {
                assert_eq!(ev.evaluate(x, &mut sat), -77, "code={} {:?} x={}", code, strategy, x);
            }
            assert_eq!(ev.evaluate(after, &mut sat) as i64, expected_after, "code={} {:?}", code, strategy);
            assert_eq!(sat, 0);
        }
    }
    let table = SegmentTable::new(vec![
        Segment::with_scale(-1024, 1, i16::MAX, 0),
        Segment::new(0, 1, 0),
        Segment::new(64, 1, 0),
        Segment::new(128, 1, 0),
    ])
    .unwrap();
    let mut sat = 0;
    assert_eq!(build_evaluator(&table, Strategy::Auto).unwrap().evaluate(-1023, &mut sat), 0);
}

#[test]
fn three_segment_scenario_forced_lookup_agrees() {
    let table = three_segment_table();
    let lookup = build_evaluator(&table, Strategy::ForceLookup).unwrap();
    let binary = build_evaluator(&table, Strategy::ForceBinary).unwrap();
    assert!(lookup.is_lookup());
    for x in [i32::MIN, i32::MIN + 1, -5, -1, 0, 1, 5, 511, 512, 513, 999, 1000, 1001, 1023, 1024, 2_000_000_000, i32::MAX] {
        let (mut sl, mut sb) = (0, 0);
        assert_eq!(lookup.evaluate(x, &mut sl), binary.evaluate(x, &mut sb), "x={}", x);
        assert_eq!(sl, sb, "x={}", x);
    }
}

#[test]
fn left_region_is_flat() {
    let table = SegmentTable::new(vec![
        Segment::new(-4000, 100, 1234),
        Segment::new(0, 3, 1300),
        Segment::new(400, -7, 2500),
        Segment::new(800, 1, 0),
        Segment::new(1600, 0, -10),
    ])
    .unwrap();
    for strategy in [Strategy::Auto, Strategy::ForceBinary, Strategy::ForceLookup] {
        let ev = build_evaluator(&table, strategy).unwrap();
        let mut sat = 0;
        for x in [i32::MIN, -1_000_000_000, -4001, -4000] {
            assert_eq!(ev.evaluate(x, &mut sat), 1234, "{:?} x={}", strategy, x);
        }
        assert_eq!(sat, 0);
        // one step right of the boundary follows the segment-0 slope
        assert_eq!(ev.evaluate(-3996, &mut sat), 1634);
    }
}

#[test]
fn breakpoints_evaluate_to_their_y_base() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..200 {
        let n = rng.gen_range(2..=40);
        let segs = common::random_segments(&mut rng, n);
        let table = SegmentTable::new(segs.clone()).unwrap();
        for strategy in [Strategy::Auto, Strategy::ForceBinary, Strategy::ForceLookup] {
            let Ok(ev) = build_evaluator(&table, strategy) else { continue };
            let mut sat = 0;
            assert_eq!(ev.evaluate(segs[0].breakpoint(), &mut sat), segs[0].y_base);
            for s in &segs[1..] {
                assert_eq!(ev.evaluate(s.breakpoint(), &mut sat), s.y_base, "{:?} at {}", strategy, s.breakpoint());
            }
            assert_eq!(sat, 0);
        }
    }
}

#[test]
fn saturation_count_is_per_evaluation() {
    let table = SegmentTable::new(vec![
        Segment::new(-1024, 0, 0),
        Segment::new(0, i16::MAX, 0),
        Segment::new(64, i16::MIN, 0),
        Segment::new(128, 0, 77),
        Segment::new(192, 1, 77),
    ])
    .unwrap();
    for strategy in [Strategy::Auto, Strategy::ForceBinary] {
        let ev = build_evaluator(&table, strategy).unwrap();
        let mut sat = 0;
        for _ in 0..100 { assert_eq!(ev.evaluate(10, &mut sat), i16::MAX); }
        assert_eq!(sat, 100);
        for _ in 0..100 { assert_eq!(ev.evaluate(70, &mut sat), i16::MIN); }
        assert_eq!(sat, 200);
        for _ in 0..100 { ev.evaluate(130, &mut sat); ev.evaluate(-5000, &mut sat); ev.evaluate(1, &mut sat); }
        assert_eq!(sat, 200);
    }
}

#[test]
fn scale_code_shifts_the_product() {
    // code 1 -> >> 8, code 2 -> >> 16
    let table = SegmentTable::new(vec![
        Segment::new(-256, 0, 0),
        Segment::with_scale(0, 1, 256, 0),
        Segment::with_scale(1 << 16, 2, 1, 300),
    ])
    .unwrap();
    let ev = build_evaluator(&table, Strategy::Auto).unwrap();
    let mut sat = 0;
    assert_eq!(ev.evaluate(100, &mut sat), 100);
    assert_eq!(ev.evaluate((1 << 16) + (5 << 16), &mut sat), 305);
    // arithmetic shift floors negative products
    let neg = SegmentTable::new(vec![Segment::new(-8, 0, 0), Segment::with_scale(0, 1, -1, 0)]).unwrap();
    let ev = build_evaluator(&neg, Strategy::Auto).unwrap();
    assert_eq!(ev.evaluate(1, &mut sat), -1);
    assert_eq!(ev.evaluate(256, &mut sat), -1);
    assert_eq!(ev.evaluate(257, &mut sat), -2);
    assert_eq!(sat, 0);
}

#[test]
fn matches_reference_oracle() {
    let mut rng = SmallRng::seed_from_u64(99);
    for _ in 0..100 {
        let n = rng.gen_range(1..=64);
        let segs = common::random_segments(&mut rng, n);
        let table = SegmentTable::new(segs.clone()).unwrap();
        let ev = build_evaluator(&table, Strategy::Auto).unwrap();
        for x in common::sample_points(&mut rng, &segs) {
            let mut sat = 0;
            let (want, clamped) = common::reference_eval(&segs, x);
            assert_eq!(ev.evaluate(x, &mut sat), want, "{} x={}", ev.variant_name(), x);
            assert_eq!(sat, clamped as u32);
        }
    }
}
